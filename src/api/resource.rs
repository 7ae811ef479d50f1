//! The recipe entity handler.
//!
//! Translates the recipe operations into calls against the primary store and
//! the search index. Writes go to the primary store first and are mirrored to
//! the index only once that succeeds; a failed index write is not compensated
//! (see [`crate::indexer::reindex`] for the manual repair path).

use std::sync::Arc;
use tracing::debug;

use crate::db::{models::Recipe, recipes, DbPool};
use crate::indexer::{self, SearchIndex};
use crate::{Error, Result};

pub const ENTITY_NAME: &str = "recipe";

/// Path of a stored recipe, used as the `Location` of a created record
pub fn recipe_location(id: i64) -> String {
    format!("/api/recipes/{id}")
}

/// A freshly created recipe
#[derive(Debug, Clone)]
pub struct Created {
    pub id: i64,
    pub location: String,
    pub recipe: Recipe,
}

/// Result of an update request
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The request carried no id and was handled as a create
    Created(Created),
    Updated(Recipe),
}

impl SaveOutcome {
    pub fn recipe(&self) -> &Recipe {
        match self {
            SaveOutcome::Created(created) => &created.recipe,
            SaveOutcome::Updated(recipe) => recipe,
        }
    }
}

/// Handler holding the two long-lived store handles
#[derive(Clone)]
pub struct RecipeResource {
    pool: DbPool,
    search_index: Arc<SearchIndex>,
}

impl RecipeResource {
    pub fn new(pool: DbPool, search_index: Arc<SearchIndex>) -> Self {
        Self { pool, search_index }
    }

    /// Create a recipe; it must not carry an id yet
    pub async fn create(&self, recipe: Recipe) -> Result<Created> {
        debug!("Create recipe request: {}", recipe.name);

        if recipe.id.is_some() {
            return Err(Error::bad_request_alert(
                "A new recipe cannot already have an ID",
                ENTITY_NAME,
                "idexists",
            ));
        }

        let stored = recipes::insert_recipe(&self.pool, &recipe).await?;
        self.search_index.save_recipe(&stored).await?;

        let id = stored
            .id
            .ok_or_else(|| Error::Internal("Stored recipe has no id".to_string()))?;

        Ok(Created {
            id,
            location: recipe_location(id),
            recipe: stored,
        })
    }

    /// Update a recipe, replacing every field; without an id this creates one instead
    pub async fn update(&self, recipe: Recipe) -> Result<SaveOutcome> {
        let Some(id) = recipe.id else {
            return self.create(recipe).await.map(SaveOutcome::Created);
        };

        debug!("Update recipe request: {}", id);

        let stored = recipes::upsert_recipe(&self.pool, id, &recipe).await?;
        self.search_index.save_recipe(&stored).await?;

        Ok(SaveOutcome::Updated(stored))
    }

    /// Every stored recipe with relationships loaded
    pub async fn get_all(&self) -> Result<Vec<Recipe>> {
        debug!("List recipes request");
        recipes::list_recipes_with_relationships(&self.pool).await
    }

    pub async fn get(&self, id: i64) -> Result<Recipe> {
        debug!("Get recipe request: {}", id);
        recipes::get_recipe(&self.pool, id).await
    }

    /// Delete from both stores; an unknown id is not an error
    pub async fn delete(&self, id: i64) -> Result<()> {
        debug!("Delete recipe request: {}", id);

        recipes::delete_recipe(&self.pool, id).await?;
        self.search_index.delete_recipe(id).await?;

        Ok(())
    }

    /// Query-string search against the index
    pub async fn search(&self, query: &str) -> Result<Vec<Recipe>> {
        debug!("Search recipes request: {:?}", query);
        self.search_index.search(query)
    }

    /// Rebuild the index from the primary store
    pub async fn reindex(&self) -> Result<usize> {
        indexer::reindex(&self.pool, &self.search_index).await
    }
}
