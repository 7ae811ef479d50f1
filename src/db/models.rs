use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `recipes` table, without relationships
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub servings: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub difficulty: Option<String>,
}

/// A recipe with its ingredients and tags loaded.
///
/// This is both the request body and the response body of the recipe API.
/// `id` is absent until the primary store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub servings: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Recipe {
    /// Minimal recipe with only a name, mostly useful in tests
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            instructions: None,
            servings: None,
            total_time_minutes: None,
            difficulty: None,
            ingredients: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn from_row(row: RecipeRow, ingredients: Vec<RecipeIngredient>, tags: Vec<String>) -> Self {
        Self {
            id: Some(row.id),
            name: row.name,
            description: row.description,
            instructions: row.instructions,
            servings: row.servings,
            total_time_minutes: row.total_time_minutes,
            difficulty: row.difficulty,
            ingredients,
            tags,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// Ingredient as it appears in a recipe, with quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl RecipeIngredient {
    pub fn new(name: impl Into<String>, quantity: Option<f64>, unit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.map(str::to_string),
        }
    }
}
