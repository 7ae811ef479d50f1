use crate::db::{ingredients, models::*, tags, DbPool};
use crate::error::{Error, Result};
use sqlx::SqliteConnection;
use tracing::debug;

/// Replace the ingredient and tag relationships of a recipe
async fn write_relationships(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    recipe: &Recipe,
) -> Result<()> {
    ingredients::set_recipe_ingredients(conn, recipe_id, &recipe.ingredients).await?;
    tags::set_recipe_tags(conn, recipe_id, &recipe.tags).await?;
    Ok(())
}

/// Drop shared ingredient and tag rows no recipe points at any more
async fn prune_unused(conn: &mut SqliteConnection) -> Result<()> {
    let ingredients = ingredients::delete_unused_ingredients(conn).await?;
    let tags = tags::delete_unused_tags(conn).await?;

    if ingredients > 0 || tags > 0 {
        debug!("Pruned {} unused ingredients and {} unused tags", ingredients, tags);
    }

    Ok(())
}

/// Insert a new recipe, letting the store assign its id.
///
/// Any id already on `recipe` is ignored. Returns the stored record with
/// relationships reloaded.
pub async fn insert_recipe(pool: &DbPool, recipe: &Recipe) -> Result<Recipe> {
    let mut tx = pool.begin().await?;

    let recipe_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO recipes (
            name, description, instructions, servings, total_time_minutes, difficulty
        )
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&recipe.name)
    .bind(&recipe.description)
    .bind(&recipe.instructions)
    .bind(recipe.servings)
    .bind(recipe.total_time_minutes)
    .bind(&recipe.difficulty)
    .fetch_one(&mut *tx)
    .await?;

    write_relationships(&mut tx, recipe_id, recipe).await?;
    tx.commit().await?;

    get_recipe(pool, recipe_id).await
}

/// Insert or overwrite the recipe stored under `recipe_id`.
///
/// Every field and both relationships are replaced wholesale.
pub async fn upsert_recipe(pool: &DbPool, recipe_id: i64, recipe: &Recipe) -> Result<Recipe> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO recipes (
            id, name, description, instructions, servings, total_time_minutes, difficulty
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            instructions = excluded.instructions,
            servings = excluded.servings,
            total_time_minutes = excluded.total_time_minutes,
            difficulty = excluded.difficulty
        "#,
    )
    .bind(recipe_id)
    .bind(&recipe.name)
    .bind(&recipe.description)
    .bind(&recipe.instructions)
    .bind(recipe.servings)
    .bind(recipe.total_time_minutes)
    .bind(&recipe.difficulty)
    .execute(&mut *tx)
    .await?;

    write_relationships(&mut tx, recipe_id, recipe).await?;
    prune_unused(&mut tx).await?;
    tx.commit().await?;

    get_recipe(pool, recipe_id).await
}

/// Find a recipe with its ingredients and tags
pub async fn find_recipe_with_relationships(pool: &DbPool, recipe_id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, RecipeRow>("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let ingredients = ingredients::get_recipe_ingredients(pool, recipe_id).await?;
    let tags = tags::get_tags_for_recipe(pool, recipe_id).await?;

    Ok(Some(Recipe::from_row(row, ingredients, tags)))
}

/// Get recipe by ID
pub async fn get_recipe(pool: &DbPool, recipe_id: i64) -> Result<Recipe> {
    find_recipe_with_relationships(pool, recipe_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))
}

/// List every recipe ordered by id.
///
/// Relationships are loaded for the whole table in one query each, so the
/// cost does not grow with a per-recipe bind list.
pub async fn list_recipes_with_relationships(pool: &DbPool) -> Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, RecipeRow>("SELECT * FROM recipes ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut ingredients_map = ingredients::get_all_recipe_ingredients(pool).await?;
    let mut tags_map = tags::get_all_recipe_tags(pool).await?;

    let recipes = rows
        .into_iter()
        .map(|row| {
            let ingredients = ingredients_map.remove(&row.id).unwrap_or_default();
            let tags = tags_map.remove(&row.id).unwrap_or_default();
            Recipe::from_row(row, ingredients, tags)
        })
        .collect();

    Ok(recipes)
}

/// Count all recipes
pub async fn count_recipes(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Delete recipe, returning the number of rows removed.
///
/// Relationship rows go with it through `ON DELETE CASCADE`; shared
/// ingredient and tag rows left unused are pruned in the same transaction.
pub async fn delete_recipe(pool: &DbPool, recipe_id: i64) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() > 0 {
        prune_unused(&mut tx).await?;
    }
    tx.commit().await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_pool, run_migrations};

    async fn setup() -> DbPool {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn soup() -> Recipe {
        Recipe {
            description: Some("Warming".to_string()),
            servings: Some(4),
            total_time_minutes: Some(30),
            difficulty: Some("easy".to_string()),
            ingredients: vec![
                RecipeIngredient::new("tomato", Some(6.0), None),
                RecipeIngredient::new("basil", Some(10.0), Some("g")),
            ],
            tags: vec!["soup".to_string(), "vegetarian".to_string()],
            ..Recipe::named("Tomato Soup")
        }
    }

    #[tokio::test]
    async fn test_recipe_crud() {
        let pool = setup().await;

        let created = insert_recipe(&pool, &soup()).await.unwrap();
        let id = created.id.expect("store assigns an id");
        assert_eq!(created.name, "Tomato Soup");
        assert_eq!(created.ingredients.len(), 2);
        assert_eq!(created.tags, vec!["soup", "vegetarian"]);

        let retrieved = get_recipe(&pool, id).await.unwrap();
        assert_eq!(retrieved, created);

        let mut changed = retrieved.clone();
        changed.name = "Roasted Tomato Soup".to_string();
        changed.ingredients.pop();
        changed.tags = vec!["soup".to_string()];
        let updated = upsert_recipe(&pool, id, &changed).await.unwrap();
        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.name, "Roasted Tomato Soup");
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.tags, vec!["soup"]);
        assert_eq!(count_recipes(&pool).await.unwrap(), 1);

        assert_eq!(delete_recipe(&pool, id).await.unwrap(), 1);
        assert!(find_recipe_with_relationships(&pool, id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            get_recipe(&pool, id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_ignores_supplied_id() {
        let pool = setup().await;

        let mut recipe = soup();
        recipe.id = Some(500);
        let created = insert_recipe(&pool, &recipe).await.unwrap();
        assert_ne!(created.id, Some(500));
    }

    #[tokio::test]
    async fn test_upsert_unknown_id_inserts_with_that_id() {
        let pool = setup().await;

        let mut recipe = soup();
        recipe.id = Some(42);
        let saved = upsert_recipe(&pool, 42, &recipe).await.unwrap();
        assert_eq!(saved.id, Some(42));
        assert_eq!(get_recipe(&pool, 42).await.unwrap().name, "Tomato Soup");

        // Later inserts continue after the explicit id
        let next = insert_recipe(&pool, &Recipe::named("Bread")).await.unwrap();
        assert!(next.id.unwrap() > 42);
    }

    #[tokio::test]
    async fn test_list_recipes_loads_relationships() {
        let pool = setup().await;

        let first = insert_recipe(&pool, &soup()).await.unwrap();
        let second = insert_recipe(&pool, &Recipe::named("Plain Rice"))
            .await
            .unwrap();

        let all = list_recipes_with_relationships(&pool).await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn test_delete_cascades_relationships() {
        let pool = setup().await;

        let created = insert_recipe(&pool, &soup()).await.unwrap();
        delete_recipe(&pool, created.id.unwrap()).await.unwrap();

        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_ingredients")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 0);

        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_an_error() {
        let pool = setup().await;
        assert_eq!(delete_recipe(&pool, 12345).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_names_round_trip_as_submitted() {
        let pool = setup().await;

        let recipe = Recipe {
            ingredients: vec![
                RecipeIngredient::new("Olive Oil", Some(2.0), Some("tbsp")),
                RecipeIngredient::new("olive oil", Some(1.0), Some("tsp")),
            ],
            tags: vec![
                "Vegan".to_string(),
                "Quick".to_string(),
                "vegan".to_string(),
            ],
            ..Recipe::named("Dressing")
        };

        let created = insert_recipe(&pool, &recipe).await.unwrap();
        let fetched = get_recipe(&pool, created.id.unwrap()).await.unwrap();

        assert_eq!(fetched, Recipe { id: created.id, ..recipe.clone() });
        assert_eq!(
            list_recipes_with_relationships(&pool).await.unwrap(),
            vec![fetched]
        );
    }

    #[tokio::test]
    async fn test_list_beyond_sqlite_variable_limit() {
        let pool = setup().await;

        sqlx::query(
            r#"
            WITH RECURSIVE seq(n) AS (
                SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 33000
            )
            INSERT INTO recipes (name) SELECT 'Recipe ' || n FROM seq
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        let last = insert_recipe(&pool, &soup()).await.unwrap();

        let all = list_recipes_with_relationships(&pool).await.unwrap();
        assert_eq!(all.len(), 33001);
        assert_eq!(all[0].name, "Recipe 1");
        assert!(all[0].tags.is_empty());
        assert_eq!(all.last(), Some(&last));
    }

    #[tokio::test]
    async fn test_unused_lookup_rows_are_pruned() {
        let pool = setup().await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let recipe = Recipe {
                ingredients: vec![RecipeIngredient::new(format!("spice{i}"), None, None)],
                tags: vec![format!("tag{i}")],
                ..Recipe::named(format!("Recipe {i}"))
            };
            ids.push(insert_recipe(&pool, &recipe).await.unwrap().id.unwrap());
        }
        assert_eq!(tags::count_tags(&pool).await.unwrap(), 5);

        // Replacing relationships drops the rows they no longer use
        let kept = Recipe {
            tags: vec!["tag0".to_string()],
            ..Recipe::named("Recipe 0")
        };
        upsert_recipe(&pool, ids[0], &kept).await.unwrap();
        assert_eq!(ingredients::count_ingredients(&pool).await.unwrap(), 4);

        for id in ids {
            delete_recipe(&pool, id).await.unwrap();
        }
        assert_eq!(tags::count_tags(&pool).await.unwrap(), 0);
        assert_eq!(ingredients::count_ingredients(&pool).await.unwrap(), 0);
    }
}
