use crate::db::{models::*, DbPool};
use crate::error::Result;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Normalize ingredient name into its lookup key (lowercase, trim)
pub fn normalize_ingredient(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Get or create the shared ingredient row for a name
pub async fn get_or_create_ingredient(conn: &mut SqliteConnection, name: &str) -> Result<Ingredient> {
    let normalized = normalize_ingredient(name);

    let existing = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE name = ?")
        .bind(&normalized)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(ingredient) = existing {
        Ok(ingredient)
    } else {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "INSERT INTO ingredients (name) VALUES (?) RETURNING *",
        )
        .bind(&normalized)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ingredient)
    }
}

/// Remove all ingredients from a recipe
pub async fn clear_recipe_ingredients(conn: &mut SqliteConnection, recipe_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Set recipe ingredients (replaces existing ingredients, keeps list order and spelling)
pub async fn set_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    ingredients: &[RecipeIngredient],
) -> Result<()> {
    clear_recipe_ingredients(conn, recipe_id).await?;

    for (position, ing) in ingredients.iter().enumerate() {
        let ingredient = get_or_create_ingredient(conn, &ing.name).await?;

        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, position, name, quantity, unit)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient.id)
        .bind(position as i64)
        .bind(&ing.name)
        .bind(ing.quantity)
        .bind(&ing.unit)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Get ingredients for a recipe
pub async fn get_recipe_ingredients(pool: &DbPool, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
    let ingredients = sqlx::query_as::<_, RecipeIngredient>(
        r#"
        SELECT name, quantity, unit
        FROM recipe_ingredients
        WHERE recipe_id = ?
        ORDER BY position
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(ingredients)
}

/// Get the ingredients of every recipe in one pass, keyed by recipe id.
///
/// Recipes without ingredients have no entry.
pub async fn get_all_recipe_ingredients(
    pool: &DbPool,
) -> Result<HashMap<i64, Vec<RecipeIngredient>>> {
    let rows: Vec<(i64, String, Option<f64>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT recipe_id, name, quantity, unit
        FROM recipe_ingredients
        ORDER BY recipe_id, position
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    for (recipe_id, name, quantity, unit) in rows {
        map.entry(recipe_id)
            .or_default()
            .push(RecipeIngredient { name, quantity, unit });
    }

    Ok(map)
}

/// Count total ingredients
pub async fn count_ingredients(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Delete ingredients that aren't associated with any recipes
pub async fn delete_unused_ingredients(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM ingredients
        WHERE id NOT IN (SELECT DISTINCT ingredient_id FROM recipe_ingredients)
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
