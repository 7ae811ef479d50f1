use crate::db::{models::Tag, DbPool};
use crate::error::Result;
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// Normalize a tag name into its lookup key (lowercase, trim)
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Get or create the shared tag row for a name
pub async fn get_or_create_tag(conn: &mut SqliteConnection, name: &str) -> Result<Tag> {
    let normalized = normalize_tag(name);

    let existing = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
        .bind(&normalized)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(tag) = existing {
        Ok(tag)
    } else {
        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES (?) RETURNING *")
            .bind(&normalized)
            .fetch_one(&mut *conn)
            .await?;

        Ok(tag)
    }
}

/// Remove all tags from a recipe
pub async fn clear_recipe_tags(conn: &mut SqliteConnection, recipe_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Set recipe tags (replaces existing tags).
///
/// Each tag keeps its submitted spelling and position, duplicates included.
pub async fn set_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    tag_names: &[String],
) -> Result<()> {
    clear_recipe_tags(conn, recipe_id).await?;

    for (position, tag_name) in tag_names.iter().enumerate() {
        let tag = get_or_create_tag(conn, tag_name).await?;

        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id, position, name) VALUES (?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(tag.id)
        .bind(position as i64)
        .bind(tag_name)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Get tag names for a recipe
pub async fn get_tags_for_recipe(pool: &DbPool, recipe_id: i64) -> Result<Vec<String>> {
    let tags: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT name
        FROM recipe_tags
        WHERE recipe_id = ?
        ORDER BY position
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(tags)
}

/// Get the tags of every recipe in one pass, keyed by recipe id.
///
/// Recipes without tags have no entry.
pub async fn get_all_recipe_tags(pool: &DbPool) -> Result<HashMap<i64, Vec<String>>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT recipe_id, name
        FROM recipe_tags
        ORDER BY recipe_id, position
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut tags_map: HashMap<i64, Vec<String>> = HashMap::new();
    for (recipe_id, tag_name) in rows {
        tags_map.entry(recipe_id).or_default().push(tag_name);
    }

    Ok(tags_map)
}

/// Count total tags
pub async fn count_tags(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Delete tags that aren't associated with any recipes
pub async fn delete_unused_tags(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM tags
        WHERE id NOT IN (SELECT DISTINCT tag_id FROM recipe_tags)
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
