use crate::db::{recipes, DbPool};
use crate::error::Result;
use crate::indexer::search::SearchIndex;
use tracing::info;

/// Rebuild the search index from the primary store.
///
/// Clears every indexed document, then re-saves each stored recipe. Returns
/// the number of recipes indexed.
pub async fn reindex(pool: &DbPool, index: &SearchIndex) -> Result<usize> {
    let all = recipes::list_recipes_with_relationships(pool).await?;
    info!("Reindexing {} recipes", all.len());

    index.clear().await?;
    let indexed = index.save_recipes(&all).await?;

    info!("Reindex complete: {} recipes indexed", indexed);
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Recipe;
    use crate::db::{init_pool, run_migrations};

    #[tokio::test]
    async fn test_reindex_restores_missing_and_drops_stale_documents() {
        let pool = init_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let index = SearchIndex::in_memory().unwrap();

        // Written to the primary store only, as if the index write had failed
        let soup = recipes::insert_recipe(&pool, &Recipe::named("Soup"))
            .await
            .unwrap();
        let stew = recipes::insert_recipe(&pool, &Recipe::named("Stew"))
            .await
            .unwrap();

        // Present in the index only
        index
            .save_recipe(&Recipe {
                id: Some(999),
                ..Recipe::named("Ghost")
            })
            .await
            .unwrap();

        let indexed = reindex(&pool, &index).await.unwrap();
        assert_eq!(indexed, 2);
        assert_eq!(index.count(), 2);
        assert_eq!(index.search("name:soup").unwrap(), vec![soup]);
        assert_eq!(index.search("name:stew").unwrap(), vec![stew]);
        assert!(index.search("ghost").unwrap().is_empty());
    }
}
