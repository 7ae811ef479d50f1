use recipebook::cli::commands::reindex;
use recipebook::db::models::{Recipe, RecipeIngredient};
use recipebook::db::recipes;
use recipebook::indexer::SearchIndex;
use sqlx::SqlitePool;

#[tokio::test]
async fn test_reindex_rebuilds_index_from_database() {
    // Create in-memory database
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // On-disk index, as the CLI uses
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    // Recipes written straight to the database never reach the index
    for i in 1..=3 {
        let recipe = Recipe {
            ingredients: vec![RecipeIngredient::new(
                format!("ingredient{i}"),
                Some(i as f64),
                Some("g"),
            )],
            tags: vec!["batch".to_string()],
            ..Recipe::named(format!("Test Recipe {i}"))
        };

        recipes::insert_recipe(&pool, &recipe)
            .await
            .expect("Failed to create recipe");
    }

    {
        let index = SearchIndex::new(dir.path()).expect("Failed to open index");
        assert_eq!(index.count(), 0, "Index should start empty");

        let indexed = reindex(&pool, &index).await.expect("Failed to reindex");
        assert_eq!(indexed, 3, "Should have indexed 3 recipes");
    }

    // The rebuilt index survives reopening
    let index = SearchIndex::new(dir.path()).expect("Failed to reopen index");
    let results = index.search("tags:batch").expect("Search failed");
    assert_eq!(results.len(), 3);

    let stored = recipes::list_recipes_with_relationships(&pool)
        .await
        .expect("Failed to list recipes");
    let results = index.search("ingredient2").expect("Search failed");
    assert_eq!(results, vec![stored[1].clone()]);
}

#[tokio::test]
async fn test_reindex_empty_database_clears_index() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let index = SearchIndex::in_memory().expect("Failed to create index");
    index
        .save_recipe(&Recipe {
            id: Some(7),
            ..Recipe::named("Orphan")
        })
        .await
        .expect("Failed to index recipe");

    let indexed = reindex(&pool, &index).await.expect("Failed to reindex");

    assert_eq!(indexed, 0);
    assert_eq!(index.count(), 0, "Stale documents should be removed");
}
