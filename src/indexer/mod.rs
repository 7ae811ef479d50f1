// Search index over the recipe records, kept in step with the primary store

pub mod reindex;
pub mod schema;
pub mod search;

// Re-exports
pub use reindex::reindex;
pub use schema::RecipeSchema;
pub use search::SearchIndex;
