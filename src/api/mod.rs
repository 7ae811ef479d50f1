// HTTP surface of the recipe service

pub mod alerts;
pub mod handlers;
pub mod models;
pub mod resource;
pub mod routes;

pub use handlers::AppState;
pub use resource::RecipeResource;
