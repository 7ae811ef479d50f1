use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::api::alerts;
use crate::api::models::*;
use crate::api::resource::{Created, RecipeResource, SaveOutcome, ENTITY_NAME};
use crate::db::models::Recipe;
use crate::indexer::SearchIndex;
use crate::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub search_index: Arc<SearchIndex>,
    pub recipes: RecipeResource,
    pub settings: crate::config::Settings,
}

impl AppState {
    pub fn new(
        pool: sqlx::SqlitePool,
        search_index: Arc<SearchIndex>,
        settings: crate::config::Settings,
    ) -> Self {
        let recipes = RecipeResource::new(pool.clone(), search_index.clone());
        Self {
            pool,
            search_index,
            recipes,
            settings,
        }
    }
}

fn created_response(created: Created) -> Response {
    let mut headers = alerts::entity_creation_alert(ENTITY_NAME, &created.id.to_string());
    if let Ok(location) = HeaderValue::from_str(&created.location) {
        headers.insert(header::LOCATION, location);
    }

    (StatusCode::CREATED, headers, Json(created.recipe)).into_response()
}

/// POST /api/recipes - Create a recipe
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(recipe): Json<Recipe>,
) -> Result<Response> {
    let created = state.recipes.create(recipe).await?;
    Ok(created_response(created))
}

/// PUT /api/recipes - Update a recipe (creates it when the body has no id)
pub async fn update_recipe(
    State(state): State<AppState>,
    Json(recipe): Json<Recipe>,
) -> Result<Response> {
    match state.recipes.update(recipe).await? {
        SaveOutcome::Created(created) => Ok(created_response(created)),
        SaveOutcome::Updated(recipe) => {
            let id = recipe.id.map(|id| id.to_string()).unwrap_or_default();
            let headers = alerts::entity_update_alert(ENTITY_NAME, &id);
            Ok((StatusCode::OK, headers, Json(recipe)).into_response())
        }
    }
}

/// GET /api/recipes - List all recipes
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>> {
    Ok(Json(state.recipes.get_all().await?))
}

/// GET /api/recipes/:id - Get recipe details
pub async fn get_recipe(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Recipe>> {
    Ok(Json(state.recipes.get(id).await?))
}

/// DELETE /api/recipes/:id - Delete a recipe
pub async fn delete_recipe(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    state.recipes.delete(id).await?;

    let headers = alerts::entity_deletion_alert(ENTITY_NAME, &id.to_string());
    Ok((StatusCode::OK, headers).into_response())
}

/// GET /api/_search/recipes?query= - Search recipes
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Recipe>>> {
    Ok(Json(state.recipes.search(&params.query).await?))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    let indexed = state.search_index.health_check();
    if let Err(e) = &indexed {
        warn!("{}", e.log_safe());
    }
    let index_healthy = indexed.is_ok();

    let ready = db_healthy && index_healthy;

    Ok(Json(ReadinessResponse {
        ready,
        database: if db_healthy { "ok" } else { "error" }.to_string(),
        search_index: if index_healthy { "ok" } else { "error" }.to_string(),
        indexed_recipes: indexed.unwrap_or(0) as u64,
    }))
}
