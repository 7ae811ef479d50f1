use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

#[cfg(not(test))]
use {
    axum::extract::ConnectInfo,
    std::net::{IpAddr, SocketAddr},
    std::sync::Arc,
    tower_governor::{governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorLayer},
    tracing::warn,
};

use crate::api::alerts;
use crate::api::handlers::{self, AppState};
use crate::config::Settings;

/// Governor quota for a per-IP limit of `requests_per_second`.
///
/// Returns the replenish period of one request in nanoseconds and the burst
/// size, twice the rate. Rates above one per nanosecond are clamped.
pub fn rate_limit_quota(requests_per_second: u64) -> (u64, u32) {
    let rate = requests_per_second.max(1);
    let period_nanos = (1_000_000_000 / rate).max(1);
    let burst = u32::try_from(rate.saturating_mul(2)).unwrap_or(u32::MAX);
    (period_nanos, burst)
}

/// Create the router with all endpoints
#[cfg_attr(test, allow(unused_variables))]
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    #[cfg_attr(test, allow(unused_mut))]
    let mut api_routes = Router::new()
        .route(
            "/recipes",
            get(handlers::list_recipes)
                .post(handlers::create_recipe)
                .put(handlers::update_recipe),
        )
        .route(
            "/recipes/:id",
            get(handlers::get_recipe).delete(handlers::delete_recipe),
        )
        .route("/_search/recipes", get(handlers::search_recipes))
        .with_state(state.clone());

    // Apply rate limiting only in non-test builds.
    // Requests are keyed by peer IP, falling back to 127.0.0.1 when the server
    // was not started with connect info (e.g. when driven in-process).
    #[cfg(not(test))]
    {
        #[derive(Clone, Copy, Debug)]
        struct FallbackIpKeyExtractor;

        impl KeyExtractor for FallbackIpKeyExtractor {
            type Key = IpAddr;

            fn extract<B>(
                &self,
                req: &axum::http::Request<B>,
            ) -> Result<Self::Key, tower_governor::GovernorError> {
                if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
                    return Ok(addr.ip());
                }

                Ok(IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)))
            }
        }

        let (period_nanos, burst) = rate_limit_quota(settings.server.api_rate_limit);
        let governor_conf = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_nanosecond(period_nanos)
            .burst_size(burst)
            .finish();

        match governor_conf {
            Some(config) => {
                api_routes = api_routes.layer(GovernorLayer {
                    config: Arc::new(config),
                });
            }
            None => warn!("Invalid rate limit configuration, API rate limiting disabled"),
        }
    }

    let api_routes = api_routes;

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            // Request body size limit - prevent memory exhaustion from large payloads
            RequestBodyLimitLayer::new(settings.server.max_request_body_size),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .expose_headers([
                    header::LOCATION,
                    alerts::ALERT_HEADER,
                    alerts::ERROR_HEADER,
                    alerts::PARAMS_HEADER,
                ])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
