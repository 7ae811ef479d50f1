//! Informational alert headers attached to write responses.
//!
//! Clients read these to show a notification naming the entity type and the
//! affected identifier. They carry no meaning for correctness.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const APPLICATION_NAME: &str = "recipebookApp";

pub const ALERT_HEADER: HeaderName = HeaderName::from_static("x-recipebookapp-alert");
pub const ERROR_HEADER: HeaderName = HeaderName::from_static("x-recipebookapp-error");
pub const PARAMS_HEADER: HeaderName = HeaderName::from_static("x-recipebookapp-params");

fn headers(name: HeaderName, message: &str, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Values that are not valid header text are dropped rather than failing the request
    if let Ok(value) = HeaderValue::from_str(message) {
        headers.insert(name, value);
    }
    if let Ok(value) = HeaderValue::from_str(param) {
        headers.insert(PARAMS_HEADER, value);
    }
    headers
}

pub fn alert(message: &str, param: &str) -> HeaderMap {
    headers(ALERT_HEADER, message, param)
}

pub fn entity_creation_alert(entity_name: &str, id: &str) -> HeaderMap {
    alert(&format!("{APPLICATION_NAME}.{entity_name}.created"), id)
}

pub fn entity_update_alert(entity_name: &str, id: &str) -> HeaderMap {
    alert(&format!("{APPLICATION_NAME}.{entity_name}.updated"), id)
}

pub fn entity_deletion_alert(entity_name: &str, id: &str) -> HeaderMap {
    alert(&format!("{APPLICATION_NAME}.{entity_name}.deleted"), id)
}

pub fn failure_alert(entity_name: &str, error_key: &str) -> HeaderMap {
    headers(ERROR_HEADER, &format!("error.{error_key}"), entity_name)
}
