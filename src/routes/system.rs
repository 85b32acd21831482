use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

pub fn handler() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_input_shape: String,
    pub class_names_count: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthCheck> {
    let (model_input_shape, class_names_count) = match &state.model {
        Some(model) => (model.info().input_shape, state.labels.len()),
        None => ("No model loaded".to_string(), 0),
    };

    Json(HealthCheck {
        status: "healthy",
        model_loaded: state.model.is_some(),
        model_input_shape,
        class_names_count,
    })
}
