//! Diagnostic routes for checking that the model and the label list agree.
//! Only mounted when `DEBUG_ENDPOINTS` is set.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::{infer, probe, read_upload, AppState};
use crate::{
    diagnosis::{self, argmax},
    errors::AppError,
    model::{format_dims, ModelError, ModelInfo},
    preprocess,
};

/// Below this spread between the best and worst class the model is likely
/// returning near-uniform output.
const DIVERSITY_THRESHOLD: f32 = 0.1;

pub fn handler() -> Router<AppState> {
    Router::new()
        .route("/model-info", get(model_info))
        .route("/debug-predict", post(debug_predict))
        .route("/test-model", get(test_model))
        .route("/diagnostics", get(diagnostics))
        .route("/test-image", post(test_image))
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, AppError> {
    Ok(Json(state.model()?.info()))
}

#[derive(Debug, Serialize)]
pub struct RankedClass {
    pub class: String,
    pub confidence: f32,
    pub percentage: String,
}

#[derive(Debug, Serialize)]
pub struct DebugPrediction {
    pub all_predictions: Vec<f32>,
    pub top_5: Vec<RankedClass>,
    pub confidence_range: f32,
    pub max_confidence: f32,
    pub min_confidence: f32,
    pub class_count: usize,
    pub diagnosis: &'static str,
}

async fn debug_predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DebugPrediction>, AppError> {
    let model = state.model()?;
    let upload = read_upload(multipart, "file").await?;

    let output = infer(model, upload.bytes).await?;
    let row = output.first_row();
    if row.is_empty() {
        return Err(ModelError::EmptyOutput.into());
    }

    tracing::info!("Prediction shape: {}", output.shape_string());
    tracing::info!("Number of classes: {}", state.labels.len());

    let top_5 = diagnosis::top_k(row, 5)
        .into_iter()
        .filter_map(|(index, confidence)| match state.labels.get(index) {
            Some(class) => Some(RankedClass {
                class: class.clone(),
                confidence,
                percentage: format!("{:.2}%", confidence * 100.0),
            }),
            None => {
                tracing::error!(
                    "Index {} out of range for class names (0-{})",
                    index,
                    state.labels.len().saturating_sub(1)
                );
                None
            }
        })
        .collect();

    let max_confidence = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min_confidence = row.iter().copied().fold(f32::INFINITY, f32::min);
    let confidence_range = max_confidence - min_confidence;

    Ok(Json(DebugPrediction {
        all_predictions: row.to_vec(),
        top_5,
        confidence_range,
        max_confidence,
        min_confidence,
        class_count: state.labels.len(),
        diagnosis: if confidence_range < DIVERSITY_THRESHOLD {
            "Model might have issues"
        } else {
            "Predictions seem diverse"
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelProbe {
    pub random_input_prediction: Vec<f32>,
    pub random_max_class: String,
    pub prediction_length: usize,
    pub class_names_length: usize,
    #[serde(rename = "match")]
    pub matches: bool,
}

async fn test_model(State(state): State<AppState>) -> Result<Json<ModelProbe>, AppError> {
    let output = probe(state.model()?).await?;
    let row = output.first_row();

    let random_max_class = match argmax(row).and_then(|index| state.labels.get(index)) {
        Some(class) => class.clone(),
        None => {
            tracing::error!("Invalid index in prediction for random input");
            "INVALID_INDEX".to_string()
        }
    };

    Ok(Json(ModelProbe {
        random_input_prediction: row.to_vec(),
        random_max_class,
        prediction_length: row.len(),
        class_names_length: state.labels.len(),
        matches: row.len() == state.labels.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub model_loaded: bool,
    pub model_output_shape: String,
    pub model_output_classes: usize,
    pub class_names_count: usize,
    #[serde(rename = "match")]
    pub matches: bool,
    pub class_names_sample: Vec<String>,
}

async fn diagnostics(State(state): State<AppState>) -> Result<Json<Diagnostics>, AppError> {
    let output = probe(state.model()?).await?;
    let classes = output.width();

    Ok(Json(Diagnostics {
        model_loaded: true,
        model_output_shape: output.shape_string(),
        model_output_classes: classes,
        class_names_count: state.labels.len(),
        matches: classes == state.labels.len(),
        class_names_sample: state.labels.iter().take(5).cloned().collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ImageCheck {
    pub success: bool,
    pub image_shape: String,
    pub image_range: String,
}

async fn test_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageCheck>, AppError> {
    let upload = read_upload(multipart, "file").await?;

    let tensor =
        tokio::task::spawn_blocking(move || preprocess::normalize(&upload.bytes)).await??;
    let (min, max) = tensor.range();

    Ok(Json(ImageCheck {
        success: true,
        image_shape: format_dims(tensor.shape().map(|d| Some(d as i64))),
        image_range: format!("{min:.4} to {max:.4}"),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::{
        preprocess::tests::png_fixture,
        routes::tests::{app, get_request, multipart_request, peaked, send, Part},
    };

    #[tokio::test]
    async fn debug_routes_are_off_by_default() {
        let response = app(Some(peaked(0, 0.9)), false)
            .oneshot(get_request("/diagnostics"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn model_info_reports_shapes() {
        let (status, body) = send(app(Some(peaked(0, 0.9)), true), get_request("/model-info")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["input_shape"], "(None, 224, 224, 3)");
        assert_eq!(body["output_shape"], "(None, 38)");
    }

    #[tokio::test]
    async fn debug_predict_ranks_top_five() {
        let image = png_fixture(20, 20);
        let request = multipart_request(
            "/debug-predict",
            &[Part::File("file", "leaf.bmp", &image)],
        );

        let (status, body) = send(app(Some(peaked(11, 0.75)), true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["top_5"].as_array().unwrap().len(), 5);
        assert_eq!(body["top_5"][0]["class"], "Grape___Black_rot");
        assert_eq!(body["top_5"][0]["percentage"], "75.00%");
        assert_eq!(body["all_predictions"].as_array().unwrap().len(), 38);
        assert_eq!(body["class_count"], 38);
        assert_eq!(body["diagnosis"], "Predictions seem diverse");
    }

    #[tokio::test]
    async fn flat_output_is_flagged() {
        let image = png_fixture(20, 20);
        let request = multipart_request("/debug-predict", &[Part::File("file", "leaf.png", &image)]);

        let (_, body) = send(app(Some(vec![1.0 / 38.0; 38]), true), request).await;

        assert_eq!(body["diagnosis"], "Model might have issues");
    }

    #[tokio::test]
    async fn test_model_checks_label_width() {
        let (status, body) = send(app(Some(vec![0.1, 0.2, 0.7]), true), get_request("/test-model")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction_length"], 3);
        assert_eq!(body["class_names_length"], 38);
        assert_eq!(body["match"], false);
        assert_eq!(body["random_max_class"], "Apple___Cedar_apple_rust");
    }

    #[tokio::test]
    async fn diagnostics_samples_labels() {
        let (status, body) = send(app(Some(peaked(3, 0.5)), true), get_request("/diagnostics")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_output_shape"], "(1, 38)");
        assert_eq!(body["model_output_classes"], 38);
        assert_eq!(body["match"], true);
        assert_eq!(body["class_names_sample"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_image_works_without_a_model() {
        let image = png_fixture(300, 150);
        let request = multipart_request("/test-image", &[Part::File("file", "leaf.png", &image)]);

        let (status, body) = send(app(None, true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["image_shape"], "(1, 224, 224, 3)");
    }

    #[tokio::test]
    async fn probes_need_a_model() {
        let (status, body) = send(app(None, true), get_request("/test-model")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model is not available");
    }
}
