use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use super::{diagnose, read_upload, AppState};
use crate::errors::AppError;

pub fn handler() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/analyze", post(analyze))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub disease: String,
    pub disease_name: String,
    pub description: String,
    pub solutions: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub disease: String,
    pub disease_name: String,
    pub description: String,
    pub treatment: Vec<String>,
    pub confidence: f32,
    pub crop_type: String,
    pub season: String,
}

async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    state.model()?;
    tracing::info!("Received a request on /predict endpoint.");

    let upload = read_upload(multipart, "file").await?;
    upload.ensure_allowed_extension()?;

    let diagnosis = diagnose(&state, upload.bytes).await?;
    let prediction = diagnosis.prediction;

    tracing::info!(
        "Prediction successful: {} with {:.4} confidence.",
        prediction.class_name,
        prediction.confidence
    );

    Ok(Json(PredictResponse {
        disease: prediction.class_name,
        disease_name: diagnosis.record.name,
        description: diagnosis.record.description,
        solutions: diagnosis.record.remedies,
        confidence: prediction.confidence,
    }))
}

async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    state.model()?;
    tracing::info!("Received a request on /analyze endpoint.");

    let upload = read_upload(multipart, "image")
        .await
        .map_err(|err| match err {
            AppError::NoFileProvided => AppError::UnsupportedContentType,
            other => other,
        })?;
    upload.ensure_allowed_extension()?;

    let crop_type = upload.field_or("crop", "Unknown");
    let season = upload.field_or("season", "Unknown");

    let diagnosis = diagnose(&state, upload.bytes).await?;
    let prediction = diagnosis.prediction;

    tracing::info!(
        "Analysis successful: {} with {:.4} confidence for crop: {}, season: {}",
        prediction.class_name,
        prediction.confidence,
        crop_type,
        season
    );

    Ok(Json(AnalyzeResponse {
        disease: prediction.class_name,
        disease_name: diagnosis.record.name,
        description: diagnosis.record.description,
        treatment: diagnosis.record.remedies,
        confidence: prediction.confidence,
        crop_type,
        season,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::{
        preprocess::tests::png_fixture,
        routes::tests::{app, multipart_request, peaked, send, Part},
    };

    const TOMATO_EARLY_BLIGHT: usize = 29;

    #[tokio::test]
    async fn predict_returns_the_diagnosis() {
        let image = png_fixture(64, 48);
        let request = multipart_request("/predict", &[Part::File("file", "leaf.jpg", &image)]);

        let (status, body) = send(app(Some(peaked(TOMATO_EARLY_BLIGHT, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disease"], "Tomato___Early_blight");
        assert_eq!(body["disease_name"], "Tomato Early Blight");
        assert_eq!(body["solutions"].as_array().unwrap().len(), 4);
        assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn healthy_classes_use_the_healthy_record() {
        let image = png_fixture(16, 16);
        let request = multipart_request("/predict", &[Part::File("file", "leaf.png", &image)]);

        let (status, body) = send(app(Some(peaked(37, 0.6)), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disease"], "Tomato___healthy");
        assert_eq!(body["disease_name"], "Healthy Plant");
    }

    #[tokio::test]
    async fn non_image_bytes_are_a_decode_error() {
        let request = multipart_request(
            "/predict",
            &[Part::File("file", "leaf.png", b"this is not a png")],
        );

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("An internal error occurred: cannot identify image file"));
    }

    #[tokio::test]
    async fn gif_uploads_are_rejected() {
        let image = png_fixture(8, 8);
        let request = multipart_request("/predict", &[Part::File("file", "leaf.gif", &image)]);

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid file type. Please upload a .png, .jpg, or .jpeg"
        );
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let request = multipart_request("/predict", &[Part::Text("note", "hello")]);

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file part in the request");
    }

    #[tokio::test]
    async fn text_part_named_file_is_not_an_upload() {
        let request = multipart_request("/predict", &[Part::Text("file", "not a file")]);

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file part in the request");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let image = png_fixture(8, 8);
        let request = multipart_request("/predict", &[Part::File("file", "", &image)]);

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No selected file");
    }

    #[tokio::test]
    async fn missing_model_degrades_to_unavailable() {
        let image = png_fixture(8, 8);
        let request = multipart_request("/predict", &[Part::File("file", "leaf.png", &image)]);

        let (status, body) = send(app(None, false), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model is not available");
    }

    #[tokio::test]
    async fn label_mismatch_is_reported() {
        let image = png_fixture(8, 8);
        let request = multipart_request("/predict", &[Part::File("file", "leaf.png", &image)]);

        let (status, body) = send(app(Some(vec![0.2; 5]), false), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Model output dimension (5) doesn't match class names count (38)"
        );
    }

    #[tokio::test]
    async fn analyze_echoes_crop_and_season() {
        let image = png_fixture(32, 32);
        let request = multipart_request(
            "/analyze",
            &[
                Part::File("image", "leaf.PNG", &image),
                Part::Text("crop", "Tomato"),
                Part::Text("season", "Summer"),
            ],
        );

        let (status, body) = send(app(Some(peaked(TOMATO_EARLY_BLIGHT, 0.8)), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disease_name"], "Tomato Early Blight");
        assert_eq!(body["treatment"].as_array().unwrap().len(), 4);
        assert_eq!(body["crop_type"], "Tomato");
        assert_eq!(body["season"], "Summer");
    }

    #[tokio::test]
    async fn analyze_defaults_missing_form_fields() {
        let image = png_fixture(32, 32);
        let request = multipart_request("/analyze", &[Part::File("image", "leaf.jpeg", &image)]);

        let (status, body) = send(app(Some(peaked(4, 0.8)), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crop_type"], "Unknown");
        assert_eq!(body["season"], "Unknown");
    }

    #[tokio::test]
    async fn analyze_wants_the_image_field() {
        let image = png_fixture(8, 8);
        let request = multipart_request("/analyze", &[Part::File("file", "leaf.png", &image)]);

        let (status, body) = send(app(Some(peaked(0, 0.9)), false), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Unsupported content type. Please use form data with image file."
        );
    }

    #[tokio::test]
    async fn repeated_form_fields_keep_the_first_value() {
        let image = png_fixture(16, 16);
        let request = multipart_request(
            "/analyze",
            &[
                Part::Text("crop", "Potato"),
                Part::File("image", "leaf.png", &image),
                Part::Text("crop", "Corn"),
                Part::Text("season", "Spring"),
                Part::Text("season", "Autumn"),
            ],
        );

        let (status, body) = send(app(Some(peaked(20, 0.7)), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crop_type"], "Potato");
        assert_eq!(body["season"], "Spring");
    }
}
