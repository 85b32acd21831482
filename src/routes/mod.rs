use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    diagnosis::{self, DiseaseRecord, DiseaseTable, Prediction},
    errors::AppError,
    model::{Classifier, ModelOutput},
    preprocess::{self, ImageTensor},
};

pub mod debug;
pub mod predict;
pub mod system;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Shared, read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<dyn Classifier>>,
    pub labels: Arc<Vec<String>>,
    pub diseases: Arc<DiseaseTable>,
}

impl AppState {
    pub fn new(
        model: Option<Arc<dyn Classifier>>,
        labels: Vec<String>,
        diseases: DiseaseTable,
    ) -> Self {
        Self {
            model,
            labels: Arc::new(labels),
            diseases: Arc::new(diseases),
        }
    }

    pub fn model(&self) -> Result<Arc<dyn Classifier>, AppError> {
        self.model.clone().ok_or(AppError::ModelUnavailable)
    }
}

pub fn handler(state: AppState, debug_endpoints: bool, body_limit_bytes: usize) -> Router {
    let mut router = Router::new()
        .merge(system::handler())
        .merge(predict::handler());

    if debug_endpoints {
        tracing::warn!("Debug endpoints are enabled");
        router = router.merge(debug::handler());
    }

    router
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// An uploaded file plus any plain form fields sent alongside it.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field_or(&self, name: &str, default: &str) -> String {
        self.fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn ensure_allowed_extension(&self) -> Result<(), AppError> {
        if is_allowed_file(&self.filename) {
            Ok(())
        } else {
            Err(AppError::UnsupportedExtension)
        }
    }
}

pub fn is_allowed_file(filename: &str) -> bool {
    filename.rsplit_once('.').is_some_and(|(_, ext)| {
        ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
    })
}

/// Drains the multipart stream, keeping the file part named `file_field` and
/// every text field. Only parts with a filename count as files, and the first
/// value of a repeated text field wins.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> Result<Upload, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Not a multipart request: {}", rejection);
        AppError::NoFileProvided
    })?;

    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };

        match field.file_name().map(String::from) {
            Some(filename) if name == file_field && file.is_none() => {
                let bytes = field.bytes().await?.to_vec();
                file = Some((filename, bytes));
            }
            Some(_) => {}
            None => {
                let value = field.text().await?;
                fields.entry(name).or_insert(value);
            }
        }
    }

    let (filename, bytes) = file.ok_or(AppError::NoFileProvided)?;
    if filename.is_empty() {
        return Err(AppError::EmptyFilename);
    }

    Ok(Upload {
        filename,
        bytes,
        fields,
    })
}

/// Decodes the image and runs the model off the async runtime.
pub async fn infer(
    model: Arc<dyn Classifier>,
    image_data: Vec<u8>,
) -> Result<ModelOutput, AppError> {
    tokio::task::spawn_blocking(move || -> Result<ModelOutput, AppError> {
        let tensor = preprocess::normalize(&image_data)?;
        Ok(model.predict(&tensor)?)
    })
    .await?
}

/// Runs the model on uniform noise, for checking the model/label wiring.
pub async fn probe(model: Arc<dyn Classifier>) -> Result<ModelOutput, AppError> {
    tokio::task::spawn_blocking(move || -> Result<ModelOutput, AppError> {
        Ok(model.predict(&ImageTensor::random())?)
    })
    .await?
}

pub struct Diagnosis {
    pub prediction: Prediction,
    pub record: DiseaseRecord,
}

/// Full pipeline: image bytes in, predicted class and its disease record out.
pub async fn diagnose(state: &AppState, image_data: Vec<u8>) -> Result<Diagnosis, AppError> {
    let model = state.model()?;
    let output = infer(model, image_data).await?;
    let row = output.first_row();

    let prediction = diagnosis::select(row, &state.labels)?;

    for (rank, (index, probability)) in diagnosis::top_k(row, 3).into_iter().enumerate() {
        match state.labels.get(index) {
            Some(label) => tracing::info!("Top {}: {} - {:.4}", rank + 1, label, probability),
            None => tracing::error!("Invalid index in top predictions: {}", index),
        }
    }

    let record = state.diseases.resolve(&prediction.class_name).clone();

    Ok(Diagnosis { prediction, record })
}
