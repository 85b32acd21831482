use serde::Serialize;

use crate::catalogue::{CATEGORY_SEPARATOR, HEALTHY_KEY};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseRecord {
    pub name: String,
    pub description: String,
    pub remedies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub class_name: String,
    pub confidence: f32,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Model output dimension ({output}) doesn't match class names count ({labels})")]
    ShapeMismatch { output: usize, labels: usize },
    #[error("Predicted index {index} is out of range for class names (0-{})", .labels.saturating_sub(1))]
    IndexOutOfRange { index: usize, labels: usize },
}

/// Ordered `(class name, record)` pairs with a catch-all for unmatched names.
#[derive(Debug, Clone)]
pub struct DiseaseTable {
    entries: Vec<(String, DiseaseRecord)>,
    unmatched: DiseaseRecord,
}

impl DiseaseTable {
    pub fn new(entries: Vec<(String, DiseaseRecord)>, unmatched: DiseaseRecord) -> Self {
        Self { entries, unmatched }
    }

    fn get(&self, key: &str) -> Option<&DiseaseRecord> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, record)| record)
    }

    /// Resolution order: exact key, then the healthy record for any name
    /// containing "healthy", then the first key whose condition suffix occurs
    /// case-insensitively in the name, then the unmatched record.
    pub fn resolve(&self, class_name: &str) -> &DiseaseRecord {
        if let Some(record) = self.get(class_name) {
            return record;
        }

        if class_name.contains(HEALTHY_KEY) {
            if let Some(record) = self.get(HEALTHY_KEY) {
                return record;
            }
        }

        let lowered = class_name.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| {
                let suffix = key.rsplit(CATEGORY_SEPARATOR).next().unwrap_or(key);
                lowered.contains(&suffix.to_lowercase())
            })
            .map_or(&self.unmatched, |(_, record)| record)
    }
}

/// Index of the largest probability; ties go to the lowest index.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in probabilities.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, current)| value > current) {
            best = Some((index, value));
        }
    }
    best.map(|(index, _)| index)
}

/// The `k` most probable `(index, probability)` pairs, highest first.
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

/// Picks the predicted class out of a model output row.
pub fn select(probabilities: &[f32], labels: &[String]) -> Result<Prediction, ResolveError> {
    if probabilities.len() != labels.len() {
        return Err(ResolveError::ShapeMismatch {
            output: probabilities.len(),
            labels: labels.len(),
        });
    }

    select_unchecked(probabilities, labels)
}

/// Like [`select`] without the width check; the index is still bounds-checked.
pub fn select_unchecked(
    probabilities: &[f32],
    labels: &[String],
) -> Result<Prediction, ResolveError> {
    let index = argmax(probabilities).unwrap_or(0);

    let class_name = labels.get(index).ok_or(ResolveError::IndexOutOfRange {
        index,
        labels: labels.len(),
    })?;

    Ok(Prediction {
        class_index: index,
        class_name: class_name.clone(),
        confidence: probabilities
            .get(index)
            .map_or(0.0, |probability| probability.clamp(0.0, 1.0)),
    })
}
