use std::env;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BODY_LIMIT_MB: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub model_path: String,
    pub class_list_path: String,
    pub model_url: Option<String>,
    pub class_list_url: Option<String>,
    pub input_op: String,
    pub output_op: String,
    pub debug_endpoints: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let body_limit_bytes = {
            let mb = match lookup("BODY_LIMIT_MB") {
                Some(value) => value
                    .parse::<usize>()
                    .context("BODY_LIMIT_MB must be a valid integer")?,
                None => DEFAULT_BODY_LIMIT_MB,
            };
            mb.checked_mul(1024 * 1024)
                .context("BODY_LIMIT_MB is too large")?
        };

        let port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .context("PORT must be a valid number between 0 and 65535")?,
            None => DEFAULT_PORT,
        };

        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            port,
            body_limit_bytes,
            model_path: non_empty("MODEL_PATH")
                .unwrap_or_else(|| "./model/plant_disease_model.pb".into()),
            class_list_path: non_empty("CLASS_LIST_PATH")
                .unwrap_or_else(|| "./model/class_list.txt".into()),
            model_url: non_empty("MODEL_URL"),
            class_list_url: non_empty("CLASS_LIST_URL"),
            input_op: non_empty("MODEL_INPUT_OP").unwrap_or_else(|| "x".into()),
            output_op: non_empty("MODEL_OUTPUT_OP").unwrap_or_else(|| "Identity".into()),
            debug_endpoints: lookup("DEBUG_ENDPOINTS").is_some_and(|value| is_truthy(&value)),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
