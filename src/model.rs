use std::sync::Arc;

use serde::Serialize;

use crate::{config::Config, preprocess::ImageTensor};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("tensorflow: {0}")]
    Tensorflow(String),
    #[error("operation '{0}' not found in graph")]
    MissingOperation(String),
    #[error("model output is empty")]
    EmptyOutput,
    #[cfg(not(feature = "tensorflow"))]
    #[error("built without an inference backend")]
    NoBackend,
}

#[cfg(feature = "tensorflow")]
impl From<tensorflow::Status> for ModelError {
    fn from(status: tensorflow::Status) -> Self {
        Self::Tensorflow(status.to_string())
    }
}

/// Raw output of a forward pass: a `(batch, classes)` probability matrix.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub shape: Vec<u64>,
    pub values: Vec<f32>,
}

impl ModelOutput {
    pub fn new(shape: Vec<u64>, values: Vec<f32>) -> Self {
        Self { shape, values }
    }

    /// Width of one row, the number of classes the model predicts.
    pub fn width(&self) -> usize {
        self.shape
            .last()
            .map_or(self.values.len(), |&w| w as usize)
    }

    /// Probabilities for the first (and only) item in the batch.
    pub fn first_row(&self) -> &[f32] {
        let width = self.width().min(self.values.len());
        &self.values[..width]
    }

    pub fn shape_string(&self) -> String {
        format_dims(self.shape.iter().map(|&d| Some(d as i64)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub input_shape: String,
    pub output_shape: String,
    pub layers: usize,
}

/// Anything that turns a normalized image batch into class probabilities.
/// Implementations must be safe to share between concurrent requests.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &ImageTensor) -> Result<ModelOutput, ModelError>;

    fn info(&self) -> ModelInfo;
}

/// Keras-style shape rendering, `None` for unknown dimensions.
pub fn format_dims(dims: impl IntoIterator<Item = Option<i64>>) -> String {
    let parts: Vec<String> = dims
        .into_iter()
        .map(|d| d.filter(|&d| d >= 0).map_or("None".to_string(), |d| d.to_string()))
        .collect();

    if parts.len() == 1 {
        format!("({},)", parts[0])
    } else {
        format!("({})", parts.join(", "))
    }
}

#[cfg(feature = "tensorflow")]
pub use self::tf::FrozenGraph;

#[cfg(feature = "tensorflow")]
mod tf {
    use std::fs;

    use tensorflow::{
        Graph, ImportGraphDefOptions, Operation, Output, Session, SessionOptions, SessionRunArgs,
        Tensor,
    };

    use super::{format_dims, Classifier, ModelError, ModelInfo, ModelOutput};
    use crate::preprocess::ImageTensor;

    /// A frozen TensorFlow graph with one image input and one softmax output.
    pub struct FrozenGraph {
        session: Session,
        graph: Graph,
        input: Operation,
        output: Operation,
    }

    impl FrozenGraph {
        pub fn load(path: &str, input_op: &str, output_op: &str) -> Result<Self, ModelError> {
            let model_bytes = fs::read(path)?;

            let mut graph = Graph::new();
            graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

            let session = Session::new(&SessionOptions::new(), &graph)?;

            let input = graph
                .operation_by_name(input_op)?
                .ok_or_else(|| ModelError::MissingOperation(input_op.to_string()))?;
            let output = graph
                .operation_by_name(output_op)?
                .ok_or_else(|| ModelError::MissingOperation(output_op.to_string()))?;

            Ok(Self {
                session,
                graph,
                input,
                output,
            })
        }

        fn shape_of(&self, operation: &Operation) -> String {
            let shape = self.graph.tensor_shape(Output {
                operation: operation.clone(),
                index: 0,
            });

            match shape {
                Ok(shape) => format_dims((0..shape.dims().unwrap_or(0)).map(|i| shape[i])),
                Err(err) => format!("unknown ({err})"),
            }
        }
    }

    impl Classifier for FrozenGraph {
        fn predict(&self, input: &ImageTensor) -> Result<ModelOutput, ModelError> {
            let input_tensor = Tensor::<f32>::new(&input.shape()).with_values(input.as_slice())?;

            let mut args = SessionRunArgs::new();
            args.add_feed(&self.input, 0, &input_tensor);
            let output_token = args.request_fetch(&self.output, 0);
            self.session.run(&mut args)?;

            let output_tensor: Tensor<f32> = args.fetch(output_token)?;
            if output_tensor.is_empty() {
                return Err(ModelError::EmptyOutput);
            }

            Ok(ModelOutput::new(
                output_tensor.dims().to_vec(),
                output_tensor.to_vec(),
            ))
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                input_shape: self.shape_of(&self.input),
                output_shape: self.shape_of(&self.output),
                layers: self.graph.operation_iter().count(),
            }
        }
    }
}

/// Loads the configured model. A failure here is not fatal to the service:
/// the caller keeps running and inference routes report the model as
/// unavailable.
pub fn load(config: &Config) -> Result<Arc<dyn Classifier>, ModelError> {
    #[cfg(feature = "tensorflow")]
    {
        let graph = FrozenGraph::load(&config.model_path, &config.input_op, &config.output_op)?;
        Ok(Arc::new(graph))
    }

    #[cfg(not(feature = "tensorflow"))]
    {
        let _ = config;
        Err(ModelError::NoBackend)
    }
}
