//! ONNX Runtime classifier
//!
//! Serves a pipeline exported with one graph input per column (the
//! usual layout for a tabular export). Inputs are fed in `Column::ALL`
//! order; numeric columns may be declared as float, double or int64,
//! the location as a string tensor. The first graph output is the
//! predicted label.

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use parking_lot::Mutex;
use std::path::Path;

use super::{Classifier, ClassifierError, LoadError};
use crate::models::{Column, FeatureRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
enum InputKind {
    Float,
    Double,
    Int,
    Text,
}

pub struct OnnxClassifier {
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
    inputs: Vec<(Column, InputKind)>,
    output: String,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| LoadError::Onnx(format!("{}: {}", path.display(), e)))?;

        Self::from_session(session)
    }

    fn from_session(session: Session) -> Result<Self, LoadError> {
        let mut declared = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let column = Column::ALL
                .into_iter()
                .find(|c| c.name() == input.name)
                .ok_or_else(|| {
                    LoadError::Invalid(format!("model input {:?} is not a feature column", input.name))
                })?;

            let kind = match &input.input_type {
                ValueType::Tensor { ty, .. } => match (column.is_numeric(), ty) {
                    (false, TensorElementType::String) => InputKind::Text,
                    (true, TensorElementType::Float32) => InputKind::Float,
                    (true, TensorElementType::Float64) => InputKind::Double,
                    (true, TensorElementType::Int64) => InputKind::Int,
                    (_, other) => {
                        return Err(LoadError::Invalid(format!(
                            "model input {} has unsupported type {:?}",
                            column, other
                        )))
                    }
                },
                other => {
                    return Err(LoadError::Invalid(format!(
                        "model input {} is not a tensor ({:?})",
                        column, other
                    )))
                }
            };
            declared.push((column, kind));
        }

        if declared.is_empty() {
            return Err(LoadError::Invalid("model declares no inputs".to_string()));
        }

        let inputs: Vec<(Column, InputKind)> = Column::ALL
            .into_iter()
            .filter_map(|c| declared.iter().find(|(d, _)| *d == c).copied())
            .collect();

        let output = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| LoadError::Invalid("model declares no outputs".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            inputs,
            output,
        })
    }

    fn tensor(column: Column, kind: InputKind, record: &FeatureRecord) -> Result<DynValue, ort::Error> {
        let shape = vec![1_i64, 1];
        let value = record.numeric(column).unwrap_or_default();
        Ok(match kind {
            InputKind::Float => Tensor::from_array((shape, vec![value as f32]))?.into_dyn(),
            InputKind::Double => Tensor::from_array((shape, vec![value]))?.into_dyn(),
            InputKind::Int => Tensor::from_array((shape, vec![value as i64]))?.into_dyn(),
            InputKind::Text => {
                Tensor::<String>::from_string_array((shape, vec![record.location.clone()].as_slice()))?.into_dyn()
            }
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, record: &FeatureRecord) -> Result<bool, ClassifierError> {
        let feed = self
            .inputs
            .iter()
            .map(|&(column, kind)| Ok((column.name(), Self::tensor(column, kind, record)?)))
            .collect::<Result<Vec<(&'static str, DynValue)>, ort::Error>>()
            .map_err(|e| ClassifierError(format!("tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(feed)
            .map_err(|e| ClassifierError(format!("inference failed: {}", e)))?;

        let label = outputs
            .get(&self.output)
            .ok_or_else(|| ClassifierError(format!("missing output {}", self.output)))?;

        if let Ok((_, data)) = label.try_extract_tensor::<i64>() {
            return data
                .first()
                .map(|&l| l != 0)
                .ok_or_else(|| ClassifierError("empty label tensor".to_string()));
        }
        if let Ok((_, data)) = label.try_extract_tensor::<f32>() {
            return data
                .first()
                .map(|&p| p >= 0.5)
                .ok_or_else(|| ClassifierError("empty label tensor".to_string()));
        }

        Err(ClassifierError(format!(
            "output {} is neither an int64 label nor a float score",
            self.output
        )))
    }
}
