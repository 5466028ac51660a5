//! Logistic regression over the numeric columns plus a per-location offset

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Classifier, ClassifierError, LoadError};
use crate::models::{Column, FeatureRecord};

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Weight per numeric column; absent columns weigh 0
    pub weights: HashMap<Column, f64>,

    /// Offset per location token
    #[serde(default)]
    pub location_weights: HashMap<String, f64>,

    /// Offset for tokens unseen during training
    #[serde(default)]
    pub unknown_location_weight: f64,
}

impl LogisticModel {
    pub(super) fn check(&self) -> Result<(), LoadError> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(LoadError::Invalid(format!(
                "threshold {} outside (0, 1)",
                self.threshold
            )));
        }

        if self.weights.contains_key(&Column::Location) {
            return Err(LoadError::Invalid(
                "localisation is categorical, use location_weights".to_string(),
            ));
        }

        Ok(())
    }

    /// Fraud probability for a record
    pub fn probability(&self, record: &FeatureRecord) -> Result<f64, ClassifierError> {
        let linear: f64 = self
            .weights
            .iter()
            .filter_map(|(column, w)| record.numeric(*column).map(|x| w * x))
            .sum();

        let offset = self
            .location_weights
            .get(&record.location)
            .copied()
            .unwrap_or(self.unknown_location_weight);

        let z = self.intercept + linear + offset;
        if !z.is_finite() {
            return Err(ClassifierError(format!("non-finite logit {}", z)));
        }

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LogisticModel {
    fn predict(&self, record: &FeatureRecord) -> Result<bool, ClassifierError> {
        Ok(self.probability(record)? >= self.threshold)
    }
}
