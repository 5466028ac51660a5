//! Binary decision tree, stored as a flat node array rooted at index 0

use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierError, LoadError};
use crate::models::{Column, FeatureRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when the value is <= threshold, else `right`
    Numeric {
        feature: Column,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Go `matched` when the location is one of `values`
    Category {
        feature: Column,
        values: Vec<String>,
        matched: usize,
        otherwise: usize,
    },
    Leaf {
        fraud: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub(super) fn check(&self) -> Result<(), LoadError> {
        if self.nodes.is_empty() {
            return Err(LoadError::Invalid("decision tree has no nodes".to_string()));
        }

        let in_range = |idx: usize, at: usize| {
            if idx < self.nodes.len() {
                Ok(())
            } else {
                Err(LoadError::Invalid(format!(
                    "node {} points to missing node {}",
                    at, idx
                )))
            }
        };

        for (at, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Numeric { feature, left, right, .. } => {
                    if !feature.is_numeric() {
                        return Err(LoadError::Invalid(format!(
                            "node {} splits numerically on {}",
                            at, feature
                        )));
                    }
                    in_range(*left, at)?;
                    in_range(*right, at)?;
                }
                TreeNode::Category { feature, matched, otherwise, .. } => {
                    if feature.is_numeric() {
                        return Err(LoadError::Invalid(format!(
                            "node {} splits categorically on {}",
                            at, feature
                        )));
                    }
                    in_range(*matched, at)?;
                    in_range(*otherwise, at)?;
                }
                TreeNode::Leaf { .. } => {}
            }
        }

        Ok(())
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, record: &FeatureRecord) -> Result<bool, ClassifierError> {
        let mut at = 0;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(at)
                .ok_or_else(|| ClassifierError(format!("missing node {}", at)))?;

            at = match node {
                TreeNode::Leaf { fraud } => return Ok(*fraud),
                TreeNode::Numeric { feature, threshold, left, right } => {
                    let value = record.numeric(*feature).ok_or_else(|| {
                        ClassifierError(format!("{} has no numeric value", feature))
                    })?;
                    if value <= *threshold { *left } else { *right }
                }
                TreeNode::Category { values, matched, otherwise, .. } => {
                    if values.iter().any(|v| *v == record.location) {
                        *matched
                    } else {
                        *otherwise
                    }
                }
            };
        }

        Err(ClassifierError(
            "decision path exceeds tree size (cycle in artifact)".to_string(),
        ))
    }
}
