//! Decision trees in flat node-array form.
//!
//! Node 0 is the root. A split sends a sample to `left` when
//! `x[feature] <= threshold`, otherwise to `right`. Child indices always
//! point forward, which [`DecisionTree::validate`] checks and which
//! guarantees that traversal terminates.

use serde::{Deserialize, Serialize};

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Regression value (width 1) or per-class weights
        value: Vec<f64>,
    },
}

/// A fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// A tree with a single leaf.
    pub fn leaf(value: Vec<f64>) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// A depth-one tree splitting on one feature.
    pub fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Self {
        Self {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    /// Check structure against the expected input and leaf widths.
    pub fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, only {n_features} inputs"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {i} has {} values, expected {leaf_width}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        return Err(format!("leaf {i} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf values reached by `x`.
    ///
    /// Returns `None` if traversal leaves the tree, which cannot happen for a
    /// validated tree and an input of the validated width.
    pub fn leaf_value(&self, x: &[f64]) -> Option<&[f64]> {
        let mut index = 0;
        // Forward-pointing children bound the walk by the node count
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index)? {
                Node::Leaf { value } => return Some(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if *x.get(*feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        None
    }
}
