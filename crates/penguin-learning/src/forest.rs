//! Random forest classifier built from `linfa-trees` CART trees.
//!
//! Each tree is fitted on a bootstrap sample of the rows and a random subset of
//! the feature columns. Both are drawn from a [`StdRng`] seeded with
//! `random_seed + tree_index`, so a forest is fully determined by its parameters
//! and training data. Prediction is a majority vote over the trees; ties go to the
//! class that sorts first.
//!
//! # Example
//!
//! ```rust,ignore
//! use penguin_learning::{RandomForestModel, RandomForestParams};
//!
//! let model = RandomForestModel::fit(&RandomForestParams::default(), &names, &rows, &labels)?;
//! model.save("models/model.json")?;
//!
//! let predicted = RandomForestModel::load("models/model.json")?.predict(&rows)?;
//! ```

use crate::error::{LearningError, Result};
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use penguin_processing::utils::numeric_values;
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Version written into persisted models.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Hyperparameters of a [`RandomForestModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Columns per tree; `None` means `round(sqrt(n_features))`.
    pub max_features: Option<usize>,
    pub random_seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
            random_seed: 42,
        }
    }
}

impl RandomForestParams {
    fn features_per_tree(&self, n_features: usize) -> usize {
        let k = self
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize);
        k.clamp(1, n_features)
    }
}

/// One fitted tree and the feature columns it reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForestTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// A fitted, immutable random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestModel {
    format_version: u32,
    trained_at: String,
    params: RandomForestParams,
    classes: Vec<String>,
    feature_names: Vec<String>,
    trees: Vec<ForestTree>,
}

impl RandomForestModel {
    /// Fit a forest on row-major `rows` with one label per row.
    ///
    /// `feature_names` fixes the column layout the model expects at prediction
    /// time.
    ///
    /// # Errors
    ///
    /// [`LearningError::TrainingFailed`] when there are no rows, fewer than two
    /// distinct labels, or the inputs disagree in shape.
    pub fn fit(
        params: &RandomForestParams,
        feature_names: &[String],
        rows: &[Vec<f64>],
        labels: &[String],
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(LearningError::TrainingFailed(
                "no training rows".to_string(),
            ));
        }
        if rows.len() != labels.len() {
            return Err(LearningError::TrainingFailed(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if feature_names.is_empty() {
            return Err(LearningError::TrainingFailed(
                "no feature columns".to_string(),
            ));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(LearningError::TrainingFailed(format!(
                "need at least two classes, found {}",
                classes.len()
            )));
        }

        let x = to_array(rows, feature_names.len()).map_err(LearningError::TrainingFailed)?;
        let y: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let n_rows = rows.len();
        let n_features = feature_names.len();
        let k = params.features_per_tree(n_features);
        info!(
            "Fitting random forest: {} trees, {} rows, {} of {} features per tree, {} classes",
            params.n_trees,
            n_rows,
            k,
            n_features,
            classes.len()
        );

        let mut trees = Vec::with_capacity(params.n_trees);
        for index in 0..params.n_trees {
            let mut rng = StdRng::seed_from_u64(params.random_seed.wrapping_add(index as u64));

            let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut features = rand::seq::index::sample(&mut rng, n_features, k).into_vec();
            features.sort_unstable();

            let x_tree = x.select(Axis(0), &sample).select(Axis(1), &features);
            let y_tree: Array1<usize> = sample.iter().map(|&r| y[r]).collect();

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(params.max_depth)
                .min_weight_leaf(params.min_samples_leaf as f32)
                .fit(&Dataset::new(x_tree, y_tree))
                .map_err(|e| LearningError::TrainingFailed(format!("tree {index}: {e}")))?;

            trees.push(ForestTree { features, tree });
        }
        debug!("Fitted {} trees", trees.len());

        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            trained_at: chrono::Utc::now().to_rfc3339(),
            params: params.clone(),
            classes,
            feature_names: feature_names.to_vec(),
            trees,
        })
    }

    /// Sorted class labels.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Feature columns, in the order the model reads them.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// RFC 3339 timestamp of the fit.
    pub fn trained_at(&self) -> &str {
        &self.trained_at
    }

    /// Predict one label per row of a row-major matrix.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<String>> {
        Ok(self
            .predict_indices(rows)?
            .into_iter()
            .map(|i| self.classes[i].clone())
            .collect())
    }

    /// Predict from a transformed feature table, selecting columns by name.
    pub fn predict_frame(&self, features: &DataFrame) -> Result<Vec<String>> {
        let rows = self.frame_rows(features)?;
        self.predict(&rows)
    }

    fn predict_indices(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let x = to_array(rows, self.feature_names.len()).map_err(LearningError::Inference)?;
        let mut votes = vec![vec![0usize; self.classes.len()]; rows.len()];

        for member in &self.trees {
            let x_tree = x.select(Axis(1), &member.features);
            let predicted: Array1<usize> = member.tree.predict(&x_tree);
            for (row, class) in predicted.iter().enumerate() {
                votes[row][*class] += 1;
            }
        }

        Ok(votes.iter().map(|counts| majority(counts)).collect())
    }

    fn frame_rows(&self, features: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let mut rows = vec![Vec::with_capacity(self.feature_names.len()); features.height()];

        for name in &self.feature_names {
            let values = numeric_values(features, name).map_err(|e| {
                LearningError::Inference(format!("feature column '{name}': {e}"))
            })?;
            for (row, value) in rows.iter_mut().zip(values) {
                let value = value.ok_or_else(|| {
                    LearningError::Inference(format!("feature column '{name}' contains nulls"))
                })?;
                row.push(value);
            }
        }
        Ok(rows)
    }

    /// Serialize to an opaque byte blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Restore from a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes)?;
        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(LearningError::Inference(format!(
                "unsupported model format version {}",
                model.format_version
            )));
        }
        Ok(model)
    }

    /// Persist to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes()?)?;
        info!("Saved trained model to {}", path.display());
        Ok(())
    }

    /// Load a model persisted with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`LearningError::ModelNotFound`] if nothing exists at `path`,
    /// [`LearningError::ArtifactCorrupt`] if the file cannot be decoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LearningError::ModelNotFound {
                path: path.display().to_string(),
            });
        }

        let bytes = fs::read(path)?;
        let model = Self::from_bytes(&bytes).map_err(|e| LearningError::ArtifactCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(
            "Loaded model from {} ({} trees, trained {})",
            path.display(),
            model.trees.len(),
            model.trained_at
        );
        Ok(model)
    }
}

/// Index of the highest count; the first one wins a tie.
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

fn to_array(rows: &[Vec<f64>], n_features: usize) -> std::result::Result<Array2<f64>, String> {
    if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
        return Err(format!(
            "row {row} has {} features, expected {n_features}",
            values.len()
        ));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_features), flat).map_err(|e| e.to_string())
}
