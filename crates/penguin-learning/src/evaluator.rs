//! Held-out evaluation of a persisted model.
//!
//! [`Evaluator::evaluate`] loads the model from disk, predicts, and writes two
//! files to its report directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `classification_report.json` | per-label metrics, `accuracy`, `macro avg`, `weighted avg` |
//! | `confusion_matrix.png` | heat map, rows true and columns predicted, labels sorted |
//! | `confusion_matrix.json` | the labels indexing both image axes and the raw counts |
//!
//! The image carries no text, so the JSON file is its legend.
//!
//! Metrics are computed over the labels that actually occur in either the truth
//! or the predictions. A metric whose denominator is zero is reported as 0.0.
//! Nothing persisted by training is modified.

use crate::error::{LearningError, Result};
use crate::forest::RandomForestModel;
use image::{Rgb, RgbImage};
use polars::prelude::DataFrame;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "classification_report.json";
pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.png";
pub const CONFUSION_LEGEND_FILE: &str = "confusion_matrix.json";

/// Pixel size of one confusion-matrix cell.
const CELL: u32 = 64;
const BORDER: u32 = 2;
/// Ends of the blue colour scale.
const LIGHT: [f64; 3] = [247.0, 251.0, 255.0];
const DARK: [f64; 3] = [8.0, 48.0, 107.0];

/// Precision, recall and F1 for one label, or an average over labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Counts of (true label, predicted label) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Sorted labels, indexing both axes.
    pub labels: Vec<String>,
    /// `counts[true][predicted]`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let labels: Vec<String> = y_true
            .iter()
            .chain(y_pred)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
                counts[i][j] += 1;
            }
        }
        Self { labels, counts }
    }

    fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Render as a blue-scale heat map, one square cell per label pair.
    pub fn render(&self) -> RgbImage {
        let n = self.labels.len() as u32;
        let side = n * CELL + (n + 1) * BORDER;
        let max = self.max_count().max(1) as f64;

        RgbImage::from_fn(side, side, |x, y| {
            let (cx, ox) = (x / (CELL + BORDER), x % (CELL + BORDER));
            let (cy, oy) = (y / (CELL + BORDER), y % (CELL + BORDER));
            if ox < BORDER || oy < BORDER || cx >= n || cy >= n {
                return Rgb([255, 255, 255]);
            }
            let t = self.counts[cy as usize][cx as usize] as f64 / max;
            let channel = |c: usize| (LIGHT[c] + (DARK[c] - LIGHT[c]) * t).round() as u8;
            Rgb([channel(0), channel(1), channel(2)])
        })
    }

    /// Write the heat map as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.render().save(path.as_ref())?;
        Ok(())
    }
}

/// Per-label metrics, accuracy and averages, shaped like scikit-learn's
/// `classification_report(output_dict=True)` when serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub per_class: Vec<(String, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    /// Compare true and predicted labels.
    ///
    /// # Errors
    ///
    /// [`LearningError::Inference`] if the inputs are empty or differ in length.
    pub fn from_predictions(y_true: &[String], y_pred: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(LearningError::Inference(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(LearningError::Inference("no rows to evaluate".to_string()));
        }

        let confusion = ConfusionMatrix::new(y_true, y_pred);
        let n = confusion.labels.len();
        let total = y_true.len();

        let mut per_class = Vec::with_capacity(n);
        for (i, label) in confusion.labels.iter().enumerate() {
            let tp = confusion.counts[i][i];
            let support: usize = confusion.counts[i].iter().sum();
            let predicted: usize = confusion.counts.iter().map(|row| row[i]).sum();

            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            per_class.push((
                label.clone(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score,
                    support,
                },
            ));
        }

        let correct: usize = (0..n).map(|i| confusion.counts[i][i]).sum();
        let accuracy = ratio(correct, total);

        let average = |weight: &dyn Fn(&ClassMetrics) -> f64| {
            let norm: f64 = per_class.iter().map(|(_, m)| weight(m)).sum();
            let mean = |f: fn(&ClassMetrics) -> f64| {
                if norm > 0.0 {
                    per_class.iter().map(|(_, m)| weight(m) * f(m)).sum::<f64>() / norm
                } else {
                    0.0
                }
            };
            ClassMetrics {
                precision: mean(|m| m.precision),
                recall: mean(|m| m.recall),
                f1_score: mean(|m| m.f1_score),
                support: total,
            }
        };
        let macro_avg = average(&|_| 1.0);
        let weighted_avg = average(&|m| m.support as f64);

        Ok(Self {
            per_class,
            accuracy,
            macro_avg,
            weighted_avg,
            confusion,
        })
    }

    /// Metrics for one label, if it occurred.
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.per_class
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, metrics)| metrics)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl Serialize for ClassificationReport {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.per_class.len() + 3))?;
        for (label, metrics) in &self.per_class {
            map.serialize_entry(label, metrics)?;
        }
        map.serialize_entry("accuracy", &self.accuracy)?;
        map.serialize_entry("macro avg", &self.macro_avg)?;
        map.serialize_entry("weighted avg", &self.weighted_avg)?;
        map.end()
    }
}

/// Files written by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationArtifacts {
    pub report_path: PathBuf,
    pub confusion_matrix_path: PathBuf,
    pub confusion_legend_path: PathBuf,
}

/// Evaluates a persisted model and writes its reports.
#[derive(Debug, Clone)]
pub struct Evaluator {
    report_dir: PathBuf,
}

impl Evaluator {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn artifacts(&self) -> EvaluationArtifacts {
        EvaluationArtifacts {
            report_path: self.report_dir.join(REPORT_FILE),
            confusion_matrix_path: self.report_dir.join(CONFUSION_MATRIX_FILE),
            confusion_legend_path: self.report_dir.join(CONFUSION_LEGEND_FILE),
        }
    }

    /// Load the model at `model_path`, predict `features` and score against `labels`.
    ///
    /// `features` must already be transformed by the preprocessor the model was
    /// trained with. A missing model is an error; there is no fallback.
    pub fn evaluate(
        &self,
        model_path: impl AsRef<Path>,
        features: &DataFrame,
        labels: &[String],
    ) -> Result<ClassificationReport> {
        info!("Loading model...");
        let model = RandomForestModel::load(model_path)?;

        info!("Generating predictions for {} rows...", features.height());
        let predicted = model.predict_frame(features)?;

        info!("Computing metrics...");
        let report = ClassificationReport::from_predictions(labels, &predicted)?;
        info!("Evaluation accuracy: {:.4}", report.accuracy);

        self.write(&report)?;
        Ok(report)
    }

    /// Persist the JSON report, the confusion-matrix image and its legend.
    pub fn write(&self, report: &ClassificationReport) -> Result<EvaluationArtifacts> {
        fs::create_dir_all(&self.report_dir)?;
        let artifacts = self.artifacts();

        fs::write(&artifacts.report_path, serde_json::to_string_pretty(report)?)?;
        info!(
            "Saved classification report to {}",
            artifacts.report_path.display()
        );

        report.confusion.save_png(&artifacts.confusion_matrix_path)?;
        fs::write(
            &artifacts.confusion_legend_path,
            serde_json::to_string_pretty(&report.confusion)?,
        )?;
        info!(
            "Saved confusion matrix to {}",
            artifacts.confusion_matrix_path.display()
        );

        Ok(artifacts)
    }
}
