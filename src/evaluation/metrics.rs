//! Classification metrics

use crate::error::{ChurnError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Area under the ROC curve for a binary problem.
///
/// The positive class is the larger label. Computed from the Mann-Whitney
/// rank statistic; tied scores share their average rank.
pub fn roc_auc_score(y_true: &Array1<i64>, y_score: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_score.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", y_score.len()),
        });
    }

    let classes: BTreeSet<i64> = y_true.iter().copied().collect();
    if classes.len() != 2 {
        return Err(ChurnError::EvaluationError(format!(
            "ROC-AUC needs exactly two classes in y_true, found {}",
            classes.len()
        )));
    }
    let positive = *classes.iter().next_back().ok_or_else(|| {
        ChurnError::EvaluationError("empty label set".to_string())
    })?;

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // Average 1-based ranks over runs of equal scores
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        start = end;
    }

    let n_pos = y_true.iter().filter(|&&y| y == positive).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;
    let rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == positive)
        .map(|(_, r)| r)
        .sum();

    Ok((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class report with accuracy, macro and weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// Decimal places used by `Display`
const REPORT_DIGITS: usize = 3;

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build the report over every label found in `y_true` or `y_pred`
    pub fn new(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ChurnError::EvaluationError("no rows to evaluate".to_string()));
        }

        let labels: BTreeSet<i64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        let n = y_true.len();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&label| {
                let mut tp = 0;
                let mut predicted = 0;
                let mut actual = 0;
                for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                    if p == label {
                        predicted += 1;
                    }
                    if t == label {
                        actual += 1;
                        if p == label {
                            tp += 1;
                        }
                    }
                }

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, actual);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label: label.to_string(),
                    precision,
                    recall,
                    f1_score,
                    support: actual,
                }
            })
            .collect();

        let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
        let k = classes.len() as f64;

        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / k,
            support: n,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / n as f64
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: n,
        };

        Ok(Self {
            classes,
            accuracy: ratio(correct, n),
            macro_avg,
            weighted_avg,
        })
    }

    /// Metrics of one class label
    pub fn class(&self, label: i64) -> Option<&ClassMetrics> {
        let key = label.to_string();
        self.classes.iter().find(|c| c.label == key)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = REPORT_DIGITS;
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0)
            .max(d);

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                m.label, m.precision, m.recall, m.f1_score, m.support
            )
        };

        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}
