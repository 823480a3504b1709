// Chart dataset domain model
use super::activity::axis_label;
use serde::Serialize;

/// Series above this length can be exported as a picture.
const SHAREABLE_MIN_POINTS: usize = 5;

/// Numeric series and sparse x-axis labels for the history charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub svm_series: Vec<f64>,
    pub state_series: Vec<i32>,
    pub labels: Vec<String>,
}

impl ChartDataset {
    pub fn new(svm_series: Vec<f64>, state_series: Vec<i32>, labels: Vec<String>) -> Self {
        Self {
            svm_series,
            state_series,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.svm_series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.svm_series.is_empty()
    }

    pub fn is_shareable(&self) -> bool {
        self.svm_series.len() > SHAREABLE_MIN_POINTS
    }

    /// Y-axis labels of the activity chart, indexed by chart code
    pub fn state_axis_labels() -> [&'static str; 3] {
        [axis_label(0), axis_label(1), axis_label(2)]
    }
}

impl Default for ChartDataset {
    /// Single-point placeholder shown before any history is reduced
    fn default() -> Self {
        Self::new(vec![0.0], vec![0], vec!["00:00".to_string()])
    }
}
