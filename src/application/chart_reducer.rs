// Chart reducer - Downsample the sample buffer into a renderable series
use crate::domain::activity::to_chart_code;
use crate::domain::chart::ChartDataset;
use crate::domain::sample::Sample;

pub const MAX_POINTS: usize = 600;
pub const LABEL_COUNT: usize = 6;
const LABEL_CHARS: usize = 5;

#[derive(Debug, Clone)]
pub struct ChartReducer {
    max_points: usize,
    label_count: usize,
    current: ChartDataset,
}

impl ChartReducer {
    pub fn new(max_points: usize, label_count: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            label_count: label_count.max(1),
            current: ChartDataset::default(),
        }
    }

    /// Last dataset produced, or the placeholder if nothing was reduced yet
    pub fn dataset(&self) -> &ChartDataset {
        &self.current
    }

    /// Rebuild the dataset from `samples`.
    ///
    /// Fewer than two samples leave the previous dataset in place.
    pub fn reduce(&mut self, samples: &[Sample]) -> &ChartDataset {
        if samples.len() < 2 {
            tracing::debug!("Skipping chart rebuild for {} samples", samples.len());
            return &self.current;
        }

        let step = stride(samples.len(), self.max_points);
        let kept: Vec<&Sample> = samples.iter().step_by(step).collect();
        let label_every = kept.len().div_ceil(self.label_count);

        let svm_series = kept
            .iter()
            .map(|s| if s.svm.is_finite() { s.svm } else { 0.0 })
            .collect();
        let state_series = kept.iter().map(|s| to_chart_code(s.activity)).collect();
        let labels = kept
            .iter()
            .enumerate()
            .map(|(j, s)| {
                if j % label_every == 0 {
                    s.time.chars().take(LABEL_CHARS).collect()
                } else {
                    String::new()
                }
            })
            .collect();

        tracing::debug!(
            "Reduced {} samples to {} points (stride {})",
            samples.len(),
            kept.len(),
            step
        );

        self.current = ChartDataset::new(svm_series, state_series, labels);
        &self.current
    }
}

impl Default for ChartReducer {
    fn default() -> Self {
        Self::new(MAX_POINTS, LABEL_COUNT)
    }
}

/// Keep every `stride`-th sample so at most `max_points` remain
pub fn stride(len: usize, max_points: usize) -> usize {
    if len <= max_points {
        1
    } else {
        len.div_ceil(max_points)
    }
}
