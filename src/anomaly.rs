//! Statistical anomaly detection over the trailing load signal.
//!
//! The detector compares the newest sample against the mean and standard
//! deviation of the load scores immediately preceding it. Below the minimum
//! sample count it reports `NotReady` rather than guessing, so a cold start
//! never produces false positives.

use serde::{Deserialize, Serialize};

use crate::history::MetricHistory;
use crate::types::ScalecastConfig;

/// Outcome of evaluating the newest sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum AnomalySignal {
    /// Not enough trailing samples to form a distribution
    NotReady,
    /// Newest sample is within the threshold
    Normal { z_score: f64 },
    /// Newest sample deviates beyond the threshold; severity is |z|
    Anomaly { z_score: f64, severity: f64 },
}

impl AnomalySignal {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::Anomaly { .. })
    }
}

/// Z-score test over a trailing window of the load signal
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    window: usize,
    min_samples: usize,
    threshold: f64,
}

/// Guard against zero variance in a flat window
const STDDEV_EPSILON: f64 = 1e-9;

impl AnomalyDetector {
    pub fn new(config: &ScalecastConfig) -> Self {
        Self {
            window: config.anomaly_window,
            min_samples: config.anomaly_min_samples.max(2),
            threshold: config.anomaly_zscore_threshold,
        }
    }

    /// Evaluate the newest sample against the window that precedes it
    pub fn evaluate(&self, history: &MetricHistory) -> AnomalySignal {
        if history.len() < self.min_samples {
            return AnomalySignal::NotReady;
        }

        let loads = history.load_scores();
        let (window, newest) = loads.split_at(loads.len() - 1);
        let newest = newest[0];

        // Trailing window, excluding the sample under test
        let start = window.len().saturating_sub(self.window);
        let window = &window[start..];

        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let stddev = variance.sqrt().max(STDDEV_EPSILON);

        let z_score = (newest - mean) / stddev;
        if z_score.abs() > self.threshold {
            AnomalySignal::Anomaly {
                z_score,
                severity: z_score.abs(),
            }
        } else {
            AnomalySignal::Normal { z_score }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LoadScoreParams, MetricSample};

    fn history_with_loads(loads: &[f64]) -> MetricHistory {
        let mut history = MetricHistory::new(1000);
        let params = LoadScoreParams::default();
        for (i, &load) in loads.iter().enumerate() {
            history.push(MetricSample::new(
                1_700_000_000 + i as u64 * 60,
                load,
                load,
                40.0,
                0,
                0,
                load * 2.0,
                10,
                &params,
            ));
        }
        history
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(&ScalecastConfig::default())
    }

    #[test]
    fn cold_start_is_not_ready() {
        let history = history_with_loads(&[40.0, 41.0, 39.0]);
        assert_eq!(detector().evaluate(&history), AnomalySignal::NotReady);
    }

    #[test]
    fn spike_after_stable_history_is_flagged() {
        // Stable around 40 with slight jitter, then a spike to 95
        let mut loads: Vec<f64> = (0..20)
            .map(|i| 40.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        loads.push(95.0);
        let history = history_with_loads(&loads);

        let signal = detector().evaluate(&history);
        match signal {
            AnomalySignal::Anomaly { z_score, severity } => {
                assert!(z_score > 2.0);
                assert_eq!(severity, z_score.abs());
            }
            other => panic!("expected anomaly, got {:?}", other),
        }
    }

    #[test]
    fn steady_load_is_normal() {
        let loads: Vec<f64> = (0..25)
            .map(|i| 50.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let history = history_with_loads(&loads);
        assert!(!detector().evaluate(&history).is_anomaly());
    }

    #[test]
    fn flat_window_does_not_divide_by_zero() {
        let mut loads = vec![50.0; 20];
        loads.push(50.0);
        let history = history_with_loads(&loads);
        // Identical values: z is zero, not NaN or infinite
        match detector().evaluate(&history) {
            AnomalySignal::Normal { z_score } => assert_eq!(z_score, 0.0),
            other => panic!("expected normal, got {:?}", other),
        }
    }
}
