//! Bounded, insertion-ordered storage for metric samples.
//!
//! The history is owned by the ingestion path and read by the feature
//! builder and anomaly detector. Oldest samples are evicted FIFO once the
//! configured capacity is reached; length never exceeds capacity.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::MetricSample;

/// Ordered, capacity-bounded sequence of metric samples
#[derive(Debug, Clone)]
pub struct MetricHistory {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

/// Summary statistics over the trailing window of history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub avg_cpu: f64,
    pub avg_memory: f64,
    pub avg_response_time: f64,
    pub avg_load_score: f64,
    pub total_samples: usize,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest when at capacity
    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    /// The trailing `n` samples, oldest first
    pub fn recent(&self, n: usize) -> Vec<&MetricSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).collect()
    }

    /// The scalar signal the forecaster and anomaly detector operate on,
    /// oldest first
    pub fn load_scores(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.load_score).collect()
    }

    /// Average stats over the trailing 50 samples
    pub fn summary(&self) -> Option<HistorySummary> {
        if self.samples.is_empty() {
            return None;
        }
        let recent = self.recent(50);
        let n = recent.len() as f64;
        Some(HistorySummary {
            avg_cpu: recent.iter().map(|s| s.cpu_pct).sum::<f64>() / n,
            avg_memory: recent.iter().map(|s| s.mem_pct).sum::<f64>() / n,
            avg_response_time: recent.iter().map(|s| s.response_time_ms).sum::<f64>() / n,
            avg_load_score: recent.iter().map(|s| s.load_score).sum::<f64>() / n,
            total_samples: self.samples.len(),
        })
    }
}
