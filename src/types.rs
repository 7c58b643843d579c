// src/types.rs

use serde::{Deserialize, Serialize};

use crate::error::{ScalecastError, ScalecastResult};

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Parameters for normalizing response time into the composite load score
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoadScoreParams {
    /// Response time considered "idle" (maps to score 0)
    pub response_baseline_ms: f64,
    /// Response time considered saturated (maps to score 100)
    pub response_ceiling_ms: f64,
}

impl Default for LoadScoreParams {
    fn default() -> Self {
        Self {
            response_baseline_ms: 0.0,
            response_ceiling_ms: 200.0,
        }
    }
}

/// A single observation of the monitored resource.
///
/// Samples are immutable once created: `load_score` is derived at
/// construction time and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// When this sample was collected (Unix seconds)
    pub timestamp: Timestamp,
    /// CPU utilization, 0-100
    pub cpu_pct: f64,
    /// Memory utilization, 0-100
    pub mem_pct: f64,
    /// Disk utilization, 0-100
    pub disk_pct: f64,
    /// Total bytes sent on the network interface
    pub net_sent: u64,
    /// Total bytes received on the network interface
    pub net_recv: u64,
    /// Application response time in milliseconds
    pub response_time_ms: f64,
    /// Active connection count
    pub connections: u64,
    /// Weighted composite of CPU, memory and response time, 0-100
    pub load_score: f64,
}

impl MetricSample {
    /// Create a sample, deriving `load_score` from the raw signals:
    /// `0.4 * cpu + 0.3 * mem + 0.3 * response_score`, where the response
    /// score is the response time normalized to 0-100 against the configured
    /// baseline and ceiling.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: Timestamp,
        cpu_pct: f64,
        mem_pct: f64,
        disk_pct: f64,
        net_sent: u64,
        net_recv: u64,
        response_time_ms: f64,
        connections: u64,
        params: &LoadScoreParams,
    ) -> Self {
        let span = (params.response_ceiling_ms - params.response_baseline_ms).max(f64::EPSILON);
        let response_score =
            ((response_time_ms - params.response_baseline_ms) / span * 100.0).clamp(0.0, 100.0);
        let load_score = 0.4 * cpu_pct + 0.3 * mem_pct + 0.3 * response_score;

        Self {
            timestamp,
            cpu_pct,
            mem_pct,
            disk_pct,
            net_sent,
            net_recv,
            response_time_ms,
            connections,
            load_score,
        }
    }

    /// Check that the sample is well-formed before it enters the history.
    ///
    /// Rejected samples are dropped, never merged or repaired.
    pub fn validate(&self) -> ScalecastResult<()> {
        if self.timestamp == 0 {
            return Err(ScalecastError::invalid_sample("timestamp is zero"));
        }
        for (name, value) in [
            ("cpu_pct", self.cpu_pct),
            ("mem_pct", self.mem_pct),
            ("disk_pct", self.disk_pct),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ScalecastError::invalid_sample(format!(
                    "{} out of range: {}",
                    name, value
                )));
            }
        }
        if !self.response_time_ms.is_finite() || self.response_time_ms < 0.0 {
            return Err(ScalecastError::invalid_sample(format!(
                "response_time_ms out of range: {}",
                self.response_time_ms
            )));
        }
        if !self.load_score.is_finite() || !(0.0..=100.0).contains(&self.load_score) {
            return Err(ScalecastError::invalid_sample(format!(
                "load_score out of range: {}",
                self.load_score
            )));
        }
        Ok(())
    }
}

/// A single point of an H-step-ahead forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// How many decision ticks into the future this prediction is for (1-based)
    pub horizon_step: usize,
    /// Predicted load score, 0-100
    pub predicted_load: f64,
    /// Forecaster's self-reported reliability, non-increasing in `horizon_step`
    pub confidence: f64,
}

/// Direction of a scaling decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScaleAction {
    /// Add instances
    ScaleUp,
    /// Remove instances
    ScaleDown,
    /// Keep current capacity
    NoOp,
}

/// Why the decision engine chose a particular action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// A previous action's cooldown window is still open
    Cooldown,
    /// Reactive path: the newest sample's z-score exceeded the threshold
    Anomaly,
    /// No forecast step met the confidence gate
    LowConfidence,
    /// Qualifying forecast exceeded the upper threshold
    HighLoadForecast,
    /// Qualifying forecast fell below the lower threshold
    LowLoadForecast,
    /// Forecast stayed between the thresholds
    WithinBounds,
    /// The cost gate clamped the target back to the current capacity
    CostCapped,
    /// No trained model exists yet
    ModelUnavailable,
}

impl DecisionReason {
    /// Stable string form used in logs and serialized decisions
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooldown => "cooldown",
            Self::Anomaly => "anomaly",
            Self::LowConfidence => "low_confidence",
            Self::HighLoadForecast => "high_load_forecast",
            Self::LowLoadForecast => "low_load_forecast",
            Self::WithinBounds => "within_bounds",
            Self::CostCapped => "cost_capped",
            Self::ModelUnavailable => "model_unavailable",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output of one decision tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingDecision {
    /// Direction to scale
    pub action: ScaleAction,
    /// Instance count after this decision is applied
    pub target_instances: u32,
    /// Why the engine decided this
    pub reason: DecisionReason,
    /// Projected daily cost of `target_instances`
    pub estimated_cost: f64,
    /// When this decision was made (Unix seconds)
    pub timestamp: Timestamp,
}

impl ScalingDecision {
    /// True when this decision changes capacity
    pub fn is_actionable(&self) -> bool {
        self.action != ScaleAction::NoOp
    }
}

/// The single piece of mutable state carried between decision ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingState {
    /// Currently provisioned instance count
    pub current_instances: u32,
    /// When the last non-no_op decision was accepted
    pub last_action_time: Option<Timestamp>,
    /// No further action is accepted before this time
    pub cooldown_until: Option<Timestamp>,
}

impl ScalingState {
    /// Start at the configured minimum capacity
    pub fn new(initial_instances: u32) -> Self {
        Self {
            current_instances: initial_instances,
            last_action_time: None,
            cooldown_until: None,
        }
    }

    /// True when a cooldown window is open at `now`
    pub fn in_cooldown(&self, now: Timestamp) -> bool {
        matches!(self.cooldown_until, Some(until) if now < until)
    }
}

/// Main configuration for the scalecast engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalecastConfig {
    /// How often samples are pulled from the metric source (seconds)
    pub ingestion_interval_s: u64,
    /// How often a scaling decision is made (seconds)
    pub decision_interval_s: u64,
    /// Maximum number of samples retained in history
    pub history_capacity: usize,
    /// Retrain after this many new samples since the last training
    pub training_batch_size: usize,
    /// Minimum total history before the first training
    pub min_training_size: usize,
    /// Maximum number of forecast steps
    pub forecast_horizon: usize,
    /// Per-step multiplicative confidence decay, in (0, 1]
    pub confidence_decay: f64,
    /// Scale up when qualifying forecast exceeds this load score
    pub upper_threshold: f64,
    /// Scale down when qualifying forecast falls below this load score
    pub lower_threshold: f64,
    /// Minimum confidence for a forecast step to qualify
    pub min_confidence: f64,
    /// Quiescent period after any accepted scaling action (seconds)
    pub cooldown_seconds: u64,
    /// Instance count floor
    pub min_instances: u32,
    /// Instance count ceiling
    pub max_instances: u32,
    /// Daily spend ceiling used by the cost gate
    pub daily_cost_budget: f64,
    /// Hourly cost of one instance
    pub cost_per_instance_hour: f64,
    /// |z| above which the newest sample is anomalous
    pub anomaly_zscore_threshold: f64,
    /// Trailing window for anomaly statistics
    pub anomaly_window: usize,
    /// Samples required before the anomaly detector activates
    pub anomaly_min_samples: usize,
    /// Instances added on the reactive anomaly path
    pub emergency_step: u32,
    /// Response time normalization for the load score
    pub load_score: LoadScoreParams,
}

impl Default for ScalecastConfig {
    fn default() -> Self {
        Self {
            ingestion_interval_s: 60,
            decision_interval_s: 300,
            history_capacity: 1000,
            training_batch_size: 10,
            min_training_size: 20,
            forecast_horizon: 10,
            confidence_decay: 0.95,
            upper_threshold: 80.0,
            lower_threshold: 30.0,
            min_confidence: 0.7,
            cooldown_seconds: 300,
            min_instances: 1,
            max_instances: 10,
            daily_cost_budget: 24.0,
            cost_per_instance_hour: 0.10,
            anomaly_zscore_threshold: 2.0,
            anomaly_window: 20,
            anomaly_min_samples: 5,
            emergency_step: 1,
            load_score: LoadScoreParams::default(),
        }
    }
}

impl ScalecastConfig {
    pub fn builder() -> ScalecastConfigBuilder {
        ScalecastConfigBuilder::new()
    }

    /// Reject configurations the decision engine cannot operate under
    pub fn validate(&self) -> ScalecastResult<()> {
        if self.min_instances == 0 {
            return Err(ScalecastError::config("min_instances must be at least 1"));
        }
        if self.min_instances > self.max_instances {
            return Err(ScalecastError::config(format!(
                "min_instances ({}) exceeds max_instances ({})",
                self.min_instances, self.max_instances
            )));
        }
        if self.lower_threshold >= self.upper_threshold {
            return Err(ScalecastError::config(format!(
                "lower_threshold ({}) must be below upper_threshold ({})",
                self.lower_threshold, self.upper_threshold
            )));
        }
        if self.forecast_horizon == 0 {
            return Err(ScalecastError::config("forecast_horizon must be at least 1"));
        }
        if !(self.confidence_decay > 0.0 && self.confidence_decay <= 1.0) {
            return Err(ScalecastError::config(format!(
                "confidence_decay must be in (0, 1], got {}",
                self.confidence_decay
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ScalecastError::config(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.history_capacity < self.min_training_size {
            return Err(ScalecastError::config(
                "history_capacity must not be below min_training_size",
            ));
        }
        Ok(())
    }
}

/// Builder for creating scalecast configurations easily
#[derive(Debug)]
pub struct ScalecastConfigBuilder {
    config: ScalecastConfig,
}

impl Default for ScalecastConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalecastConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ScalecastConfig::default(),
        }
    }

    pub fn ingestion_interval(mut self, seconds: u64) -> Self {
        self.config.ingestion_interval_s = seconds;
        self
    }

    pub fn decision_interval(mut self, seconds: u64) -> Self {
        self.config.decision_interval_s = seconds;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    pub fn training_batch_size(mut self, size: usize) -> Self {
        self.config.training_batch_size = size;
        self
    }

    pub fn min_training_size(mut self, size: usize) -> Self {
        self.config.min_training_size = size;
        self
    }

    pub fn forecast_horizon(mut self, steps: usize) -> Self {
        self.config.forecast_horizon = steps;
        self
    }

    pub fn confidence_decay(mut self, decay: f64) -> Self {
        self.config.confidence_decay = decay;
        self
    }

    pub fn thresholds(mut self, lower: f64, upper: f64) -> Self {
        self.config.lower_threshold = lower;
        self.config.upper_threshold = upper;
        self
    }

    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.config.min_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn cooldown_seconds(mut self, seconds: u64) -> Self {
        self.config.cooldown_seconds = seconds;
        self
    }

    pub fn instance_bounds(mut self, min: u32, max: u32) -> Self {
        self.config.min_instances = min;
        self.config.max_instances = max;
        self
    }

    pub fn daily_cost_budget(mut self, budget: f64) -> Self {
        self.config.daily_cost_budget = budget;
        self
    }

    pub fn cost_per_instance_hour(mut self, cost: f64) -> Self {
        self.config.cost_per_instance_hour = cost;
        self
    }

    pub fn anomaly_zscore_threshold(mut self, threshold: f64) -> Self {
        self.config.anomaly_zscore_threshold = threshold;
        self
    }

    pub fn anomaly_window(mut self, window: usize) -> Self {
        self.config.anomaly_window = window;
        self
    }

    pub fn anomaly_min_samples(mut self, samples: usize) -> Self {
        self.config.anomaly_min_samples = samples;
        self
    }

    pub fn emergency_step(mut self, step: u32) -> Self {
        self.config.emergency_step = step;
        self
    }

    pub fn load_score_params(mut self, params: LoadScoreParams) -> Self {
        self.config.load_score = params;
        self
    }

    pub fn build(self) -> ScalecastConfig {
        self.config
    }
}
