// src/engine.rs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::anomaly::AnomalyDetector;
use crate::callbacks::{CallbackContext, ScalecastCallbacks};
use crate::decision::DecisionEngine;
use crate::error::{ScalecastError, ScalecastResult};
use crate::forecaster::Forecaster;
use crate::history::MetricHistory;
use crate::types::{
    MetricSample, Prediction, ScalecastConfig, ScalingDecision, ScalingState, Timestamp,
};
use crate::utils::current_timestamp;

/// How many past decisions the engine retains for `decision_history`
const DECISION_HISTORY_CAPACITY: usize = 100;

/// Commands that can be sent to the scalecast engine
#[derive(Debug)]
pub enum EngineCommand {
    /// Push one metric sample into the history
    SubmitSample {
        sample: MetricSample,
        response: tokio::sync::oneshot::Sender<ScalecastResult<()>>,
    },
    /// Most recent scaling decision, if any tick has run
    GetLatestDecision {
        response: tokio::sync::oneshot::Sender<Option<ScalingDecision>>,
    },
    /// The trailing `limit` decisions, oldest first
    GetDecisionHistory {
        limit: usize,
        response: tokio::sync::oneshot::Sender<Vec<ScalingDecision>>,
    },
    /// Current forecast from the latest model and history
    GetLatestPredictions {
        response: tokio::sync::oneshot::Sender<ScalecastResult<Vec<Prediction>>>,
    },
    /// Get current engine status
    GetStatus {
        response: tokio::sync::oneshot::Sender<EngineStatus>,
    },
    /// Shutdown the engine
    Shutdown,
}

/// Status information about the scalecast engine
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub is_running: bool,
    pub samples_ingested: u64,
    pub decisions_made: u64,
    pub current_instances: u32,
    pub last_decision_at: Option<Timestamp>,
}

/// The main scalecast autoscaling engine.
///
/// Owns the metric history, forecaster, anomaly detector, decision engine
/// and scaling state, and runs the two periodic activities (ingestion tick,
/// decision tick) in a single `select!` loop, so a decision tick is never
/// re-entered while a previous one is in flight.
pub struct ScalecastEngine {
    config: ScalecastConfig,
    callbacks: ScalecastCallbacks,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
    command_rx: Option<mpsc::UnboundedReceiver<EngineCommand>>,
    status: Arc<RwLock<EngineStatus>>,
    history: Arc<RwLock<MetricHistory>>,
    forecaster: Arc<RwLock<Forecaster>>,
    anomaly_detector: AnomalyDetector,
    decision_engine: DecisionEngine,
    scaling_state: Arc<RwLock<ScalingState>>,
    decisions: Arc<RwLock<VecDeque<ScalingDecision>>>,
}

impl ScalecastEngine {
    /// Create a new engine. Fails on an invalid configuration.
    pub fn new(
        config: ScalecastConfig,
        callbacks: ScalecastCallbacks,
    ) -> ScalecastResult<Self> {
        config.validate()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Ok(Self {
            callbacks,
            command_tx,
            command_rx: Some(command_rx),
            status: Arc::new(RwLock::new(EngineStatus {
                is_running: false,
                samples_ingested: 0,
                decisions_made: 0,
                current_instances: config.min_instances,
                last_decision_at: None,
            })),
            history: Arc::new(RwLock::new(MetricHistory::new(config.history_capacity))),
            forecaster: Arc::new(RwLock::new(Forecaster::new(&config))),
            anomaly_detector: AnomalyDetector::new(&config),
            decision_engine: DecisionEngine::new(config.clone()),
            scaling_state: Arc::new(RwLock::new(ScalingState::new(config.min_instances))),
            decisions: Arc::new(RwLock::new(VecDeque::with_capacity(
                DECISION_HISTORY_CAPACITY,
            ))),
            config,
        })
    }

    /// Get a handle to send commands to the engine
    pub fn handle(&self) -> ScalecastHandle {
        ScalecastHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Start the engine (consumes self)
    pub async fn start(mut self) -> ScalecastResult<()> {
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| ScalecastError::engine_not_running("Engine already started"))?;

        {
            let mut status = self.status.write().await;
            status.is_running = true;
        }

        info!(
            ingestion_interval_s = self.config.ingestion_interval_s,
            decision_interval_s = self.config.decision_interval_s,
            "scalecast engine starting"
        );

        let mut ingestion_timer = interval(Duration::from_secs(self.config.ingestion_interval_s));
        let mut decision_timer = interval(Duration::from_secs(self.config.decision_interval_s));
        ingestion_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        decision_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Don't decide before the first samples had a chance to arrive
        decision_timer.reset();

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(EngineCommand::Shutdown) => {
                            info!("Shutdown command received");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("Command channel closed, shutting down engine");
                            break;
                        }
                    }
                }

                _ = ingestion_timer.tick() => {
                    if let Err(e) = self.ingestion_tick().await {
                        // Rejected or failed samples never stop ingestion
                        warn!("Ingestion tick error: {}", e);
                    }
                }

                _ = decision_timer.tick() => {
                    self.decision_tick().await;
                }
            }
        }

        {
            let mut status = self.status.write().await;
            status.is_running = false;
        }

        info!("scalecast engine stopped");
        Ok(())
    }

    /// Handle incoming commands
    async fn handle_command(&self, command: EngineCommand) {
        match command {
            EngineCommand::SubmitSample { sample, response } => {
                let result = self.submit_sample(sample).await;
                let _ = response.send(result); // Ignore send errors
            }
            EngineCommand::GetLatestDecision { response } => {
                let latest = self.decisions.read().await.back().cloned();
                let _ = response.send(latest);
            }
            EngineCommand::GetDecisionHistory { limit, response } => {
                let decisions = self.decisions.read().await;
                let skip = decisions.len().saturating_sub(limit);
                let _ = response.send(decisions.iter().skip(skip).cloned().collect());
            }
            EngineCommand::GetLatestPredictions { response } => {
                let _ = response.send(self.current_predictions().await);
            }
            EngineCommand::GetStatus { response } => {
                let status = self.status.read().await.clone();
                let _ = response.send(status);
            }
            EngineCommand::Shutdown => unreachable!("handled in the engine loop"),
        }
    }

    /// Validate and append one sample. Rejected samples are dropped.
    async fn submit_sample(&self, sample: MetricSample) -> ScalecastResult<()> {
        if let Err(e) = sample.validate() {
            warn!("Rejected sample: {}", e);
            return Err(e);
        }

        debug!(
            timestamp = sample.timestamp,
            load_score = sample.load_score,
            "sample accepted"
        );
        self.history.write().await.push(sample);
        self.status.write().await.samples_ingested += 1;
        Ok(())
    }

    /// Pull one sample from the metric source callback
    async fn ingestion_tick(&self) -> ScalecastResult<()> {
        let context = self.context();
        match self.callbacks.metric_source.collect(&context).await? {
            Some(sample) => self.submit_sample(sample).await,
            None => Ok(()),
        }
    }

    /// Forecast from the current model and history snapshot
    async fn current_predictions(&self) -> ScalecastResult<Vec<Prediction>> {
        let snapshot = self.history.read().await.clone();
        self.forecaster.read().await.forecast(&snapshot)
    }

    /// One decision tick: retrain if due, forecast, check for anomalies,
    /// decide, then hand any accepted action to the capacity controller.
    async fn decision_tick(&self) {
        let now = current_timestamp();
        // Consistent view for this whole tick
        let snapshot = self.history.read().await.clone();
        let samples_ingested = self.status.read().await.samples_ingested;

        // Retraining failure keeps the previous model; the tick proceeds
        {
            let mut forecaster = self.forecaster.write().await;
            if let Err(e) = forecaster.maybe_train(&snapshot, samples_ingested) {
                warn!("Retraining failed: {}", e);
            }
        }

        let predictions = match self.forecaster.read().await.forecast(&snapshot) {
            Ok(p) => Some(p),
            Err(e) if e.is_cold_start() => None,
            Err(e) => {
                error!("Forecast error: {}", e);
                None
            }
        };
        let anomaly = self.anomaly_detector.evaluate(&snapshot);

        let decision = {
            let mut state = self.scaling_state.write().await;
            self.decision_engine
                .decide(now, predictions.as_deref(), anomaly, &mut state)
        };

        {
            let mut decisions = self.decisions.write().await;
            if decisions.len() == DECISION_HISTORY_CAPACITY {
                decisions.pop_front();
            }
            decisions.push_back(decision.clone());
        }
        {
            let mut status = self.status.write().await;
            status.decisions_made += 1;
            status.last_decision_at = Some(now);
            status.current_instances = decision.target_instances;
        }

        self.dispatch_decision(decision).await;
    }

    /// Notify observers and apply actionable decisions, outside the core's
    /// state mutation
    async fn dispatch_decision(&self, decision: ScalingDecision) {
        let context = self.context();

        for observer in &self.callbacks.observers {
            if let Err(e) = observer.on_decision(&decision, &context).await {
                warn!("Observer error on decision: {}", e);
            }
        }

        if !decision.is_actionable() {
            debug!(reason = %decision.reason, "no scaling action needed");
            return;
        }

        let is_safe = match self
            .callbacks
            .capacity_controller
            .is_safe_to_apply(&decision, &context)
            .await
        {
            Ok(safe) => safe,
            Err(e) => {
                error!("Safety check failed: {}", e);
                false
            }
        };

        if !is_safe {
            for observer in &self.callbacks.observers {
                if let Err(e) = observer
                    .on_decision_skipped(&decision, "Safety check failed", &context)
                    .await
                {
                    warn!("Observer error on decision skipped: {}", e);
                }
            }
            return;
        }

        match self
            .callbacks
            .capacity_controller
            .apply_decision(&decision, &context)
            .await
        {
            Ok(applied) => {
                if applied {
                    info!(
                        target = decision.target_instances,
                        reason = %decision.reason,
                        "scaling decision applied"
                    );
                }
                for observer in &self.callbacks.observers {
                    if let Err(e) = observer
                        .on_decision_applied(&decision, applied, &context)
                        .await
                    {
                        warn!("Observer error on decision applied: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("Failed to apply scaling decision: {}", e);
                for observer in &self.callbacks.observers {
                    if let Err(err) = observer.on_decision_error(&decision, &e, &context).await {
                        warn!("Observer error on decision error: {}", err);
                    }
                }
            }
        }
    }

    fn context(&self) -> CallbackContext {
        CallbackContext {
            timestamp: current_timestamp(),
            metadata: HashMap::new(),
        }
    }
}

/// Handle for interacting with a running scalecast engine
#[derive(Clone)]
pub struct ScalecastHandle {
    command_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl ScalecastHandle {
    /// Submit a sample. Returns `InvalidSample` when the sample is rejected.
    pub async fn submit(&self, sample: MetricSample) -> ScalecastResult<()> {
        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        self.command_tx.send(EngineCommand::SubmitSample {
            sample,
            response: response_tx,
        })?;
        response_rx.await?
    }

    /// Most recent scaling decision, if any
    pub async fn latest_decision(&self) -> ScalecastResult<Option<ScalingDecision>> {
        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        self.command_tx.send(EngineCommand::GetLatestDecision {
            response: response_tx,
        })?;
        Ok(response_rx.await?)
    }

    /// The trailing `limit` decisions, oldest first
    pub async fn decision_history(&self, limit: usize) -> ScalecastResult<Vec<ScalingDecision>> {
        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        self.command_tx.send(EngineCommand::GetDecisionHistory {
            limit,
            response: response_tx,
        })?;
        Ok(response_rx.await?)
    }

    /// Current forecast, or `NotReady` before the first model is trained
    pub async fn latest_predictions(&self) -> ScalecastResult<Vec<Prediction>> {
        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        self.command_tx.send(EngineCommand::GetLatestPredictions {
            response: response_tx,
        })?;
        response_rx.await?
    }

    /// Get current engine status
    pub async fn status(&self) -> ScalecastResult<EngineStatus> {
        let (response_tx, response_rx) = tokio::sync::oneshot::channel();
        self.command_tx.send(EngineCommand::GetStatus {
            response: response_tx,
        })?;
        Ok(response_rx.await?)
    }

    /// Shutdown the engine
    pub async fn shutdown(&self) -> ScalecastResult<()> {
        self.command_tx.send(EngineCommand::Shutdown)?;
        Ok(())
    }
}
