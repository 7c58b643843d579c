// src/callbacks.rs

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::ScalecastResult;
use crate::types::{MetricSample, ScalingDecision};

/// Context provided to callbacks with additional information
#[derive(Debug, Clone)]
pub struct CallbackContext {
    /// Current timestamp when callback is invoked
    pub timestamp: u64,
    /// Any additional metadata from the engine
    pub metadata: HashMap<String, String>,
}

/// Trait for supplying metric samples to the engine's ingestion tick
///
/// Implement this to integrate with whatever actually measures the resource
/// (OS sampling, an agent, a monitoring API). The engine pulls one sample
/// per ingestion tick; samples can also be pushed through the handle.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Collect the current sample for the monitored resource
    ///
    /// # Returns
    /// * `Ok(Some(sample))` - Successfully collected a sample
    /// * `Ok(None)` - No sample available right now (skipped, not an error)
    /// * `Err(error)` - Collection failed
    async fn collect(&self, context: &CallbackContext) -> ScalecastResult<Option<MetricSample>>;
}

/// Trait for applying scaling decisions to real capacity
///
/// Implement this to integrate with your infrastructure (K8s, a cloud ASG,
/// a process pool). The engine calls it after the core has emitted a
/// non-no_op decision, outside the core's critical section.
#[async_trait]
pub trait CapacityController: Send + Sync {
    /// Apply a scaling decision
    ///
    /// # Returns
    /// * `Ok(true)` - Capacity was changed
    /// * `Ok(false)` - Decision was skipped (e.g., already at target)
    /// * `Err(error)` - Provisioning failed
    async fn apply_decision(
        &self,
        decision: &ScalingDecision,
        context: &CallbackContext,
    ) -> ScalecastResult<bool>;

    /// Check whether a decision is safe to apply right now
    ///
    /// Use this for maintenance windows or other business rules.
    async fn is_safe_to_apply(
        &self,
        _decision: &ScalingDecision,
        _context: &CallbackContext,
    ) -> ScalecastResult<bool> {
        // Default implementation: all decisions are safe
        Ok(true)
    }

    /// Report the real provisioned capacity, if known
    async fn current_capacity(&self, _context: &CallbackContext) -> ScalecastResult<Option<u32>> {
        // Default implementation: unknown capacity
        Ok(None)
    }
}

/// Trait for receiving decision events
///
/// Implement this to get notified about decisions as they happen.
/// Useful for logging, alerting, or dashboards.
#[async_trait]
pub trait DecisionObserver: Send + Sync {
    /// Called for every decision the engine makes, no_op included
    async fn on_decision(
        &self,
        _decision: &ScalingDecision,
        _context: &CallbackContext,
    ) -> ScalecastResult<()> {
        Ok(())
    }

    /// Called after a non-no_op decision was handed to the controller
    async fn on_decision_applied(
        &self,
        _decision: &ScalingDecision,
        _applied: bool,
        _context: &CallbackContext,
    ) -> ScalecastResult<()> {
        Ok(())
    }

    /// Called when a decision was not applied (e.g., safety check failed)
    async fn on_decision_skipped(
        &self,
        _decision: &ScalingDecision,
        _reason: &str,
        _context: &CallbackContext,
    ) -> ScalecastResult<()> {
        Ok(())
    }

    /// Called when applying a decision failed
    async fn on_decision_error(
        &self,
        _decision: &ScalingDecision,
        _error: &crate::error::ScalecastError,
        _context: &CallbackContext,
    ) -> ScalecastResult<()> {
        Ok(())
    }
}

/// Combine all callbacks into a single struct for easier management
#[derive(Clone)]
pub struct ScalecastCallbacks {
    pub metric_source: std::sync::Arc<dyn MetricSource>,
    pub capacity_controller: std::sync::Arc<dyn CapacityController>,
    pub observers: Vec<std::sync::Arc<dyn DecisionObserver>>,
}

impl ScalecastCallbacks {
    /// Create a new callback configuration
    pub fn new(
        metric_source: std::sync::Arc<dyn MetricSource>,
        capacity_controller: std::sync::Arc<dyn CapacityController>,
    ) -> Self {
        Self {
            metric_source,
            capacity_controller,
            observers: Vec::new(),
        }
    }

    /// Add an observer to receive decision events
    pub fn add_observer(mut self, observer: std::sync::Arc<dyn DecisionObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}
