//! Scaling decision state machine.
//!
//! Two states: Idle (may act) and Cooldown (rejects action until the window
//! elapses). Each tick combines the forecast, the anomaly signal, the
//! current scaling state, and the cost budget into exactly one decision.
//! The reactive anomaly path bypasses the confidence gate; the predictive
//! path only considers forecast steps that meet it. Scale-up is evaluated
//! before scale-down, biasing toward availability when both could trigger.

use tracing::{debug, info};

use crate::anomaly::AnomalySignal;
use crate::types::{
    DecisionReason, Prediction, ScaleAction, ScalecastConfig, ScalingDecision, ScalingState,
    Timestamp,
};

/// Combines forecaster and anomaly output with scaling state and cost
/// constraints into a single decision per tick
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: ScalecastConfig,
}

impl DecisionEngine {
    pub fn new(config: ScalecastConfig) -> Self {
        Self { config }
    }

    /// Projected daily cost of running `instances`
    pub fn estimated_daily_cost(&self, instances: u32) -> f64 {
        instances as f64 * self.config.cost_per_instance_hour * 24.0
    }

    /// Make one scaling decision and apply its state transition.
    ///
    /// `predictions` is `None` when the forecaster has no model yet ("no
    /// information", which never maps to a scaling action on its own).
    /// The state update is all-or-nothing: `state` is only touched at the
    /// very end, for accepted (non-no_op) decisions.
    pub fn decide(
        &self,
        now: Timestamp,
        predictions: Option<&[Prediction]>,
        anomaly: AnomalySignal,
        state: &mut ScalingState,
    ) -> ScalingDecision {
        let current = state.current_instances;

        // 1. Cooldown window rejects everything
        if state.in_cooldown(now) {
            debug!(cooldown_until = ?state.cooldown_until, "decision suppressed by cooldown");
            return self.no_op(now, current, DecisionReason::Cooldown);
        }

        let (mut action, mut target, mut reason) = self.propose(predictions, anomaly, current);

        // 7. Cost gate: clamp the target to the daily budget, never below
        // the configured minimum
        let mut estimated_cost = self.estimated_daily_cost(target);
        if action != ScaleAction::NoOp && estimated_cost > self.config.daily_cost_budget {
            let affordable = (self.config.daily_cost_budget
                / (self.config.cost_per_instance_hour * 24.0))
                .floor() as u32;
            let clamped = affordable.clamp(self.config.min_instances, self.config.max_instances);
            debug!(target, clamped, "cost gate clamped scaling target");
            target = clamped;
            estimated_cost = self.estimated_daily_cost(target);
            if target == current && action != ScaleAction::NoOp {
                action = ScaleAction::NoOp;
                reason = DecisionReason::CostCapped;
            }
        }

        // A proposal clamped into a no-change is not an action
        if target == current && action != ScaleAction::NoOp {
            action = ScaleAction::NoOp;
        }
        // Direction always reflects the final target
        if action != ScaleAction::NoOp {
            action = if target > current {
                ScaleAction::ScaleUp
            } else {
                ScaleAction::ScaleDown
            };
        } else {
            target = current;
        }

        let decision = ScalingDecision {
            action,
            target_instances: target,
            reason,
            estimated_cost,
            timestamp: now,
        };

        // 8. Accepted actions transition to Cooldown and move capacity,
        // atomically from the caller's point of view
        if decision.is_actionable() {
            state.current_instances = target;
            state.last_action_time = Some(now);
            state.cooldown_until = Some(now + self.config.cooldown_seconds);
            info!(
                action = ?decision.action,
                target,
                reason = %decision.reason,
                "scaling decision accepted"
            );
        }

        decision
    }

    /// Steps 2-6: propose an action before the cost gate
    fn propose(
        &self,
        predictions: Option<&[Prediction]>,
        anomaly: AnomalySignal,
        current: u32,
    ) -> (ScaleAction, u32, DecisionReason) {
        // 2. Reactive path: anomaly severity wins over forecast confidence
        if let AnomalySignal::Anomaly { severity, .. } = anomaly {
            debug!(severity, "anomaly detected, taking reactive path");
            let target = current
                .saturating_add(self.config.emergency_step)
                .min(self.config.max_instances);
            return (ScaleAction::ScaleUp, target, DecisionReason::Anomaly);
        }

        // 3. Predictive path: no model means no information, not zero load
        let Some(predictions) = predictions else {
            return (ScaleAction::NoOp, current, DecisionReason::ModelUnavailable);
        };

        let qualifying = predictions
            .iter()
            .filter(|p| p.confidence >= self.config.min_confidence)
            .map(|p| p.predicted_load)
            .fold(None::<f64>, |acc, load| {
                Some(acc.map_or(load, |m| m.max(load)))
            });

        let Some(max_load) = qualifying else {
            return (ScaleAction::NoOp, current, DecisionReason::LowConfidence);
        };

        // 4. Scale-up first: availability beats cost when both would trigger
        if max_load > self.config.upper_threshold {
            let excess = max_load - self.config.upper_threshold;
            let step = 1 + (excess / 10.0).floor() as u32;
            let target = current
                .saturating_add(step)
                .min(self.config.max_instances);
            return (ScaleAction::ScaleUp, target, DecisionReason::HighLoadForecast);
        }

        // 5. Scale-down by one, floored at the minimum
        if max_load < self.config.lower_threshold {
            let target = current
                .saturating_sub(1)
                .max(self.config.min_instances);
            return (ScaleAction::ScaleDown, target, DecisionReason::LowLoadForecast);
        }

        // 6. Forecast stays between the thresholds
        (ScaleAction::NoOp, current, DecisionReason::WithinBounds)
    }

    fn no_op(&self, now: Timestamp, current: u32, reason: DecisionReason) -> ScalingDecision {
        ScalingDecision {
            action: ScaleAction::NoOp,
            target_instances: current,
            reason,
            estimated_cost: self.estimated_daily_cost(current),
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: ScalecastConfig) -> DecisionEngine {
        DecisionEngine::new(config)
    }

    fn prediction(step: usize, load: f64, confidence: f64) -> Prediction {
        Prediction {
            horizon_step: step,
            predicted_load: load,
            confidence,
        }
    }

    #[test]
    fn cooldown_rejects_qualifying_scale_down() {
        let config = ScalecastConfig::default();
        let engine = engine(config);
        let mut state = ScalingState::new(3);

        // Scale-up accepted at t=0
        let up = engine.decide(
            0,
            Some(&[prediction(1, 90.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(up.action, ScaleAction::ScaleUp);

        // Qualifying scale-down at t=120 lands inside the 300s window
        let down = engine.decide(
            120,
            Some(&[prediction(1, 10.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(down.action, ScaleAction::NoOp);
        assert_eq!(down.reason, DecisionReason::Cooldown);

        // After the window elapses the same condition acts
        let later = engine.decide(
            400,
            Some(&[prediction(1, 10.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(later.action, ScaleAction::ScaleDown);
    }

    #[test]
    fn anomaly_bypasses_confidence_gate() {
        let engine = engine(ScalecastConfig::default());
        let mut state = ScalingState::new(2);

        // Forecast confidence is below the gate, but the anomaly path
        // does not consult it
        let decision = engine.decide(
            1000,
            Some(&[prediction(1, 50.0, 0.1)]),
            AnomalySignal::Anomaly {
                z_score: 3.4,
                severity: 3.4,
            },
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::ScaleUp);
        assert_eq!(decision.reason, DecisionReason::Anomaly);
        assert_eq!(decision.target_instances, 3);
        assert_eq!(state.current_instances, 3);
    }

    #[test]
    fn no_model_is_no_information() {
        let engine = engine(ScalecastConfig::default());
        let mut state = ScalingState::new(2);
        let decision = engine.decide(1000, None, AnomalySignal::NotReady, &mut state);
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(decision.reason, DecisionReason::ModelUnavailable);
        assert_eq!(state.current_instances, 2);
    }

    #[test]
    fn low_confidence_steps_do_not_qualify() {
        let engine = engine(ScalecastConfig::default());
        let mut state = ScalingState::new(2);
        let decision = engine.decide(
            1000,
            Some(&[prediction(1, 95.0, 0.5), prediction(2, 97.0, 0.4)]),
            AnomalySignal::Normal { z_score: 0.3 },
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(decision.reason, DecisionReason::LowConfidence);
    }

    #[test]
    fn proactive_step_scales_with_threshold_excess() {
        let engine = engine(ScalecastConfig::default());

        // 5% over: one instance
        let mut state = ScalingState::new(2);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 85.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.target_instances, 3);

        // 15% over: two instances
        let mut state = ScalingState::new(2);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 95.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.target_instances, 4);
    }

    #[test]
    fn targets_stay_within_instance_bounds() {
        let config = ScalecastConfig::builder().instance_bounds(1, 3).build();
        let engine = engine(config);

        // Scale-up capped at the maximum
        let mut state = ScalingState::new(3);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 99.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(state.current_instances, 3);

        // Scale-down floored at the minimum
        let mut state = ScalingState::new(1);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 5.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(state.current_instances, 1);
    }

    #[test]
    fn scale_up_wins_when_both_conditions_appear() {
        let engine = engine(ScalecastConfig::default());
        let mut state = ScalingState::new(2);
        // One qualifying step above the upper threshold, one below the lower
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 10.0, 0.9), prediction(2, 90.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::ScaleUp);
    }

    #[test]
    fn cost_gate_clamps_and_downgrades() {
        // Budget only covers 4 instances at $0.10/h ($9.60/day)
        let config = ScalecastConfig::builder().daily_cost_budget(9.6).build();
        let engine = engine(config);

        // From 3, a big forecast wants 3 + step, but the clamp allows 4
        let mut state = ScalingState::new(3);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 99.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::ScaleUp);
        assert_eq!(decision.target_instances, 4);
        assert!(decision.estimated_cost <= 9.6);

        // From 4, the clamped target equals current: downgraded to no_op
        let mut state = ScalingState::new(4);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 99.0, 0.9)]),
            AnomalySignal::NotReady,
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(decision.reason, DecisionReason::CostCapped);
        assert_eq!(state.current_instances, 4);
        assert!(state.cooldown_until.is_none());
    }

    #[test]
    fn within_bounds_is_no_op() {
        let engine = engine(ScalecastConfig::default());
        let mut state = ScalingState::new(2);
        let decision = engine.decide(
            0,
            Some(&[prediction(1, 55.0, 0.9)]),
            AnomalySignal::Normal { z_score: 0.1 },
            &mut state,
        );
        assert_eq!(decision.action, ScaleAction::NoOp);
        assert_eq!(decision.reason, DecisionReason::WithinBounds);
        assert!(state.cooldown_until.is_none());
    }

    #[test]
    fn non_noop_decisions_respect_cooldown_spacing() {
        let config = ScalecastConfig::default();
        let cooldown = config.cooldown_seconds;
        let engine = engine(config);
        let mut state = ScalingState::new(1);

        let mut accepted: Vec<Timestamp> = Vec::new();
        for tick in 0..20u64 {
            let now = tick * 60;
            let decision = engine.decide(
                now,
                Some(&[prediction(1, 90.0, 0.9)]),
                AnomalySignal::NotReady,
                &mut state,
            );
            if decision.is_actionable() {
                accepted.push(decision.timestamp);
            }
            assert!(state.current_instances >= 1 && state.current_instances <= 10);
        }

        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= cooldown);
        }
    }
}
