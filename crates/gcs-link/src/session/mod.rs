//! Parameter download and set/confirm session
//!
//! Tracks the full-list download progress and at most one outstanding
//! parameter-set expectation. Completion is always computed from
//! `received == total && total > 0`; the far end never flags it.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use gcs_core::{ParamKind, Parameter, ParameterList, ParameterProgress};
use tokio::sync::oneshot;
use tracing::debug;

use crate::codec::messages::ParamValue;

/// Confirmation window for a single parameter set
pub const SET_CONFIRM_TIMEOUT: Duration = Duration::from_millis(1000);

/// Resolution of a parameter-set expectation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetReply {
    /// Echo matched the expectation; carries the confirmed value
    Confirmed(f32),
    /// Echo arrived but disagreed; carries the observed value
    Mismatch(f32),
}

struct PendingSet {
    name: String,
    expected: f32,
    issued_at: Instant,
    reply: oneshot::Sender<SetReply>,
}

/// Bookkeeping for the two parameter protocols
#[derive(Default)]
pub struct ParameterSession {
    registry: BTreeMap<String, Parameter>,
    total: u16,
    cancelled: bool,
    pending: Option<PendingSet>,
}

impl ParameterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the registry and counters for a fresh download.
    pub fn begin_download(&mut self) {
        self.registry.clear();
        self.total = 0;
        self.cancelled = false;
    }

    /// Force-mark completion. Already-received values are kept and the
    /// transport is untouched.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether progress should still be reported to subscribers.
    pub fn reporting(&self) -> bool {
        !self.cancelled
    }

    /// Merge one inbound parameter-value frame. Returns the reply that
    /// resolved a pending set expectation, if any.
    pub fn apply_value(&mut self, pv: &ParamValue) -> Option<SetReply> {
        if pv.count > 0 && self.total == 0 {
            // Latch the declared total from the first counted value.
            self.total = pv.count;
        }
        self.registry.insert(
            pv.name.clone(),
            Parameter {
                name: pv.name.clone(),
                value: pv.value,
                kind: ParamKind::from_type_tag(pv.param_type),
                index: pv.index,
                total_count: pv.count,
            },
        );

        let resolved = match &self.pending {
            Some(p) if p.name == pv.name => {
                let reply = if values_match(p.expected, pv.value) {
                    SetReply::Confirmed(pv.value)
                } else {
                    SetReply::Mismatch(pv.value)
                };
                debug!(
                    name = %pv.name,
                    value = pv.value,
                    elapsed_ms = p.issued_at.elapsed().as_millis() as u64,
                    "Parameter set echo received"
                );
                Some(reply)
            }
            _ => None,
        };
        if let Some(reply) = resolved {
            if let Some(p) = self.pending.take() {
                let _ = p.reply.send(reply);
            }
        }
        resolved
    }

    /// Record a new set expectation. A previously outstanding one is
    /// superseded: its waiter resolves as a failure when the sender
    /// drops here.
    pub fn register_set(&mut self, name: String, expected: f32) -> oneshot::Receiver<SetReply> {
        let (tx, rx) = oneshot::channel();
        self.pending = Some(PendingSet {
            name,
            expected,
            issued_at: Instant::now(),
            reply: tx,
        });
        rx
    }

    /// Drop the expectation for `name` after its wait elapsed.
    pub fn clear_expired_set(&mut self, name: &str) {
        if self.pending.as_ref().is_some_and(|p| p.name == name) {
            self.pending = None;
        }
    }

    /// Fail any outstanding expectation (session teardown).
    pub fn fail_pending(&mut self) {
        self.pending = None;
    }

    /// Full reset at connect/disconnect.
    pub fn reset(&mut self) {
        self.begin_download();
        self.fail_pending();
    }

    pub fn received(&self) -> usize {
        self.registry.len()
    }

    pub fn total(&self) -> u16 {
        self.total
    }

    pub fn complete(&self) -> bool {
        self.cancelled || (self.total > 0 && self.registry.len() == self.total as usize)
    }

    pub fn progress(&self) -> ParameterProgress {
        ParameterProgress::new(self.total, self.received(), self.complete())
    }

    pub fn list(&self) -> ParameterList {
        ParameterList {
            parameters: self.registry.values().cloned().collect(),
            total: self.total,
            received: self.received(),
            complete: self.complete(),
        }
    }
}

/// Comparison policy for set confirmation: integral expectations compare
/// as rounded integers, fractional ones with 0.01 absolute tolerance.
pub fn values_match(expected: f32, actual: f32) -> bool {
    if expected.fract() == 0.0 {
        expected.round() as i64 == actual.round() as i64
    } else {
        (actual - expected).abs() < 0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(name: &str, value: f32, count: u16, index: u16) -> ParamValue {
        ParamValue {
            value,
            count,
            index,
            name: name.to_string(),
            param_type: 9,
        }
    }

    #[test]
    fn total_latches_from_first_counted_value() {
        let mut session = ParameterSession::new();
        session.begin_download();
        session.apply_value(&value("A", 1.0, 3, 0));
        session.apply_value(&value("B", 2.0, 7, 1)); // later totals ignored
        assert_eq!(session.total(), 3);
    }

    #[test]
    fn complete_iff_received_equals_nonzero_total() {
        let mut session = ParameterSession::new();
        session.begin_download();
        assert!(!session.complete());

        session.apply_value(&value("A", 1.0, 2, 0));
        assert!(!session.complete());
        session.apply_value(&value("B", 2.0, 2, 1));
        assert!(session.complete());

        // Duplicate names do not inflate the received count.
        session.apply_value(&value("B", 3.0, 2, 1));
        assert_eq!(session.received(), 2);
        assert!(session.complete());
    }

    #[test]
    fn cancel_keeps_values_and_stops_reporting() {
        let mut session = ParameterSession::new();
        session.begin_download();
        session.apply_value(&value("A", 1.0, 10, 0));
        session.cancel();
        assert!(session.complete());
        assert!(!session.reporting());
        assert_eq!(session.list().parameters.len(), 1);
    }

    #[test]
    fn restart_clears_registry() {
        let mut session = ParameterSession::new();
        session.apply_value(&value("A", 1.0, 2, 0));
        session.begin_download();
        assert_eq!(session.received(), 0);
        assert_eq!(session.total(), 0);
    }

    #[test]
    fn matching_echo_confirms() {
        let mut session = ParameterSession::new();
        let mut rx = session.register_set("FOO".to_string(), 5.0);
        let reply = session.apply_value(&value("FOO", 5.0, 0, 0));
        assert_eq!(reply, Some(SetReply::Confirmed(5.0)));
        assert_eq!(rx.try_recv().unwrap(), SetReply::Confirmed(5.0));
    }

    #[test]
    fn mismatching_echo_reports_observed_value() {
        let mut session = ParameterSession::new();
        let mut rx = session.register_set("FOO".to_string(), 5.0);
        let reply = session.apply_value(&value("FOO", 7.0, 0, 0));
        assert_eq!(reply, Some(SetReply::Mismatch(7.0)));
        assert_eq!(rx.try_recv().unwrap(), SetReply::Mismatch(7.0));
    }

    #[test]
    fn echo_for_other_name_leaves_expectation_pending() {
        let mut session = ParameterSession::new();
        let mut rx = session.register_set("FOO".to_string(), 5.0);
        assert_eq!(session.apply_value(&value("BAR", 5.0, 0, 0)), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn new_set_supersedes_previous_expectation() {
        let mut session = ParameterSession::new();
        let mut first = session.register_set("FOO".to_string(), 5.0);
        let _second = session.register_set("BAR".to_string(), 1.0);
        // Superseded waiter resolves as closed rather than hanging.
        assert!(matches!(
            first.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn comparison_policy_integral_vs_fractional() {
        assert!(values_match(5.0, 5.0));
        assert!(values_match(5.0, 5.4)); // rounds to 5
        assert!(!values_match(5.0, 7.0));
        assert!(values_match(0.5, 0.505));
        assert!(!values_match(0.5, 0.52));
    }
}
