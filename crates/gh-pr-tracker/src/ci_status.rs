//! Status aggregation
//!
//! Reduces a set of [`CheckSignal`]s for one commit into a single [`CiState`].
//!
//! Only required signals are evaluated. When every signal is optional the
//! whole set is evaluated instead, so a PR whose only checks are, say,
//! failing lint jobs still reads as failing rather than unknown.
//!
//! Reduction priority, first match wins:
//! 1. any of `failure`, `error`, `cancelled`, `timed_out` → `Failure`
//! 2. any of `pending`, `in_progress`, `queued` → `Pending`
//! 3. all of `success`, `neutral`, `skipped` → `Success`
//! 4. otherwise → `Unknown`

use crate::check_rules::CheckRuleTable;
use crate::signals::{collect_signals, CheckSignal};
use gh_client::{CheckRun, CiState, CommitStatus, WorkflowRun};
use serde::{Deserialize, Serialize};

const FAILURE_STATES: &[&str] = &["failure", "error", "cancelled", "timed_out"];
const PENDING_STATES: &[&str] = &["pending", "in_progress", "queued"];
const SUCCESS_STATES: &[&str] = &["success", "neutral", "skipped"];

/// Bucket of a single raw state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Failure,
    Pending,
    Success,
    Other,
}

impl StateClass {
    pub fn of(raw_state: &str) -> Self {
        if FAILURE_STATES.contains(&raw_state) {
            StateClass::Failure
        } else if PENDING_STATES.contains(&raw_state) {
            StateClass::Pending
        } else if SUCCESS_STATES.contains(&raw_state) {
            StateClass::Success
        } else {
            StateClass::Other
        }
    }
}

/// Aggregate the raw API records of one commit
///
/// # Arguments
///
/// * `check_runs` - Check runs for the head commit
/// * `statuses` - Legacy commit statuses for the head commit
/// * `workflow_runs` - Actions workflow runs for the head commit
/// * `rules` - Optional-check rule table
pub fn aggregate(
    check_runs: &[CheckRun],
    statuses: &[CommitStatus],
    workflow_runs: &[WorkflowRun],
    rules: &CheckRuleTable,
) -> CiState {
    aggregate_signals(&collect_signals(check_runs, statuses, workflow_runs, rules))
}

/// Aggregate already normalised signals
pub fn aggregate_signals(signals: &[CheckSignal]) -> CiState {
    reduce_states(evaluated(signals).map(|s| s.raw_state.as_str()))
}

/// Apply the priority rules to a list of raw states
pub fn reduce_states<'a>(states: impl IntoIterator<Item = &'a str>) -> CiState {
    let mut seen_any = false;
    let mut has_pending = false;
    let mut all_success = true;

    for state in states {
        seen_any = true;
        match StateClass::of(state) {
            StateClass::Failure => return CiState::Failure,
            StateClass::Pending => has_pending = true,
            StateClass::Success => {}
            StateClass::Other => all_success = false,
        }
    }

    if !seen_any {
        CiState::Unknown
    } else if has_pending {
        CiState::Pending
    } else if all_success {
        CiState::Success
    } else {
        CiState::Unknown
    }
}

/// Signals that take part in the verdict: required ones, or all of them when
/// none is required
fn evaluated(signals: &[CheckSignal]) -> impl Iterator<Item = &CheckSignal> {
    let any_required = signals.iter().any(|s| s.required);
    signals.iter().filter(move |s| s.required || !any_required)
}

/// Verdict plus per-class counts, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiSummary {
    pub state: CiState,
    /// Signals that took part in the verdict
    pub evaluated: usize,
    /// Signals skipped as optional
    pub optional: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl CiSummary {
    pub fn from_signals(signals: &[CheckSignal]) -> Self {
        let mut summary = CiSummary {
            state: aggregate_signals(signals),
            evaluated: 0,
            optional: 0,
            passed: 0,
            failed: 0,
            pending: 0,
        };

        for signal in evaluated(signals) {
            summary.evaluated += 1;
            match StateClass::of(&signal.raw_state) {
                StateClass::Failure => summary.failed += 1,
                StateClass::Pending => summary.pending += 1,
                StateClass::Success => summary.passed += 1,
                StateClass::Other => {}
            }
        }
        summary.optional = signals.len() - summary.evaluated;
        summary
    }
}
