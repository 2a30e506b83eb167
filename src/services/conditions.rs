//! Runtime conditions evaluated inside the application under test.
//!
//! A [`Condition`] decides, per tuple or per time tick, whether its success
//! criterion currently holds. [`ActiveCondition`] owns the bookkeeping shared
//! by every variant: the persisted [`ConditionState`], the metric triple
//! published to a [`MetricsSink`], and fail-fast behaviour in standalone
//! runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConditionMetricKind, ConditionState, ExecutionMode, Verdict};
use crate::domain::ports::MetricsSink;

/// Default period between ticks of time-driven conditions.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// A success criterion for one point of a stream.
pub trait Condition: Send + Sync {
    /// Prefix used when the tester names the condition automatically.
    fn kind(&self) -> &'static str;

    /// Whether the condition holds before any tuple arrives.
    fn starts_valid(&self) -> bool {
        false
    }

    /// Evaluate one tuple.
    fn observe(&mut self, tuple: &Value) -> Verdict;

    /// Evaluate a time tick. `None` for conditions that ignore time.
    fn tick(&mut self, _elapsed: Duration) -> Option<Verdict> {
        None
    }

    /// Human readable summary of expected vs observed.
    fn describe(&self) -> String;

    /// Accumulated state to carry through a checkpoint.
    fn save(&self) -> Value {
        Value::Null
    }

    /// Restore state produced by [`Condition::save`]. `Null` leaves the
    /// condition untouched.
    fn restore(&mut self, _saved: &Value) -> DomainResult<()> {
        Ok(())
    }
}

fn restore_from<T: DeserializeOwned>(saved: &Value) -> DomainResult<Option<T>> {
    if saved.is_null() {
        return Ok(None);
    }
    Ok(Some(T::deserialize(saved)?))
}

#[derive(Deserialize)]
struct CountProgress {
    count: u64,
}

impl fmt::Debug for dyn Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Exactly `target` tuples.
#[derive(Debug, Clone)]
pub struct ExactCount {
    target: u64,
    count: u64,
}

impl ExactCount {
    pub fn new(target: u64) -> Self {
        Self { target, count: 0 }
    }
}

impl Condition for ExactCount {
    fn kind(&self) -> &'static str {
        "ExactCount"
    }

    fn starts_valid(&self) -> bool {
        self.target == 0
    }

    fn observe(&mut self, _tuple: &Value) -> Verdict {
        self.count += 1;
        if self.count > self.target {
            Verdict::Fail
        } else {
            Verdict::from_valid(self.count == self.target)
        }
    }

    fn describe(&self) -> String {
        format!(
            "Exact tuple count: expected:{} received:{}",
            self.target, self.count
        )
    }

    fn save(&self) -> Value {
        json!({ "count": self.count })
    }

    fn restore(&mut self, saved: &Value) -> DomainResult<()> {
        if let Some(CountProgress { count }) = restore_from(saved)? {
            self.count = count;
        }
        Ok(())
    }
}

/// At least `target` tuples.
#[derive(Debug, Clone)]
pub struct AtLeastCount {
    target: u64,
    count: u64,
}

impl AtLeastCount {
    pub fn new(target: u64) -> Self {
        Self { target, count: 0 }
    }
}

impl Condition for AtLeastCount {
    fn kind(&self) -> &'static str {
        "AtLeastCount"
    }

    fn starts_valid(&self) -> bool {
        self.target == 0
    }

    fn observe(&mut self, _tuple: &Value) -> Verdict {
        self.count += 1;
        Verdict::from_valid(self.count >= self.target)
    }

    fn describe(&self) -> String {
        format!(
            "At least tuple count: expected:{} received:{}",
            self.target, self.count
        )
    }

    fn save(&self) -> Value {
        json!({ "count": self.count })
    }

    fn restore(&mut self, saved: &Value) -> DomainResult<()> {
        if let Some(CountProgress { count }) = restore_from(saved)? {
            self.count = count;
        }
        Ok(())
    }
}

/// The stream carries exactly `expected`, in order or as a multiset.
#[derive(Debug, Clone)]
pub struct StreamContents {
    expected: Vec<Value>,
    received: Vec<Value>,
    ordered: bool,
}

impl StreamContents {
    pub fn ordered(expected: Vec<Value>) -> Self {
        Self {
            expected,
            received: Vec::new(),
            ordered: true,
        }
    }

    pub fn unordered(expected: Vec<Value>) -> Self {
        Self {
            ordered: false,
            ..Self::ordered(expected)
        }
    }

    fn mismatch(&self) -> bool {
        if self.ordered {
            let last = self.received.len() - 1;
            self.received[last] != self.expected[last]
        } else {
            self.received.len() == self.expected.len()
                && multiset(&self.expected) != multiset(&self.received)
        }
    }
}

/// Occurrence count per distinct value.
///
/// `serde_json` maps keep their keys sorted, so equal values serialize to
/// the same string.
fn multiset(values: &[Value]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

impl Condition for StreamContents {
    fn kind(&self) -> &'static str {
        if self.ordered {
            "StreamContents"
        } else {
            "UnorderedStreamContents"
        }
    }

    fn starts_valid(&self) -> bool {
        self.expected.is_empty()
    }

    fn observe(&mut self, tuple: &Value) -> Verdict {
        self.received.push(tuple.clone());
        if self.received.len() > self.expected.len() || self.mismatch() {
            return Verdict::Fail;
        }
        Verdict::from_valid(self.received.len() == self.expected.len())
    }

    fn describe(&self) -> String {
        format!(
            "{}: expected:{} received:{}",
            if self.ordered {
                "Stream contents"
            } else {
                "Unordered stream contents"
            },
            Value::Array(self.expected.clone()),
            Value::Array(self.received.clone())
        )
    }

    fn save(&self) -> Value {
        json!({ "received": self.received })
    }

    fn restore(&mut self, saved: &Value) -> DomainResult<()> {
        #[derive(Deserialize)]
        struct ContentsProgress {
            received: Vec<Value>,
        }

        if let Some(ContentsProgress { received }) = restore_from(saved)? {
            self.received = received;
        }
        Ok(())
    }
}

/// Predicate applied to tuples by [`TupleCheck`].
pub type TuplePredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Every tuple satisfies a predicate.
pub struct TupleCheck {
    predicate: TuplePredicate,
    checked: u64,
}

impl TupleCheck {
    pub fn new(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            checked: 0,
        }
    }
}

impl Condition for TupleCheck {
    fn kind(&self) -> &'static str {
        "TupleCheck"
    }

    fn observe(&mut self, tuple: &Value) -> Verdict {
        self.checked += 1;
        if (self.predicate)(tuple) {
            Verdict::Valid
        } else {
            Verdict::Fail
        }
    }

    fn describe(&self) -> String {
        format!("Tuple checker: checked:{}", self.checked)
    }

    fn save(&self) -> Value {
        json!({ "checked": self.checked })
    }

    fn restore(&mut self, saved: &Value) -> DomainResult<()> {
        #[derive(Deserialize)]
        struct CheckProgress {
            checked: u64,
        }

        if let Some(CheckProgress { checked }) = restore_from(saved)? {
            self.checked = checked;
        }
        Ok(())
    }
}

/// The application keeps running for at least `duration`.
#[derive(Debug, Clone)]
pub struct RunFor {
    duration: Duration,
}

impl RunFor {
    pub const NAME: &'static str = "TestRunTime";

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Condition for RunFor {
    fn kind(&self) -> &'static str {
        Self::NAME
    }

    fn starts_valid(&self) -> bool {
        self.duration.is_zero()
    }

    fn observe(&mut self, _tuple: &Value) -> Verdict {
        Verdict::NotValid
    }

    fn tick(&mut self, elapsed: Duration) -> Option<Verdict> {
        Some(Verdict::from_valid(elapsed >= self.duration))
    }

    fn describe(&self) -> String {
        format!("Run time: {:?}", self.duration)
    }
}

/// A condition attached to a running job.
///
/// Every evaluation increments `seq` by exactly one and publishes the full
/// metric triple. Once failed, the condition stays failed and reads invalid.
pub struct ActiveCondition {
    condition: Box<dyn Condition>,
    state: ConditionState,
    sink: Arc<dyn MetricsSink>,
    mode: ExecutionMode,
}

impl fmt::Debug for ActiveCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveCondition")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ActiveCondition {
    /// Register the metric triple and apply the initial validity.
    pub fn activate(
        name: impl Into<String>,
        condition: Box<dyn Condition>,
        sink: Arc<dyn MetricsSink>,
        mode: ExecutionMode,
    ) -> Self {
        let mut active = Self {
            state: ConditionState::new(name),
            condition,
            sink,
            mode,
        };
        active.publish();
        if active.condition.starts_valid() {
            active.state.valid = true;
            active.state.seq += 1;
            active.publish();
        }
        debug!(condition = %active.state.name, valid = active.state.valid, "condition activated");
        active
    }

    /// Reattach a checkpointed state to a freshly built condition.
    ///
    /// The condition's accumulated state is restored from the checkpoint;
    /// a [`TupleCheck`] predicate is supplied again by the caller.
    ///
    /// # Errors
    /// `Serialization` when the checkpoint was taken from a different kind
    /// of condition.
    pub fn resume(
        mut state: ConditionState,
        mut condition: Box<dyn Condition>,
        sink: Arc<dyn MetricsSink>,
        mode: ExecutionMode,
    ) -> DomainResult<Self> {
        condition.restore(&state.progress)?;
        state.progress = Value::Null;
        let active = Self {
            condition,
            state,
            sink,
            mode,
        };
        active.publish();
        debug!(condition = %active.state.name, seq = active.state.seq, "condition resumed");
        Ok(active)
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn is_valid(&self) -> bool {
        self.state.valid
    }

    pub fn is_failed(&self) -> bool {
        self.state.failed
    }

    pub fn seq(&self) -> i64 {
        self.state.seq
    }

    pub fn describe(&self) -> String {
        self.condition.describe()
    }

    /// Evaluate one tuple.
    ///
    /// # Errors
    /// `ConditionFailed` when the condition fails in a standalone run.
    pub fn evaluate(&mut self, tuple: &Value) -> DomainResult<Verdict> {
        let verdict = self.condition.observe(tuple);
        self.apply(verdict)
    }

    /// Evaluate a time tick. Returns `None` when the condition ignores time.
    ///
    /// # Errors
    /// `ConditionFailed` when the condition fails in a standalone run.
    pub fn tick(&mut self, elapsed: Duration) -> DomainResult<Option<Verdict>> {
        match self.condition.tick(elapsed) {
            Some(verdict) => self.apply(verdict).map(Some),
            None => Ok(None),
        }
    }

    /// Fail the condition permanently.
    ///
    /// # Errors
    /// `ConditionFailed` in a standalone run.
    pub fn fail(&mut self) -> DomainResult<()> {
        self.apply(Verdict::Fail).map(|_| ())
    }

    /// Persisted state, without runtime handles.
    pub fn checkpoint(&self) -> ConditionState {
        ConditionState {
            progress: self.condition.save(),
            ..self.state.clone()
        }
    }

    /// End of the run.
    ///
    /// # Errors
    /// In a standalone run, `ConditionFailed` for a condition that is
    /// neither failed nor valid.
    pub fn finish(self) -> DomainResult<ConditionState> {
        if self.mode == ExecutionMode::Standalone && !self.state.failed && !self.state.valid {
            return Err(self.failure());
        }
        Ok(self.checkpoint())
    }

    fn apply(&mut self, verdict: Verdict) -> DomainResult<Verdict> {
        self.state.seq += 1;

        let newly_failed = verdict == Verdict::Fail && !self.state.failed;
        if verdict == Verdict::Fail {
            self.state.failed = true;
        }
        self.state.valid = !self.state.failed && verdict == Verdict::Valid;
        self.publish();

        if newly_failed {
            warn!(condition = %self.state.name, detail = %self.condition.describe(), "condition failed");
            if self.mode == ExecutionMode::Standalone {
                return Err(self.failure());
            }
        }

        Ok(if self.state.failed {
            Verdict::Fail
        } else {
            verdict
        })
    }

    fn publish(&self) {
        let name = &self.state.name;
        self.sink.publish(
            &ConditionMetricKind::Valid.metric_name(name),
            i64::from(self.state.valid),
        );
        self.sink.publish(
            &ConditionMetricKind::Fail.metric_name(name),
            i64::from(self.state.failed),
        );
        self.sink
            .publish(&ConditionMetricKind::Seq.metric_name(name), self.state.seq);
    }

    fn failure(&self) -> DomainError {
        DomainError::ConditionFailed(format!(
            "{}: {}",
            self.state.name,
            self.condition.describe()
        ))
    }
}

/// Drive a time-driven condition until it becomes valid.
///
/// Ticks every `period`, passing the time since the call started.
///
/// # Errors
/// `ConditionFailed` when the condition fails in a standalone run.
pub async fn run_ticks(active: &mut ActiveCondition, period: Duration) -> DomainResult<()> {
    let start = Instant::now();
    loop {
        sleep(period).await;
        if active.tick(start.elapsed())? != Some(Verdict::NotValid) {
            return Ok(());
        }
    }
}
