//! Instrumentation around every outbound command and pipeline batch.
//!
//! `begin` stamps a start instant and bumps the in-flight counters strictly
//! before dispatch; `finish` computes the elapsed duration, settles the
//! counters, and emits one structured event when the operation was slow or
//! failed. The start time travels as an explicit token between the two calls
//! rather than through ambient context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::gate::{AdmissionGate, OpKind};

/// One slow-or-failed operation, reported to the logging collaborator.
///
/// For pipelines `commands` carries every constituent command name joined
/// with commas; a single slow or failed command produces one record for the
/// whole batch. Never persisted by this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlowOrError {
    pub commands: String,
    pub elapsed: Duration,
    pub error: String,
}

/// In-flight marker returned by [`CommandHook::begin`].
///
/// Settles its processing counter on drop, so the decrement stays symmetric
/// with the increment even when the dispatch future is cancelled by an outer
/// deadline.
#[derive(Debug)]
pub struct OpToken {
    gate: Arc<AdmissionGate>,
    kind: OpKind,
    started_at: Instant,
}

impl OpToken {
    pub fn kind(&self) -> OpKind {
        self.kind
    }
}

impl Drop for OpToken {
    fn drop(&mut self) {
        self.gate.exit(self.kind);
    }
}

/// Observes command lifecycles. Purely observational: it never retries a
/// command or alters its result.
#[derive(Debug, Clone)]
pub struct CommandHook {
    gate: Arc<AdmissionGate>,
    slow: Duration,
}

impl CommandHook {
    pub fn new(gate: Arc<AdmissionGate>, slow: Duration) -> Self {
        CommandHook { gate, slow }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow
    }

    /// Record the start of an operation. Increments happen before dispatch.
    #[inline]
    pub fn begin(&self, kind: OpKind) -> OpToken {
        self.gate.enter(kind);
        OpToken {
            gate: Arc::clone(&self.gate),
            kind,
            started_at: Instant::now(),
        }
    }

    /// Record the completion of an operation.
    ///
    /// Consumes the token (settling the counters) and returns the emitted
    /// slow-or-error record, if any.
    pub fn finish(
        &self,
        token: OpToken,
        commands: &str,
        error: Option<&str>,
    ) -> Option<SlowOrError> {
        let elapsed = token.started_at.elapsed();
        drop(token);
        self.observe(commands, elapsed, error)
    }

    /// Slow/error policy: emit when `elapsed > slow` (strict) or the
    /// operation produced an error.
    fn observe(&self, commands: &str, elapsed: Duration, error: Option<&str>) -> Option<SlowOrError> {
        if elapsed <= self.slow && error.is_none() {
            return None;
        }
        let event = SlowOrError {
            commands: commands.to_string(),
            elapsed,
            error: error.unwrap_or_default().to_string(),
        };
        tracing::info!(
            category = "redisSlowOrErr",
            cmd = %event.commands,
            "use" = %format!("{:?}", event.elapsed),
            error = %event.error,
            "redis slow or error"
        );
        Some(event)
    }
}

/// Join pipeline command names the way the slow/error event reports them.
pub(crate) fn join_commands(names: &[String]) -> String {
    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(slow_ms: u64) -> CommandHook {
        CommandHook::new(
            Arc::new(AdmissionGate::new(100)),
            Duration::from_millis(slow_ms),
        )
    }

    #[test]
    fn test_fast_success_is_silent() {
        let h = hook(100);
        assert!(h.observe("get", Duration::from_millis(1), None).is_none());
    }

    #[test]
    fn test_slow_threshold_is_strict() {
        let h = hook(100);
        // Exactly at the threshold: not slow.
        assert!(h.observe("get", Duration::from_millis(100), None).is_none());
        // One millisecond past it: logged.
        let event = h.observe("get", Duration::from_millis(101), None).unwrap();
        assert_eq!(event.commands, "get");
        assert_eq!(event.elapsed, Duration::from_millis(101));
        assert_eq!(event.error, "");
    }

    #[test]
    fn test_error_is_reported_even_when_fast() {
        let h = hook(100);
        let event = h
            .observe("set", Duration::from_millis(1), Some("connection refused"))
            .unwrap();
        assert_eq!(event.error, "connection refused");
    }

    #[test]
    fn test_pipeline_aggregates_names_and_error() {
        let h = hook(100);
        let names = vec!["set".to_string(), "incr".to_string(), "get".to_string()];
        // Only the second command failed; one event covers the whole batch.
        let event = h
            .observe(
                &join_commands(&names),
                Duration::from_millis(2),
                Some("WRONGTYPE Operation against a key holding the wrong kind of value"),
            )
            .unwrap();
        assert_eq!(event.commands, "set,incr,get");
        assert_eq!(
            event.error,
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );
    }

    #[test]
    fn test_token_settles_counter_on_finish() {
        let gate = Arc::new(AdmissionGate::new(100));
        let h = CommandHook::new(Arc::clone(&gate), Duration::from_millis(100));

        let token = h.begin(OpKind::Command);
        assert_eq!(gate.processing(), 1);
        assert_eq!(gate.total(), 1);

        h.finish(token, "get", None);
        assert_eq!(gate.processing(), 0);
        assert_eq!(gate.total(), 1);
    }

    #[test]
    fn test_token_settles_counter_on_drop() {
        let gate = Arc::new(AdmissionGate::new(100));
        let h = CommandHook::new(Arc::clone(&gate), Duration::from_millis(100));

        let token = h.begin(OpKind::Pipeline);
        assert_eq!(gate.pipe_processing(), 1);
        // A cancelled dispatch never reaches finish; the drop settles it.
        drop(token);
        assert_eq!(gate.pipe_processing(), 0);
    }
}
