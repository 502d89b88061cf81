//! Admission gate for the store access layer.
//!
//! Keeps the three live counters (in-flight commands, in-flight pipeline
//! batches, lifetime total) and decides whether a new operation may be
//! dispatched. All counters are plain atomics: they sit on the hot path of
//! every store access and must never take a lock.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::error::StoreError;

/// Which processing counter an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Command,
    Pipeline,
}

/// Concurrency gate shared by every caller issuing store commands.
///
/// `allow` is consulted once per physical dispatch, independent of how many
/// commands a pipeline batch carries. The check is non-blocking: a saturated
/// gate rejects immediately instead of queuing.
#[derive(Debug)]
pub struct AdmissionGate {
    max_processing: u32,
    processing: AtomicU32,
    pipe_processing: AtomicU32,
    total: AtomicU64,
}

impl AdmissionGate {
    pub fn new(max_processing: u32) -> Self {
        AdmissionGate {
            max_processing,
            processing: AtomicU32::new(0),
            pipe_processing: AtomicU32::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Decide whether one more operation may go out.
    ///
    /// The pre-increment snapshot is compared against the ceiling, so exactly
    /// `max_processing` operations may be in flight at once and the next
    /// attempt is the first one rejected. Check and increment are deliberately
    /// not atomic as a unit; this is a soft ceiling.
    #[inline]
    pub fn allow(&self) -> Result<(), StoreError> {
        let in_flight =
            self.processing.load(Ordering::SeqCst) + self.pipe_processing.load(Ordering::SeqCst);
        if in_flight >= self.max_processing {
            return Err(StoreError::TooManyProcessing);
        }
        Ok(())
    }

    /// Mark one operation as in flight. Must happen strictly before dispatch.
    #[inline]
    pub(crate) fn enter(&self, kind: OpKind) {
        self.counter(kind).fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark one operation as settled. Must happen strictly after the result
    /// is known, on every exit path.
    #[inline]
    pub(crate) fn exit(&self, kind: OpKind) {
        self.counter(kind).fetch_sub(1, Ordering::SeqCst);
    }

    #[inline]
    fn counter(&self, kind: OpKind) -> &AtomicU32 {
        match kind {
            OpKind::Command => &self.processing,
            OpKind::Pipeline => &self.pipe_processing,
        }
    }

    pub fn max_processing(&self) -> u32 {
        self.max_processing
    }

    pub fn processing(&self) -> u32 {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn pipe_processing(&self) -> u32 {
        self.pipe_processing.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Companion callback receiving the terminal result of every dispatched
    /// operation. A well-formed empty result (nil sentinel) is not a failure,
    /// and admission rejections are already visible through the counters, so
    /// neither is logged here.
    pub fn report_result<T>(&self, result: &Result<T, StoreError>) {
        if let Err(err) = result {
            if err.is_nil() || err.is_too_many_processing() {
                return;
            }
            tracing::error!(category = "redisProcessFail", error = %err, "redis command failed");
        }
    }
}
