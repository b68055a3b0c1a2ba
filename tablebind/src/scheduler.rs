//! Batched row compilation.
//!
//! Rows are created by the widget at arbitrary points, often in the middle of
//! a collection mutation. Compiling each one on the spot would both flicker
//! and race the next digest, so rows are hidden and queued instead. The first
//! queued row schedules a flush a short delay later; every row queued before
//! that flush runs joins the same batch.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::dom::Node;

/// Delay between the first queued row and the flush.
pub const DEFAULT_COMPILE_DELAY: Duration = Duration::from_millis(2);

// =============================================================================
// Clock
// =============================================================================

/// Time source for scheduling flushes.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward. Shared by all clones.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.origin + offset
    }
}

// =============================================================================
// CompileScheduler
// =============================================================================

/// A queued row and the scope it compiles against.
#[derive(Debug, Clone)]
pub struct PendingCompile<S> {
    pub node: Node,
    pub scope: S,
}

/// Coalesces row compilations into one flush per scheduling window.
pub struct CompileScheduler<S> {
    pending: Vec<PendingCompile<S>>,
    deadline: Option<Instant>,
    delay: Duration,
    clock: Arc<dyn Clock>,
    flushes: u64,
}

impl<S> fmt::Debug for CompileScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileScheduler")
            .field("pending", &self.pending.len())
            .field("deadline", &self.deadline)
            .field("delay", &self.delay)
            .field("flushes", &self.flushes)
            .finish()
    }
}

impl<S> CompileScheduler<S> {
    pub fn new(delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: Vec::new(),
            deadline: None,
            delay,
            clock,
            flushes: 0,
        }
    }

    /// Hide `node` and queue it for the next flush.
    pub fn enqueue(&mut self, node: Node, scope: S) {
        node.set_visible(false);
        self.pending.push(PendingCompile { node, scope });

        if self.deadline.is_none() {
            let deadline = self.clock.now() + self.delay;
            trace!("Scheduling compile flush in {:?}", self.delay);
            self.deadline = Some(deadline);
        }
    }

    /// Number of queued rows.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// When the scheduled flush is due, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| self.clock.now() >= deadline)
    }

    /// Total flushes run so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Flush if the scheduled deadline has passed.
    pub fn flush_due_with(&mut self, compile: impl FnMut(&Node, &S)) -> usize {
        if self.is_due() {
            self.flush_with(compile)
        } else {
            0
        }
    }

    /// Reveal and compile every queued row in enqueue order.
    ///
    /// The queue and the scheduled flag are reset before `compile` runs, so
    /// rows queued from inside `compile` start a new batch.
    pub fn flush_with(&mut self, mut compile: impl FnMut(&Node, &S)) -> usize {
        self.deadline = None;
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return 0;
        }

        self.flushes += 1;
        debug!("Compiling {} queued rows", batch.len());
        for entry in &batch {
            entry.node.set_visible(true);
            compile(&entry.node, &entry.scope);
        }
        batch.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (CompileScheduler<usize>, ManualClock) {
        let clock = ManualClock::new();
        (
            CompileScheduler::new(DEFAULT_COMPILE_DELAY, Arc::new(clock.clone())),
            clock,
        )
    }

    #[test]
    fn test_enqueue_hides_row_and_schedules_once() {
        let (mut scheduler, _) = scheduler();
        let first = Node::row();
        scheduler.enqueue(first.clone(), 0);
        let deadline = scheduler.deadline();
        scheduler.enqueue(Node::row(), 1);

        assert!(!first.is_visible());
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(scheduler.deadline(), deadline);
    }

    #[test]
    fn test_not_due_before_delay() {
        let (mut scheduler, clock) = scheduler();
        scheduler.enqueue(Node::row(), 0);
        assert!(!scheduler.is_due());
        assert_eq!(scheduler.flush_due_with(|_, _| {}), 0);

        clock.advance(Duration::from_millis(2));
        assert!(scheduler.is_due());
    }

    #[test]
    fn test_burst_yields_one_flush_in_order() {
        let (mut scheduler, clock) = scheduler();
        let rows: Vec<Node> = (0..5).map(|_| Node::row()).collect();
        for (i, row) in rows.iter().enumerate() {
            scheduler.enqueue(row.clone(), i);
        }

        clock.advance(Duration::from_millis(3));
        let mut seen = Vec::new();
        let compiled = scheduler.flush_due_with(|node, scope| {
            assert!(node.is_visible());
            seen.push(*scope);
        });

        assert_eq!(compiled, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(scheduler.flush_count(), 1);
        assert_eq!(scheduler.pending(), 0);
        assert!(!scheduler.is_scheduled());
        assert!(rows.iter().all(Node::is_visible));
    }

    #[test]
    fn test_enqueue_after_flush_starts_new_batch() {
        let (mut scheduler, clock) = scheduler();
        scheduler.enqueue(Node::row(), 0);
        clock.advance(Duration::from_millis(2));
        scheduler.flush_due_with(|_, _| {});

        scheduler.enqueue(Node::row(), 1);
        assert!(scheduler.is_scheduled());
        assert!(!scheduler.is_due());
        clock.advance(Duration::from_millis(2));
        assert_eq!(scheduler.flush_due_with(|_, _| {}), 1);
        assert_eq!(scheduler.flush_count(), 2);
    }

    #[test]
    fn test_empty_flush_is_not_counted() {
        let (mut scheduler, _) = scheduler();
        assert_eq!(scheduler.flush_with(|_, _| {}), 0);
        assert_eq!(scheduler.flush_count(), 0);
    }
}
