//! Scheduler run loop
//!
//! Owns the set of (expression, job) entries and the single wait/fire
//! decision. All public entry points mutate shared state behind one
//! lock and then wake the loop so it can re-evaluate its deadline;
//! only the loop itself ever blocks, and only on its own wait.
//!
//! Jobs are dispatched fire-and-forget on the blocking thread pool, so
//! a slow job never delays other entries' fire times. By default
//! successive firings of the same entry are not guarded against
//! overlap: a job whose runtime exceeds its own period runs
//! concurrently with itself. [`Scheduler::with_overlap_guard`] makes
//! such fires skip instead.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::cron::CronExpr;

/// Zero-argument callback installed for an entry. Its own success or
/// failure is opaque to the scheduler.
pub type Job = Arc<dyn Fn() + Send + Sync + 'static>;

/// How long the loop waits when it has nothing to schedule. A wake on
/// the notifier cuts any wait short, so the exact value only bounds
/// how often passive entries are re-examined.
const IDLE_WAIT: std::time::Duration = std::time::Duration::from_secs(3600);

/// Opaque, process-unique entry identifier. Assigned monotonically and
/// never reused while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry {
    id: EntryId,
    expr: CronExpr,
    job: Job,
    /// Next fire time, or `None` when no occurrence was found within
    /// the search horizon; such entries are kept passively and retried
    /// on later wakes.
    next: Option<DateTime<Utc>>,
    /// Whether a dispatched job for this entry is still running. Only
    /// consulted when the overlap guard is enabled.
    running: Arc<AtomicBool>,
}

/// Point-in-time copy of one entry. Mutating it has no effect on live
/// scheduler state.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    /// Entry identifier.
    pub id: EntryId,
    /// Canonical expression text.
    pub expression: String,
    /// Next fire time at snapshot instant.
    pub next: Option<DateTime<Utc>>,
}

/// The scheduler: entry set, adjustable clock, and run loop.
pub struct Scheduler {
    clock: Arc<Clock>,
    entries: Mutex<Vec<Entry>>,
    waker: Notify,
    next_id: AtomicU64,
    overlap_guard: bool,
}

impl Scheduler {
    /// Create a scheduler reading time through `clock`.
    #[must_use]
    pub fn new(clock: Arc<Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
            waker: Notify::new(),
            next_id: AtomicU64::new(1),
            overlap_guard: false,
        }
    }

    /// Skip a fire while the same entry's previous job is still
    /// running, instead of letting firings overlap.
    #[must_use]
    pub fn with_overlap_guard(mut self, enabled: bool) -> Self {
        self.overlap_guard = enabled;
        self
    }

    /// The clock all scheduling decisions go through.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Install an entry. Its first fire time is computed from the
    /// current (offset-corrected) clock; the run loop is woken in case
    /// the new deadline is earlier than the one it is waiting on.
    pub fn add_fn(&self, expr: CronExpr, job: Job) -> EntryId {
        let id = EntryId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let next = expr.next_after(self.clock.now());
        debug!("entry {} ({}) next fires at {:?}", id, expr.canonical(), next);
        self.locked().push(Entry {
            id,
            expr,
            job,
            next,
            running: Arc::new(AtomicBool::new(false)),
        });
        self.waker.notify_one();
        id
    }

    /// Remove an entry. Removing an unknown id is a no-op.
    pub fn remove(&self, id: EntryId) {
        self.locked().retain(|e| e.id != id);
        self.waker.notify_one();
    }

    /// Snapshot of all live entries, in installation order.
    #[must_use]
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        self.locked()
            .iter()
            .map(|e| EntrySnapshot {
                id: e.id,
                expression: e.expr.canonical().to_string(),
                next: e.next,
            })
            .collect()
    }

    /// Replace the clock offset and recompute every entry's fire time
    /// against the corrected present, returning the previous offset.
    ///
    /// Holding the entry lock across both steps keeps the change
    /// atomic with respect to the run loop's wait decision: a clock
    /// jump can neither skip an entry nor re-fire one. Each new fire
    /// time is strictly after the corrected now; nothing fires merely
    /// because the clock moved.
    pub fn update_time_offset(&self, offset: Duration) -> Duration {
        let mut entries = self.locked();
        let previous = self.clock.set_offset(offset);
        let now = self.clock.now();
        for entry in entries.iter_mut() {
            entry.next = entry.expr.next_after(now);
        }
        drop(entries);
        self.waker.notify_one();
        info!(
            "clock offset is now {}ms, entries rescheduled",
            offset.num_milliseconds()
        );
        previous
    }

    /// Run the wait/fire loop until `shutdown` is cancelled.
    ///
    /// The loop sleeps until the earliest live deadline, re-evaluating
    /// whenever the entry set or the clock offset changes. Due jobs
    /// are dispatched to the blocking pool and the loop immediately
    /// moves on to the next deadline. Cancellation returns promptly
    /// without firing pending entries.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("scheduler starting");
        loop {
            let wait = self.next_wait();
            tokio::select! {
                _ = tokio::time::sleep(wait) => self.fire_due(),
                _ = self.waker.notified() => {
                    // Entry set or offset changed; recompute the wait.
                }
                _ = shutdown.cancelled() => {
                    info!("scheduler stopping");
                    return;
                }
            }
        }
    }

    /// Duration until the earliest live deadline, measured through the
    /// adjustable clock.
    fn next_wait(&self) -> std::time::Duration {
        let entries = self.locked();
        let now = self.clock.now();
        match entries.iter().filter_map(|e| e.next).min() {
            Some(next) if next <= now => std::time::Duration::ZERO,
            Some(next) => (next - now).to_std().unwrap_or(IDLE_WAIT).min(IDLE_WAIT),
            None => IDLE_WAIT,
        }
    }

    /// Fire every entry whose deadline has been reached and recompute
    /// its next occurrence. Jobs run outside the lock.
    fn fire_due(&self) {
        let mut due = Vec::new();
        {
            let mut entries = self.locked();
            let now = self.clock.now();
            for entry in entries.iter_mut() {
                match entry.next {
                    Some(next) if next <= now => {
                        // Strictly after now, so per-entry fires are
                        // monotonically increasing even when late.
                        entry.next = entry.expr.next_after(now);
                        if self.overlap_guard && entry.running.load(Ordering::SeqCst) {
                            debug!("entry {} still running, skipping this fire", entry.id);
                            continue;
                        }
                        entry.running.store(true, Ordering::SeqCst);
                        due.push((entry.id, Arc::clone(&entry.job), Arc::clone(&entry.running)));
                    }
                    Some(_) => {}
                    None => {
                        // Retry with the horizon anchored at the new now.
                        entry.next = entry.expr.next_after(now);
                        if entry.next.is_none() {
                            warn!(
                                "entry {} ({}) has no upcoming occurrence",
                                entry.id,
                                entry.expr.canonical()
                            );
                        }
                    }
                }
            }
        }
        for (id, job, running) in due {
            debug!("firing entry {}", id);
            tokio::task::spawn_blocking(move || {
                job();
                running.store(false, Ordering::SeqCst);
            });
        }
    }

    /// Lock the entry set, recovering from a poisoned lock; a panic
    /// while holding it is a programming error but must not wedge the
    /// scheduler.
    fn locked(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
