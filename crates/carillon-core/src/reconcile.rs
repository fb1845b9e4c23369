//! Schedule file reconciliation
//!
//! The schedule lives in an external text file, one cron expression
//! per line, editable while the daemon runs. Each pass reads the file,
//! canonicalizes the lines, diffs the result against what is currently
//! installed in the scheduler, and applies only the delta: unchanged
//! expressions keep their entry (and their computed fire time)
//! untouched, which makes a pass against an unchanged file a no-op.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::cron::{canonicalize, CronExpr};
use crate::scheduler::{EntryId, Job, Scheduler};

/// Reconciles the schedule file against the scheduler's entry set.
///
/// Holds the only record of which canonical expression maps to which
/// installed entry. Two source lines that canonicalize identically
/// collapse to a single entry (one entry per unique expression).
pub struct Reconciler {
    path: PathBuf,
    scheduler: Arc<Scheduler>,
    job: Job,
    installed: Mutex<HashMap<String, EntryId>>,
}

impl Reconciler {
    /// Create a reconciler for `path`, installing `job` for every
    /// expression found there.
    pub fn new(path: impl Into<PathBuf>, scheduler: Arc<Scheduler>, job: Job) -> Self {
        Self {
            path: path.into(),
            scheduler,
            job,
            installed: Mutex::new(HashMap::new()),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// An unreadable file aborts the pass and leaves the installed set
    /// intact for the next cycle. A malformed expression is skipped
    /// with an error; the rest of the delta still applies.
    pub fn reconcile(&self) {
        let desired = match read_schedule(&self.path) {
            Ok(desired) => desired,
            Err(e) => {
                error!("unable to read {:?} - {}", self.path, e);
                return;
            }
        };

        let mut installed = self.locked();

        let stale: Vec<String> = installed
            .keys()
            .filter(|key| !desired.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(id) = installed.remove(&key) {
                info!("removing {:?}", key);
                self.scheduler.remove(id);
            }
        }

        for key in desired {
            if installed.contains_key(&key) {
                continue;
            }
            let expr = match CronExpr::parse(&key) {
                Ok(expr) => expr,
                Err(e) => {
                    warn!("skipping {:?} - {}", key, e);
                    continue;
                }
            };
            let id = self.scheduler.add_fn(expr, Arc::clone(&self.job));
            info!("added {:?} as entry {}", key, id);
            installed.insert(key, id);
        }
    }

    /// Canonical expressions currently recorded as installed.
    #[must_use]
    pub fn installed(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.locked().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Wrap this reconciler as a scheduler job so the engine can
    /// schedule its own re-checks.
    #[must_use]
    pub fn as_job(self: &Arc<Self>) -> Job {
        let this = Arc::clone(self);
        Arc::new(move || {
            debug!("updating schedule");
            this.reconcile();
        })
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, EntryId>> {
        self.installed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read the schedule file into the set of canonical expressions it
/// describes. Blank lines and lines whose first non-space character is
/// `#` are ignored.
pub fn read_schedule(path: &Path) -> io::Result<HashSet<String>> {
    let text = fs::read_to_string(path)?;
    let mut schedule = HashSet::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        schedule.insert(canonicalize(line));
    }
    Ok(schedule)
}

#[cfg(test)]
mod tests;
