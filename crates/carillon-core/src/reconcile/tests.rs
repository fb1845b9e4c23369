
use super::*;
use crate::clock::Clock;
use tempfile::NamedTempFile;

fn noop() -> Job {
    Arc::new(|| {})
}

fn write_schedule(file: &NamedTempFile, text: &str) {
    fs::write(file.path(), text).unwrap();
}

fn fixture(text: &str) -> (NamedTempFile, Arc<Scheduler>, Arc<Reconciler>) {
    let file = NamedTempFile::new().unwrap();
    write_schedule(&file, text);
    let scheduler = Arc::new(Scheduler::new(Arc::new(Clock::new())));
    let reconciler = Arc::new(Reconciler::new(
        file.path(),
        Arc::clone(&scheduler),
        noop(),
    ));
    (file, scheduler, reconciler)
}

#[test]
fn test_read_schedule_skips_blanks_and_comments() {
    let file = NamedTempFile::new().unwrap();
    write_schedule(
        &file,
        "# morning bell\n\n   \n0 0 9 * * *\n   # indented comment\n0 0 17 * * *\n",
    );
    let schedule = read_schedule(file.path()).unwrap();
    assert_eq!(schedule.len(), 2);
    assert!(schedule.contains("0 0 9 * * *"));
    assert!(schedule.contains("0 0 17 * * *"));
}

#[test]
fn test_read_schedule_canonicalizes_lines() {
    let file = NamedTempFile::new().unwrap();
    write_schedule(
        &file,
        "0   0  9 * * *\n0 0 9 * * * trailing tokens dropped\n",
    );
    let schedule = read_schedule(file.path()).unwrap();
    // Both lines collapse to the same canonical key.
    assert_eq!(schedule.len(), 1);
    assert!(schedule.contains("0 0 9 * * *"));
}

#[test]
fn test_reconcile_applies_exact_delta() {
    let (file, scheduler, reconciler) = fixture("0 0 9 * * *\n0 0 12 * * *\n");
    reconciler.reconcile();
    assert_eq!(scheduler.entries().len(), 2);

    let kept_id = scheduler
        .entries()
        .iter()
        .find(|e| e.expression == "0 0 12 * * *")
        .unwrap()
        .id;

    // Drop the 9 o'clock bell, keep noon, add evening.
    write_schedule(&file, "0 0 12 * * *\n0 0 18 * * *\n");
    reconciler.reconcile();

    let entries = scheduler.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.expression != "0 0 9 * * *"));
    // The unchanged expression kept its entry id (and thus its nextRun).
    let noon = entries
        .iter()
        .find(|e| e.expression == "0 0 12 * * *")
        .unwrap();
    assert_eq!(noon.id, kept_id);
    assert!(entries.iter().any(|e| e.expression == "0 0 18 * * *"));
}

#[test]
fn test_reconcile_is_idempotent() {
    let (_file, scheduler, reconciler) = fixture("0 30 8 * * mon\n*/10 * * * * *\n");
    reconciler.reconcile();
    let first: Vec<_> = scheduler.entries().iter().map(|e| e.id).collect();
    reconciler.reconcile();
    let second: Vec<_> = scheduler.entries().iter().map(|e| e.id).collect();
    assert_eq!(first, second);
}

#[test]
fn test_reconcile_skips_malformed_lines() {
    let (_file, scheduler, reconciler) =
        fixture("not a cron line at all ! ?\n0 0 9 * * *\n61 * * * * *\n");
    reconciler.reconcile();
    // Only the valid expression was installed; the pass was not aborted.
    let entries = scheduler.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].expression, "0 0 9 * * *");
    assert_eq!(reconciler.installed(), vec!["0 0 9 * * *".to_string()]);
}

#[test]
fn test_reconcile_keeps_installed_when_file_unreadable() {
    let (file, scheduler, reconciler) = fixture("0 0 9 * * *\n");
    reconciler.reconcile();
    assert_eq!(scheduler.entries().len(), 1);

    let path = file.path().to_path_buf();
    drop(file);
    assert!(!path.exists());

    // The pass aborts; previously installed entries stay live.
    reconciler.reconcile();
    assert_eq!(scheduler.entries().len(), 1);
    assert_eq!(reconciler.installed(), vec!["0 0 9 * * *".to_string()]);
}

#[test]
fn test_duplicate_lines_collapse_to_one_entry() {
    let (_file, scheduler, reconciler) =
        fixture("0 0 9 * * *\n0  0  9 * * *\n0 0 9 * * * extra\n");
    reconciler.reconcile();
    assert_eq!(scheduler.entries().len(), 1);
}

#[test]
fn test_edit_cycle_replaces_single_entry() {
    // The end-to-end scenario: an empty installed set, then a file
    // holding one expression, then the file edited to hold another.
    let (file, scheduler, reconciler) = fixture("* * * * * *\n");
    reconciler.reconcile();
    assert_eq!(reconciler.installed(), vec!["* * * * * *".to_string()]);
    let first_id = scheduler.entries()[0].id;

    write_schedule(&file, "*/10 * * * * *\n");
    reconciler.reconcile();

    assert_eq!(reconciler.installed(), vec!["*/10 * * * * *".to_string()]);
    let entries = scheduler.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].expression, "*/10 * * * * *");
    assert_ne!(entries[0].id, first_id);
}
