
use super::*;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn test_parse_every_second() {
    let expr = CronExpr::parse("* * * * * *").unwrap();
    assert_eq!(expr.canonical(), "* * * * * *");
    let from = at(2026, 3, 14, 15, 9, 26);
    assert_eq!(expr.next_after(from), Some(at(2026, 3, 14, 15, 9, 27)));
}

#[test]
fn test_parse_rejects_empty() {
    assert_eq!(CronExpr::parse(""), Err(ParseError::Empty));
    assert_eq!(CronExpr::parse("   "), Err(ParseError::Empty));
}

#[test]
fn test_parse_rejects_out_of_range() {
    assert!(CronExpr::parse("60 * * * * *").is_err());
    assert!(CronExpr::parse("* * 24 * * *").is_err());
    assert!(CronExpr::parse("* * * 0 * *").is_err());
    assert!(CronExpr::parse("* * * * 13 *").is_err());
    assert!(CronExpr::parse("* * * * * 7").is_err());
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(CronExpr::parse("bells * * * * *").is_err());
    assert!(CronExpr::parse("1-2-3 * * * * *").is_err());
    assert!(CronExpr::parse("*/0 * * * * *").is_err());
    assert!(CronExpr::parse("30-10 * * * * *").is_err());
}

#[test]
fn test_parse_truncates_extra_fields() {
    let six = CronExpr::parse("0 30 9 * * mon").unwrap();
    let eight = CronExpr::parse("0 30 9 * * mon extra junk").unwrap();
    assert_eq!(six, eight);
    assert_eq!(eight.canonical(), "0 30 9 * * mon");
}

#[test]
fn test_parse_collapses_whitespace() {
    let expr = CronExpr::parse("  0   30\t9 * * *  ").unwrap();
    assert_eq!(expr.canonical(), "0 30 9 * * *");
}

#[test]
fn test_missing_trailing_fields_default_to_any() {
    // A single field pins the second; everything else stays open.
    let expr = CronExpr::parse("30").unwrap();
    let from = at(2026, 1, 1, 0, 0, 45);
    assert_eq!(expr.next_after(from), Some(at(2026, 1, 1, 0, 1, 30)));
}

#[test]
fn test_every_five_seconds_boundary() {
    let expr = CronExpr::parse("0/5 * * * * *").unwrap();
    for from in [
        at(2026, 1, 1, 0, 0, 0),
        at(2026, 6, 30, 12, 34, 56),
        at(2026, 12, 31, 23, 59, 59),
    ] {
        let next = expr.next_after(from).unwrap();
        assert_eq!(next.second() % 5, 0);
        assert!(next > from);
        assert!(next <= from + Duration::seconds(5));
    }
}

#[test]
fn test_step_and_list_fields() {
    let expr = CronExpr::parse("0 15,45 * * * *").unwrap();
    let from = at(2026, 2, 3, 10, 20, 0);
    assert_eq!(expr.next_after(from), Some(at(2026, 2, 3, 10, 45, 0)));
    assert_eq!(
        expr.next_after(at(2026, 2, 3, 10, 45, 0)),
        Some(at(2026, 2, 3, 11, 15, 0))
    );

    let expr = CronExpr::parse("0 0 8-17/3 * * *").unwrap();
    let from = at(2026, 2, 3, 12, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2026, 2, 3, 14, 0, 0)));
}

#[test]
fn test_month_and_weekday_names() {
    let expr = CronExpr::parse("0 0 12 * mar *").unwrap();
    let from = at(2026, 1, 10, 0, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2026, 3, 1, 12, 0, 0)));

    let expr = CronExpr::parse("0 0 9 * * MON").unwrap();
    // 2026-03-14 is a Saturday; the next Monday is the 16th.
    let from = at(2026, 3, 14, 10, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2026, 3, 16, 9, 0, 0)));
}

#[test]
fn test_year_carry() {
    let expr = CronExpr::parse("0 0 0 1 1 *").unwrap();
    let from = at(2026, 6, 15, 12, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2027, 1, 1, 0, 0, 0)));

    // From the last second of the year the carry crosses every field.
    let from = at(2026, 12, 31, 23, 59, 59);
    assert_eq!(expr.next_after(from), Some(at(2027, 1, 1, 0, 0, 0)));
}

#[test]
fn test_day_of_month_or_day_of_week_when_both_restricted() {
    // Both fields restricted: fire on the 1st of the month OR on Mondays.
    let expr = CronExpr::parse("0 0 0 1 * mon").unwrap();
    // 2024-01-05 is a Friday; Monday the 8th comes before February 1st.
    let from = at(2024, 1, 5, 0, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2024, 1, 8, 0, 0, 0)));
    // From late January the 1st of February wins over Monday the 5th.
    let from = at(2024, 1, 29, 12, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2024, 2, 1, 0, 0, 0)));
}

#[test]
fn test_day_of_month_alone_when_weekday_open() {
    let expr = CronExpr::parse("0 0 0 15 * *").unwrap();
    let from = at(2024, 1, 5, 0, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2024, 1, 15, 0, 0, 0)));
}

#[test]
fn test_impossible_expression_hits_horizon() {
    // February 30 never exists; the bounded search must terminate.
    let expr = CronExpr::parse("0 0 0 30 2 *").unwrap();
    assert_eq!(expr.next_after(at(2026, 1, 1, 0, 0, 0)), None);
}

#[test]
fn test_leap_day() {
    let expr = CronExpr::parse("0 0 0 29 2 *").unwrap();
    let from = at(2025, 1, 1, 0, 0, 0);
    assert_eq!(expr.next_after(from), Some(at(2028, 2, 29, 0, 0, 0)));
}

#[test]
fn test_next_after_is_deterministic() {
    let expr = CronExpr::parse("*/10 30 * * * *").unwrap();
    let from = at(2026, 5, 5, 5, 5, 5);
    assert_eq!(expr.next_after(from), expr.next_after(from));
}

#[test]
fn test_every_interval_constructor() {
    assert_eq!(CronExpr::every(5).unwrap().canonical(), "*/5 * * * * *");
    assert_eq!(CronExpr::every(60).unwrap().canonical(), "0 */1 * * * *");
    assert_eq!(CronExpr::every(300).unwrap().canonical(), "0 */5 * * * *");
    assert_eq!(CronExpr::every(3600).unwrap().canonical(), "0 0 */1 * * *");
    assert_eq!(CronExpr::every(7200).unwrap().canonical(), "0 0 */2 * * *");
    assert!(CronExpr::every(0).is_none());
    assert!(CronExpr::every(90).is_none());
    assert!(CronExpr::every(86_400).is_none());
}

#[test]
fn test_canonicalize() {
    assert_eq!(canonicalize("  a  b\tc "), "a b c");
    assert_eq!(
        canonicalize("1 2 3 4 5 6 7 8"),
        canonicalize("1 2 3 4 5 6")
    );
    assert_eq!(canonicalize(""), "");
}
