//! Tests for recurrence pattern parsing and calendar stepping.

use booking_engine::{BookingError, Frequency, RecurrenceRule};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_parse_error(pattern: &str) {
    match RecurrenceRule::parse(pattern) {
        Err(BookingError::RecurrenceParse(_)) => {}
        other => panic!("expected RecurrenceParse for {:?}, got {:?}", pattern, other),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn bare_keywords_parse_with_interval_one() {
    for (pattern, freq) in [
        ("daily", Frequency::Daily),
        ("Weekly", Frequency::Weekly),
        ("MONTHLY", Frequency::Monthly),
        ("yearly", Frequency::Yearly),
        ("  annually ", Frequency::Yearly),
    ] {
        let rule = RecurrenceRule::parse(pattern).expect("keyword should parse");
        assert_eq!(rule.frequency(), freq, "pattern {:?}", pattern);
        assert_eq!(rule.interval(), 1, "pattern {:?}", pattern);
    }
}

#[test]
fn every_n_units_phrase() {
    let rule = RecurrenceRule::parse("every 2 weeks").unwrap();
    assert_eq!(rule.frequency(), Frequency::Weekly);
    assert_eq!(rule.interval(), 2);

    let rule = RecurrenceRule::parse("every month").unwrap();
    assert_eq!(rule.frequency(), Frequency::Monthly);
    assert_eq!(rule.interval(), 1);

    let rule: RecurrenceRule = "Every 3 Days".parse().unwrap();
    assert_eq!(rule.frequency(), Frequency::Daily);
    assert_eq!(rule.interval(), 3);
}

#[test]
fn biweekly_is_every_two_weeks() {
    let rule = RecurrenceRule::parse("biweekly").unwrap();
    assert_eq!(rule.frequency(), Frequency::Weekly);
    assert_eq!(rule.interval(), 2);
}

#[test]
fn rrule_text_parses_freq_and_interval() {
    let rule = RecurrenceRule::parse("FREQ=WEEKLY;INTERVAL=2").unwrap();
    assert_eq!(rule.frequency(), Frequency::Weekly);
    assert_eq!(rule.interval(), 2);

    let rule = RecurrenceRule::parse("RRULE:FREQ=MONTHLY").unwrap();
    assert_eq!(rule.frequency(), Frequency::Monthly);
    assert_eq!(rule.interval(), 1);
}

#[test]
fn display_is_canonical_rrule_text() {
    let rule = RecurrenceRule::parse("every 3 months").unwrap();
    assert_eq!(rule.to_string(), "FREQ=MONTHLY;INTERVAL=3");
    assert_eq!(RecurrenceRule::parse(&rule.to_string()).unwrap(), rule);
}

#[test]
fn empty_and_unknown_patterns_rejected() {
    assert_parse_error("");
    assert_parse_error("   ");
    assert_parse_error("fortnightly");
    assert_parse_error("every");
    assert_parse_error("every 2 fortnights");
    assert_parse_error("every two weeks");
}

#[test]
fn non_positive_intervals_rejected() {
    assert_parse_error("every 0 days");
    assert_parse_error("every -1 weeks");
    assert_parse_error("FREQ=DAILY;INTERVAL=0");
    assert_parse_error("FREQ=DAILY;INTERVAL=-2");
    assert!(RecurrenceRule::new(Frequency::Daily, 0).is_err());
}

#[test]
fn unsupported_rrule_parts_rejected() {
    assert_parse_error("FREQ=WEEKLY;BYDAY=TU,TH");
    assert_parse_error("FREQ=DAILY;COUNT=5");
    assert_parse_error("FREQ=DAILY;UNTIL=20260101T000000Z");
    assert_parse_error("FREQ=HOURLY");
}

// ---------------------------------------------------------------------------
// Stepping
// ---------------------------------------------------------------------------

#[test]
fn daily_and_weekly_steps() {
    let daily = RecurrenceRule::new(Frequency::Daily, 3).unwrap();
    assert_eq!(daily.advance(date(2026, 2, 27), 1), Some(date(2026, 3, 2)));

    let weekly = RecurrenceRule::new(Frequency::Weekly, 2).unwrap();
    assert_eq!(weekly.advance(date(2026, 3, 2), 2), Some(date(2026, 3, 30)));
}

#[test]
fn monthly_clamps_to_last_day_of_shorter_month() {
    let monthly = RecurrenceRule::new(Frequency::Monthly, 1).unwrap();
    let anchor = date(2026, 1, 31);
    assert_eq!(monthly.advance(anchor, 1), Some(date(2026, 2, 28)));
    // Later steps clamp against the anchor, not the previous clamped date.
    assert_eq!(monthly.advance(anchor, 2), Some(date(2026, 3, 31)));
    assert_eq!(monthly.advance(anchor, 3), Some(date(2026, 4, 30)));
}

#[test]
fn monthly_clamp_in_leap_year() {
    let monthly = RecurrenceRule::new(Frequency::Monthly, 1).unwrap();
    assert_eq!(
        monthly.advance(date(2028, 1, 31), 1),
        Some(date(2028, 2, 29))
    );
}

#[test]
fn yearly_from_leap_day() {
    let yearly = RecurrenceRule::new(Frequency::Yearly, 1).unwrap();
    let anchor = date(2024, 2, 29);
    assert_eq!(yearly.advance(anchor, 1), Some(date(2025, 2, 28)));
    assert_eq!(yearly.advance(anchor, 4), Some(date(2028, 2, 29)));
}

#[test]
fn overflow_returns_none() {
    let yearly = RecurrenceRule::new(Frequency::Yearly, u32::MAX).unwrap();
    assert_eq!(yearly.advance(date(2026, 1, 1), 2), None);
}

#[test]
fn steps_until_counts_whole_steps_on_or_before_target() {
    let daily = RecurrenceRule::new(Frequency::Daily, 3).unwrap();
    assert_eq!(daily.steps_until(date(2026, 1, 1), date(2026, 1, 10)), 3);
    assert_eq!(daily.steps_until(date(2026, 1, 1), date(2026, 1, 9)), 2);
    assert_eq!(daily.steps_until(date(2026, 1, 1), date(2025, 12, 1)), 0);

    let monthly = RecurrenceRule::new(Frequency::Monthly, 1).unwrap();
    // Mar 31 is past Mar 15, so only the clamped Feb 28 step counts.
    assert_eq!(monthly.steps_until(date(2026, 1, 31), date(2026, 3, 15)), 1);

    let yearly = RecurrenceRule::new(Frequency::Yearly, 1).unwrap();
    assert_eq!(yearly.steps_until(date(2024, 2, 29), date(2028, 2, 28)), 3);
}
