//! WASM bindings for booking-engine.
//!
//! Exposes recurring instance generation, availability checks, calendar
//! rendering and free-slot search to the JavaScript front end via
//! `wasm-bindgen`. All complex types are passed as JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p booking-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/booking_engine_wasm.wasm
//! ```

use std::collections::BTreeSet;
use std::fmt::Display;

use booking_engine::event::validate_range;
use booking_engine::generator::GeneratorOptions;
use booking_engine::time::{parse_timestamp, parse_timezone};
use booking_engine::{
    BookingInterval, Calendar, CalendarFile, Exclude, ParentEvent, RecurrenceRule, SourceType,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly inputs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

/// Parent event passed from JavaScript. Timestamps may be RFC 3339 or naive (UTC).
#[derive(Deserialize)]
struct ParentInput {
    id: String,
    start: String,
    end: String,
    #[serde(default)]
    excluded_dates: BTreeSet<NaiveDate>,
}

/// Booking interval passed from JavaScript.
#[derive(Deserialize)]
struct IntervalInput {
    start: String,
    end: String,
    source_id: String,
    #[serde(default = "default_source_type")]
    source_type: SourceType,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn default_source_type() -> SourceType {
    SourceType::Event
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, JsValue> {
    parse_timestamp(s).map_err(js_error)
}

fn options_for(timezone: Option<&str>) -> Result<GeneratorOptions, JsValue> {
    let mut options = GeneratorOptions::default();
    if let Some(tz) = timezone {
        options.timezone = parse_timezone(tz).map_err(js_error)?;
    }
    Ok(options)
}

fn parse_intervals_json(json: &str) -> Result<Vec<BookingInterval>, JsValue> {
    let inputs: Vec<IntervalInput> = serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("Invalid intervals JSON: {}", e)))?;

    inputs
        .into_iter()
        .map(|input| {
            let mut interval = BookingInterval::new(
                input.source_id,
                input.source_type,
                parse_datetime(&input.start)?,
                parse_datetime(&input.end)?,
            );
            interval.parent_id = input.parent_id;
            interval.title = input.title;
            Ok(interval)
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Generate the virtual instances of a recurring parent event.
///
/// `parent_json` is `{id, start, end, excluded_dates?}`; `rule` is a recurrence
/// pattern (`"weekly"`, `"every 2 weeks"`, `"FREQ=MONTHLY"`). Returns a JSON
/// array of occurrences. A malformed rule is reported as an error so the
/// caller can fall back to rendering the event as non-recurring.
#[wasm_bindgen(js_name = "generateInstances")]
pub fn generate_instances(
    parent_json: &str,
    rule: &str,
    repeat_until: Option<String>,
    window_end: &str,
    timezone: Option<String>,
) -> Result<String, JsValue> {
    let input: ParentInput = serde_json::from_str(parent_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid parent JSON: {}", e)))?;
    let parent = ParentEvent {
        id: input.id,
        start: parse_datetime(&input.start)?,
        end: parse_datetime(&input.end)?,
        excluded_dates: input.excluded_dates,
    };
    let rule = RecurrenceRule::parse(rule).map_err(js_error)?;
    let repeat_until = repeat_until.as_deref().map(parse_datetime).transpose()?;
    let window_end = parse_datetime(window_end)?;
    let options = options_for(timezone.as_deref())?;

    let instances = booking_engine::generate_instances_with(
        &parent,
        &rule,
        repeat_until,
        window_end,
        &options,
    )
    .map_err(js_error)?;

    to_json(&instances)
}

/// Check whether `[start, end)` is free against a JSON array of intervals
/// (`{start, end, source_id, source_type?, parent_id?, title?}`).
///
/// Returns `{available, conflict?}`. `exclude_id` skips the row or instance
/// being edited; `exclude_series` skips a whole series being rescheduled.
#[wasm_bindgen(js_name = "checkAvailability")]
pub fn check_availability(
    start: &str,
    end: &str,
    intervals_json: &str,
    exclude_id: Option<String>,
    exclude_series: Option<String>,
) -> Result<String, JsValue> {
    let intervals = parse_intervals_json(intervals_json)?;
    let start = parse_datetime(start)?;
    let end = parse_datetime(end)?;
    validate_range(start, end).map_err(js_error)?;

    let availability = booking_engine::check_availability_excluding(
        start,
        end,
        &intervals,
        Exclude {
            id: exclude_id.as_deref(),
            series: exclude_series.as_deref(),
        },
    );
    to_json(&availability)
}

/// Render a calendar (`{events, bookings}`) into the occurrences overlapping
/// `[window_start, window_end)`, virtual instances included.
#[wasm_bindgen(js_name = "expandCalendar")]
pub fn expand_calendar(
    calendar_json: &str,
    window_start: &str,
    window_end: &str,
    timezone: Option<String>,
) -> Result<String, JsValue> {
    let file = CalendarFile::from_json(calendar_json).map_err(js_error)?;
    let mut calendar = Calendar::from_events(file.events, options_for(timezone.as_deref())?);

    let occurrences =
        calendar.occurrences(parse_datetime(window_start)?, parse_datetime(window_end)?);
    to_json(&occurrences)
}

/// Free slots inside `[window_start, window_end)` given a JSON array of busy intervals.
#[wasm_bindgen(js_name = "findFreeSlots")]
pub fn find_free_slots(
    intervals_json: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, JsValue> {
    let intervals = parse_intervals_json(intervals_json)?;
    let slots = booking_engine::find_free_slots(
        &intervals,
        parse_datetime(window_start)?,
        parse_datetime(window_end)?,
    );
    to_json(&slots)
}
