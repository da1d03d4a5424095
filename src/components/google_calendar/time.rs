use super::models::{EventRecord, EventTime};
use chrono::{DateTime, NaiveDate, Utc};

/// Normalize an event boundary for display. All-day events carry a bare
/// date and timed events a date-time; the date form wins when both are
/// present, matching how listings label all-day entries.
pub fn display_time(time: Option<&EventTime>) -> Option<String> {
    let time = time?;
    time.date.clone().or_else(|| time.date_time.clone())
}

/// Point on the timeline used to order events by start. Timed events
/// parse as RFC 3339; all-day events count from midnight UTC.
pub fn start_ordinal(event: &EventRecord) -> Option<DateTime<Utc>> {
    let start = event.start.as_ref()?;

    if let Some(date_time) = &start.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }

    if let Some(date) = &start.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }

    None
}

/// Sort events ascending by start time. Events whose start cannot be
/// parsed sort last.
pub fn sort_by_start(events: &mut [EventRecord]) {
    events.sort_by_key(|event| start_ordinal(event).unwrap_or(DateTime::<Utc>::MAX_UTC));
}
