//! Core types: event slots, interval parsing, timezone adjustment, tracing

pub mod event;
pub mod interval;
pub mod time;
pub mod tracing;

pub use event::{
    Attendee, DEFAULT_CALENDAR_ID, DEFAULT_TIMEZONE, EVENT_BOOKED_MESSAGE, EventCreated, EventQuery,
    NewEvent, Slot,
};
pub use interval::{IntervalError, interval_to_millis, parse_interval};
pub use time::{
    TimeError, adjust_time_by_timezone, adjust_time_by_timezone_string, format_utc,
    parse_timezone, parse_utc_timestamp, parse_wall_clock,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing, parse_level};
