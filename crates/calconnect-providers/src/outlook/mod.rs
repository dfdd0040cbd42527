//! Outlook Calendar adapter over Microsoft Graph.
//!
//! Tokens come from the Microsoft identity platform v2.0 endpoints; the
//! `offline_access` scope is what makes it hand out refresh tokens. Events
//! are read through `calendarView` so recurring series come back expanded,
//! with every time expressed in UTC.

mod adapter;
mod client;
mod config;

pub use adapter::OutlookAdapter;
pub use client::{CreatedGraphEvent, GraphCalendarClient, GraphEventPayload};
pub use config::OutlookConfig;
