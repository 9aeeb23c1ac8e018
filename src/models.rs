use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Argon2-encoded hash, write-only.
    #[serde(skip_serializing, default)]
    pub password: String,
}

#[derive(Debug, Serialize, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub created_by: Option<i64>,
    pub attendees: i64,
}

/// Fields of an event not yet persisted.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub created_by: i64,
}

/// The subset of the creator exposed when an event is read back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub email: String,
}

/// An event with its `createdBy` reference expanded to `{name, email}`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub created_by: Option<Creator>,
    pub attendees: i64,
}

#[derive(Debug, Serialize, Clone, FromRow)]
pub struct Booking {
    pub id: i64,
    pub event: i64,
    pub user: String,
}

/// A booking with its event reference resolved to the full record.
/// The event is null if the referenced id no longer exists; bookings are
/// never validated against the event store.
#[derive(Debug, Serialize, Clone)]
pub struct BookingDetails {
    pub id: i64,
    pub user: String,
    pub event: Option<Event>,
}
