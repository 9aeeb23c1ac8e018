use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error::AppError;
use crate::models::{Booking, BookingDetails, Creator, Event, EventDetails, NewEvent, User};

pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            image TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            location TEXT NOT NULL,
            category TEXT NOT NULL,
            created_by INTEGER REFERENCES users (id),
            attendees INTEGER NOT NULL DEFAULT 0
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL,
            user_id TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn find_user_by_phone(pool: &SqlitePool, phone: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as("SELECT * FROM users WHERE phone = ?")
        .bind(phone)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn create_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as(
        "INSERT INTO users (name, email, phone, password) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)
}

pub async fn create_event(pool: &SqlitePool, event: &NewEvent) -> Result<Event, AppError> {
    sqlx::query_as(
        "INSERT INTO events (title, description, image, date, location, category, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.image)
    .bind(event.date)
    .bind(&event.location)
    .bind(&event.category)
    .bind(event.created_by)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)
}

pub async fn get_event(pool: &SqlitePool, id: i64) -> Result<Option<Event>, AppError> {
    sqlx::query_as("SELECT * FROM events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

/// Writes back the mutable fields of an event.
pub async fn update_event(pool: &SqlitePool, event: &Event) -> Result<Event, AppError> {
    sqlx::query_as(
        "UPDATE events
         SET title = ?, description = ?, image = ?, date = ?, location = ?, category = ?
         WHERE id = ? RETURNING *",
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.image)
    .bind(event.date)
    .bind(&event.location)
    .bind(&event.category)
    .bind(event.id)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)
}

pub async fn set_attendees(pool: &SqlitePool, id: i64, attendees: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE events SET attendees = ? WHERE id = ?")
        .bind(attendees)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_event(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(FromRow)]
struct EventDetailsRow {
    id: i64,
    title: String,
    description: Option<String>,
    image: String,
    date: DateTime<Utc>,
    location: String,
    category: String,
    attendees: i64,
    creator_name: Option<String>,
    creator_email: Option<String>,
}

impl From<EventDetailsRow> for EventDetails {
    fn from(row: EventDetailsRow) -> Self {
        let created_by = row
            .creator_name
            .zip(row.creator_email)
            .map(|(name, email)| Creator { name, email });
        EventDetails {
            id: row.id,
            title: row.title,
            description: row.description,
            image: row.image,
            date: row.date,
            location: row.location,
            category: row.category,
            created_by,
            attendees: row.attendees,
        }
    }
}

const EVENT_DETAILS_SELECT: &str = "SELECT e.id, e.title, e.description, e.image, e.date, \
     e.location, e.category, e.attendees, u.name AS creator_name, u.email AS creator_email \
     FROM events e LEFT JOIN users u ON e.created_by = u.id";

pub async fn get_event_details(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<EventDetails>, AppError> {
    let row: Option<EventDetailsRow> =
        sqlx::query_as(&format!("{EVENT_DETAILS_SELECT} WHERE e.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(EventDetails::from))
}

/// Lists events sorted ascending by date. Each filter applies only when
/// supplied; `owner` scopes the result to that creator's events.
pub async fn list_events(
    pool: &SqlitePool,
    owner: Option<i64>,
    category: Option<&str>,
    date_from: Option<DateTime<Utc>>,
) -> Result<Vec<EventDetails>, AppError> {
    let rows: Vec<EventDetailsRow> = sqlx::query_as(&format!(
        "{EVENT_DETAILS_SELECT} \
         WHERE (?1 IS NULL OR e.created_by = ?1) \
           AND (?2 IS NULL OR e.category = ?2) \
           AND (?3 IS NULL OR e.date >= ?3) \
         ORDER BY e.date ASC"
    ))
    .bind(owner)
    .bind(category)
    .bind(date_from)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(EventDetails::from).collect())
}

pub async fn create_booking(
    pool: &SqlitePool,
    event: i64,
    user: &str,
) -> Result<Booking, AppError> {
    sqlx::query_as(
        "INSERT INTO bookings (event_id, user_id) VALUES (?, ?)
         RETURNING id, event_id AS event, user_id AS user",
    )
    .bind(event)
    .bind(user)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)
}

#[derive(FromRow)]
struct BookingDetailsRow {
    id: i64,
    user: String,
    event_id: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    date: Option<DateTime<Utc>>,
    location: Option<String>,
    category: Option<String>,
    created_by: Option<i64>,
    attendees: Option<i64>,
}

pub async fn bookings_for_user(
    pool: &SqlitePool,
    user: &str,
) -> Result<Vec<BookingDetails>, AppError> {
    let rows: Vec<BookingDetailsRow> = sqlx::query_as(
        "SELECT b.id, b.user_id AS user, e.id AS event_id, e.title, e.description, e.image, \
         e.date, e.location, e.category, e.created_by, e.attendees \
         FROM bookings b LEFT JOIN events e ON b.event_id = e.id \
         WHERE b.user_id = ?",
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let event = match (
                row.event_id,
                row.title,
                row.image,
                row.date,
                row.location,
                row.category,
                row.attendees,
            ) {
                (Some(id), Some(title), Some(image), Some(date), Some(location), Some(category), Some(attendees)) => {
                    Some(Event {
                        id,
                        title,
                        description: row.description,
                        image,
                        date,
                        location,
                        category,
                        created_by: row.created_by,
                        attendees,
                    })
                }
                _ => None,
            };
            BookingDetails {
                id: row.id,
                user: row.user,
                event,
            }
        })
        .collect())
}
