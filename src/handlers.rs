use crate::{
    auth::{self, AuthUser, OptionalAuth},
    db,
    error::AppError,
    models::{Booking, BookingDetails, Event, EventDetails, NewEvent, User},
    notifier::{AttendeeUpdate, Notifier},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[derive(Deserialize)]
pub struct RegisterPayload {
    name: String,
    email: String,
    phone: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    message: String,
    user: User,
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if db::find_user_by_email(&state.pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("User already exists".to_string()));
    }
    if db::find_user_by_phone(&state.pool, &payload.phone)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Phone number already registered".to_string(),
        ));
    }

    let hash = auth::hash_password(&payload.password)?;
    let user = db::create_user(
        &state.pool,
        &payload.name,
        &payload.email,
        &payload.phone,
        &hash,
    )
    .await?;
    let token = auth::issue_token(user.id, &state.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = db::find_user_by_email(&state.pool, &payload.email)
        .await?
        .filter(|user| auth::verify_password(&user.password, &payload.password))
        .ok_or_else(|| AppError::InvalidCredentials("Invalid credentials".to_string()))?;

    let token = auth::issue_token(user.id, &state.jwt_secret)?;
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user,
        token,
    }))
}

/// Fields gathered from a multipart event form. All optional here; create
/// enforces the required set, update treats absent fields as "keep prior".
#[derive(Default)]
struct EventForm {
    title: Option<String>,
    description: Option<String>,
    date: Option<DateTime<Utc>>,
    location: Option<String>,
    category: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_event_form(mut multipart: Multipart) -> Result<EventForm, AppError> {
    let mut form = EventForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let filename = field.file_name().unwrap_or("image").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            if !data.is_empty() {
                form.image = Some((filename, data.to_vec()));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "date" => form.date = Some(parse_event_date(&value)?),
            "location" => form.location = Some(value),
            "category" => form.category = Some(value),
            _ => {}
        }
    }
    Ok(form)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as
/// midnight UTC).
fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(AppError::Validation(format!("invalid date: {raw}")))
}

fn start_of_today() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let form = read_event_form(multipart).await?;

    let title = required(form.title, "title")?;
    let location = required(form.location, "location")?;
    let category = required(form.category, "category")?;
    let date = form
        .date
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    if date < start_of_today() {
        return Err(AppError::Validation(
            "Event date must be today or in the future".to_string(),
        ));
    }

    let image = match form.image {
        Some((filename, data)) => state.images.store(&filename, &data).await?,
        None => String::new(),
    };

    let event = db::create_event(
        &state.pool,
        &NewEvent {
            title,
            description: form.description,
            image,
            date,
            location,
            category,
            created_by: user_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Serialize)]
pub struct UpdateEventResponse {
    message: String,
    event: Event,
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UpdateEventResponse>, AppError> {
    let form = read_event_form(multipart).await?;

    let mut event = db::get_event(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    if event.created_by != Some(user_id) {
        return Err(AppError::Forbidden(
            "Unauthorized to update this event".to_string(),
        ));
    }

    if let Some((filename, data)) = form.image {
        if !event.image.is_empty() {
            // Non-fatal: a stale image on disk is an accepted tradeoff.
            if let Err(e) = state.images.remove(&event.image).await {
                warn!(error = %e, image = %event.image, "failed to delete previous image");
            }
        }
        event.image = state.images.store(&filename, &data).await?;
    }

    if let Some(title) = form.title {
        event.title = title;
    }
    if form.description.is_some() {
        event.description = form.description;
    }
    if let Some(date) = form.date {
        event.date = date;
    }
    if let Some(location) = form.location {
        event.location = location;
    }
    if let Some(category) = form.category {
        event.category = category;
    }

    let event = db::update_event(&state.pool, &event).await?;
    Ok(Json(UpdateEventResponse {
        message: "Event updated successfully".to_string(),
        event,
    }))
}

#[derive(Deserialize)]
pub struct EventFilters {
    category: Option<String>,
    date: Option<NaiveDate>,
}

pub async fn get_events(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Query(filters): Query<EventFilters>,
) -> Result<Json<Vec<EventDetails>>, AppError> {
    let date_from = filters.date.map(|d| d.and_time(NaiveTime::MIN).and_utc());
    db::list_events(&state.pool, identity, filters.category.as_deref(), date_from)
        .await
        .map(Json)
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventDetails>, AppError> {
    db::get_event_details(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let event = db::get_event(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let Some(owner) = event.created_by else {
        return Err(AppError::Validation(
            "Invalid event data. No creator found.".to_string(),
        ));
    };
    if owner != user_id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this event".to_string(),
        ));
    }

    if !event.image.is_empty() {
        if let Err(e) = state.images.remove(&event.image).await {
            warn!(error = %e, image = %event.image, "failed to delete event image");
        }
    }

    db::delete_event(&state.pool, id).await?;
    Ok(Json(json!({ "message": "Event deleted successfully" })))
}

#[derive(Serialize)]
pub struct AttendeesResponse {
    message: String,
    attendees: i64,
}

/// Joins are unauthenticated and carry no identity: every call increments,
/// including repeats by the same caller. The counter update is a
/// read-modify-write, so concurrent joins can lose an increment.
pub async fn join_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let event = db::get_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let attendees = event.attendees + 1;
    db::set_attendees(&state.pool, event.id, attendees).await?;
    state.notifier.publish(AttendeeUpdate {
        event_id: event.id,
        attendees,
    });

    Ok(Json(AttendeesResponse {
        message: "Joined successfully".to_string(),
        attendees,
    }))
}

/// Decrements only above zero; the broadcast fires only when a decrement
/// actually occurred.
pub async fn leave_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let event = db::get_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let mut attendees = event.attendees;
    if attendees > 0 {
        attendees -= 1;
        db::set_attendees(&state.pool, event.id, attendees).await?;
        state.notifier.publish(AttendeeUpdate {
            event_id: event.id,
            attendees,
        });
    }

    Ok(Json(AttendeesResponse {
        message: "Left event".to_string(),
        attendees,
    }))
}

#[derive(Deserialize)]
pub struct BookingPayload {
    event: i64,
    user: String,
}

/// Bookings are created freely: no auth and no existence check against the
/// event or user stores.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<BookingPayload>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = db::create_booking(&state.pool, payload.event, &payload.user).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    db::bookings_for_user(&state.pool, &user_id)
        .await
        .map(Json)
}

/// Push channel: clients connect as passive subscribers and receive an
/// `updateAttendees` message on every successful join/leave.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.notifier))
}

async fn handle_socket(mut socket: WebSocket, notifier: Notifier) {
    let mut rx = notifier.subscribe();
    debug!("websocket subscriber connected");

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(update) => {
                    let msg = json!({ "event": "updateAttendees", "data": update }).to_string();
                    if socket.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                // Subscribers are passive; other client messages are ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("websocket subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_date_accepts_rfc3339() {
        let dt = parse_event_date("2030-06-01T18:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2030-06-01T18:30:00+00:00");
    }

    #[test]
    fn parse_event_date_accepts_bare_dates_as_midnight_utc() {
        let dt = parse_event_date("2030-06-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2030-06-01T00:00:00+00:00");
    }

    #[test]
    fn parse_event_date_rejects_garbage() {
        assert!(matches!(
            parse_event_date("next tuesday"),
            Err(AppError::Validation(_))
        ));
    }
}
