pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod images;
pub mod models;
pub mod notifier;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Builds the full application router around the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route(
            "/api/events",
            get(handlers::get_events).post(handlers::create_event),
        )
        .route(
            "/api/events/{id}",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route("/api/events/join/{event_id}", post(handlers::join_event))
        .route("/api/events/leave/{event_id}", post(handlers::leave_event))
        .route(
            "/api/bookings",
            post(handlers::create_booking),
        )
        .route("/api/bookings/{user_id}", get(handlers::get_user_bookings))
        .route("/ws", get(handlers::ws_handler))
        .nest_service("/uploads", ServeDir::new(state.images.root()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
