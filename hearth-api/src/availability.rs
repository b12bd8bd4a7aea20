use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::CookieJar;
use hearth_booking::DraftReservation;
use hearth_core::{Room, SpanError, StaySpan};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .route("/availability", post(search_availability))
        .route("/availability/room", post(probe_room))
}

/// Entry point of the booking flow. Serves the pending flash message, if
/// any, and consumes it.
async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (id, mut session) = state.sessions.resolve(&jar);
    let flash = session.flash.take();
    let jar = state.sessions.persist(jar, id, session);
    (jar, Json(json!({ "service": "hearth-api", "flash": flash }))).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.booking.rooms().await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchForm {
    start: String,
    end: String,
}

/// Search every room for the requested dates. A successful search replaces
/// whatever draft the session held and starts the flow over.
async fn search_availability(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SearchForm>,
) -> Result<Response, ApiError> {
    let (id, mut session) = state.sessions.resolve(&jar);

    let span = match StaySpan::parse(&form.start, &form.end) {
        Ok(span) => span,
        Err(e) => {
            return Ok(state
                .sessions
                .flash_redirect(jar, id, session, span_rejection(&e), "/")
                .into_response())
        }
    };

    let rooms = state.booking.search(span).await?;
    if rooms.is_empty() {
        return Ok(state
            .sessions
            .flash_redirect(jar, id, session, "No availability", "/")
            .into_response());
    }

    session.draft = DraftReservation::begin(span);
    let jar = state.sessions.persist(jar, id, session);
    Ok((
        jar,
        Json(json!({
            "rooms": rooms,
            "start_date": form.start,
            "end_date": form.end,
        })),
    )
        .into_response())
}

/// Flash wording for a date range the flow turns away.
pub(crate) fn span_rejection(err: &SpanError) -> &'static str {
    match err {
        SpanError::BadStart(_) => "Invalid start date format. Please use yyyy-mm-dd.",
        SpanError::BadEnd(_) => "Invalid end date format. Please use yyyy-mm-dd.",
        SpanError::EmptyOrReversed { .. } => "You have to book at least one night",
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProbeForm {
    start: String,
    end: String,
    room_id: String,
}

#[derive(Debug, Default, Serialize)]
struct ProbeResponse {
    ok: bool,
    message: String,
    room_id: String,
    start_date: String,
    end_date: String,
}

impl ProbeResponse {
    fn refused(message: &str) -> Json<ProbeResponse> {
        Json(ProbeResponse {
            message: message.to_string(),
            ..ProbeResponse::default()
        })
    }
}

/// Single-room availability probe for the date picker. Always answers with
/// a 200 and a JSON verdict, whatever was submitted; it reads nothing from
/// the session and writes nothing to it.
async fn probe_room(
    State(state): State<AppState>,
    form: Result<Form<ProbeForm>, FormRejection>,
) -> Json<ProbeResponse> {
    let Ok(Form(form)) = form else {
        return ProbeResponse::refused("Internal server error");
    };

    let span = match StaySpan::parse(&form.start, &form.end) {
        Ok(span) => span,
        Err(SpanError::BadStart(_)) => {
            return ProbeResponse::refused("Invalid start date format. Please use yyyy-mm-dd.")
        }
        Err(SpanError::BadEnd(_)) => {
            return ProbeResponse::refused("Invalid end date format. Please use yyyy-mm-dd.")
        }
        Err(SpanError::EmptyOrReversed { .. }) => {
            return ProbeResponse::refused("End date must be at least one day after start date.")
        }
    };

    // A room id that does not parse probes room 0, which owns no
    // restriction rows and never will.
    let room_id = form.room_id.parse::<i64>().unwrap_or(0);
    match state.booking.probe(room_id, span).await {
        Ok(available) => Json(ProbeResponse {
            ok: available,
            message: String::new(),
            room_id: room_id.to_string(),
            start_date: form.start,
            end_date: form.end,
        }),
        Err(_) => ProbeResponse::refused("Error querying database"),
    }
}
