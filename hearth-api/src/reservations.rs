use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::CookieJar;
use hearth_booking::{CommitError, DraftReservation, GuestForm};
use hearth_core::{StaySpan, StoreError};
use serde::Deserialize;
use serde_json::json;

use crate::availability::span_rejection;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}/choose", get(choose_room))
        .route("/book", get(book_direct))
        .route("/reservations/new", get(reservation_form))
        .route("/reservations", post(create_reservation))
        .route("/reservations/summary", get(reservation_summary))
}

/// Record the room picked from the availability results.
async fn choose_room(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(room_id): Path<i64>,
) -> Response {
    let (id, mut session) = state.sessions.resolve(&jar);
    match session.draft.choose_room(room_id) {
        Ok(()) => {
            let jar = state.sessions.persist(jar, id, session);
            (jar, Redirect::to("/reservations/new")).into_response()
        }
        Err(e) => state
            .sessions
            .flash_redirect(jar, id, session, &e.to_string(), "/")
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookQuery {
    room_id: String,
    start: String,
    end: String,
}

/// Direct booking link carrying room and dates in the query string, the
/// path taken from a room page instead of a search. Starts the flow in one
/// step after re-validating everything the link claims.
async fn book_direct(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<BookQuery>,
) -> Result<Response, ApiError> {
    let (id, mut session) = state.sessions.resolve(&jar);

    let span = match StaySpan::parse(&query.start, &query.end) {
        Ok(span) => span,
        Err(e) => {
            return Ok(state
                .sessions
                .flash_redirect(jar, id, session, span_rejection(&e), "/")
                .into_response())
        }
    };

    let room_id = query.room_id.parse::<i64>().unwrap_or(0);
    if !state.booking.probe(room_id, span).await? {
        return Ok(state
            .sessions
            .flash_redirect(
                jar,
                id,
                session,
                "Room is no longer available for those dates",
                "/",
            )
            .into_response());
    }
    let room = match state.booking.room(room_id).await {
        Ok(room) => room,
        Err(StoreError::RoomNotFound(_)) => {
            return Ok(state
                .sessions
                .flash_redirect(jar, id, session, "Can't find room", "/")
                .into_response())
        }
        Err(e) => return Err(e.into()),
    };

    session.draft = DraftReservation::begin_direct(span, room.id);
    let jar = state.sessions.persist(jar, id, session);
    Ok((jar, Redirect::to("/reservations/new")).into_response())
}

/// Context for the guest-details form: the room, the dates, and whatever
/// details an earlier rejected submission left in the draft.
async fn reservation_form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let (id, session) = state.sessions.resolve(&jar);
    let Some((span, room_id)) = session.draft.stay() else {
        return Ok(state
            .sessions
            .flash_redirect(jar, id, session, "No booking in progress", "/")
            .into_response());
    };

    // The draft only holds the room id; the room itself is re-resolved on
    // every view and may have vanished since.
    let room = match state.booking.room(room_id).await {
        Ok(room) => room,
        Err(StoreError::RoomNotFound(_)) => {
            return Ok(state
                .sessions
                .flash_redirect(jar, id, session, "Can't find room", "/")
                .into_response())
        }
        Err(e) => return Err(e.into()),
    };

    let guest = session.draft.guest().cloned().unwrap_or_default();
    let jar = state.sessions.persist(jar, id, session);
    Ok((
        jar,
        Json(json!({
            "room": room,
            "start_date": span.start().to_string(),
            "end_date": span.end().to_string(),
            "guest": guest,
        })),
    )
        .into_response())
}

/// Run the commit sequence for the submitted guest details.
async fn create_reservation(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<GuestForm>,
) -> Result<Response, ApiError> {
    let (id, mut session) = state.sessions.resolve(&jar);
    let Some((span, room_id)) = session.draft.stay() else {
        return Ok(state
            .sessions
            .flash_redirect(jar, id, session, "No booking in progress", "/")
            .into_response());
    };

    // Keep the submission in the draft first, so a rejected form comes back
    // filled in.
    session.draft.enter_details(form.clone())?;

    match state.booking.commit(room_id, span, &form).await {
        Ok(committed) => {
            session
                .draft
                .mark_committed(committed.reservation, committed.room)?;
            let jar = state.sessions.persist(jar, id, session);
            Ok((jar, Redirect::to("/reservations/summary")).into_response())
        }
        Err(CommitError::Validation(errors)) => {
            let jar = state.sessions.persist(jar, id, session);
            Ok((
                jar,
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "errors": errors,
                        "guest": form,
                        "room_id": room_id,
                        "start_date": span.start().to_string(),
                        "end_date": span.end().to_string(),
                    })),
                ),
            )
                .into_response())
        }
        Err(CommitError::RoomNotFound(_)) => Ok(state
            .sessions
            .flash_redirect(jar, id, session, "Can't find room", "/")
            .into_response()),
        Err(CommitError::RoomNoLongerAvailable(_)) => Ok(state
            .sessions
            .flash_redirect(
                jar,
                id,
                session,
                "Room is no longer available for those dates",
                "/",
            )
            .into_response()),
        // PartialCommit and storage failures are server faults, never a
        // user mistake.
        Err(e) => Err(e.into()),
    }
}

/// Confirmation view. Shown once; the draft is cleared on the way out.
async fn reservation_summary(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (id, mut session) = state.sessions.resolve(&jar);
    let DraftReservation::Committed { reservation, room } = session.draft.clone() else {
        return state
            .sessions
            .flash_redirect(jar, id, session, "No booking in progress", "/")
            .into_response();
    };

    session.draft.clear();
    let jar = state.sessions.persist(jar, id, session);
    (jar, Json(json!({ "reservation": reservation, "room": room }))).into_response()
}
