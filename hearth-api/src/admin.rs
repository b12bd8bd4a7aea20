use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use axum_extra::extract::CookieJar;
use hearth_core::{Reservation, StaySpan, StoreError};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::password;
use crate::session::AdminUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/reservations", get(all_reservations))
        .route("/admin/reservations/new", get(new_reservations))
        .route("/admin/reservations/{reservation_id}/processed", put(mark_processed))
        .route("/admin/blocks", post(block_room))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let mut checks = hearth_booking::Form::new(&[
        ("email", &form.email),
        ("password", &form.password),
    ]);
    checks.required(&["email", "password"]);
    checks.is_email("email");
    if !checks.valid() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": checks.into_errors() })),
        )
            .into_response());
    }

    let Some(user) = state.repo.user_by_email(form.email.trim()).await? else {
        return Err(ApiError::Unauthorized("Invalid login credentials".to_string()));
    };
    let valid = password::verify_password(&form.password, &user.password_hash)
        .map_err(|e| ApiError::InternalServerError(format!("password verification error: {e}")))?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid login credentials".to_string()));
    }

    let (id, mut session) = state.sessions.resolve(&jar);
    session.user_id = Some(user.id);
    session.flash = Some("Logged in successfully!".to_string());
    // Privilege change: the pre-login token must not survive it.
    let (_id, jar) = state.sessions.rotate(jar, id, session);
    info!(user_id = user.id, "admin logged in");
    Ok((jar, Redirect::to("/")).into_response())
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (id, _session) = state.sessions.resolve(&jar);
    let jar = state.sessions.destroy(jar, id);
    (jar, Redirect::to("/")).into_response()
}

async fn all_reservations(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(state.repo.all_reservations().await?))
}

/// Reservations nobody has processed yet, newest first.
async fn new_reservations(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(state.repo.new_reservations().await?))
}

async fn mark_processed(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    match state.repo.mark_reservation_processed(reservation_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::ReservationNotFound(id)) => {
            Err(ApiError::NotFound(format!("reservation {id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlockForm {
    room_id: String,
    start: String,
    end: String,
}

/// Close a room for a date span without a reservation behind it.
async fn block_room(
    _admin: AdminUser,
    State(state): State<AppState>,
    Form(form): Form<BlockForm>,
) -> Result<Response, ApiError> {
    let span =
        StaySpan::parse(&form.start, &form.end).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let room_id = form
        .room_id
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest("room_id must be an integer".to_string()))?;

    match state.repo.block_room(room_id, span).await {
        Ok(restriction) => {
            info!(room_id, start = %span.start(), end = %span.end(), "room blocked");
            Ok((StatusCode::CREATED, Json(restriction)).into_response())
        }
        Err(StoreError::RoomNotFound(id)) => {
            Err(ApiError::NotFound(format!("room {id} not found")))
        }
        Err(StoreError::SpanConflict { room_id }) => Err(ApiError::Conflict(format!(
            "room {room_id} already has a restriction overlapping those dates"
        ))),
        Err(e) => Err(e.into()),
    }
}
