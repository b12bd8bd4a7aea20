#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use hearth_api::{app, session::SessionStore, AppState};
use hearth_booking::{BookingService, MailSettings};
use hearth_notify::{Dispatcher, RecordingMailer};
use hearth_store::MemoryBookingRepository;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// The whole application over the in-memory repository and a recording
/// mail transport, plus handles to both for seeding and assertions.
pub struct TestApp {
    pub app: Router,
    pub repo: Arc<MemoryBookingRepository>,
    pub recorder: Arc<RecordingMailer>,
}

pub fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryBookingRepository::new());
    let recorder = Arc::new(RecordingMailer::new());
    let (mailer, _worker) = Dispatcher::spawn(recorder.clone());
    let booking = Arc::new(BookingService::new(
        repo.clone(),
        mailer,
        MailSettings {
            from: "stay@hearth.test".to_string(),
            owner: "owner@hearth.test".to_string(),
        },
    ));
    let state = AppState {
        repo: repo.clone(),
        booking,
        sessions: SessionStore::new(3600, false),
    };
    TestApp {
        app: app(state),
        repo,
        recorder,
    }
}

pub async fn get(app: &Router, path: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_form(app: &Router, path: &str, cookie: Option<&str>, body: &str) -> Response {
    form_request(app, "POST", path, cookie, body).await
}

pub async fn put(app: &Router, path: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method("PUT").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn form_request(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    body: &str,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// The `name=value` pair of the session cookie a response set.
pub fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect should carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Fetch `/` with the given session and return the flash it served,
/// consuming it.
pub async fn flash_at_home(app: &Router, cookie: &str) -> serde_json::Value {
    let response = get(app, "/", Some(cookie)).await;
    json_body(response).await["flash"].clone()
}
