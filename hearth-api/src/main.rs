use std::net::SocketAddr;
use std::sync::Arc;

use hearth_api::{app, session::SessionStore, AppState};
use hearth_booking::{BookingService, MailSettings};
use hearth_core::BookingRepository;
use hearth_notify::{Dispatcher, LogMailer, MailTransport, SmtpConfig, SmtpMailer};
use hearth_store::{Config, DbClient, MailTransportKind, PgBookingRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Hearth API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let repo: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(db.pool.clone()));

    let transport: Arc<dyn MailTransport> = match config.mail.transport {
        MailTransportKind::Log => Arc::new(LogMailer),
        MailTransportKind::Smtp => {
            let smtp = SmtpConfig {
                host: config
                    .mail
                    .smtp_host
                    .clone()
                    .expect("mail.smtp_host is required for the smtp transport"),
                port: config.mail.smtp_port,
                user: config.mail.smtp_user.clone(),
                password: config.mail.smtp_password.clone(),
            };
            Arc::new(SmtpMailer::new(&smtp).expect("Failed to build SMTP transport"))
        }
    };
    let (mailer, dispatcher) = Dispatcher::spawn(transport);

    let booking = Arc::new(BookingService::new(
        repo.clone(),
        mailer,
        MailSettings {
            from: config.mail.from.clone(),
            owner: config.mail.owner.clone(),
        },
    ));
    let sessions = SessionStore::new(config.session.ttl_seconds, config.session.cookie_secure);

    let app = app(AppState {
        repo,
        booking,
        sessions,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();

    // Serving is over and every enqueue handle is gone; let the dispatcher
    // drain what is left of the queue before the process exits.
    dispatcher.await.unwrap();
}
