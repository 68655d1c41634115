//! HTTP API server with SSE support

use super::{admin, auth, chat, directory, procedures, tickets};
use super::{
    events::{Event, EventBroadcaster},
    state::AppState,
};
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr};
use tokio_stream::{wrappers::BroadcastStream, StreamExt as _};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// Interval between heartbeat events
const HEARTBEAT_SECS: u64 = 30;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Event channel capacity
    pub event_capacity: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
            event_capacity: 1000,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    /// Shutdown signal for background tasks
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    /// Heartbeat task handle for cleanup
    heartbeat_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            state,
            shutdown_tx,
            heartbeat_handle: None,
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.state.events
    }

    pub fn instance_id(&self) -> &str {
        &self.state.instance_id
    }

    /// Build router
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            // Sessions
            .route("/auth/login", post(auth::login_handler))
            .route("/auth/logout", post(auth::logout_handler))
            .route("/auth/me", get(auth::me_handler))
            // Tickets
            .route(
                "/tickets",
                get(tickets::list_tickets_handler).post(tickets::create_ticket_handler),
            )
            .route("/tickets/:id", get(tickets::get_ticket_handler))
            .route("/tickets/:id/status", patch(tickets::update_status_handler))
            .route("/tickets/:id/export", get(tickets::export_ticket_handler))
            // Procedures
            .route(
                "/procedures",
                get(procedures::list_procedures_handler).post(procedures::create_procedure_handler),
            )
            .route("/procedures/template", get(procedures::template_handler))
            .route("/procedures/analyze", post(procedures::analyze_handler))
            .route(
                "/procedures/:id",
                put(procedures::update_procedure_handler)
                    .delete(procedures::delete_procedure_handler),
            )
            // Students and accounts
            .route(
                "/students",
                get(directory::list_students_handler).post(directory::create_student_handler),
            )
            .route(
                "/students/:id",
                get(directory::get_student_handler)
                    .put(directory::update_student_handler)
                    .delete(directory::delete_student_handler),
            )
            .route(
                "/accounts",
                get(directory::list_accounts_handler).post(directory::create_account_handler),
            )
            .route(
                "/accounts/:username",
                put(directory::update_account_handler)
                    .delete(directory::delete_account_handler),
            )
            // Notifications
            .route("/notifications", get(admin::list_notifications_handler))
            .route("/notifications/clear", post(admin::clear_notifications_handler))
            .route("/notifications/:id/read", post(admin::mark_read_handler))
            // Chat
            .route(
                "/chat/history",
                get(chat::history_handler).delete(chat::clear_history_handler),
            )
            .route("/chat/messages", post(chat::send_message_handler))
            .route("/chat/tickets", post(chat::create_ticket_handler))
            .route("/chat/suggestions", get(chat::suggestions_handler))
            // Administration
            .route("/admin/logs", get(admin::system_logs_handler))
            .route("/admin/dashboard", get(admin::dashboard_handler))
            // Event streaming
            .route("/events", get(events_handler))
            // Health check
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until the process exits
    pub async fn serve(mut self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state.clone());
        let events = self.state.events.clone();
        let instance_id = self.state.instance_id.clone();

        events.publish(Event::session_started(instance_id.clone()));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let heartbeat_events = events.clone();
        let heartbeat_instance = instance_id.clone();
        self.heartbeat_handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(HEARTBEAT_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        heartbeat_events.publish(Event::heartbeat(heartbeat_instance.clone()));
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Heartbeat task received shutdown signal");
                        break;
                    }
                }
            }
        }));

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!(
            "API server [{}] listening on http://{}",
            instance_id, self.config.addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server [{}] stopped", instance_id);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// SSE events handler
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    debug!("New SSE client connected");

    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok(SseEvent::default().data(data).id(event.id)))
        }
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
    subscribers: usize,
    sessions: usize,
    assistant: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        subscribers: state.events.subscriber_count(),
        sessions: state.sessions.count().await,
        assistant: state.assistant.is_available(),
    })
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.heartbeat_handle.take() {
            handle.abort();
            debug!("ApiServer dropped - heartbeat task aborted");
        }
    }
}
