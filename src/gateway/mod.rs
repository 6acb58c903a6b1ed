//! Axum-based HTTP dispatcher for the emulated device API.
//!
//! Single entry point sequencing the cross-cutting concerns:
//! - CORS preflight handled uniformly for every path
//! - body limits (64KB) and request timeouts (30s), handled by tower-http
//! - the auth gate (see `crate::auth`) applied to every route
//! - a failure boundary converting handler panics into 500 responses
//!   instead of tearing the connection down
//!
//! Routing is by path prefix: probes, SSE stream, JSON API, debug
//! introspection, and the embedded static tree as the fallback.

pub mod assets;
pub mod handlers;
pub mod ops;
pub mod routes;

use crate::auth;
use crate::config::{Config, OperatingMode, SimulationConfig};
use crate::content::MemoStore;
use crate::session::{self, SessionStore};
use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::future::FutureExt;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::IntervalStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) — simulated delays stay well below this
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Cadence of the SSE printer-discovery stream.
const SSE_UPDATE_INTERVAL_SECS: u64 = 5;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Operating mode, fixed at process start — never toggled mid-request.
    pub mode: OperatingMode,
    pub sessions: Arc<SessionStore>,
    /// The nested device document served and mutated by `/api/config`.
    pub device_config: Arc<Mutex<Value>>,
    pub memos: Arc<MemoStore>,
    /// In-flight flags for the long-running test operations.
    pub tests: Arc<ops::TestGuard>,
    pub simulation: Arc<SimulationConfig>,
    /// Identity the emulator announces on the discovery stream.
    pub printer_id: Arc<str>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(mode: OperatingMode, config: &Config) -> Self {
        Self {
            mode,
            sessions: Arc::new(SessionStore::new(Duration::from_secs(
                config.session.timeout_secs,
            ))),
            device_config: Arc::new(Mutex::new(crate::config::default_device_document())),
            memos: Arc::new(MemoStore::default()),
            tests: Arc::new(ops::TestGuard::default()),
            simulation: Arc::new(config.simulation.clone()),
            printer_id: Arc::from(uuid::Uuid::new_v4().to_string()),
            started_at: Instant::now(),
        }
    }
}

/// Run the emulator gateway until the process is stopped.
pub async fn run(mode: OperatingMode, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual = listener.local_addr()?;

    let state = AppState::new(mode, &config);
    let _sweeper = session::spawn_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.session.sweep_interval_secs),
    );

    let app = build_router(state);

    tracing::info!(
        %actual,
        ?mode,
        "emulator listening — open http://{actual}/ in a browser"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Assemble the full middleware + route stack. Split out so tests can
/// drive the real router without binding a socket.
pub fn build_router(state: AppState) -> Router {
    // ── CORS — dev frontends run on their own origin ──
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let mut router = Router::new()
        .route("/", get(handle_index))
        .route("/index.html", get(handle_index))
        .route("/mqtt-printers", get(handle_printer_events))
        .route("/generate_204", get(handle_generate_204))
        .route("/hotspot-detect.html", get(handle_probe_page))
        .route("/connectivity-check.html", get(handle_probe_page))
        .route("/ncsi.txt", get(handle_ncsi))
        .route("/debug/assets", get(assets::handle_debug_assets))
        .route("/api/routes", get(handlers::handle_routes))
        .route("/api/diagnostics", get(handlers::handle_diagnostics))
        .route(
            "/api/config",
            get(handlers::handle_config_get).post(handlers::handle_config_post),
        )
        .route("/api/wifi-scan", get(handlers::handle_wifi_scan))
        .route("/api/test-wifi", post(handlers::handle_test_wifi))
        .route("/api/test-mqtt", post(handlers::handle_test_mqtt))
        .route("/api/timezones", get(handlers::handle_timezones))
        .route("/api/joke", get(handlers::handle_joke))
        .route("/api/quote", get(handlers::handle_quote))
        .route("/api/riddle", get(handlers::handle_riddle))
        .route("/api/print-local", post(handlers::handle_print_local))
        .route(
            "/api/memo/{id}",
            get(handlers::handle_memo_get).post(handlers::handle_memo_post),
        )
        .route(
            "/api/memos",
            get(handlers::handle_memos_get).post(handlers::handle_memos_post),
        );

    // Provisioning-only surface: absent (404) in normal mode.
    if state.mode == OperatingMode::Provisioning {
        router = router.route(
            "/api/setup",
            get(handlers::handle_setup_get).post(handlers::handle_setup_post),
        );
    }

    router
        .fallback(assets::static_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(axum::middleware::from_fn(failure_boundary))
}

// ══════════════════════════════════════════════════════════════════════════════
// DISPATCHER MIDDLEWARE
// ══════════════════════════════════════════════════════════════════════════════

/// Outermost failure boundary: a panic anywhere below becomes a logged 500
/// instead of a dropped connection. API paths get a structured error body;
/// everything else gets the fallback page.
async fn failure_boundary(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic_detail(panic.as_ref());
            tracing::error!(%path, %detail, "handler panicked; responding 500");
            if path.starts_with("/api/") {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            } else {
                assets::error_page()
            }
        }
    }
}

fn panic_detail(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// PAGE + PROBE HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET / and /index.html — the sole session-issuance point. A request
/// without a live session gets a fresh one attached as a cookie; expiry on
/// a page load is therefore silent.
async fn handle_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.mode == OperatingMode::Provisioning {
        return Redirect::temporary("/setup.html").into_response();
    }

    let mut response = assets::serve("index.html").unwrap_or_else(assets::not_found_page);

    let addr = auth::client_addr(&headers);
    let has_session = auth::session_token_from_headers(&headers)
        .is_some_and(|token| state.sessions.validate(&token, addr));
    if !has_session {
        let token = state.sessions.create(addr);
        let cookie = auth::session_cookie_value(&token, state.sessions.timeout());
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// In provisioning mode every OS connectivity probe redirects to the setup
/// page — that is what pops the captive-portal sheet on phones. In normal
/// mode the probes answer success so clients consider the network healthy.
fn captive_redirect(mode: OperatingMode) -> Option<Response> {
    (mode == OperatingMode::Provisioning)
        .then(|| Redirect::temporary("/setup.html").into_response())
}

/// GET /generate_204 — Android-style connectivity probe.
async fn handle_generate_204(State(state): State<AppState>) -> Response {
    captive_redirect(state.mode).unwrap_or_else(|| StatusCode::NO_CONTENT.into_response())
}

/// GET /hotspot-detect.html and /connectivity-check.html.
async fn handle_probe_page(State(state): State<AppState>) -> Response {
    captive_redirect(state.mode).unwrap_or_else(|| {
        (
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>OK</body></html>",
        )
            .into_response()
    })
}

/// GET /ncsi.txt — Windows connectivity indicator.
async fn handle_ncsi(State(state): State<AppState>) -> Response {
    captive_redirect(state.mode)
        .unwrap_or_else(|| ([(header::CONTENT_TYPE, "text/plain")], "Microsoft NCSI").into_response())
}

/// GET /mqtt-printers — SSE discovery stream. The emulator announces
/// itself as the only online printer, refreshed on a fixed cadence.
async fn handle_printer_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let ticker = tokio::time::interval(Duration::from_secs(SSE_UPDATE_INTERVAL_SECS));
    let stream = IntervalStream::new(ticker).map(move |_| {
        Ok(Event::default()
            .event("printer-update")
            .data(discovered_printers(&state).to_string()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn discovered_printers(state: &AppState) -> Value {
    let doc = state.device_config.lock();
    json!({
        "discovered_printers": [{
            "printerId": state.printer_id.as_ref(),
            "name": doc["device"]["owner"].clone(),
            "firmwareVersion": env!("CARGO_PKG_VERSION"),
            "ipAddress": "127.0.0.1",
            "status": "online",
            "timezone": doc["device"]["timezone"].clone(),
        }],
        "count": 1,
        "ourPrinterId": state.printer_id.as_ref(),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// TESTS
// ══════════════════════════════════════════════════════════════════════════════
