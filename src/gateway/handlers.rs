//! JSON API handlers.
//!
//! Auth has already happened by the time these run — the gate middleware
//! rejects unauthenticated requests to private paths — so handlers only
//! deal with their own input validation and the long-operation guards.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::ops::TestKind;
use super::{routes, AppState};
use crate::content;
use crate::device;
use crate::validation;

/// Body envelope for JSON rejections: the client gets one generic message
/// whatever the parse failure was.
fn malformed_body(err: &JsonRejection) -> (StatusCode, Json<Value>) {
    tracing::debug!(error = %err, "rejected malformed JSON body");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Invalid JSON body"})),
    )
}

fn conflict() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CONFLICT,
        Json(json!({"error": "Test already running"})),
    )
}

// ── Routes & diagnostics ────────────────────────────────────────────

/// GET /api/routes — public route manifest.
pub async fn handle_routes(State(state): State<AppState>) -> Json<Value> {
    Json(routes::manifest(state.mode))
}

/// GET /api/diagnostics
pub async fn handle_diagnostics(State(state): State<AppState>) -> Json<Value> {
    let stats = state.sessions.stats();
    Json(json!({
        "board": device::BOARD_NAME,
        "printerId": state.printer_id.as_ref(),
        "firmwareVersion": env!("CARGO_PKG_VERSION"),
        "emulated": true,
        "uptimeMs": state.started_at.elapsed().as_millis() as u64,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sessions": {
            "active": stats.active,
            "totalCreated": stats.total_created,
        },
    }))
}

// ── Configuration ───────────────────────────────────────────────────

/// GET /api/config — the full device document.
pub async fn handle_config_get(State(state): State<AppState>) -> Json<Value> {
    Json(state.device_config.lock().clone())
}

/// POST /api/config — validated partial update, deep-merged on success.
pub async fn handle_config_post(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };

    if let Err(e) = validation::validate_update(&update) {
        tracing::warn!(field = %e.field, "configuration update rejected");
        return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})));
    }

    let mut doc = state.device_config.lock();
    crate::config::merge_update(&mut doc, &update);
    tracing::info!("configuration updated");
    (StatusCode::OK, Json(json!({"status": "saved"})))
}

// ── Provisioning ────────────────────────────────────────────────────

/// GET /api/setup — current setup state plus what the picker UIs need.
pub async fn handle_setup_get(State(state): State<AppState>) -> Json<Value> {
    let doc = state.device_config.lock();
    Json(json!({
        "board": device::BOARD_NAME,
        "printerId": state.printer_id.as_ref(),
        "device": doc["device"].clone(),
        "wifi": {"ssid": doc["wifi"]["ssid"].clone()},
        "safePins": device::safe_pins(),
    }))
}

/// POST /api/setup — apply the provisioning document. Same rule table as
/// `/api/config`; the emulator keeps running in provisioning mode rather
/// than rebooting like the hardware does.
pub async fn handle_setup_post(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };

    if let Err(e) = validation::validate_update(&update) {
        tracing::warn!(field = %e.field, "setup submission rejected");
        return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})));
    }

    let mut doc = state.device_config.lock();
    crate::config::merge_update(&mut doc, &update);
    tracing::info!("setup configuration saved");
    (
        StatusCode::OK,
        Json(json!({
            "status": "saved",
            "note": "restart without --provisioning to use the full interface",
        })),
    )
}

// ── Network ─────────────────────────────────────────────────────────

fn signal_strength(rssi: i32) -> &'static str {
    if rssi > -50 {
        "Excellent"
    } else if rssi > -60 {
        "Good"
    } else if rssi > -70 {
        "Fair"
    } else {
        "Weak"
    }
}

/// GET /api/wifi-scan — canned network list after a short scan delay.
pub async fn handle_wifi_scan(State(state): State<AppState>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(state.simulation.scan_delay_ms)).await;

    let networks: Vec<Value> = state
        .simulation
        .networks
        .iter()
        .map(|n| {
            json!({
                "ssid": n.ssid,
                "rssi": n.rssi,
                "secured": n.secured,
                "signal_strength": signal_strength(n.rssi),
            })
        })
        .collect();

    tracing::debug!(count = networks.len(), "wifi scan served");
    Json(json!({"networks": networks, "count": networks.len()}))
}

#[derive(Debug, Deserialize)]
pub struct WifiTestBody {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/test-wifi — guarded credential test with a simulated connect
/// delay. Succeeds when the SSID exists in the emulated neighborhood and
/// the password satisfies the (open network aside) WPA minimum.
pub async fn handle_test_wifi(
    State(state): State<AppState>,
    body: Result<Json<WifiTestBody>, JsonRejection>,
) -> impl IntoResponse {
    let Some(_running) = state.tests.try_start(TestKind::Wifi) else {
        tracing::warn!("wifi test rejected: already running");
        return conflict();
    };

    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };
    if body.ssid.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ssid is required"})),
        );
    }

    tokio::time::sleep(Duration::from_millis(state.simulation.wifi_test_delay_ms)).await;

    let network = state
        .simulation
        .networks
        .iter()
        .find(|n| n.ssid == body.ssid);
    let response = match network {
        Some(n) if !n.secured || body.password.len() >= 8 => {
            json!({"success": true, "rssi": n.rssi})
        }
        Some(_) => json!({"success": false, "reason": "Authentication failed"}),
        None => json!({"success": false, "reason": "Network not found"}),
    };

    tracing::info!(ssid = %body.ssid, success = response["success"] == true, "wifi test finished");
    (StatusCode::OK, Json(response))
}

#[derive(Debug, Deserialize)]
pub struct BrokerTestBody {
    #[serde(default)]
    pub server: String,
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/test-mqtt — guarded broker connectivity test.
pub async fn handle_test_mqtt(
    State(state): State<AppState>,
    body: Result<Json<BrokerTestBody>, JsonRejection>,
) -> impl IntoResponse {
    let Some(_running) = state.tests.try_start(TestKind::Broker) else {
        tracing::warn!("broker test rejected: already running");
        return conflict();
    };

    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };
    if body.server.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "server is required"})),
        );
    }
    let Some(port) = body.port else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "port is required"})),
        );
    };

    let delay = Duration::from_millis(state.simulation.broker_test_delay_ms);
    tokio::time::sleep(delay).await;

    let response = if state.simulation.broker_reachable {
        json!({"success": true, "latencyMs": delay.as_millis() as u64})
    } else {
        json!({"success": false, "reason": format!("Could not reach {}:{port}", body.server)})
    };

    tracing::info!(server = %body.server, %port, "broker test finished");
    (StatusCode::OK, Json(response))
}

// ── Timezones ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TimezoneQuery {
    /// Case-insensitive substring filter.
    pub q: Option<String>,
}

/// GET /api/timezones — the zone identifiers the device accepts, from the
/// bundled tz database, optionally filtered.
pub async fn handle_timezones(Query(query): Query<TimezoneQuery>) -> Json<Value> {
    let needle = query.q.unwrap_or_default().to_lowercase();
    let zones: Vec<&str> = chrono_tz::TZ_VARIANTS
        .iter()
        .map(|tz| tz.name())
        .filter(|name| validation::is_valid_timezone(name))
        .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
        .collect();

    Json(json!({"timezones": zones, "count": zones.len()}))
}

// ── Content ─────────────────────────────────────────────────────────

/// GET /api/joke
pub async fn handle_joke() -> Json<Value> {
    Json(json!({"joke": content::random_joke()}))
}

/// GET /api/quote
pub async fn handle_quote() -> Json<Value> {
    Json(json!({"quote": content::random_quote()}))
}

/// GET /api/riddle
pub async fn handle_riddle() -> Json<Value> {
    let (question, answer) = content::random_riddle();
    Json(json!({"riddle": question, "answer": answer}))
}

#[derive(Debug, Deserialize)]
pub struct PrintBody {
    #[serde(default)]
    pub message: String,
}

/// POST /api/print-local — validate and "print" (log) a message.
pub async fn handle_print_local(
    body: Result<Json<PrintBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };

    if let Err(e) = content::validate_message(&body.message) {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})));
    }

    tracing::info!(characters = body.message.chars().count(), "print job accepted");
    (
        StatusCode::OK,
        Json(json!({
            "status": "printed",
            "characters": body.message.chars().count(),
        })),
    )
}

// ── Memos ───────────────────────────────────────────────────────────

fn memo_not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Memo not found"})))
}

/// GET /api/memo/{id}
pub async fn handle_memo_get(
    State(state): State<AppState>,
    Path(id): Path<usize>,
) -> impl IntoResponse {
    match (state.memos.get(id), state.memos.get_expanded(id)) {
        (Some(content), Some(expanded)) => (
            StatusCode::OK,
            Json(json!({"id": id, "content": content, "expanded": expanded})),
        ),
        _ => memo_not_found(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MemoBody {
    #[serde(default)]
    pub content: String,
}

/// POST /api/memo/{id}
pub async fn handle_memo_post(
    State(state): State<AppState>,
    Path(id): Path<usize>,
    body: Result<Json<MemoBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };

    match state.memos.set(id, &body.content) {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "saved", "id": id}))),
        Err(content::MessageError::InvalidSlot) => memo_not_found(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))),
    }
}

/// GET /api/memos
pub async fn handle_memos_get(State(state): State<AppState>) -> Json<Value> {
    let memos: Vec<Value> = state
        .memos
        .all()
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            json!({
                "id": i + 1,
                "content": content,
                "expanded": content::expand_placeholders(&content),
            })
        })
        .collect();
    Json(json!({"memos": memos}))
}

#[derive(Debug, Deserialize)]
pub struct MemosBody {
    pub memos: Vec<String>,
}

/// POST /api/memos — replace all four slots atomically: every slot is
/// checked before any slot is written.
pub async fn handle_memos_post(
    State(state): State<AppState>,
    body: Result<Json<MemosBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return malformed_body(&e),
    };

    if body.memos.len() != content::MEMO_COUNT {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Expected exactly {} memos", content::MEMO_COUNT)})),
        );
    }
    if let Some(oversized) = body
        .memos
        .iter()
        .position(|m| m.chars().count() > content::MEMO_MAX_CHARS)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Memo {} too long", oversized + 1)})),
        );
    }

    for (i, memo) in body.memos.iter().enumerate() {
        // Length was checked above; set cannot fail here.
        let _ = state.memos.set(i + 1, memo);
    }
    (StatusCode::OK, Json(json!({"status": "saved"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_strength_thresholds() {
        assert_eq!(signal_strength(-40), "Excellent");
        assert_eq!(signal_strength(-55), "Good");
        assert_eq!(signal_strength(-65), "Fair");
        assert_eq!(signal_strength(-80), "Weak");
    }
}
