//! Request gate: public/private path classification and session cookies.
//!
//! Classification lives in one declarative table instead of scattered
//! prefix checks, so the public/private contract is auditable in a single
//! screen. Rules are matched top to bottom; the first hit wins; anything
//! unmatched is public (static assets).
//!
//! ## Design Decisions
//! - Provisioning mode bypasses the table entirely — the setup flow must
//!   work before any session can exist.
//! - The owner address recorded at session creation is advisory: proxies
//!   rewrite client addresses, so a mismatch logs a warning and nothing
//!   more.

use crate::config::OperatingMode;
use crate::gateway::AppState;
use crate::session::TOKEN_LEN;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use std::net::IpAddr;
use std::time::Duration;

/// Fixed session cookie name.
pub const SESSION_COOKIE_NAME: &str = "PlumeSession";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == p,
            Pattern::Prefix(p) => path.starts_with(p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Public,
    Private,
}

/// The public/private contract, in one place. Order matters: the API
/// exception list must precede the `/api/` catch-all.
const PATH_POLICY: &[(Pattern, Visibility)] = &[
    // Documents served without a session (the root issues one).
    (Pattern::Exact("/"), Visibility::Public),
    (Pattern::Exact("/index.html"), Visibility::Public),
    (Pattern::Exact("/setup.html"), Visibility::Public),
    (Pattern::Exact("/404.html"), Visibility::Public),
    // Icons.
    (Pattern::Exact("/favicon.svg"), Visibility::Public),
    (Pattern::Exact("/favicon.ico"), Visibility::Public),
    (Pattern::Exact("/apple-touch-icon.png"), Visibility::Public),
    // Asset trees.
    (Pattern::Prefix("/css/"), Visibility::Public),
    (Pattern::Prefix("/js/"), Visibility::Public),
    (Pattern::Prefix("/images/"), Visibility::Public),
    (Pattern::Prefix("/fonts/"), Visibility::Public),
    // Route listing is intentionally public for discoverability.
    (Pattern::Exact("/api/routes"), Visibility::Public),
    // OS connectivity probes.
    (Pattern::Exact("/generate_204"), Visibility::Public),
    (Pattern::Exact("/hotspot-detect.html"), Visibility::Public),
    (Pattern::Exact("/connectivity-check.html"), Visibility::Public),
    (Pattern::Exact("/ncsi.txt"), Visibility::Public),
    // Endpoints that must work before a session can exist.
    (Pattern::Prefix("/api/setup"), Visibility::Public),
    (Pattern::Prefix("/api/wifi-scan"), Visibility::Public),
    (Pattern::Prefix("/api/test-wifi"), Visibility::Public),
    (Pattern::Prefix("/api/timezones"), Visibility::Public),
    // Everything else under the API prefix needs a session.
    (Pattern::Prefix("/api/"), Visibility::Private),
];

/// Whether `path` requires an authenticated session in the given mode.
pub fn requires_auth(path: &str, mode: OperatingMode) -> bool {
    if mode == OperatingMode::Provisioning {
        return false;
    }
    for (pattern, visibility) in PATH_POLICY {
        if pattern.matches(path) {
            return *visibility == Visibility::Private;
        }
    }
    false
}

/// Cookie string attached when the root document issues a session.
pub fn session_cookie_value(token: &str, timeout: Duration) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        timeout.as_secs()
    )
}

/// Extract the session token from the `Cookie` header. Values with the
/// wrong length are discarded here so the store never sees them.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in cookie_header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == SESSION_COOKIE_NAME {
            let value = value.trim();
            return (value.len() == TOKEN_LEN).then(|| value.to_string());
        }
    }
    None
}

/// Best-effort client identity: proxy headers first, loopback otherwise.
pub fn client_addr(headers: &HeaderMap) -> IpAddr {
    for header_name in ["X-Forwarded-For", "X-Real-IP"] {
        if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if let Ok(addr) = first.parse() {
                return addr;
            }
        }
    }
    IpAddr::from([127, 0, 0, 1])
}

/// Middleware applied to every route: public paths pass straight through;
/// private paths must present a live session, which is refreshed on the
/// way in. Rejections never reach the destination handler.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !requires_auth(path, state.mode) {
        return next.run(request).await;
    }

    let addr = client_addr(request.headers());
    let token = session_token_from_headers(request.headers());
    match token {
        Some(token) if state.sessions.validate(&token, addr) => {
            state.sessions.refresh(&token);
            next.run(request).await
        }
        _ => {
            let path = path.to_owned();
            tracing::warn!(%addr, %path, "rejected unauthenticated request to private path");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Authentication required", "code": 401})),
            )
                .into_response()
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NORMAL: OperatingMode = OperatingMode::Normal;

    #[test]
    fn provisioning_mode_makes_everything_public() {
        for path in ["/api/config", "/api/diagnostics", "/anything", "/"] {
            assert!(!requires_auth(path, OperatingMode::Provisioning));
        }
    }

    #[test]
    fn public_path_table_matches_the_contract() {
        for path in [
            "/",
            "/index.html",
            "/setup.html",
            "/404.html",
            "/favicon.svg",
            "/css/app.css",
            "/js/app.js",
            "/images/logo.png",
            "/fonts/outfit-variable.woff2",
            "/api/routes",
            "/generate_204",
            "/hotspot-detect.html",
            "/connectivity-check.html",
            "/ncsi.txt",
            "/api/setup",
            "/api/wifi-scan",
            "/api/test-wifi",
            "/api/timezones",
        ] {
            assert!(!requires_auth(path, NORMAL), "expected public: {path}");
        }
    }

    #[test]
    fn api_paths_are_private_by_default() {
        for path in [
            "/api/config",
            "/api/diagnostics",
            "/api/joke",
            "/api/memo/1",
            "/api/test-mqtt",
            "/api/print-local",
        ] {
            assert!(requires_auth(path, NORMAL), "expected private: {path}");
        }
    }

    #[test]
    fn non_api_unknown_paths_default_to_public() {
        assert!(!requires_auth("/settings/index.html", NORMAL));
        assert!(!requires_auth("/debug/assets", NORMAL));
    }

    #[test]
    fn root_match_is_exact_not_prefix() {
        // The historical firmware bug: "/" in a startsWith list classified
        // every path public. The exact-match entry must not swallow the API.
        assert!(requires_auth("/api/config", NORMAL));
    }

    #[test]
    fn cookie_value_carries_all_attributes() {
        let value = session_cookie_value("ab12", Duration::from_secs(14400));
        assert_eq!(
            value,
            "PlumeSession=ab12; HttpOnly; SameSite=Strict; Path=/; Max-Age=14400"
        );
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn token_extraction_finds_the_named_cookie() {
        let token = "a".repeat(TOKEN_LEN);
        let headers = headers_with_cookie(&format!("theme=dark; PlumeSession={token}; lang=en"));
        assert_eq!(
            session_token_from_headers(&headers).as_deref(),
            Some(token.as_str())
        );
    }

    #[test]
    fn token_extraction_rejects_wrong_length_values() {
        let headers = headers_with_cookie("PlumeSession=tooshort");
        assert!(session_token_from_headers(&headers).is_none());
    }

    #[test]
    fn token_extraction_handles_missing_header() {
        assert!(session_token_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn client_addr_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("10.0.0.7, 172.16.0.1"),
        );
        assert_eq!(client_addr(&headers), IpAddr::from([10, 0, 0, 7]));
    }

    #[test]
    fn client_addr_falls_back_to_loopback() {
        assert_eq!(client_addr(&HeaderMap::new()), IpAddr::from([127, 0, 0, 1]));
    }
}
