//! Embedded static assets with mode-dependent serving.
//!
//! The device UI is compiled into the binary. Normal mode serves the full
//! tree and answers unknown paths with the embedded 404 page; provisioning
//! mode serves only the setup page plus a small allow-list and redirects
//! everything else to `/setup.html` (captive-portal behavior).

use crate::config::OperatingMode;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use rust_embed::RustEmbed;

use super::AppState;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Prefixes still served while provisioning (the setup page needs them).
const PROVISIONING_ALLOWED: &[&str] = &["/css/", "/js/", "/favicon.svg"];

/// Cache lifetime for fingerprinted-ish assets (css/js/images/fonts).
const ASSET_CACHE_CONTROL: &str = "max-age=31536000";

/// Fallback handler for everything the router does not match explicitly.
pub async fn static_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    match state.mode {
        OperatingMode::Provisioning => {
            if path == "/setup.html" {
                return serve("setup.html").unwrap_or_else(not_found_page);
            }
            if PROVISIONING_ALLOWED.iter().any(|p| path.starts_with(p)) {
                if let Some(response) = serve(path.trim_start_matches('/')) {
                    return response;
                }
            }
            Redirect::temporary("/setup.html").into_response()
        }
        OperatingMode::Normal => {
            let file = match path.trim_start_matches('/') {
                "" => "index.html",
                other => other,
            };
            serve(file).unwrap_or_else(not_found_page)
        }
    }
}

/// Serve one embedded file, or `None` when it does not exist.
pub fn serve(file: &str) -> Option<Response> {
    let asset = Assets::get(file)?;
    let mime = mime_guess::from_path(file).first_or_octet_stream();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref());
    if !file.ends_with(".html") {
        builder = builder.header(header::CACHE_CONTROL, ASSET_CACHE_CONTROL);
    }
    builder.body(Body::from(asset.data.into_owned())).ok()
}

/// The embedded 404 page with a 404 status.
pub fn not_found_page() -> Response {
    page_with_status(StatusCode::NOT_FOUND)
}

/// The same fallback page, but for dispatcher-caught failures.
pub fn error_page() -> Response {
    page_with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

fn page_with_status(status: StatusCode) -> Response {
    let body = Assets::get("404.html")
        .map(|asset| asset.data.into_owned())
        .unwrap_or_else(|| b"Not found".to_vec());
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// `GET /debug/assets` — what the binary actually embeds, for debugging
/// frontend build problems.
pub async fn handle_debug_assets() -> Response {
    let mut output = String::from("Embedded assets:\n\n");
    for file in Assets::iter() {
        let size = Assets::get(&file).map_or(0, |a| a.data.len());
        output.push_str(&format!("{file} ({size} bytes)\n"));
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
        .into_response()
}
