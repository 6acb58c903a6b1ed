//! Static route registry backing `/api/routes`.
//!
//! The device publishes its own route table so the web UI and integration
//! tests can discover the API without hardcoding paths. The table is kept
//! by hand next to the router; the `manifest_covers_router` test keeps the
//! two honest.

use crate::config::OperatingMode;
use serde_json::{json, Value};

pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub api: bool,
}

pub const NORMAL_ROUTES: &[RouteInfo] = &[
    RouteInfo { method: "GET", path: "/", description: "Main interface", api: false },
    RouteInfo { method: "GET", path: "/index.html", description: "Main interface", api: false },
    RouteInfo { method: "GET", path: "/mqtt-printers", description: "Server-sent printer discovery events", api: false },
    RouteInfo { method: "GET", path: "/generate_204", description: "Connectivity check", api: false },
    RouteInfo { method: "GET", path: "/hotspot-detect.html", description: "Captive portal detection", api: false },
    RouteInfo { method: "GET", path: "/connectivity-check.html", description: "Network connectivity test", api: false },
    RouteInfo { method: "GET", path: "/ncsi.txt", description: "Network connectivity status indicator", api: false },
    RouteInfo { method: "GET", path: "/debug/assets", description: "Embedded asset listing", api: false },
    RouteInfo { method: "GET", path: "/api/routes", description: "List all routes and endpoints", api: true },
    RouteInfo { method: "GET", path: "/api/diagnostics", description: "System diagnostics", api: true },
    RouteInfo { method: "GET", path: "/api/config", description: "Get configuration", api: true },
    RouteInfo { method: "POST", path: "/api/config", description: "Update configuration", api: true },
    RouteInfo { method: "GET", path: "/api/wifi-scan", description: "Scan WiFi networks", api: true },
    RouteInfo { method: "POST", path: "/api/test-wifi", description: "Test WiFi credentials", api: true },
    RouteInfo { method: "POST", path: "/api/test-mqtt", description: "Test MQTT broker connection", api: true },
    RouteInfo { method: "GET", path: "/api/timezones", description: "List IANA timezones", api: true },
    RouteInfo { method: "GET", path: "/api/joke", description: "Generate random joke", api: true },
    RouteInfo { method: "GET", path: "/api/quote", description: "Generate random quote", api: true },
    RouteInfo { method: "GET", path: "/api/riddle", description: "Generate random riddle", api: true },
    RouteInfo { method: "POST", path: "/api/print-local", description: "Print custom message", api: true },
    RouteInfo { method: "GET", path: "/api/memo/{id}", description: "Get processed memo content", api: true },
    RouteInfo { method: "POST", path: "/api/memo/{id}", description: "Update specific memo", api: true },
    RouteInfo { method: "GET", path: "/api/memos", description: "Get all memos", api: true },
    RouteInfo { method: "POST", path: "/api/memos", description: "Update all memos", api: true },
];

pub const PROVISIONING_ROUTES: &[RouteInfo] = &[
    RouteInfo { method: "GET", path: "/setup.html", description: "Device setup", api: false },
    RouteInfo { method: "GET", path: "/api/setup", description: "Get setup state", api: true },
    RouteInfo { method: "POST", path: "/api/setup", description: "Apply setup configuration", api: true },
    RouteInfo { method: "GET", path: "/api/wifi-scan", description: "Scan WiFi networks", api: true },
    RouteInfo { method: "POST", path: "/api/test-wifi", description: "Test WiFi credentials", api: true },
    RouteInfo { method: "GET", path: "/api/timezones", description: "List IANA timezones", api: true },
];

fn routes_for(mode: OperatingMode) -> &'static [RouteInfo] {
    match mode {
        OperatingMode::Normal => NORMAL_ROUTES,
        OperatingMode::Provisioning => PROVISIONING_ROUTES,
    }
}

/// The manifest `/api/routes` serves: web pages and API endpoints, split
/// the way the device UI expects them.
pub fn manifest(mode: OperatingMode) -> Value {
    let routes = routes_for(mode);
    let web_pages: Vec<Value> = routes
        .iter()
        .filter(|r| !r.api)
        .map(|r| json!({"path": r.path, "description": r.description}))
        .collect();
    let api_endpoints: Vec<Value> = routes
        .iter()
        .filter(|r| r.api)
        .map(|r| json!({"method": r.method, "path": r.path, "description": r.description}))
        .collect();

    json!({
        "mode": match mode {
            OperatingMode::Normal => "normal",
            OperatingMode::Provisioning => "provisioning",
        },
        "endpoints": {
            "web_pages": web_pages,
            "api_endpoints": api_endpoints,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_splits_pages_and_api() {
        let manifest = manifest(OperatingMode::Normal);
        let endpoints = &manifest["endpoints"];
        assert!(endpoints["web_pages"].as_array().is_some_and(|a| !a.is_empty()));
        let api = endpoints["api_endpoints"].as_array().unwrap();
        assert!(api.iter().any(|e| e["path"] == "/api/config" && e["method"] == "POST"));
    }

    #[test]
    fn provisioning_routes_are_all_in_the_public_exception_list() {
        // Everything reachable during setup must also classify public under
        // the normal-mode table, or provisioning could dead-end.
        for route in PROVISIONING_ROUTES {
            assert!(
                !crate::auth::requires_auth(route.path, OperatingMode::Normal),
                "provisioning route classified private: {}",
                route.path
            );
        }
    }
}
