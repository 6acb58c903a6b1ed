//! Declarative validation for configuration-update documents.
//!
//! Updates arrive as arbitrarily nested JSON. The document is flattened to
//! dot-joined key paths, each path with a matching entry in the rule table
//! is checked against its rule kind, and the first violation aborts the
//! whole update. Keys without a rule pass through untouched — partial
//! updates only carry the fields they change, and the device has always
//! accepted documents with extra keys.

pub mod rules;

pub use rules::{is_valid_timezone, FieldRule, RuleKind, BUTTON_ACTIONS, CONFIG_RULES, LED_EFFECTS};

use crate::device;
use serde_json::Value;

/// A rejected field: `Display` renders as `"<fieldPath> <reason>"`, which
/// is the exact error string the API returns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate a configuration-update document against [`CONFIG_RULES`].
///
/// Pure: the same document and rule table always produce the same verdict,
/// and the input is never mutated. Unknown keys are deliberately ignored
/// (see module docs).
pub fn validate_update(doc: &Value) -> Result<(), ValidationError> {
    let mut flat = Vec::new();
    flatten("", doc, &mut flat);

    for (path, value) in &flat {
        if let Some(rule) = rules::find_rule(path) {
            check(rule, path, value)?;
        }
    }
    Ok(())
}

/// Flatten nested objects into dot-joined leaf paths. Arrays and scalars
/// are leaves; only objects recurse.
fn flatten<'a>(prefix: &str, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        _ => out.push((prefix.to_string(), value)),
    }
}

fn check(rule: &FieldRule, path: &str, value: &Value) -> Result<(), ValidationError> {
    match rule.kind {
        RuleKind::AnyString => {
            if !value.is_string() {
                return Err(ValidationError::new(path, "must be a string"));
            }
        }
        RuleKind::NonEmptyString => match value.as_str() {
            None => return Err(ValidationError::new(path, "must be a string")),
            Some("") => return Err(ValidationError::new(path, "cannot be empty")),
            Some(_) => {}
        },
        RuleKind::Timezone => match value.as_str() {
            None => return Err(ValidationError::new(path, "must be a string")),
            Some("") => return Err(ValidationError::new(path, "cannot be empty")),
            Some(tz) if !is_valid_timezone(tz) => {
                return Err(ValidationError::new(
                    path,
                    format!("invalid timezone: {tz} (expected Area/Location, e.g. Europe/London)"),
                ));
            }
            Some(_) => {}
        },
        RuleKind::GpioPin => {
            let Some(pin) = value.as_i64() else {
                return Err(ValidationError::new(path, "must be a pin number"));
            };
            if !device::is_valid_pin(pin) {
                return Err(ValidationError::new(path, format!("invalid pin: {pin}")));
            }
            if !device::is_safe_pin(pin) {
                return Err(ValidationError::new(
                    path,
                    format!("unsafe pin: {pin} ({})", device::pin_description(pin)),
                ));
            }
        }
        RuleKind::BoundedInt { min, max } => match value.as_i64() {
            None => return Err(ValidationError::new(path, "must be an integer")),
            Some(n) if n < min || n > max => {
                return Err(ValidationError::new(
                    path,
                    format!("must be between {min} and {max}"),
                ));
            }
            Some(_) => {}
        },
        RuleKind::Boolean => {
            if !value.is_boolean() {
                return Err(ValidationError::new(path, "must be true or false"));
            }
        }
        RuleKind::OneOf(allowed) => match value.as_str() {
            None => return Err(ValidationError::new(path, "must be a string")),
            Some(s) if !allowed.contains(&s) => {
                return Err(ValidationError::new(path, format!("invalid value: {s}")));
            }
            Some(_) => {}
        },
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_builds_dotted_paths() {
        let doc = json!({"device": {"owner": "Ada"}, "buttons": {"button1": {"gpio": 4}}});
        let mut flat = Vec::new();
        flatten("", &doc, &mut flat);

        let paths: Vec<&str> = flat.iter().map(|(p, _)| p.as_str()).collect();
        assert!(paths.contains(&"device.owner"));
        assert!(paths.contains(&"buttons.button1.gpio"));
    }

    #[test]
    fn arrays_are_leaves() {
        let doc = json!({"wifi": {"channels": [1, 6, 11]}});
        let mut flat = Vec::new();
        flatten("", &doc, &mut flat);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].0, "wifi.channels");
        assert!(flat[0].1.is_array());
    }

    #[test]
    fn unknown_keys_only_document_passes() {
        let doc = json!({"future": {"feature": true}, "unrelated": 42});
        assert!(validate_update(&doc).is_ok());
    }

    #[test]
    fn valid_partial_update_passes() {
        let doc = json!({
            "device": {"owner": "Ada", "timezone": "Europe/London"},
            "mqtt": {"enabled": true, "port": 1883}
        });
        assert!(validate_update(&doc).is_ok());
    }

    #[test]
    fn unsafe_pin_is_rejected_with_unsafe_message() {
        let doc = json!({"device": {"printerTxPin": 9}});
        let err = validate_update(&doc).unwrap_err();
        assert_eq!(err.field, "device.printerTxPin");
        assert!(err.reason.contains("unsafe pin: 9"));
    }

    #[test]
    fn unassigned_pin_is_accepted() {
        let doc = json!({"device": {"printerRxPin": -1}});
        assert!(validate_update(&doc).is_ok());
    }

    #[test]
    fn unknown_pin_is_rejected_with_invalid_message() {
        let doc = json!({"device": {"printerTxPin": 99}});
        let err = validate_update(&doc).unwrap_err();
        assert!(err.reason.contains("invalid pin: 99"));
        assert!(!err.reason.contains("unsafe"));
    }

    #[test]
    fn non_numeric_pin_is_rejected() {
        let doc = json!({"leds": {"pin": "twenty"}});
        let err = validate_update(&doc).unwrap_err();
        assert_eq!(err.reason, "must be a pin number");
    }

    #[test]
    fn timezone_acceptance_matrix() {
        for tz in ["Europe/London", "UTC", "GMT", "America/New_York", "Etc/GMT+2"] {
            let doc = json!({"device": {"timezone": tz}});
            assert!(validate_update(&doc).is_ok(), "expected accept: {tz}");
        }
        for tz in [" Europe/London", "Foo/Bar", "Europe/", "/London", "Europe/New City"] {
            let doc = json!({"device": {"timezone": tz}});
            assert!(validate_update(&doc).is_err(), "expected reject: {tz}");
        }
    }

    #[test]
    fn bounded_int_enforces_inclusive_range() {
        assert!(validate_update(&json!({"mqtt": {"port": 1}})).is_ok());
        assert!(validate_update(&json!({"mqtt": {"port": 65535}})).is_ok());

        let err = validate_update(&json!({"mqtt": {"port": 0}})).unwrap_err();
        assert_eq!(err.to_string(), "mqtt.port must be between 1 and 65535");
    }

    #[test]
    fn boolean_rule_rejects_truthy_strings() {
        let err = validate_update(&json!({"mqtt": {"enabled": "true"}})).unwrap_err();
        assert_eq!(err.reason, "must be true or false");
    }

    #[test]
    fn enum_rule_rejects_unknown_action() {
        let err =
            validate_update(&json!({"buttons": {"button2": {"shortAction": "LAUNCH"}}}))
                .unwrap_err();
        assert_eq!(err.field, "buttons.button2.shortAction");
        assert!(err.reason.contains("invalid value"));
    }

    #[test]
    fn enum_rule_accepts_empty_action() {
        // "" means "no action bound" and is a legal enum member.
        assert!(validate_update(&json!({"buttons": {"button3": {"longAction": ""}}})).is_ok());
    }

    #[test]
    fn empty_owner_is_rejected() {
        let err = validate_update(&json!({"device": {"owner": ""}})).unwrap_err();
        assert_eq!(err.to_string(), "device.owner cannot be empty");
    }

    #[test]
    fn first_violation_short_circuits() {
        // serde_json object iteration is key-ordered, so "owner" is visited
        // before "timezone" regardless of insertion order.
        let doc = json!({
            "device": {"timezone": "Foo/Bar", "owner": ""}
        });
        let err = validate_update(&doc).unwrap_err();
        assert_eq!(err.field, "device.owner");
    }

    #[test]
    fn input_is_not_mutated() {
        let doc = json!({"device": {"printerTxPin": 9}});
        let before = doc.clone();
        let _ = validate_update(&doc);
        assert_eq!(doc, before);
    }
}
