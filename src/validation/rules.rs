//! The configuration field registry: one rule per settable field.
//!
//! Single source of truth for what `/api/config` (and the provisioning
//! setup endpoint) will accept. Adding a field means adding one entry
//! here; the kind enum is matched exhaustively in the checker, so a new
//! kind is a compile-time-visible change.

/// Validation kind, with kind-specific constraints inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Any string, empty allowed.
    AnyString,
    /// String that must be non-empty.
    NonEmptyString,
    /// IANA timezone identifier (see [`is_valid_timezone`]).
    Timezone,
    /// GPIO pin: must be valid for the board and in the safe subset.
    GpioPin,
    /// Integer within an inclusive range.
    BoundedInt { min: i64, max: i64 },
    /// Strict boolean.
    Boolean,
    /// String drawn from a fixed set.
    OneOf(&'static [&'static str]),
}

/// A dot-joined field path bound to its rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub path: &'static str,
    pub kind: RuleKind,
}

/// Actions assignable to a hardware button press. The empty string unbinds.
pub const BUTTON_ACTIONS: &[&str] = &[
    "JOKE", "RIDDLE", "QUOTE", "QUIZ", "POKE", "AUTO_INK", "MEMO1", "MEMO2", "MEMO3", "MEMO4", "",
];

/// LED strip effects the firmware ships with.
pub const LED_EFFECTS: &[&str] = &[
    "chase_single",
    "chase_multi",
    "rainbow",
    "twinkle",
    "pulse",
    "matrix",
    "none",
];

pub const CONFIG_RULES: &[FieldRule] = &[
    // Device
    FieldRule { path: "device.owner", kind: RuleKind::NonEmptyString },
    FieldRule { path: "device.timezone", kind: RuleKind::Timezone },
    FieldRule { path: "device.printerTxPin", kind: RuleKind::GpioPin },
    FieldRule { path: "device.printerRxPin", kind: RuleKind::GpioPin },
    FieldRule { path: "device.printerDtrPin", kind: RuleKind::GpioPin },
    // WiFi
    FieldRule { path: "wifi.ssid", kind: RuleKind::NonEmptyString },
    FieldRule { path: "wifi.password", kind: RuleKind::AnyString },
    // MQTT
    FieldRule { path: "mqtt.enabled", kind: RuleKind::Boolean },
    FieldRule { path: "mqtt.server", kind: RuleKind::AnyString },
    FieldRule { path: "mqtt.port", kind: RuleKind::BoundedInt { min: 1, max: 65535 } },
    FieldRule { path: "mqtt.username", kind: RuleKind::AnyString },
    FieldRule { path: "mqtt.password", kind: RuleKind::AnyString },
    // Scheduled surprise printing
    FieldRule { path: "autoInk.enabled", kind: RuleKind::Boolean },
    FieldRule { path: "autoInk.startHour", kind: RuleKind::BoundedInt { min: 0, max: 24 } },
    FieldRule { path: "autoInk.endHour", kind: RuleKind::BoundedInt { min: 0, max: 24 } },
    FieldRule { path: "autoInk.frequencyMinutes", kind: RuleKind::BoundedInt { min: 15, max: 480 } },
    FieldRule { path: "autoInk.prompt", kind: RuleKind::NonEmptyString },
    FieldRule { path: "autoInk.apiToken", kind: RuleKind::AnyString },
    // Buttons
    FieldRule { path: "buttons.button1.gpio", kind: RuleKind::GpioPin },
    FieldRule { path: "buttons.button1.shortAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button1.longAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button1.shortLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button1.longLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button1.shortMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button1.longMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button2.gpio", kind: RuleKind::GpioPin },
    FieldRule { path: "buttons.button2.shortAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button2.longAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button2.shortLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button2.longLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button2.shortMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button2.longMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button3.gpio", kind: RuleKind::GpioPin },
    FieldRule { path: "buttons.button3.shortAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button3.longAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button3.shortLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button3.longLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button3.shortMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button3.longMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button4.gpio", kind: RuleKind::GpioPin },
    FieldRule { path: "buttons.button4.shortAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button4.longAction", kind: RuleKind::OneOf(BUTTON_ACTIONS) },
    FieldRule { path: "buttons.button4.shortLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button4.longLedEffect", kind: RuleKind::OneOf(LED_EFFECTS) },
    FieldRule { path: "buttons.button4.shortMqttTopic", kind: RuleKind::AnyString },
    FieldRule { path: "buttons.button4.longMqttTopic", kind: RuleKind::AnyString },
    // LED strip
    FieldRule { path: "leds.pin", kind: RuleKind::GpioPin },
    FieldRule { path: "leds.count", kind: RuleKind::BoundedInt { min: 1, max: 300 } },
    FieldRule { path: "leds.brightness", kind: RuleKind::BoundedInt { min: 0, max: 255 } },
    FieldRule { path: "leds.refreshRate", kind: RuleKind::BoundedInt { min: 10, max: 120 } },
];

/// Look up the rule for a flattened field path.
pub fn find_rule(path: &str) -> Option<&'static FieldRule> {
    CONFIG_RULES.iter().find(|rule| rule.path == path)
}

/// IANA area prefixes the device accepts, plus the literal `UTC`/`GMT`.
const TZ_AREA_PREFIXES: &[&str] = &[
    "Africa/",
    "America/",
    "Antarctica/",
    "Asia/",
    "Atlantic/",
    "Australia/",
    "Europe/",
    "Indian/",
    "Pacific/",
    "Etc/",
];

/// Format check for timezone identifiers: max 50 chars, no leading or
/// trailing slash, no spaces, and either a literal `UTC`/`GMT` or one of
/// the known area prefixes. Not a full tzdb lookup — the device only
/// guards the string it forwards to its time library.
pub fn is_valid_timezone(tz: &str) -> bool {
    if tz.is_empty() || tz.len() > 50 {
        return false;
    }
    if tz.starts_with('/') || tz.ends_with('/') || tz.contains(' ') {
        return false;
    }
    if tz == "UTC" || tz == "GMT" {
        return true;
    }
    TZ_AREA_PREFIXES.iter().any(|prefix| tz.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_lookup_hits_and_misses() {
        assert!(find_rule("device.timezone").is_some());
        assert!(find_rule("device.nonexistent").is_none());
        assert!(find_rule("").is_none());
    }

    #[test]
    fn every_rule_path_is_unique() {
        for (i, rule) in CONFIG_RULES.iter().enumerate() {
            assert!(
                !CONFIG_RULES[i + 1..].iter().any(|r| r.path == rule.path),
                "duplicate rule path: {}",
                rule.path
            );
        }
    }

    #[test]
    fn timezone_literals_and_prefixes() {
        assert!(is_valid_timezone("UTC"));
        assert!(is_valid_timezone("GMT"));
        assert!(is_valid_timezone("Pacific/Auckland"));
        assert!(is_valid_timezone("Etc/GMT-14"));
        assert!(!is_valid_timezone("Foo/Bar"));
        assert!(!is_valid_timezone("utc"));
    }

    #[test]
    fn timezone_shape_violations() {
        assert!(!is_valid_timezone(""));
        assert!(!is_valid_timezone("/Europe/London"));
        assert!(!is_valid_timezone("Europe/London/"));
        assert!(!is_valid_timezone("Europe/Lon don"));
        assert!(!is_valid_timezone(&format!("Europe/{}", "x".repeat(50))));
    }
}
