//! Emulated board profile.
//!
//! Mirrors an ESP32-C3-class GPIO layout: a fixed map of valid pins, a
//! stricter safe-to-expose subset, and a human-readable description per
//! pin. A pin can be electrically valid yet unsafe for user configuration
//! (strapping pins, USB data lines, the onboard LED), so validity and
//! safety are separate checks with separate error messages.

/// Board name reported by diagnostics and the setup endpoint.
pub const BOARD_NAME: &str = "ESP32-C3-mini (emulated)";

/// Sentinel for "not connected". Always valid and always safe.
pub const PIN_UNASSIGNED: i64 = -1;

struct PinInfo {
    pin: i64,
    safe: bool,
    description: &'static str,
}

const GPIO_MAP: &[PinInfo] = &[
    PinInfo { pin: 0, safe: false, description: "Strapping pin" },
    PinInfo { pin: 1, safe: false, description: "TX for UART0 (USB-Serial)" },
    PinInfo { pin: 2, safe: true, description: "Safe" },
    PinInfo { pin: 3, safe: false, description: "RX for UART0 (USB-Serial)" },
    PinInfo { pin: 4, safe: true, description: "Safe" },
    PinInfo { pin: 5, safe: true, description: "Safe" },
    PinInfo { pin: 6, safe: true, description: "Safe" },
    PinInfo { pin: 7, safe: true, description: "Safe" },
    PinInfo { pin: 8, safe: false, description: "Onboard LED" },
    PinInfo { pin: 9, safe: false, description: "Strapping pin" },
    PinInfo { pin: 10, safe: true, description: "Safe" },
    PinInfo { pin: 18, safe: false, description: "USB D- (Serial/JTAG)" },
    PinInfo { pin: 19, safe: false, description: "USB D+ (Serial/JTAG)" },
    PinInfo { pin: 20, safe: true, description: "Safe (UART1 TX)" },
    PinInfo { pin: 21, safe: true, description: "Safe (UART1 RX)" },
];

/// Whether the pin exists on this board at all.
pub fn is_valid_pin(pin: i64) -> bool {
    pin == PIN_UNASSIGNED || GPIO_MAP.iter().any(|info| info.pin == pin)
}

/// Whether the pin is in the safe-to-expose subset.
pub fn is_safe_pin(pin: i64) -> bool {
    pin == PIN_UNASSIGNED || GPIO_MAP.iter().any(|info| info.pin == pin && info.safe)
}

/// Hardware description for error messages and the pin picker.
pub fn pin_description(pin: i64) -> &'static str {
    if pin == PIN_UNASSIGNED {
        return "Not connected";
    }
    GPIO_MAP
        .iter()
        .find(|info| info.pin == pin)
        .map_or("Unknown GPIO", |info| info.description)
}

/// All safe pins, for the setup UI's pin picker.
pub fn safe_pins() -> Vec<i64> {
    GPIO_MAP
        .iter()
        .filter(|info| info.safe)
        .map(|info| info.pin)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strapping_pin_is_valid_but_unsafe() {
        assert!(is_valid_pin(9));
        assert!(!is_safe_pin(9));
        assert_eq!(pin_description(9), "Strapping pin");
    }

    #[test]
    fn unassigned_pin_is_valid_and_safe() {
        assert!(is_valid_pin(PIN_UNASSIGNED));
        assert!(is_safe_pin(PIN_UNASSIGNED));
    }

    #[test]
    fn out_of_range_pin_is_invalid() {
        assert!(!is_valid_pin(99));
        assert!(!is_safe_pin(99));
        assert_eq!(pin_description(99), "Unknown GPIO");
    }

    #[test]
    fn uart1_pins_are_safe() {
        assert!(is_safe_pin(20));
        assert!(is_safe_pin(21));
    }

    #[test]
    fn safe_pins_excludes_usb_and_strapping() {
        let safe = safe_pins();
        assert!(safe.contains(&2));
        assert!(!safe.contains(&0));
        assert!(!safe.contains(&18));
        assert!(!safe.contains(&19));
    }
}
