//! Color-mode and power-mode tables.
//!
//! Both tables are fixed domain data, versioned with the ESC/VP.net protocol:
//! the codes and labels must match the device firmware exactly for
//! interoperability.

/// Image color modes supported by the projector, as `(name, protocol code)`
/// pairs.
pub const COLOR_MODES: [(&str, u8); 9] = [
    ("sRGB", 0x01),
    ("Presentation", 0x04),
    ("Theatre", 0x05),
    ("Dynamic", 0x06),
    ("Sports", 0x08),
    ("DICOM SIM", 0x0F),
    ("Blackboard", 0x11),
    ("Whiteboard", 0x12),
    ("Photo", 0x14),
];

/// Power status codes reported by `PWR?`, as `(code, label)` pairs.
pub const POWER_MODES: [(u8, &str); 7] = [
    (0, "Standby Mode (Network OFF)"),
    (1, "Lamp ON"),
    (2, "Warmup"),
    (3, "Cooldown"),
    (4, "Standby Mode (Network ON)"),
    (5, "Abnormality standby"),
    (9, "A/V standby"),
];

/// Look up a color-mode protocol code by its human-readable name.
pub fn color_mode_code(name: &str) -> Option<u8> {
    COLOR_MODES
        .iter()
        .find(|(mode, _)| *mode == name)
        .map(|&(_, code)| code)
}

/// Look up a color-mode name by its protocol code.
pub fn color_mode_name(code: u8) -> Option<&'static str> {
    COLOR_MODES
        .iter()
        .find(|&&(_, mode)| mode == code)
        .map(|&(name, _)| name)
}

/// Resolve a control value into a color-mode code.
///
/// Accepts either the mode name (`"Theatre"`) or its decimal code string
/// (`"5"`, as carried by dropdown options). Returns `None` for anything the
/// [`COLOR_MODES`] table does not know.
pub fn resolve_color_mode(value: &str) -> Option<u8> {
    color_mode_code(value).or_else(|| {
        value
            .parse::<u8>()
            .ok()
            .filter(|&code| color_mode_name(code).is_some())
    })
}

/// Look up the descriptive label for a power status code.
pub fn power_mode_label(code: u8) -> Option<&'static str> {
    POWER_MODES
        .iter()
        .find(|&&(mode, _)| mode == code)
        .map(|&(_, label)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_mode_table_round_trips() {
        for (name, code) in COLOR_MODES {
            assert_eq!(color_mode_code(name), Some(code));
            assert_eq!(color_mode_name(code), Some(name));
        }
    }

    #[test]
    fn test_resolve_accepts_name_or_code() {
        assert_eq!(resolve_color_mode("Theatre"), Some(0x05));
        assert_eq!(resolve_color_mode("5"), Some(0x05));
        assert_eq!(resolve_color_mode("20"), Some(0x14));
        assert_eq!(resolve_color_mode("Cinema"), None);
        assert_eq!(resolve_color_mode("2"), None);
    }

    #[test]
    fn test_power_mode_labels() {
        assert_eq!(power_mode_label(1), Some("Lamp ON"));
        assert_eq!(power_mode_label(4), Some("Standby Mode (Network ON)"));
        assert_eq!(power_mode_label(6), None);
    }
}
