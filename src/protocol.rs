//! ESC/VP.net command catalog and codec.
//!
//! Commands are fixed-length ASCII byte sequences terminated by `\r`; the
//! projector answers queries with `KEY=VALUE\r` text and acknowledges control
//! commands with a single `:` byte. The templates below are shared immutable
//! statics: encoding always copies a template before writing the value-bearing
//! offsets, so no call can corrupt another caller's command.

// =============================================================================
// Command templates
// =============================================================================

/// ESC/VP.net session greeting. The last byte of the reply carries the
/// authorization status; 0 means the session may issue commands.
pub(crate) const ESC_VP_HANDSHAKE: &[u8] = b"ESC/VP.net\x10\x03\x00\x00\x00\x00";

pub(crate) const POWER_STATUS_CHECK: &[u8] = b"PWR?\r";
pub(crate) const MUTE_STATUS_CHECK: &[u8] = b"MUTE?\r";
pub(crate) const FREEZE_STATUS_CHECK: &[u8] = b"FREEZE?\r";
pub(crate) const REQUEST_LAMP_HOURS: &[u8] = b"LAMP?\r";
pub(crate) const REQUEST_SERIAL_NUMBER: &[u8] = b"SNO?\r";
pub(crate) const GET_COLOR_MODE: &[u8] = b"CMODE?\r";

pub(crate) const POWER_ON: &[u8] = b"PWR ON\r";
pub(crate) const POWER_OFF: &[u8] = b"PWR OFF\r";
pub(crate) const MUTE_ON: &[u8] = b"MUTE ON\r";
pub(crate) const MUTE_OFF: &[u8] = b"MUTE OFF\r";
pub(crate) const FREEZE_ON: &[u8] = b"FREEZE ON\r";
pub(crate) const FREEZE_OFF: &[u8] = b"FREEZE OFF\r";

/// Color-mode set template; the protocol code byte goes at `len - 2`.
pub(crate) const SET_COLOR_MODE: &[u8] = b"CMODE \x00\r";

/// Acknowledgment byte the device sends for an accepted control command.
pub const ACK_BYTE: u8 = b':';

/// Literal reply the device sends for a rejected or malformed command.
pub const ERROR_REPLY: &[u8] = b"ERR\r";

// =============================================================================
// Numeric property catalog
// =============================================================================

/// Catalog entry for one numeric (0-255) image property: its public name,
/// response marker, query command and set template. The set template carries a
/// `000` placeholder at `len - 4 .. len - 1` for the zero-padded value.
pub(crate) struct NumericProperty {
    pub name: &'static str,
    pub marker: &'static str,
    pub query: &'static [u8],
    pub set: &'static [u8],
}

pub(crate) const NUMERIC_PROPERTIES: [NumericProperty; 9] = [
    NumericProperty {
        name: "Image settings#Brightness",
        marker: "BRIGHT",
        query: b"BRIGHT?\r",
        set: b"BRIGHT 000\r",
    },
    NumericProperty {
        name: "Image settings#Contrast",
        marker: "CONTRAST",
        query: b"CONTRAST?\r",
        set: b"CONTRAST 000\r",
    },
    NumericProperty {
        name: "Image settings#Density",
        marker: "DENSITY",
        query: b"DENSITY?\r",
        set: b"DENSITY 000\r",
    },
    NumericProperty {
        name: "Image settings#Tint",
        marker: "TINT",
        query: b"TINT?\r",
        set: b"TINT 000\r",
    },
    NumericProperty {
        name: "Image settings#Sharp",
        marker: "SHARP",
        query: b"SHARP?\r",
        set: b"SHARP 000\r",
    },
    NumericProperty {
        name: "RGB#Red",
        marker: "RED",
        query: b"RED?\r",
        set: b"RED 000\r",
    },
    NumericProperty {
        name: "RGB#Green",
        marker: "GREEN",
        query: b"GREEN?\r",
        set: b"GREEN 000\r",
    },
    NumericProperty {
        name: "RGB#Blue",
        marker: "BLUE",
        query: b"BLUE?\r",
        set: b"BLUE 000\r",
    },
    NumericProperty {
        name: "Image settings#Color temperature",
        marker: "CTEMP",
        query: b"CTEMP?\r",
        set: b"CTEMP 000\r",
    },
];

/// Find the catalog entry for a numeric control property name.
pub(crate) fn numeric_property(name: &str) -> Option<&'static NumericProperty> {
    NUMERIC_PROPERTIES.iter().find(|entry| entry.name == name)
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a 0-255 value into a copy of a numeric set template.
///
/// The value is written as zero-padded 3-digit ASCII so the command length
/// stays constant regardless of the value.
pub(crate) fn encode_numeric(template: &'static [u8], value: u8) -> Vec<u8> {
    let mut command = template.to_vec();
    let digits = format!("{value:03}");
    let slot = command.len() - 4;
    command[slot..slot + 3].copy_from_slice(digits.as_bytes());
    command
}

/// Encode a color-mode code into a copy of the color-mode set template.
pub(crate) fn encode_color_mode(template: &'static [u8], code: u8) -> Vec<u8> {
    let mut command = template.to_vec();
    let slot = command.len() - 2;
    command[slot] = code;
    command
}

// =============================================================================
// Decoding
// =============================================================================

/// Extract the raw field for `key` from a response: the text between the key
/// (plus a single `=` or space separator) and the next `\r`.
fn field<'a>(response: &'a str, key: &str) -> Option<&'a str> {
    let start = response.find(key)? + key.len();
    let rest = response[start..]
        .strip_prefix(['=', ' '])
        .unwrap_or(&response[start..]);
    rest.split_once('\r').map(|(value, _)| value)
}

/// Decode the numeric value for `key`, or `None` if the response carries no
/// well-formed `key=digits\r` field.
pub(crate) fn decode_number(response: &str, key: &str) -> Option<u32> {
    let value = field(response, key)?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Decode the string value for `key`, or `None` if absent or empty.
pub(crate) fn decode_text(response: &str, key: &str) -> Option<String> {
    field(response, key)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Decode an `=ON`/`=OFF` literal reply, or `None` if neither is present.
pub(crate) fn decode_on_off(response: &str) -> Option<bool> {
    if response.contains("=ON") {
        Some(true)
    } else if response.contains("=OFF") {
        Some(false)
    } else {
        None
    }
}

/// Whether a raw reply is the single-byte acceptance acknowledgment.
pub(crate) fn is_accepted(reply: &[u8]) -> bool {
    reply.len() == 1 && reply[0] == ACK_BYTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_encoding_round_trips_for_every_value() {
        for entry in &NUMERIC_PROPERTIES {
            for value in 0..=255u8 {
                let command = encode_numeric(entry.set, value);
                assert_eq!(command.len(), entry.set.len());
                assert_eq!(*command.last().unwrap(), b'\r');
                let text = String::from_utf8(command).unwrap();
                assert_eq!(decode_number(&text, entry.marker), Some(u32::from(value)));
            }
        }
    }

    #[test]
    fn test_numeric_encoding_is_zero_padded() {
        let command = encode_numeric(b"BRIGHT 000\r", 7);
        assert_eq!(command, b"BRIGHT 007\r");
        let command = encode_numeric(b"BRIGHT 000\r", 42);
        assert_eq!(command, b"BRIGHT 042\r");
        let command = encode_numeric(b"BRIGHT 000\r", 210);
        assert_eq!(command, b"BRIGHT 210\r");
    }

    #[test]
    fn test_encoding_allocates_a_fresh_command() {
        let theatre = encode_color_mode(SET_COLOR_MODE, 0x05);
        let photo = encode_color_mode(SET_COLOR_MODE, 0x14);
        assert_eq!(theatre, b"CMODE \x05\r");
        assert_eq!(photo, b"CMODE \x14\r");
    }

    #[test]
    fn test_decodes_two_digit_power_status() {
        assert_eq!(decode_number("PWR=01\r:", "PWR"), Some(1));
        assert_eq!(decode_number("PWR=04\r:", "PWR"), Some(4));
    }

    #[test]
    fn test_decodes_lamp_hours_and_serial() {
        assert_eq!(decode_number("LAMP=1337\r:", "LAMP"), Some(1337));
        assert_eq!(
            decode_text("SNO=X3K7400123\r:", "SNO"),
            Some("X3K7400123".to_owned())
        );
    }

    #[test]
    fn test_missing_or_malformed_fields_decode_to_none() {
        assert_eq!(decode_number("ERR\r", "PWR"), None);
        assert_eq!(decode_number("PWR=\r", "PWR"), None);
        assert_eq!(decode_number("CMODE=0F\r", "CMODE"), None);
        assert_eq!(decode_number("PWR=01", "PWR"), None);
        assert_eq!(decode_text("ERR\r", "SNO"), None);
        assert_eq!(decode_text("SNO=\r", "SNO"), None);
    }

    #[test]
    fn test_decodes_on_off_literals() {
        assert_eq!(decode_on_off("MUTE=ON\r:"), Some(true));
        assert_eq!(decode_on_off("FREEZE=OFF\r:"), Some(false));
        assert_eq!(decode_on_off("ERR\r"), None);
    }

    #[test]
    fn test_acceptance_is_exactly_one_colon_byte() {
        assert!(is_accepted(b":"));
        assert!(!is_accepted(b"::"));
        assert!(!is_accepted(b""));
        assert!(!is_accepted(ERROR_REPLY));
    }
}
