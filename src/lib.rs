//! Unofficial Rust API for Epson projector monitoring and control.
//!
//! This crate speaks the ESC/VP.net command protocol over a persistent TCP
//! session (port 3629 by default) and exposes two operations on top of it:
//! polling the device state into a [`Snapshot`], and applying control
//! commands (power, A/V mute, freeze, image levels, color mode). Both share
//! one session lock, and polls issued within five seconds of a control
//! operation are answered from the cached snapshot so monitoring never reads
//! a parameter mid-transition.
//!
//! # Example
//!
//! ```no_run
//! use escvp::{DEFAULT_PORT, ProjectorController, TcpTransport};
//!
//! fn main() -> Result<(), escvp::ProjectorError> {
//!     let transport = TcpTransport::new(format!("192.168.1.50:{DEFAULT_PORT}"));
//!     let controller = ProjectorController::new(transport);
//!
//!     // Read the current statistics and controls
//!     let snapshot = controller.poll()?;
//!     if let Some(mode) = snapshot.statistics.get("Power mode") {
//!         println!("Power mode: {mode}");
//!     }
//!
//!     // Switch the lamp on and adjust the picture
//!     controller.control("Power", "1")?;
//!     controller.control("Image settings#Brightness", "200")?;
//!     controller.control("Image color mode", "Theatre")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockProjector`] to test code without a device on the network:
//!
//! ```
//! use escvp::{MockProjector, ProjectorController};
//!
//! let mock = MockProjector::with_power_status(1);
//! let controller = ProjectorController::new(mock.clone());
//! controller.control("RGB#Red", "210").unwrap();
//! assert_eq!(mock.level("RED"), Some(210));
//! ```
//!
//! # Disclaimer
//!
//! This is an **unofficial** library. It is not affiliated with or endorsed
//! by Seiko Epson Corporation. Use at your own risk.

#![warn(missing_docs)]

mod controller;
mod error;
mod mock;
mod modes;
mod protocol;
mod state;
mod transport;

// Re-export public API
pub use controller::{COOLDOWN_WINDOW, ControlOutcome, ControlRequest, ProjectorController};
pub use error::ProjectorError;
pub use mock::MockProjector;
pub use modes::{
    COLOR_MODES, POWER_MODES, color_mode_code, color_mode_name, power_mode_label,
    resolve_color_mode,
};
pub use protocol::{ACK_BYTE, ERROR_REPLY};
pub use state::{ControlDescriptor, ControlKind, DropdownOption, Snapshot};
pub use transport::{DEFAULT_PORT, TcpTransport, Transport};

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn lamp_on() -> (MockProjector, ProjectorController<MockProjector>) {
        let mock = MockProjector::with_power_status(1);
        let controller = ProjectorController::new(mock.clone());
        (mock, controller)
    }

    #[test]
    fn test_standby_poll_reports_power_only() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());

        let snapshot = controller.poll().unwrap();
        assert_eq!(snapshot.statistics["Power mode"], "Standby Mode (Network ON)");
        assert_eq!(snapshot.statistics["Power"], "0");
        assert_eq!(snapshot.statistics["Lamp operation time (hrs)"], "1286");
        assert_eq!(snapshot.statistics["Serial number"], "X3K7400123");

        // The lamp is off, so no image settings were queried or published.
        assert!(!snapshot.statistics.contains_key("A/V Mute"));
        assert!(!snapshot.statistics.contains_key("Image settings#Brightness"));
        assert_eq!(snapshot.controls.len(), 1);
        assert_eq!(snapshot.controls[0].name, "Power");
    }

    #[test]
    fn test_active_poll_includes_image_settings() {
        let (_, controller) = lamp_on();

        let snapshot = controller.poll().unwrap();
        assert_eq!(snapshot.statistics["Power mode"], "Lamp ON");
        assert_eq!(snapshot.statistics["Power"], "1");
        assert_eq!(snapshot.statistics["A/V Mute"], "0");
        assert_eq!(snapshot.statistics["Freeze"], "0");
        assert_eq!(snapshot.statistics["Image settings#Brightness"], "128");
        assert_eq!(snapshot.statistics["Image color mode"], "1");

        let red = snapshot
            .controls
            .iter()
            .find(|c| c.name == "RGB#Red")
            .unwrap();
        assert_eq!(red.kind, ControlKind::Slider { min: 0.0, max: 255.0 });
        assert_eq!(red.value, "128");

        let mode = snapshot
            .controls
            .iter()
            .find(|c| c.name == "Image color mode")
            .unwrap();
        let ControlKind::Dropdown { options } = &mode.kind else {
            panic!("expected a dropdown, got {:?}", mode.kind);
        };
        assert_eq!(options.len(), COLOR_MODES.len());
        assert!(options.iter().any(|o| o.value == "5" && o.label == "Theatre"));
    }

    #[test]
    fn test_power_on_patches_cache_without_requerying() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());

        controller.poll().unwrap();
        let sends_before = mock.sent_commands().len();

        let outcome = controller.control("Power", "1").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.power_status(), 1);
        assert!(mock.sent_commands().iter().any(|c| c == b"PWR ON\r"));

        // The follow-up poll is inside the cooldown: it must reflect the
        // patched value without another wire exchange.
        let snapshot = controller.poll().unwrap();
        assert_eq!(snapshot.statistics["Power"], "1");
        assert_eq!(mock.sent_commands().len(), sends_before + 1);
    }

    #[test]
    fn test_numeric_control_is_encoded_as_three_ascii_digits() {
        let (mock, controller) = lamp_on();
        controller.poll().unwrap();

        let outcome = controller.control("RGB#Red", "210").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.level("RED"), Some(210));
        assert!(mock.sent_commands().iter().any(|c| c == b"RED 210\r"));

        let snapshot = controller.poll().unwrap();
        assert_eq!(snapshot.statistics["RGB#Red"], "210");
    }

    #[test]
    fn test_numeric_values_are_truncated_and_clamped() {
        let (mock, controller) = lamp_on();

        let outcome = controller.control("Image settings#Brightness", "42.9").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.level("BRIGHT"), Some(42));

        let outcome = controller.control("Image settings#Brightness", "300").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.level("BRIGHT"), Some(255));

        let outcome = controller.control("Image settings#Brightness", "bright").unwrap();
        assert_eq!(outcome, ControlOutcome::Unsupported);
        assert_eq!(mock.level("BRIGHT"), Some(255));
    }

    #[test]
    fn test_color_mode_accepts_label_or_code() {
        let (mock, controller) = lamp_on();
        controller.poll().unwrap();

        let outcome = controller.control("Image color mode", "Theatre").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.color_mode(), 0x05);
        assert!(mock.sent_commands().iter().any(|c| c == b"CMODE \x05\r"));

        // The cache holds the normalized decimal code, which maps back to
        // the requested mode through the table.
        let snapshot = controller.poll().unwrap();
        assert_eq!(snapshot.statistics["Image color mode"], "5");
        assert_eq!(color_mode_name(5), Some("Theatre"));

        let outcome = controller.control("Image color mode", "20").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.color_mode(), 0x14);

        let outcome = controller.control("Image color mode", "Cinema").unwrap();
        assert_eq!(outcome, ControlOutcome::Unsupported);
        assert_eq!(mock.color_mode(), 0x14);
    }

    #[test]
    fn test_image_controls_are_rejected_in_standby() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());

        let outcome = controller.control("A/V Mute", "1").unwrap();
        assert_eq!(outcome, ControlOutcome::Rejected);
        assert!(!mock.mute());
    }

    #[test]
    fn test_unsupported_property_is_ignored() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());
        controller.poll().unwrap();
        let sends_before = mock.sent_commands().len();

        let outcome = controller.control("Zoom", "1").unwrap();
        assert_eq!(outcome, ControlOutcome::Unsupported);
        assert_eq!(mock.sent_commands().len(), sends_before);
    }

    #[test]
    fn test_empty_batch_is_rejected_up_front() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());

        assert!(matches!(
            controller.control_batch(&[]),
            Err(ProjectorError::EmptyBatch)
        ));
        assert!(mock.sent_commands().is_empty());
    }

    #[test]
    fn test_batch_applies_entries_in_order() {
        let (mock, controller) = lamp_on();

        let outcomes = controller
            .control_batch(&[
                ControlRequest::new("A/V Mute", "1"),
                ControlRequest::new("RGB#Blue", "17"),
            ])
            .unwrap();
        assert_eq!(outcomes, vec![ControlOutcome::Applied, ControlOutcome::Applied]);
        assert!(mock.mute());
        assert_eq!(mock.level("BLUE"), Some(17));

        let commands = mock.sent_commands();
        let mute = commands.iter().position(|c| c == b"MUTE ON\r").unwrap();
        let blue = commands.iter().position(|c| c == b"BLUE 017\r").unwrap();
        assert!(mute < blue);
    }

    #[test]
    fn test_polls_inside_cooldown_are_identical() {
        let (mock, controller) = lamp_on();
        controller.poll().unwrap();
        controller.control("Freeze", "1").unwrap();

        let sends_before = mock.sent_commands().len();
        let first = controller.poll().unwrap();
        let second = controller.poll().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.statistics["Freeze"], "1");
        assert_eq!(mock.sent_commands().len(), sends_before);
    }

    #[test]
    fn test_poll_after_cooldown_queries_the_device() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());
        controller.poll().unwrap();
        controller.control("Power", "1").unwrap();

        controller.backdate_last_control(Duration::from_millis(5500));
        let sends_before = mock.sent_commands().len();
        let snapshot = controller.poll().unwrap();

        assert!(mock.sent_commands().len() > sends_before);
        assert_eq!(snapshot.statistics["Power mode"], "Lamp ON");
        assert!(snapshot.statistics.contains_key("Image settings#Brightness"));
    }

    #[test]
    fn test_failed_sub_queries_are_omitted_after_one_retry() {
        let mock = MockProjector::with_power_status(1);
        mock.mark_unsupported("LAMP");
        mock.mark_unsupported("SNO");
        let controller = ProjectorController::new(mock.clone());

        let snapshot = controller.poll().unwrap();
        assert!(!snapshot.statistics.contains_key("Lamp operation time (hrs)"));
        assert!(!snapshot.statistics.contains_key("Serial number"));
        // The rest of the poll went through regardless.
        assert_eq!(snapshot.statistics["Power mode"], "Lamp ON");
        assert_eq!(snapshot.statistics["Image settings#Contrast"], "128");

        let lamp_queries = mock
            .sent_commands()
            .iter()
            .filter(|c| c.as_slice() == b"LAMP?\r")
            .count();
        assert_eq!(lamp_queries, 2);
    }

    #[test]
    fn test_refused_handshake_skips_the_poll() {
        let mock = MockProjector::new();
        mock.refuse_handshake();
        let controller = ProjectorController::new(mock.clone());

        let snapshot = controller.poll().unwrap();
        assert!(snapshot.statistics.is_empty());
        assert!(snapshot.controls.is_empty());
        assert_eq!(mock.sent_commands().len(), 1);

        let outcome = controller.control("Power", "1").unwrap();
        assert_eq!(outcome, ControlOutcome::NotAuthorized);
        assert_eq!(mock.sent_commands().len(), 2);
        assert_eq!(mock.power_status(), 4);
    }

    #[test]
    fn test_refused_handshake_preserves_the_previous_snapshot() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());
        let first = controller.poll().unwrap();

        controller.disconnect().unwrap();
        mock.refuse_handshake();
        let second = controller.poll().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transport_errors_propagate() {
        let mock = MockProjector::new();
        let controller = ProjectorController::new(mock.clone());

        mock.fail_next_send();
        assert!(matches!(
            controller.poll(),
            Err(ProjectorError::Transport(_))
        ));
        // The session recovers on the next exchange.
        assert!(controller.poll().is_ok());

        mock.fail_next_send();
        assert!(matches!(
            controller.control("Power", "1"),
            Err(ProjectorError::Transport(_))
        ));
    }

    #[test]
    fn test_power_off_disconnects_the_session() {
        let (mock, controller) = lamp_on();
        controller.poll().unwrap();
        assert!(mock.is_connected());

        let outcome = controller.control("Power", "0").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(mock.power_status(), 4);
        assert!(!mock.is_connected());

        // Powering back on keeps the session up.
        let outcome = controller.control("Power", "1").unwrap();
        assert!(outcome.is_applied());
        assert!(mock.is_connected());
    }

    #[test]
    fn test_concurrent_poll_and_control_never_interleave_on_the_wire() {
        let mock = MockProjector::with_power_status(1);
        mock.set_latency(Duration::from_millis(2));
        let controller = ProjectorController::new(mock.clone());

        thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    let _ = controller.poll();
                });
                s.spawn(|| {
                    let _ = controller.control("RGB#Green", "99");
                });
            }
        });

        assert_eq!(mock.max_in_flight(), 1);
        assert!(!mock.sent_commands().is_empty());
    }
}
