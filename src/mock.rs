//! Mock projector for testing.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::protocol::{ACK_BYTE, ERROR_REPLY, ESC_VP_HANDSHAKE};
use crate::transport::Transport;

/// An in-memory projector implementing [`Transport`].
///
/// This allows testing code that depends on [`ProjectorController`] without a
/// device on the network. The mock answers the full ESC/VP.net command set
/// from mutable device state, and every clone shares that state, so a clone
/// kept outside the controller can inspect what the session did.
///
/// # Example
///
/// ```
/// use escvp::{MockProjector, ProjectorController};
///
/// let mock = MockProjector::new();
/// let controller = ProjectorController::new(mock.clone());
///
/// let snapshot = controller.poll().unwrap();
/// assert_eq!(snapshot.statistics["Power mode"], "Standby Mode (Network ON)");
/// ```
///
/// [`ProjectorController`]: crate::ProjectorController
#[derive(Clone)]
pub struct MockProjector {
    state: Arc<Mutex<MockState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct MockState {
    accept_handshake: bool,
    connected: bool,
    fail_next: bool,
    latency: Duration,
    power_status: u8,
    lamp_hours: u32,
    serial_number: String,
    mute: bool,
    freeze: bool,
    levels: BTreeMap<&'static str, u8>,
    color_mode: u8,
    unsupported: Vec<String>,
    wire_log: Vec<Vec<u8>>,
}

impl MockProjector {
    /// Create a mock in standby (power status 4, lamp off), with every image
    /// level at 128 and color mode sRGB.
    pub fn new() -> Self {
        Self::with_power_status(4)
    }

    /// Create a mock reporting the given initial power status.
    pub fn with_power_status(power_status: u8) -> Self {
        let levels = [
            "BRIGHT", "CONTRAST", "DENSITY", "TINT", "SHARP", "RED", "GREEN", "BLUE", "CTEMP",
        ]
        .into_iter()
        .map(|key| (key, 128))
        .collect();
        Self {
            state: Arc::new(Mutex::new(MockState {
                accept_handshake: true,
                connected: false,
                fail_next: false,
                latency: Duration::ZERO,
                power_status,
                lamp_hours: 1286,
                serial_number: "X3K7400123".to_owned(),
                mute: false,
                freeze: false,
                levels,
                color_mode: 0x01,
                unsupported: Vec::new(),
                wire_log: Vec::new(),
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Refuse the ESC/VP.net handshake from now on.
    pub fn refuse_handshake(&self) {
        self.state.lock().unwrap().accept_handshake = false;
    }

    /// Fail the next exchange with a broken-pipe error and drop the session.
    pub fn fail_next_send(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    /// Answer every command for `key` with `ERR`, simulating a projector
    /// model that does not implement it.
    pub fn mark_unsupported(&self, key: &str) {
        self.state.lock().unwrap().unsupported.push(key.to_owned());
    }

    /// Delay every exchange by `latency`, to widen race windows in
    /// concurrency tests.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    /// Change the reported power status, simulating the device itself.
    pub fn set_power_status(&self, power_status: u8) {
        self.state.lock().unwrap().power_status = power_status;
    }

    /// Current power status code.
    pub fn power_status(&self) -> u8 {
        self.state.lock().unwrap().power_status
    }

    /// Current color mode code.
    pub fn color_mode(&self) -> u8 {
        self.state.lock().unwrap().color_mode
    }

    /// Current value of a numeric image level, by wire key (e.g. `"RED"`).
    pub fn level(&self, key: &str) -> Option<u8> {
        self.state.lock().unwrap().levels.get(key).copied()
    }

    /// Current A/V mute state.
    pub fn mute(&self) -> bool {
        self.state.lock().unwrap().mute
    }

    /// Current freeze state.
    pub fn freeze(&self) -> bool {
        self.state.lock().unwrap().freeze
    }

    /// Every raw command received so far, including handshakes.
    pub fn sent_commands(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().wire_log.clone()
    }

    /// Highest number of exchanges ever observed in flight at once. Stays at
    /// 1 as long as callers serialize their transport access.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn exchange(&self, command: &[u8]) -> io::Result<Vec<u8>> {
        let latency = self.state.lock().unwrap().latency;
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        let mut state = self.state.lock().unwrap();
        state.wire_log.push(command.to_vec());
        if state.fail_next {
            state.fail_next = false;
            state.connected = false;
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated connection failure",
            ));
        }
        if command == ESC_VP_HANDSHAKE {
            return if state.accept_handshake {
                state.connected = true;
                Ok(b"ESC/VP.net\x10\x03\x00\x00\x20\x00".to_vec())
            } else {
                Ok(b"ESC/VP.net\x10\x03\x00\x00\x20\x41".to_vec())
            };
        }
        if !state.connected {
            return Ok(ERROR_REPLY.to_vec());
        }
        Ok(state.reply_to(command))
    }
}

impl Default for MockProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockProjector {
    fn send(&mut self, command: &[u8]) -> io::Result<Vec<u8>> {
        let depth = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(depth, Ordering::SeqCst);
        let result = self.exchange(command);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().connected = false;
        Ok(())
    }
}

impl MockState {
    fn reply_to(&mut self, command: &[u8]) -> Vec<u8> {
        // Image commands are only answered while the lamp is on or warming
        // up, as on the real device.
        let image_active = matches!(self.power_status, 1 | 2);

        // The color-mode set command carries a raw code byte; handle it
        // before any text parsing.
        if command.starts_with(b"CMODE ") && command.len() == 8 {
            if !image_active {
                return ERROR_REPLY.to_vec();
            }
            self.color_mode = command[6];
            return vec![ACK_BYTE];
        }

        let text = String::from_utf8_lossy(command);
        let line = text.trim_end_matches('\r');

        if let Some(key) = line.strip_suffix('?') {
            if self.unsupported.iter().any(|k| k == key) {
                return ERROR_REPLY.to_vec();
            }
            if !matches!(key, "PWR" | "LAMP" | "SNO") && !image_active {
                return ERROR_REPLY.to_vec();
            }
            let reply = match key {
                "PWR" => format!("PWR={:02}\r:", self.power_status),
                "MUTE" => format!("MUTE={}\r:", if self.mute { "ON" } else { "OFF" }),
                "FREEZE" => format!("FREEZE={}\r:", if self.freeze { "ON" } else { "OFF" }),
                "LAMP" => format!("LAMP={}\r:", self.lamp_hours),
                "SNO" => format!("SNO={}\r:", self.serial_number),
                "CMODE" => format!("CMODE={}\r:", self.color_mode),
                other => match self.levels.get(other) {
                    Some(value) => format!("{other}={value}\r:"),
                    None => return ERROR_REPLY.to_vec(),
                },
            };
            return reply.into_bytes();
        }

        if let Some((key, argument)) = line.split_once(' ') {
            if self.unsupported.iter().any(|k| k == key) {
                return ERROR_REPLY.to_vec();
            }
            if key != "PWR" && !image_active {
                return ERROR_REPLY.to_vec();
            }
            match (key, argument) {
                ("PWR", "ON") => {
                    self.power_status = 1;
                    return vec![ACK_BYTE];
                }
                ("PWR", "OFF") => {
                    self.power_status = 4;
                    return vec![ACK_BYTE];
                }
                ("MUTE", on_off @ ("ON" | "OFF")) => {
                    self.mute = on_off == "ON";
                    return vec![ACK_BYTE];
                }
                ("FREEZE", on_off @ ("ON" | "OFF")) => {
                    self.freeze = on_off == "ON";
                    return vec![ACK_BYTE];
                }
                _ => {
                    // Numeric sets require the exact 3-digit framing.
                    if argument.len() == 3
                        && let Ok(value) = argument.parse::<u8>()
                        && let Some(level) = self.levels.get_mut(key)
                    {
                        *level = value;
                        return vec![ACK_BYTE];
                    }
                }
            }
        }

        ERROR_REPLY.to_vec()
    }
}
