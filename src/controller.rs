//! Projector facade: polling, control dispatch and the post-control cache.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::error::ProjectorError;
use crate::modes::{COLOR_MODES, color_mode_name, power_mode_label, resolve_color_mode};
use crate::protocol::{
    self, ESC_VP_HANDSHAKE, FREEZE_OFF, FREEZE_ON, FREEZE_STATUS_CHECK, GET_COLOR_MODE, MUTE_OFF,
    MUTE_ON, MUTE_STATUS_CHECK, NUMERIC_PROPERTIES, NumericProperty, POWER_OFF, POWER_ON,
    POWER_STATUS_CHECK, REQUEST_LAMP_HOURS, REQUEST_SERIAL_NUMBER, SET_COLOR_MODE,
};
use crate::state::{ControlDescriptor, DropdownOption, Snapshot};
use crate::transport::Transport;

/// How long after a successful control operation polls are served from the
/// cached snapshot instead of querying the device. Many projector parameters
/// need time to settle after a command; skipping the read is preferred to
/// reading a transitional value.
pub const COOLDOWN_WINDOW: Duration = Duration::from_millis(5000);

/// One entry of a control batch: a property name and the value to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Property name, e.g. `"Power"` or `"RGB#Red"`.
    pub property: String,
    /// Value to apply, in the property's string form.
    pub value: String,
}

impl ControlRequest {
    /// Convenience constructor.
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// What became of a single control operation.
///
/// Only transport failures are reported as errors; everything else is an
/// outcome the caller may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The device acknowledged the command; the cached snapshot was patched.
    Applied,
    /// The command was sent but the device did not acknowledge it.
    Rejected,
    /// The authorization handshake was refused; no command was sent.
    NotAuthorized,
    /// The property (or its value) is not in the catalog; no command was sent.
    Unsupported,
}

impl ControlOutcome {
    /// Whether the device accepted the command.
    pub fn is_applied(self) -> bool {
        self == ControlOutcome::Applied
    }
}

// =============================================================================
// Controller facade
// =============================================================================

/// Monitoring and control facade for one projector session.
///
/// A single lock serializes polling and control end-to-end: the underlying
/// transport is one stateful TCP session, and interleaving two exchanges
/// would corrupt both. Batch control re-acquires the lock per entry, so polls
/// may be interleaved *between* batch entries but never *within* an exchange.
pub struct ProjectorController<T: Transport> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    transport: T,
    cache: Option<Snapshot>,
    last_control: Option<Instant>,
}

impl<T: Transport> ProjectorController<T> {
    /// Create a controller over the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                transport,
                cache: None,
                last_control: None,
            }),
        }
    }

    /// Poll the device and return a fresh [`Snapshot`].
    ///
    /// Within [`COOLDOWN_WINDOW`] of a successful control operation the
    /// cached snapshot (with that operation already patched in) is returned
    /// verbatim, without touching the device. If the authorization handshake
    /// is refused, the previous snapshot (or an empty one) is returned and
    /// the cache is left untouched.
    ///
    /// # Errors
    /// Returns [`ProjectorError::Transport`] if the session fails mid-poll.
    pub fn poll(&self) -> Result<Snapshot, ProjectorError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(snapshot) = inner.cached_within_cooldown() {
            debug!("control cooldown active, serving cached snapshot");
            return Ok(snapshot);
        }
        inner.refresh()
    }

    /// Apply a single control operation.
    ///
    /// Unsupported properties are logged and reported as
    /// [`ControlOutcome::Unsupported`] without contacting the device.
    ///
    /// # Errors
    /// Returns [`ProjectorError::Transport`] if the session fails.
    pub fn control(&self, property: &str, value: &str) -> Result<ControlOutcome, ProjectorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.apply_control(property, value)
    }

    /// Apply a batch of control operations in order.
    ///
    /// Each entry goes through [`control`](Self::control) and re-acquires the
    /// session lock, so a concurrent poll can run between entries.
    ///
    /// # Errors
    /// Returns [`ProjectorError::EmptyBatch`] before any processing if the
    /// batch is empty, or [`ProjectorError::Transport`] if an entry fails.
    pub fn control_batch(
        &self,
        requests: &[ControlRequest],
    ) -> Result<Vec<ControlOutcome>, ProjectorError> {
        if requests.is_empty() {
            return Err(ProjectorError::EmptyBatch);
        }
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.control(&request.property, &request.value)?);
        }
        Ok(outcomes)
    }

    /// Tear down the transport session.
    ///
    /// # Errors
    /// Returns [`ProjectorError::Transport`] if the shutdown fails.
    pub fn disconnect(&self) -> Result<(), ProjectorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.transport.disconnect()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backdate_last_control(&self, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_control = inner.last_control.and_then(|t| t.checked_sub(by));
    }
}

// =============================================================================
// Session internals (run under the facade lock)
// =============================================================================

impl<T: Transport> Inner<T> {
    fn cached_within_cooldown(&self) -> Option<Snapshot> {
        let last_control = self.last_control?;
        if last_control.elapsed() < COOLDOWN_WINDOW {
            self.cache.clone()
        } else {
            None
        }
    }

    /// Send the ESC/VP.net greeting and check the status byte of the reply.
    fn authorize(&mut self) -> Result<bool, ProjectorError> {
        let reply = self.transport.send(ESC_VP_HANDSHAKE).map_err(|e| {
            error!("ESC/VP.net handshake failed: {e}");
            ProjectorError::from(e)
        })?;
        match reply.last() {
            Some(0) => Ok(true),
            code => {
                debug!("handshake refused with status {code:?}");
                Ok(false)
            }
        }
    }

    fn ensure_authorized(&mut self) -> Result<bool, ProjectorError> {
        if self.transport.is_connected() {
            return Ok(true);
        }
        self.authorize()
    }

    /// One query exchange with the bounded retry: if the expected marker is
    /// missing from the reply, the identical command is sent exactly once
    /// more and the second reply is used as-is.
    fn exchange(&mut self, command: &[u8], marker: &str) -> Result<String, ProjectorError> {
        let reply = self.transport.send(command)?;
        let text = String::from_utf8_lossy(&reply).into_owned();
        if text.contains(marker) {
            return Ok(text);
        }
        debug!("reply {text:?} is missing marker {marker:?}, retrying once");
        let reply = self.transport.send(command)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    fn query_number(&mut self, command: &[u8], marker: &str) -> Result<Option<u32>, ProjectorError> {
        let response = self.exchange(command, marker)?;
        Ok(protocol::decode_number(&response, marker))
    }

    fn query_text(&mut self, command: &[u8], marker: &str) -> Result<Option<String>, ProjectorError> {
        let response = self.exchange(command, marker)?;
        Ok(protocol::decode_text(&response, marker))
    }

    fn query_on_off(&mut self, command: &[u8], marker: &str) -> Result<Option<bool>, ProjectorError> {
        let response = self.exchange(command, marker)?;
        Ok(protocol::decode_on_off(&response))
    }

    // -------------------------------------------------------------------------
    // Statistics collection
    // -------------------------------------------------------------------------

    /// Query the full device state and replace the cached snapshot.
    fn refresh(&mut self) -> Result<Snapshot, ProjectorError> {
        if !self.ensure_authorized()? {
            warn!("not authorized, skipping statistics refresh");
            return Ok(self.cache.clone().unwrap_or_default());
        }

        let mut snapshot = Snapshot::default();

        let power_status = self.query_number(POWER_STATUS_CHECK, "PWR")?;
        if let Some(status) = power_status {
            debug!("power status: {status}");
            match u8::try_from(status).ok().and_then(power_mode_label) {
                Some(label) => {
                    snapshot
                        .statistics
                        .insert("Power mode".to_owned(), label.to_owned());
                }
                None => debug!("unknown power status code {status}, omitting label"),
            }
            let lamp_on = status == 1;
            let switch_value = if lamp_on { "1" } else { "0" };
            snapshot
                .statistics
                .insert("Power".to_owned(), switch_value.to_owned());
            snapshot.controls.push(ControlDescriptor::switch("Power", lamp_on));
        }

        if let Some(hours) = self.query_number(REQUEST_LAMP_HOURS, "LAMP")? {
            debug!("lamp operation time: {hours}h");
            snapshot
                .statistics
                .insert("Lamp operation time (hrs)".to_owned(), hours.to_string());
        }

        if let Some(serial) = self.query_text(REQUEST_SERIAL_NUMBER, "SNO")? {
            debug!("serial number: {serial}");
            snapshot
                .statistics
                .insert("Serial number".to_owned(), serial);
        }

        // Image settings are only answered while the lamp is on or warming up.
        if matches!(power_status, Some(1) | Some(2)) {
            self.populate_image_settings(&mut snapshot)?;
        }

        self.cache = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn populate_image_settings(&mut self, snapshot: &mut Snapshot) -> Result<(), ProjectorError> {
        if let Some(mute) = self.query_on_off(MUTE_STATUS_CHECK, "MUTE")? {
            let value = if mute { "1" } else { "0" };
            snapshot
                .statistics
                .insert("A/V Mute".to_owned(), value.to_owned());
            snapshot.controls.push(ControlDescriptor::switch("A/V Mute", mute));
        }

        if let Some(freeze) = self.query_on_off(FREEZE_STATUS_CHECK, "FREEZE")? {
            let value = if freeze { "1" } else { "0" };
            snapshot
                .statistics
                .insert("Freeze".to_owned(), value.to_owned());
            snapshot.controls.push(ControlDescriptor::switch("Freeze", freeze));
        }

        for entry in &NUMERIC_PROPERTIES {
            if let Some(value) = self.query_number(entry.query, entry.marker)? {
                snapshot
                    .statistics
                    .insert(entry.name.to_owned(), value.to_string());
                snapshot
                    .controls
                    .push(ControlDescriptor::slider(entry.name, 0.0, 255.0, value as f32));
            }
        }

        if let Some(code) = self.query_number(GET_COLOR_MODE, "CMODE")? {
            let known = u8::try_from(code).ok().and_then(color_mode_name).is_some();
            if known {
                let options = COLOR_MODES
                    .iter()
                    .map(|&(name, mode)| DropdownOption {
                        value: mode.to_string(),
                        label: name.to_owned(),
                    })
                    .collect();
                snapshot
                    .statistics
                    .insert("Image color mode".to_owned(), code.to_string());
                snapshot.controls.push(ControlDescriptor::dropdown(
                    "Image color mode",
                    options,
                    &code.to_string(),
                ));
            } else {
                debug!("unknown image color mode code {code}, omitting");
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Control dispatch
    // -------------------------------------------------------------------------

    fn apply_control(&mut self, property: &str, value: &str) -> Result<ControlOutcome, ProjectorError> {
        match property {
            "Power" => {
                let command = if value == "0" { POWER_OFF } else { POWER_ON };
                let outcome = self.toggle(command, property, value)?;
                // The device may drop the socket on power-down; disconnecting
                // keeps local and remote session state aligned.
                if outcome.is_applied() && value == "0" {
                    self.transport.disconnect()?;
                }
                Ok(outcome)
            }
            "A/V Mute" => {
                let command = if value == "0" { MUTE_OFF } else { MUTE_ON };
                self.toggle(command, property, value)
            }
            "Freeze" => {
                let command = if value == "0" { FREEZE_OFF } else { FREEZE_ON };
                self.toggle(command, property, value)
            }
            "Image color mode" => self.set_color_mode(value),
            _ => match protocol::numeric_property(property) {
                Some(entry) => self.set_numeric(entry, value),
                None => {
                    warn!("control operation {property:?} is not supported");
                    Ok(ControlOutcome::Unsupported)
                }
            },
        }
    }

    fn toggle(
        &mut self,
        command: &'static [u8],
        property: &str,
        value: &str,
    ) -> Result<ControlOutcome, ProjectorError> {
        if !self.ensure_authorized()? {
            debug!("not authorized/connected, abandoning control of {property:?}");
            return Ok(ControlOutcome::NotAuthorized);
        }
        if self.send_control(command, property)? {
            self.patch_cache(property, value);
            Ok(ControlOutcome::Applied)
        } else {
            Ok(ControlOutcome::Rejected)
        }
    }

    fn set_numeric(
        &mut self,
        entry: &'static NumericProperty,
        value: &str,
    ) -> Result<ControlOutcome, ProjectorError> {
        if !self.ensure_authorized()? {
            debug!("not authorized/connected, abandoning control of {:?}", entry.name);
            return Ok(ControlOutcome::NotAuthorized);
        }
        let Ok(requested) = value.parse::<f64>() else {
            warn!("value {value:?} for {:?} is not numeric", entry.name);
            return Ok(ControlOutcome::Unsupported);
        };
        // Truncate a fractional input, then clamp into the device range so a
        // stray caller value can never break the 3-digit command framing.
        let level = (requested as i64).clamp(0, 255) as u8;
        let command = protocol::encode_numeric(entry.set, level);
        if self.send_control(&command, entry.name)? {
            self.patch_cache(entry.name, &level.to_string());
            Ok(ControlOutcome::Applied)
        } else {
            Ok(ControlOutcome::Rejected)
        }
    }

    fn set_color_mode(&mut self, value: &str) -> Result<ControlOutcome, ProjectorError> {
        if !self.ensure_authorized()? {
            debug!("not authorized/connected, abandoning color mode change");
            return Ok(ControlOutcome::NotAuthorized);
        }
        let Some(code) = resolve_color_mode(value) else {
            warn!("unknown image color mode {value:?}");
            return Ok(ControlOutcome::Unsupported);
        };
        let command = protocol::encode_color_mode(SET_COLOR_MODE, code);
        if self.send_control(&command, "Image color mode")? {
            self.patch_cache("Image color mode", &code.to_string());
            Ok(ControlOutcome::Applied)
        } else {
            Ok(ControlOutcome::Rejected)
        }
    }

    /// Send an encoded control command and validate the acknowledgment.
    /// Accepted commands start the poll cooldown.
    fn send_control(&mut self, command: &[u8], property: &str) -> Result<bool, ProjectorError> {
        let reply = self.transport.send(command).map_err(|e| {
            debug!("control of {property:?} failed at the transport: {e}");
            ProjectorError::from(e)
        })?;
        let accepted = protocol::is_accepted(&reply);
        if accepted {
            self.last_control = Some(Instant::now());
        }
        Ok(accepted)
    }

    fn patch_cache(&mut self, property: &str, value: &str) {
        match self.cache.as_mut() {
            Some(snapshot) => snapshot.patch(property, value),
            None => debug!("no snapshot cached yet, skipping patch of {property:?}"),
        }
    }
}
