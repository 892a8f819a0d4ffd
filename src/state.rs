//! Device state snapshot and control descriptors.

use std::collections::BTreeMap;
use std::time::SystemTime;

use log::debug;

/// The UI shape of a controllable property, plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    /// A two-state toggle.
    Switch {
        /// Label for the "1" position.
        label_on: &'static str,
        /// Label for the "0" position.
        label_off: &'static str,
    },
    /// A continuous numeric control.
    Slider {
        /// Lower bound of the accepted range.
        min: f32,
        /// Upper bound of the accepted range.
        max: f32,
    },
    /// A fixed set of named options.
    Dropdown {
        /// The selectable options.
        options: Vec<DropdownOption>,
    },
}

/// One selectable entry of a [`ControlKind::Dropdown`].
#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOption {
    /// The value submitted back through `control` when selected.
    pub value: String,
    /// The human-readable label shown for this option.
    pub label: String,
}

/// Metadata describing one controllable property and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    /// Property name, matching the statistics key.
    pub name: String,
    /// UI shape and metadata.
    pub kind: ControlKind,
    /// Current value as reported by (or patched into) the device state.
    pub value: String,
    /// When the value was last read or patched.
    pub updated_at: SystemTime,
}

impl ControlDescriptor {
    /// Create an On/Off switch descriptor.
    pub fn switch(name: &str, on: bool) -> Self {
        Self {
            name: name.to_owned(),
            kind: ControlKind::Switch {
                label_on: "On",
                label_off: "Off",
            },
            value: (if on { "1" } else { "0" }).to_owned(),
            updated_at: SystemTime::now(),
        }
    }

    /// Create a slider descriptor with the given range and position.
    pub fn slider(name: &str, min: f32, max: f32, value: f32) -> Self {
        Self {
            name: name.to_owned(),
            kind: ControlKind::Slider { min, max },
            value: (value as u32).to_string(),
            updated_at: SystemTime::now(),
        }
    }

    /// Create a dropdown descriptor with the given options and selection.
    pub fn dropdown(name: &str, options: Vec<DropdownOption>, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: ControlKind::Dropdown { options },
            value: value.to_owned(),
            updated_at: SystemTime::now(),
        }
    }
}

/// Everything currently known about the device: monitored statistics plus the
/// descriptors of the properties that can be controlled right now.
///
/// A property appears here only if its underlying query succeeded; a reading
/// the device did not answer is omitted rather than published as a false
/// zero or empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Ordered statistics map, property name to value.
    pub statistics: BTreeMap<String, String>,
    /// Descriptors for the currently controllable properties.
    pub controls: Vec<ControlDescriptor>,
}

impl Snapshot {
    /// Patch a single property in place after a successful control operation,
    /// leaving every other entry untouched.
    pub(crate) fn patch(&mut self, property: &str, value: &str) {
        self.statistics
            .insert(property.to_owned(), value.to_owned());
        match self.controls.iter_mut().find(|c| c.name == property) {
            Some(control) => {
                control.value = value.to_owned();
                control.updated_at = SystemTime::now();
            }
            None => debug!("no {property:?} control descriptor to patch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_updates_matching_entries_only() {
        let mut snapshot = Snapshot::default();
        snapshot
            .statistics
            .insert("Power".to_owned(), "0".to_owned());
        snapshot
            .statistics
            .insert("Freeze".to_owned(), "0".to_owned());
        snapshot.controls.push(ControlDescriptor::switch("Power", false));
        snapshot.controls.push(ControlDescriptor::switch("Freeze", false));

        snapshot.patch("Power", "1");

        assert_eq!(snapshot.statistics["Power"], "1");
        assert_eq!(snapshot.statistics["Freeze"], "0");
        assert_eq!(snapshot.controls[0].value, "1");
        assert_eq!(snapshot.controls[1].value, "0");
    }

    #[test]
    fn test_patch_tolerates_a_missing_descriptor() {
        let mut snapshot = Snapshot::default();
        snapshot.patch("Lamp operation time (hrs)", "900");
        assert_eq!(snapshot.statistics["Lamp operation time (hrs)"], "900");
        assert!(snapshot.controls.is_empty());
    }
}
