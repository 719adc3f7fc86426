//! Device — a named thing exposing attribute values (`power`, `brightness`, …).
//!
//! Devices are the minimal hook the runtime needs from the device layer:
//! attribute reads for constraints, attribute changes as stimuli.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TripwireError, ValidationError};
use crate::time::WallClock;

/// A device and its current attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
    pub last_changed: Option<WallClock>,
}

/// Result of writing an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub previous: Value,
    pub changed: bool,
}

impl Device {
    /// Create a device with no attributes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when `name` is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, TripwireError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(Self {
            name,
            attributes: BTreeMap::new(),
            last_changed: None,
        })
    }

    /// Current value of an attribute, `Null` when unset.
    #[must_use]
    pub fn attribute(&self, attribute: &str) -> Value {
        self.attributes.get(attribute).cloned().unwrap_or(Value::Null)
    }

    /// Write an attribute. `last_changed` only moves when the value differs.
    pub fn set_attribute(
        &mut self,
        attribute: impl Into<String>,
        value: Value,
        at: WallClock,
    ) -> AttributeChange {
        let attribute = attribute.into();
        let previous = self.attribute(&attribute);
        let changed = previous != value;
        if value.is_null() {
            self.attributes.remove(&attribute);
        } else {
            self.attributes.insert(attribute, value);
        }
        if changed {
            self.last_changed = Some(at);
        }
        AttributeChange { previous, changed }
    }
}
