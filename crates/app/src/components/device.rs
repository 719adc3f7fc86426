//! Device component — the minimal device hook.
//!
//! [`Devices`] holds named devices and their attribute values. Writing an
//! attribute publishes `{device, attribute, value, previous}` on the
//! `attribute` topic when the value actually changes. External adapters can
//! push updates by emitting the same shape (without `previous`) on the
//! inbound `device` topic.

use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};
use tracing::{debug, info};
use tripwire_domain::device::Device;
use tripwire_domain::error::{NotFoundError, TripwireError, ValidationError};
use tripwire_domain::expect::expect_with;
use tripwire_domain::time::WallClock;

use crate::clock::SystemClock;
use crate::component::Component;
use crate::event_bus::EventBus;
use crate::ports::Clock;
use crate::runtime::Services;
use crate::scenario::Scenario;
use crate::vocabulary::{
    ConstraintVocabulary, Constraints, TriggerVocabulary, Vocabulary, str_arg, value_arg,
};

/// Inbound: adapters report attribute values here.
pub const DEVICE_TOPIC: &str = "device";
/// Outbound: published when an attribute changes.
pub const ATTRIBUTE_TOPIC: &str = "attribute";

pub const CHANGES: &str = "device.changes";
pub const IS: &str = "device.is";

struct DevicesInner {
    devices: RefCell<BTreeMap<String, Device>>,
    binding: OnceCell<Binding>,
}

/// Runtime services a registry publishes and stamps through once bound.
struct Binding {
    bus: EventBus,
    clock: Rc<dyn Clock>,
}

/// Shared device registry. Clones share the same devices.
#[derive(Clone)]
pub struct Devices {
    inner: Rc<DevicesInner>,
}

impl Default for Devices {
    fn default() -> Self {
        Self {
            inner: Rc::new(DevicesInner {
                devices: RefCell::default(),
                binding: OnceCell::new(),
            }),
        }
    }
}

impl Devices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device, replacing any device with the same name.
    pub fn register(&self, device: Device) {
        info!(device = %device.name, "device registered");
        self.inner
            .devices
            .borrow_mut()
            .insert(device.name.clone(), device);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Device> {
        self.inner.devices.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.devices.borrow().keys().cloned().collect()
    }

    /// Current attribute value; `null` for unknown devices or attributes.
    #[must_use]
    pub fn attribute(&self, device: &str, attribute: &str) -> Value {
        self.inner
            .devices
            .borrow()
            .get(device)
            .map_or(Value::Null, |d| d.attribute(attribute))
    }

    /// Write an attribute and publish the change, if any.
    ///
    /// Returns whether the value changed. `last_changed` is stamped from the
    /// runtime clock once the registry is bound, the system clock before.
    ///
    /// # Errors
    ///
    /// Returns [`TripwireError::NotFound`] for an unknown device, or the
    /// first error raised by an `attribute` subscriber.
    pub fn set_attribute(
        &self,
        device: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<bool, TripwireError> {
        let value = value.into();
        let now = self.now();
        let change = {
            let mut devices = self.inner.devices.borrow_mut();
            let entry = devices.get_mut(device).ok_or_else(|| NotFoundError {
                entity: "device",
                id: device.to_string(),
            })?;
            entry.set_attribute(attribute, value.clone(), now)
        };
        if !change.changed {
            return Ok(false);
        }
        debug!(device, attribute, %value, "attribute changed");
        if let Some(Binding { bus, .. }) = self.inner.binding.get() {
            let payload = json!({
                "device": device,
                "attribute": attribute,
                "value": value,
                "previous": change.previous,
            });
            bus.emit(ATTRIBUTE_TOPIC, &[payload])?;
        }
        Ok(true)
    }

    fn now(&self) -> WallClock {
        self.inner
            .binding
            .get()
            .map_or_else(|| SystemClock.now(), |binding| binding.clock.now())
    }

    fn bind(&self, services: &Services) {
        let binding = Binding {
            bus: services.bus().clone(),
            clock: Rc::clone(services.clock()),
        };
        if self.inner.binding.set(binding).is_err() {
            debug!("device registry already bound to a runtime");
        }
    }
}

impl fmt::Debug for Devices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Devices")
            .field("devices", &self.names())
            .finish_non_exhaustive()
    }
}

/// Opt-in component exposing a [`Devices`] registry to scenarios.
#[derive(Debug, Clone)]
pub struct DeviceComponent {
    devices: Devices,
}

impl DeviceComponent {
    #[must_use]
    pub fn new(devices: Devices) -> Self {
        Self { devices }
    }
}

impl Component for DeviceComponent {
    fn name(&self) -> &'static str {
        "device"
    }

    fn init(&self, services: &Services) -> Result<(), TripwireError> {
        self.devices.bind(services);
        let devices = self.devices.clone();
        services.bus().on(DEVICE_TOPIC, move |args| {
            let Some(report) = args.first() else {
                return Err(ValidationError::arguments(DEVICE_TOPIC, "expected a report").into());
            };
            let (Some(device), Some(attribute)) =
                (report["device"].as_str(), report["attribute"].as_str())
            else {
                return Err(ValidationError::arguments(
                    DEVICE_TOPIC,
                    "expected string device and attribute names",
                )
                .into());
            };
            devices
                .set_attribute(device, attribute, report["value"].clone())
                .map(drop)
        });
        Ok(())
    }

    fn triggers(&self, services: &Services, scenario: &Scenario) -> Vocabulary {
        let bus = services.bus().clone();
        let scenario = scenario.clone();
        Vocabulary::new().with(CHANGES, move |args| {
            let device = Value::from(str_arg(CHANGES, args, 0)?);
            let attribute = match args.get(1) {
                None | Some(Value::Null) => None,
                Some(_) => Some(Value::from(str_arg(CHANGES, args, 1)?)),
            };
            let scenario = scenario.clone();
            bus.on(ATTRIBUTE_TOPIC, move |change| match change.first() {
                Some(payload)
                    if payload["device"] == device
                        && attribute.as_ref().is_none_or(|a| payload["attribute"] == *a) =>
                {
                    scenario.assert(Some(payload)).map(drop)
                }
                _ => Ok(()),
            });
            Ok(())
        })
    }

    fn constraints(
        &self,
        _services: &Services,
        _scenario: &Scenario,
        constraints: &Constraints,
    ) -> Vocabulary {
        let devices = self.devices.clone();
        let group = constraints.clone();
        Vocabulary::new().with(IS, move |args| {
            let device = str_arg(IS, args, 0)?.to_string();
            let attribute = str_arg(IS, args, 1)?.to_string();
            let devices = devices.clone();
            let verdict =
                expect_with(move || devices.attribute(&device, &attribute)).eql(value_arg(args, 2));
            group.push(move || Ok(verdict.evaluate()));
            Ok(())
        })
    }
}

/// `when()?.device(name).changes()` / `.attribute_changes(attr)`.
pub trait DeviceTriggers {
    fn device(self, name: &str) -> DeviceTrigger;
}

impl DeviceTriggers for TriggerVocabulary {
    fn device(self, name: &str) -> DeviceTrigger {
        DeviceTrigger {
            vocabulary: self,
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DeviceTrigger {
    vocabulary: TriggerVocabulary,
    name: String,
}

impl DeviceTrigger {
    /// Assert when any attribute of the device changes.
    ///
    /// # Errors
    ///
    /// Fails when the device component is not registered.
    pub fn changes(self) -> Result<TriggerVocabulary, TripwireError> {
        self.vocabulary.invoke(CHANGES, &[Value::from(self.name)])
    }

    /// Assert when `attribute` of the device changes.
    ///
    /// # Errors
    ///
    /// Fails when the device component is not registered.
    pub fn attribute_changes(self, attribute: &str) -> Result<TriggerVocabulary, TripwireError> {
        self.vocabulary
            .invoke(CHANGES, &[Value::from(self.name), Value::from(attribute)])
    }
}

/// `constraint()?.device(name).is(attribute, value)`.
pub trait DeviceConstraints {
    fn device(self, name: &str) -> DeviceConstraint;
}

impl DeviceConstraints for ConstraintVocabulary {
    fn device(self, name: &str) -> DeviceConstraint {
        DeviceConstraint {
            vocabulary: self,
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DeviceConstraint {
    vocabulary: ConstraintVocabulary,
    name: String,
}

impl DeviceConstraint {
    /// The device attribute deep-equals `value` at assert time.
    ///
    /// # Errors
    ///
    /// Fails when the device component is not registered.
    pub fn is(
        self,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<ConstraintVocabulary, TripwireError> {
        self.vocabulary.invoke(
            IS,
            &[Value::from(self.name), Value::from(attribute), value.into()],
        )
    }
}
