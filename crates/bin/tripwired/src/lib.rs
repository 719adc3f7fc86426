//! # tripwired — tripwire daemon
//!
//! Composition root that loads configuration, declares scenarios and drives
//! the scheduler.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Build the runtime with the built-in components (and devices, if any)
//! - Seed initial variables and declare the configured scenarios
//! - Call `tick` on a fixed interval until SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no scenario logic belongs here.

pub mod config;
pub mod declare;

use anyhow::Context;
use tripwire_app::components::device::{DeviceComponent, Devices};
use tripwire_app::ports::Clock;
use tripwire_app::runtime::Runtime;
use tripwire_domain::device::Device;

use crate::config::Config;

/// Build a runtime from `config` and declare everything in it.
///
/// # Errors
///
/// Fails on an invalid device name, a failing component, or any
/// declaration error.
pub fn bootstrap(config: &Config, clock: impl Clock + 'static) -> anyhow::Result<Runtime> {
    let mut builder = Runtime::builder()
        .clock(clock)
        .builtin_components()
        .max_catch_up(config.scheduler.max_catch_up_secs);
    if !config.devices.is_empty() {
        let devices = Devices::new();
        for name in &config.devices {
            devices.register(Device::new(name.as_str())?);
        }
        builder = builder.component(DeviceComponent::new(devices));
    }
    let runtime = builder.build().context("failed to build runtime")?;

    declare::seed_variables(&runtime, &config.variables)
        .context("failed to seed variables")?;
    declare::declare_all(&runtime, &config.scenarios)
        .context("failed to declare scenarios")?;
    Ok(runtime)
}
