//! # tripwire-app
//!
//! Application layer — the single-threaded scenario runtime.
//!
//! ## Responsibilities
//! - Define **port traits** for the outside world:
//!   - `Clock` — wall-clock reads (system or manual)
//!   - `EventPublisher` — where ticks and change notifications go
//! - Provide **in-process infrastructure**:
//!   - `EventBus` — topic → ordered subscriber list, synchronous dispatch
//!   - `VariableStore` — named values with optional expiry
//!   - `Scheduler` — per-second ticks, periodic jobs, one-shot timers
//! - Define the **component protocol**: components contribute named trigger
//!   and constraint factories to every scenario's vocabulary
//! - Run the **scenario engine**: ordered constraint-group matching with an
//!   exclusive else branch and an optional debounce window
//! - Own everything in an explicit `Runtime` context
//!
//! ## Execution model
//! Everything runs on one thread. Handles are `Rc`-based and dispatch is
//! re-entrant: a callback may emit events, set variables or assert other
//! scenarios while an assert is in progress.
//!
//! ## Dependency rule
//! Depends on `tripwire-domain` only. Never imports the daemon crate.

pub mod clock;
pub mod component;
pub mod components;
pub mod event_bus;
pub mod ports;
pub mod prelude;
pub mod runtime;
pub mod scenario;
pub mod scheduler;
pub mod variables;
pub mod vocabulary;
