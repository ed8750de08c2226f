//! In-process host for home rules
//!
//! The rules only talk to the host through the ports in `rules-core`. This
//! crate provides a self-contained implementation of those ports, used by the
//! `home-rules` runner and by integration tests:
//!
//! - [`SignalBus`] broadcasts [`rules_core::SignalChange`] notifications
//! - [`SignalStore`] holds current signal values and implements
//!   [`rules_core::SignalSource`]
//! - [`ServiceRegistry`] routes service calls to registered handlers and
//!   implements [`rules_core::ServiceCaller`]

mod bus;
mod services;
mod store;

pub use bus::{SharedSignalBus, SignalBus};
pub use services::{ServiceFuture, ServiceHandler, ServiceRegistry};
pub use store::{SharedSignalStore, SignalStore};
