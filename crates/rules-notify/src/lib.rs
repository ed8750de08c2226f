//! Outbound notifications for home rules
//!
//! This crate provides:
//! - [`Messenger`], the port every monitor sends text through
//! - [`ServiceMessenger`], which delivers through a host `notify/*` service
//! - [`escape_markdown_v2`] for the messaging channel's reserved characters
//! - [`ThrottledNotifier`], a minimum-interval gate per [`ThrottleKey`]

mod escape;
mod messenger;
mod throttle;

pub use escape::escape_markdown_v2;
pub use messenger::{Messenger, NotifyError, ServiceMessenger};
pub use throttle::{AlertKind, ThrottleKey, ThrottledNotifier, DEFAULT_MIN_INTERVAL};
