//! Email notification subsystem.
//!
//! Delivery is strictly best effort: the lifecycle controller logs a failed
//! send and moves on, it never fails a scan session over email.

pub mod mailer;

pub use mailer::{NoopNotifier, Notifier, SmtpNotifier};
