//! Storage subsystem
//!
//! This module provides abstractions and implementations for persisting
//! session records and finished report artifacts.
//!
//! Components:
//! - `session_store`: the SessionStore trait, whose compare-and-swap is the
//!   only mutation primitive the controller uses.
//! - `memory_store`: in-process HashMap implementation, used by tests and
//!   as a zero-setup default.
//! - `database_store`: SQLite implementation driven through sqlx.
//! - `report_store`: the ReportStore trait for finished PDF artifacts.
//! - `file_report_store`: filesystem-backed artifact storage.

pub mod database_store;
pub mod file_report_store;
pub mod memory_store;
pub mod report_store;
pub mod session_store;

pub use database_store::DatabaseSessionStore;
pub use file_report_store::FileReportStore;
pub use memory_store::MemorySessionStore;
pub use report_store::ReportStore;
pub use session_store::SessionStore;
