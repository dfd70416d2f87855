//! Sessions: per-client wizard state and the background generation task.
//!
//! Each client gets its own [`Session`] holding the step pointer, answers,
//! optional API key and generation status. [`PlaybookGenerator`] runs at most
//! one generation per session and reports progress as [`SessionEvent`]s.

pub mod generator;
pub mod model;
pub mod store;

pub use generator::{PlaybookGenerator, ProviderSource};
pub use model::{FailureKind, GenerationStatus, SessionEvent, SessionSnapshot};
pub use store::{Session, SessionStore, spawn_expiry_task};
