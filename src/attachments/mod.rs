//! Built-in attachments.
//!
//! Each attachment is an [`Operation`](crate::compose::Operation) built from
//! a typed config, bound under a caller-chosen name at composition time:
//!
//! - [`debug`]: times each delegated invocation and appends a text record to
//!   a log target.
//! - [`remember`]: derives a deterministic key from the call and
//!   short-circuits execution through a persisted result store.

pub mod debug;
pub mod remember;
