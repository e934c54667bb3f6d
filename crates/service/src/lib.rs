//! Service layer for the notes backend.
//! - `content`: the backing file store (GitHub contents API or in-memory).
//! - `registry`: the single-file user registry with conditional writes.
//! - `users` / `notes`: business rules behind each HTTP endpoint.

pub mod errors;
pub mod retry;
pub mod content;
pub mod registry;
pub mod users;
pub mod notes;
