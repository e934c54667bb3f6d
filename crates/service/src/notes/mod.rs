//! Per-user file namespace: upload, list and delete under `<folder>/<userId>/`.

pub mod domain;
pub mod service;

pub use domain::{is_within_namespace, sanitize_filename};
pub use service::{NoteService, NoteSettings};
