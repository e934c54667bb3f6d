//! Registration and credential checks on top of the registry.

pub mod domain;
pub mod service;

pub use service::UserService;
