// src/config/mod.rs

//! Task file configuration: TOML model, loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{IoSection, RawTaskFile, TaskFile, TaskSection};
pub use validate::parse_duration;
