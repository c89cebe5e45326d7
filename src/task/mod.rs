// src/task/mod.rs

//! Task description layer.
//!
//! A [`TaskConfiguration`] is built once by the caller (directly, through the
//! builder, or from a task file via [`crate::config`]) and handed to the
//! executor. It never changes afterwards.

pub mod configuration;

pub use configuration::{DEFAULT_GRACE_PERIOD, TaskConfiguration, TaskConfigurationBuilder};
