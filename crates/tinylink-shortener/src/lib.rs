//! The tinylink link registry.
//!
//! [`LinkRegistry`] owns the rules for creating short links (URL and code
//! validation, random code generation, collision retries) on top of any
//! [`LinkStore`](tinylink_core::LinkStore) backend. Core types are re-exported
//! from `tinylink_core`.

pub mod registry;

pub use registry::{LinkRegistry, RegistrySettings};
pub use tinylink_core::{Link, RegistryError, ShortCode, ShortenParams, Shortener};
