//! Core types and traits for the tinylink URL shortener.
//!
//! This crate provides the types shared by the code generator, the storage
//! backends and the link registry: the [`Link`] record, the validated
//! [`ShortCode`], the storage contract and the [`Shortener`] interface that
//! request-handling layers call into.

pub mod clock;
pub mod error;
pub mod link;
pub mod shortcode;
pub mod shortener;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, GeneratorError, RegistryError, StorageError};
pub use link::Link;
pub use shortcode::ShortCode;
pub use shortener::{ShortenParams, Shortener};
pub use store::{LinkStore, ReadLinkStore};
