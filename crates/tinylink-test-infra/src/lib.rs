//! Test infrastructure shared by the tinylink crates.
//!
//! - [`mysql`]: a disposable MySQL server with a connected pool.
//! - [`conformance`]: the behaviour every [`LinkStore`](tinylink_core::LinkStore)
//!   backend must show, plus the [`link_store_conformance!`] macro that turns it
//!   into a test suite for a concrete backend.

pub mod conformance;
pub mod error;
pub mod mysql;

pub use error::{Result, TestInfraError};
