//! Client side of Cantine: the unified data-access layer.
//!
//! [`Canteen`] routes every operation to either the on-device store
//! ([`LocalDocs`], or any other [`cantine_core::store::CanteenStore`]) or the
//! HTTP service ([`RemoteStore`]), picking the side per call through a
//! [`mode::ModeResolver`].

pub mod error;
pub mod facade;
pub mod local;
pub mod mode;
pub mod remote;

pub use error::{Error, Result};
pub use facade::Canteen;
pub use local::LocalDocs;
pub use remote::{RemoteConfig, RemoteStore};

#[cfg(test)]
mod tests;
