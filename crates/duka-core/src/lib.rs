//! Core types and services for the Duka storefront backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! and identity are reached through the [`store::KeyValueStore`] and
//! [`identity::IdentityProvider`] traits; time through [`clock::Clock`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod checkout;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod event;
pub mod identity;
pub mod report;
pub mod repository;
pub mod resource;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod testing;
