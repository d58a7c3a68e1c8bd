//! services/api/src/lib.rs
//!
//! Library surface of the `api` service, so the binaries and integration
//! tests can share the config, adapters, and web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
