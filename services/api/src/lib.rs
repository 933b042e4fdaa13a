//! services/api/src/lib.rs
//!
//! The storefront HTTP service: PostgreSQL, Argon2 and JWT adapters for the
//! core ports, the axum gateway and its configuration.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
