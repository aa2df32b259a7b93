//! HTTP serving layer for the endometriosis prediction engine
//!
//! Exposed as a library so the integration tests exercise the exact router
//! and handlers the binary serves.

pub mod api;
pub mod config;
