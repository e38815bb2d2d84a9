//! Core domain types for Core Web Vitals collection and ingestion.
//!
//! Pure logic only: no I/O, no async. Shared by the collector, the API
//! server and the storage layer.

pub mod aggregate;
pub mod error;
pub mod roles;
pub mod sample;
pub mod types;
pub mod vitals;
