//! Access-token verification.
//!
//! - [`jwt`] -- HS256 validation of host-issued access tokens.

pub mod jwt;
