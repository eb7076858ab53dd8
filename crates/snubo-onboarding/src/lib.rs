//! Client-side identity verification for Snubo onboarding.
//!
//! Field validators, a password strength scorer, the per-market ID-type registry and
//! the OTP-backed verification flow, plus the configuration, telemetry and error types
//! shared with the API service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod validation;
pub mod workflows;
