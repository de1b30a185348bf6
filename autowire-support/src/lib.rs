//! # Autowire Support
//!
//! Text helpers shared by the autowire crates.
//!
//! This crate provides:
//! - Type-name shortening for diagnostics
//! - "Did you mean?" suggestions for missing services
//! - Tabular rendering of compiled factory plans

pub mod rendering;
