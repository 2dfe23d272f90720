// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! CityPulse: urban intelligence workspace
//!
//! Collects city datasets, images and documents together with free-text
//! field notes, asks a reasoning model for a structured analysis, and
//! presents the result through a CLI or a small web dashboard.

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod present;
pub mod reasoning;
pub mod session;
pub mod web;

pub use config::AppConfig;
pub use error::{CityPulseError, Result};
