//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: insert payloads used by repositories.
//! - `repo`: SQL-only functions that map rows into `crate::model` entities.
//!
//! External modules should import from `certmailer::db` — we re-export the
//! repository API and the insert models for convenience.

pub mod model;
pub mod repo;

pub use model::NewParticipant;
pub use repo::*;
