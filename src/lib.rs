//! Participant and key-issuance core of a certificate distribution
//! service: roster import into batches, unique access-key generation,
//! certificate rendering and per-batch delivery dispatch.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod import;
pub mod keygen;
pub mod mailer;
pub mod model;
pub mod render;
pub mod roster;
