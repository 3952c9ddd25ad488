//! Encrypted-at-rest, triplicated timestamp storage.
//!
//! This crate provides the "sealed checkpoint" primitive that
//! `license-core`'s trusted-time oracle uses as its monotone floor: a
//! directory of three Fernet-sealed files, each holding the same Unix
//! timestamp. A checkpoint is trusted only when at least two of the three
//! files decrypt and agree within a small tolerance. The triplication
//! defeats accidental corruption and casual
//! single-file tampering; it is not a defense against an attacker with
//! filesystem-root access.
//!
//! The Fernet codec ([`fernet`]) matches the public Fernet token format
//! exactly, so the on-disk files remain a documented, inspectable external
//! interface rather than an opaque internal blob.

pub mod checkpoint;
mod error;
pub mod fernet;

pub use checkpoint::{CheckpointReading, CheckpointStore};
pub use error::CheckpointError;
pub use fernet::FernetKey;
