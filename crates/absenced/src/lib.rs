//! absenced: the Auto-Absence HTTP daemon.
//!
//! Serves the REST API over a SQLite [`absence_store::Store`] and a face
//! engine thread that turns uploaded photos into embeddings.

pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
