//! soplink - click-tracking redirector
//!
//! Receives a tracking link, records one row per human click into an external
//! table and redirects the browser to the destination.
//!
//! # Architecture
//! - `tracking`: bot filter, duplicate-click gate, click events, background reporter
//! - `sink`: external table (Coda REST API, in-memory)
//! - `resolver`: SOP key → target lookup
//! - `identity`: Google OAuth and sessions
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod identity;
pub mod resolver;
pub mod runtime;
pub mod sink;
pub mod system;
pub mod tracking;
pub mod utils;
