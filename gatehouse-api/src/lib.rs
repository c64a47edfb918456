//! # Gatehouse API Server Library
//!
//! HTTP surface of the Gatehouse access-control service.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Boot parameters and layered configuration
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
