//! # Taxi API Server Library
//!
//! HTTP surface of the taxi fleet service: manufacturer, car and driver
//! management behind a login-required gate.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Login-required gate and security headers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
