//! # Taxi Shared Library
//!
//! This crate contains the data model, validation rules and storage layer
//! shared by the taxi fleet API server.
//!
//! ## Module Organization
//!
//! - `models`: Manufacturers, cars, drivers, search forms and pagination
//! - `store`: Storage traits plus the PostgreSQL and in-memory backends
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing and bearer tokens
//! - `error`: Storage error type

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

