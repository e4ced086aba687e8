//! # Granite Flow Web Server Library
//!
//! HTTP presentation layer for Granite Flow: page view models, the auth and
//! task APIs, and the access gate applied per route group.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Session restore and access gate layers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
