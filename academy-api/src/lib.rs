//! # Academy API Server Library
//!
//! HTTP layer of the academy backend: accounts, academies, schedules,
//! attendance, challenges and payments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors rejecting with the API error envelope
//! - `middleware`: Security headers
//! - `response`: Success envelope
//! - `routes`: API route handlers
//! - `uploads`: Multipart parsing and file storage

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod uploads;
