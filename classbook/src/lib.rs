//! Classbook library
//!
//! This library exposes the core functionality of Classbook, a classroom
//! notebook, for the binary, the integration tests and host applications.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
