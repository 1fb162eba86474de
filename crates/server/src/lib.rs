//! Cafe Calories server library.
//!
//! The HTTP API for browsing cafes, ordering for yourself and others,
//! dispatching drivers and tracking calorie intake. Exposed as a library so
//! the binary, the CLI and the tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
