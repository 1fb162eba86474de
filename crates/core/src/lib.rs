//! Cafe Calories Core - Domain types and ordering rules.
//!
//! This crate provides the types and pure rules shared by all Cafe Calories
//! components:
//! - `server` - The HTTP API
//! - `cli` - Command-line tools for migrations and administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, roles, statuses and pickup codes
//! - [`cart`] - Grouping cart lines into per-person subtotals
//! - [`money`] - Two-decimal rounding for prices
//! - [`order`] - Turning cart lines into an order draft, and the cancellation window
//! - [`geo`] - Great-circle distance and nearest-point selection
//! - [`nutrition`] - Daily calorie recommendations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod geo;
pub mod money;
pub mod nutrition;
pub mod order;
pub mod types;

pub use types::*;
