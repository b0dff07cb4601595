//! Atelier Core - Shared marketplace types.
//!
//! This crate provides the types exchanged with the marketplace backend and
//! shared by every Atelier component:
//! - `storefront` - Server-rendered marketplace site
//! - `cli` - Command-line tools for roles, checkout sessions and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Wire names follow the backend interface (camelCase fields,
//! lowercase enum variants).
//!
//! # Modules
//!
//! - [`types`] - Principals, items, prices, categories, profiles, branding and checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
