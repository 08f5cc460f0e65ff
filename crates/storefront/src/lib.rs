//! Rounds Storefront library.
//!
//! Public shop pages, customer ordering, owner accounts and the owner
//! dashboard API. Built as a library so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
