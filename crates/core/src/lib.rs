//! Rounds Core - Domain types and business rules.
//!
//! This crate provides the types and pure rules shared by every Rounds component:
//! - `storefront` - Public shop pages, order placement, and the owner dashboard API
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP. Repositories in the storefront crate load rows and
//! hand plain data to the functions here, which keeps the rules testable without
//! a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, slugs, money and status enums
//! - [`scope`] - Which shops an owner may currently act on
//! - [`inventory`] - Purchase-list aggregation and per-round stock
//! - [`pricing`] - Order totals and shipping tiers
//! - [`finance`] - Round revenue and cost summary
//! - [`tokens`] - Single-use email verification and password reset tokens
//! - [`promptpay`] - `PromptPay` QR payload encoding

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod finance;
pub mod inventory;
pub mod pricing;
pub mod promptpay;
pub mod scope;
pub mod tokens;
pub mod types;

pub use types::*;
