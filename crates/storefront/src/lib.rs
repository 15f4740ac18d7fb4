//! Saumara Storefront library.
//!
//! The catalog pages, the server half of checkout (`/api/razorpay`,
//! `/api/orders`), and the client-side checkout state machine with its
//! HTTP backend. The binary in `main.rs` only wires configuration,
//! logging and the listener around [`server::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod gateway;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
