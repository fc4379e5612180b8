//! Academy Payments - payment gateway integration for the academy platform.
//!
//! Starts checkouts against the Paymob Accept gateway, verifies signed
//! transaction callbacks, drives each payment order through its state
//! machine, and grants premium entitlements exactly once per successful
//! order.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
