//! Entity admin module: list/search, create/edit and delete over any
//! registered schema.

// === PUBLIC CONTRACT ===
// Only the contract module should be public for other modules to consume
pub mod contract;

// Re-export the public contract components
pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::EntityAdmin;

// === INTERNAL MODULES ===
// Exposed for the binary and for tests; the `contract` module is the stable API.
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
