//! Feature flag platform.
//!
//! - [`gates`] and [`evaluation`]: the ordered gate model and the deterministic evaluator
//!   shared by the server and the SDK.
//! - [`models`] and [`keys`]: entities and the validators run on every mutation.
//! - [`client`]: the polling SDK that evaluates flags against a local snapshot.
//! - [`routes`]: the axum admin and SDK APIs backed by Postgres.

pub mod client;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod gates;
pub mod keys;
pub mod models;
pub mod routes;
pub mod state;
pub mod values;
