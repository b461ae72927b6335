//! Durable storage for the TCC coordinator: connection pooling, flow
//! definitions, and transaction records.
//!
//! This crate has no knowledge of the engine's in-memory types
//! ([`crate`]`::models` is the durable shape, not the runtime one) -- see
//! `tcc-core` for the flow model, component contract, and orchestrator
//! that read and write through these queries.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
