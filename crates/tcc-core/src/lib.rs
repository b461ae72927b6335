//! The TCC (Try-Confirm-Cancel) transaction coordinator engine: the flow
//! model, the component contract and registry, the retry/backoff
//! calculator, and the phase orchestrator that drives a transaction from
//! Try through Confirm or Cancel.
//!
//! This crate has no opinion on how flows or transaction records are
//! persisted beyond the [`loader::FlowLoader`] and [`store::RecordStore`]
//! traits -- see `tcc-db` for the reference Postgres-backed
//! implementations, and `tcc-cli` for the binary that wires them together.

pub mod component;
pub mod engine;
pub mod error;
pub mod flow;
pub mod id;
pub mod loader;
pub mod orchestrator;
pub mod recovery;
pub mod retry;
pub mod store;
pub mod task;

pub use engine::Engine;
pub use error::TccError;
pub use orchestrator::{OrchestratorError, PhaseOrchestrator, TransactionOutcome};
