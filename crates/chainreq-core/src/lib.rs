//! Request lifecycle engine.
//!
//! Requests are stored as intent only. Every read reconciles the stored
//! intent against the chain and projects the result into an API response;
//! nothing observed on chain is cached except the address of a successfully
//! created contract.

pub mod engine;
pub mod projector;
pub mod projects;
pub mod reconciler;
pub mod utils;

pub mod services {
	pub mod catalog;
	pub mod deployment;
	pub mod function_call;
	pub mod import;
	pub mod interfaces;
	pub mod lock;
	pub mod multi_send;
	pub mod send;
}

#[cfg(test)]
mod test_support;

pub use engine::{EngineBuilder, EngineError, RequestEngine};
pub use projects::ProjectRegistry;
pub use reconciler::{
	ExpectedTarget, ReconciledTransaction, StatusReconciler, TransactionExpectation,
};
