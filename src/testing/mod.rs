//! Scenario and property tests for the state transfer engine.
//!
//! The scenarios drive a [`StateTransferOrchestrator`](crate::statetransfer::StateTransferOrchestrator)
//! against an in-memory layout store and a scripted transfer collaborator
//! that can fail chosen addresses, report addresses already held locally,
//! and slow batches down to observe concurrency and cancellation.

mod properties;
mod utils;
