//! # sia-tests
//!
//! Integration tests for the Sia explorer. The [`sim`] module stands
//! in for the chain manager, emitting apply/revert updates with
//! consistent element proofs and consensus roots; [`harness`] wires it
//! to a full explorer instance.

pub mod harness;
pub mod sim;


#[cfg(test)]
mod api_tests;

pub use harness::TestExplorer;
pub use sim::{send_siacoins, test_address, ChainSim};
