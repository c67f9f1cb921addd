//! Core business logic for Outlay.
//!
//! This crate contains the expense approval engine with ZERO web or database
//! dependencies. Persistence and HTTP layers call into it with plain values.
//!
//! # Modules
//!
//! - `workflow` - Approval chains, conditional rules, workflow instantiation
//!   and the decision evaluator state machine

pub mod workflow;
