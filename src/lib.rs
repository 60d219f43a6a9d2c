//! Library surface for the signal-and-execution engine, exposed so
//! integration tests can exercise components without going through the
//! `main` binary.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod kelly;
pub mod llm;
pub mod orchestrator;
pub mod producers;
pub mod risk;
