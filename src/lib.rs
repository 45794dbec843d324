// src/lib.rs
//! Control core for a two-channel serial electrical stimulator.
//!
//! `drivers` holds the wire protocol: the opcode table, the two-byte parameter
//! encoder, transports, the per-channel controller and the dual-channel
//! coordinator. `engine` and `types` adapt it to an operator front end.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod types;
