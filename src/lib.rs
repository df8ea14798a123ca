//! Library crate for a software emulator of an abstract SIMD
//! associative/array vector machine: one Control Unit directing a fixed
//! number of Processing Elements in lockstep, with a bit-packed instruction
//! encoding, an assembler, and both a non-pipelined and a pipelined
//! execution engine.

pub mod assembler;
pub mod config;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod pe;
pub mod program;
pub mod program_reader;
pub mod state;

pub use config::{MachineConfig, Width};
pub use error::VsimdError;
