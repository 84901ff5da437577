//! Plain-text protocols fed to the native engines on standard input.
//!
//! Every value is computed upstream; the emitters only serialize it in the
//! order the engines read it.

pub mod aggregate_packing;
pub mod microstructure;
pub mod writer;

pub use aggregate_packing::emit_aggregate_packing_protocol;
pub use microstructure::{emit_dissolution_bias_block, emit_microstructure_protocol};
pub use writer::ProtocolWriter;
