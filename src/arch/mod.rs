//! # Architecture Abstraction Layer
//!
//! Hardware implementations of the clock, preemption timer and log sink.
//! Currently implements the Cortex-M4 port; only compiled for bare-metal
//! ARM targets so the rest of the crate builds and tests on the host.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
