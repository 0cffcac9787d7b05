//! Handshake Layer - Phase State Machines
//!
//! The deterministic exchanges that open each phase, one engine per side:
//!
//! - `setup`: the 2-step setup handshake plus completion wait
//! - `connect`: the 3-step transport handshake
//! - `wait`: deadline-bounded, cancellable receive shared by all engines
//!
//! Engines are internal; they are driven by the outer and inner transports,
//! which own container lifecycle and error propagation.

// Module declarations (declarations only in mod.rs)
pub(crate) mod connect;
pub(crate) mod setup;
pub(crate) mod wait;
