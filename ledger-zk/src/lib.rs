//! ZK layer for proving ledger transactions with an external toolchain.
//!
//! This crate contains:
//! - A fixed-length codec whose output length depends only on declared bounds.
//! - Witness assembly from encoded transaction components.
//! - A cache deciding whether compiled circuit artifacts are still valid.
//! - Build / setup / prove / verify orchestration over the toolchain's processes.

pub mod circuit;
pub mod codec;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod toolchain;
pub mod types;
pub mod witness;

pub use circuit::CircuitManager;
pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{ProveOutput, ZkError, ZkService};
pub use types::{CircuitDescription, CircuitStatus, Proof, PublicData, ZkSetup};
pub use witness::{CommandMetadata, ComponentGroup, Witness, WitnessBuilder, WitnessError};
