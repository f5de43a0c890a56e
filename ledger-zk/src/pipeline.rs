//! Build / setup / prove / verify orchestration over the external toolchain.
//!
//! Every call blocks until its subprocess exits or its phase timeout expires.
//! Setup for one circuit must not run concurrently with itself; proving and
//! verifying only read the key files and may run in parallel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};
use thiserror::Error;
use tracing::{debug, info};

use crate::circuit::{newest_source_mtime, CircuitManager};
use crate::codec::{CodecRegistry, Scheme};
use crate::config::PipelineConfig;
use crate::toolchain::{Phase, ToolchainCommand};
use crate::types::{ArtifactLayout, CircuitDescription, CircuitStatus, Proof, PublicData, ZkSetup};
use crate::witness::{Witness, WitnessBuilder};

#[derive(Debug, Error)]
pub enum ZkError {
    #[error("circuit build failed: {0}")]
    Build(String),

    #[error("circuit setup failed: {0}")]
    Setup(String),

    /// The toolchain rejected the witness.
    #[error("proving failed: {0}")]
    Proving(String),

    /// The proof does not hold for the given public data.
    #[error("verification failed: {0}")]
    Verification(String),

    #[error("{phase} timed out after {timeout:?}")]
    Timeout { phase: Phase, timeout: Duration },

    #[error("missing artifact {path}; run setup first")]
    MissingArtifact { path: PathBuf },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Caller-supplied data could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The toolchain wrote output this pipeline cannot read.
    #[error("unreadable toolchain output: {0}")]
    ToolchainOutput(String),

    #[error("witness encoded with {actual:?} scheme, circuit expects {expected:?}")]
    SchemeMismatch { expected: Scheme, actual: Scheme },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ZkError {
    /// Phase the failure belongs to, when it came from a toolchain run.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ZkError::Build(_) => Some(Phase::Build),
            ZkError::Setup(_) => Some(Phase::Setup),
            ZkError::Proving(_) => Some(Phase::Prove),
            ZkError::Verification(_) => Some(Phase::Verify),
            ZkError::Timeout { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Result of a successful proving run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveOutput {
    pub proof: Proof,
    /// Public data the toolchain derived from the witness.
    pub public_data: PublicData,
}

/// Proving pipeline for one circuit.
pub struct ZkService {
    description: CircuitDescription,
    layout: ArtifactLayout,
    config: PipelineConfig,
    circuits: Arc<CircuitManager>,
    // Owns the artifact directory of ephemeral circuits.
    scratch: Option<TempDir>,
}

impl ZkService {
    pub fn new(description: CircuitDescription, config: PipelineConfig, circuits: Arc<CircuitManager>) -> Self {
        circuits.register(&description);
        Self {
            layout: description.layout(),
            description,
            config,
            circuits,
            scratch: None,
        }
    }

    /// Pipeline whose artifacts live in a temporary directory, removed by
    /// [`cleanup`](Self::cleanup) or on drop.
    pub fn ephemeral(source_dir: impl Into<PathBuf>, config: PipelineConfig) -> Result<Self, ZkError> {
        let scratch = tempfile::Builder::new().prefix("zk-circuit-").tempdir()?;
        let description = CircuitDescription::new(source_dir, scratch.path());
        let mut service = Self::new(description, config, Arc::new(CircuitManager::new()));
        service.scratch = Some(scratch);
        Ok(service)
    }

    pub fn description(&self) -> &CircuitDescription {
        &self.description
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Key locations, whether or not setup has produced them yet.
    pub fn zk_setup(&self) -> &ZkSetup {
        &self.layout.setup
    }

    pub fn status(&self) -> CircuitStatus {
        self.circuits.status(&self.description)
    }

    /// Builds the circuit and generates its keys, unless the cached artifacts
    /// are still up to date.
    pub fn setup(&self) -> Result<ZkSetup, ZkError> {
        let name = self.description.name();
        match self.circuits.refresh(&self.description) {
            CircuitStatus::UpToDate => {
                info!(circuit = %name, "reusing cached circuit artifacts");
                return Ok(self.layout.setup.clone());
            }
            CircuitStatus::Outdated { reason } => {
                info!(circuit = %name, %reason, "regenerating circuit artifacts");
            }
        }

        let source_mtime = newest_source_mtime(&self.description.source_dir)?.unwrap_or(0);
        fs::create_dir_all(&self.description.artifact_dir)?;
        fs::create_dir_all(&self.layout.data_dir)?;
        for stale in [
            &self.layout.compiled_circuit,
            &self.layout.setup.proving_key,
            &self.layout.setup.verifying_key,
        ] {
            remove_if_present(stale)?;
        }

        let build = ToolchainCommand::new(&self.config.compiler)
            .path_arg("--binary", &self.layout.compiled_circuit)
            .path_arg("--data", &self.layout.data_dir)
            .arg(self.description.source_dir.as_os_str())
            .run(Phase::Build, self.config.timeout(Phase::Build))?;
        if !build.success() {
            return Err(ZkError::Build(build.diagnostic()));
        }
        require(&self.layout.compiled_circuit)?;

        let setup = ToolchainCommand::new(&self.config.vm)
            .arg("setup")
            .path_arg("--binary", &self.layout.compiled_circuit)
            .path_arg("--proving-key", &self.layout.setup.proving_key)
            .path_arg("--verifying-key", &self.layout.setup.verifying_key)
            .run(Phase::Setup, self.config.timeout(Phase::Setup))?;
        if !setup.success() {
            return Err(ZkError::Setup(setup.diagnostic()));
        }
        require(&self.layout.setup.proving_key)?;
        require(&self.layout.setup.verifying_key)?;

        // Ledger last: an interrupted run above leaves the circuit outdated.
        self.circuits.record(&self.description, source_mtime)?;
        info!(circuit = %name, "circuit setup complete");
        Ok(self.layout.setup.clone())
    }

    /// Proves `witness_json` against the circuit's proving key.
    pub fn prove(&self, witness_json: &str) -> Result<ProveOutput, ZkError> {
        require(&self.layout.compiled_circuit)?;
        require(&self.layout.setup.proving_key)?;

        let mut witness_file = NamedTempFile::new()?;
        io::Write::write_all(&mut witness_file, witness_json.as_bytes())?;
        let public_data_file = NamedTempFile::new()?;

        let output = ToolchainCommand::new(&self.config.vm)
            .arg("prove")
            .path_arg("--binary", &self.layout.compiled_circuit)
            .path_arg("--proving-key", &self.layout.setup.proving_key)
            .path_arg("--witness", witness_file.path())
            .path_arg("--public-data", public_data_file.path())
            .run(Phase::Prove, self.config.timeout(Phase::Prove))?;
        if !output.success() {
            return Err(ZkError::Proving(output.diagnostic()));
        }
        if output.stdout.is_empty() {
            return Err(ZkError::Proving("toolchain produced an empty proof".to_string()));
        }

        let public_json = fs::read_to_string(public_data_file.path())?;
        let public_data = PublicData::parse(&public_json)
            .map_err(|e| ZkError::ToolchainOutput(format!("public data: {e}")))?;

        debug!(circuit = %self.description.name(), proof_len = output.stdout.len(), "proof generated");
        Ok(ProveOutput {
            proof: Proof::new(output.stdout),
            public_data,
        })
    }

    /// Witness builder using the scheme this circuit was configured with.
    pub fn witness_builder<'r>(&self, registry: &'r CodecRegistry) -> WitnessBuilder<'r> {
        WitnessBuilder::new(registry, self.config.scheme)
    }

    pub fn prove_witness(&self, witness: &Witness) -> Result<ProveOutput, ZkError> {
        if witness.scheme() != self.config.scheme {
            return Err(ZkError::SchemeMismatch {
                expected: self.config.scheme,
                actual: witness.scheme(),
            });
        }
        self.prove(&witness.to_json_string())
    }

    /// Checks `proof` against `public_data_json`.
    pub fn verify(&self, proof: &[u8], public_data_json: &str) -> Result<(), ZkError> {
        require(&self.layout.compiled_circuit)?;
        require(&self.layout.setup.verifying_key)?;

        let public_data = PublicData::parse(public_data_json)
            .map_err(|e| ZkError::Serialization(format!("public data: {e}")))?;
        let mut public_data_file = NamedTempFile::new()?;
        io::Write::write_all(&mut public_data_file, public_data.to_json().as_bytes())?;

        let output = ToolchainCommand::new(&self.config.vm)
            .arg("verify")
            .path_arg("--binary", &self.layout.compiled_circuit)
            .path_arg("--verifying-key", &self.layout.setup.verifying_key)
            .path_arg("--public-data", public_data_file.path())
            .stdin(proof.to_vec())
            .run(Phase::Verify, self.config.timeout(Phase::Verify))?;
        if !output.success() {
            return Err(ZkError::Verification(output.diagnostic()));
        }
        debug!(circuit = %self.description.name(), "proof verified");
        Ok(())
    }

    pub fn verify_public(&self, proof: &Proof, public_data: &PublicData) -> Result<(), ZkError> {
        self.verify(proof.as_bytes(), &public_data.to_json())
    }

    /// Removes the artifacts of an ephemeral circuit. No-op for persistent ones.
    pub fn cleanup(&mut self) -> Result<(), ZkError> {
        if let Some(scratch) = self.scratch.take() {
            self.circuits.unregister(&self.description);
            info!(dir = %scratch.path().display(), "removing ephemeral circuit artifacts");
            scratch.close()?;
        }
        Ok(())
    }
}

fn require(path: &Path) -> Result<(), ZkError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ZkError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
