//! Types shared between the artifact cache, the pipeline and its callers.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::constants::{
    COMPILED_CIRCUIT_FILE_NAME, DATA_DIR_NAME, METADATA_FILE_NAME, PROVING_KEY_FILE_NAME,
    VERIFYING_KEY_FILE_NAME,
};

/// A circuit's source tree and the directory its artifacts are written to.
///
/// Two descriptions are equal iff both paths are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitDescription {
    pub source_dir: PathBuf,
    pub artifact_dir: PathBuf,
}

impl CircuitDescription {
    pub fn new(source_dir: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Final component of the source directory, used in logs and routes.
    pub fn name(&self) -> String {
        self.source_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_dir.display().to_string())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.artifact_dir.join(METADATA_FILE_NAME)
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.artifact_dir)
    }
}

/// Why a circuit's artifacts cannot be reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "path", rename_all = "snake_case")]
pub enum OutdatedReason {
    Unregistered,
    MissingMetadata,
    MalformedMetadata,
    SourceUnreadable,
    SourceChanged,
    ArtifactMissing(PathBuf),
    ArtifactChanged(PathBuf),
}

impl fmt::Display for OutdatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutdatedReason::Unregistered => write!(f, "circuit is not registered"),
            OutdatedReason::MissingMetadata => write!(f, "no metadata ledger"),
            OutdatedReason::MalformedMetadata => write!(f, "metadata ledger is unreadable"),
            OutdatedReason::SourceUnreadable => write!(f, "source directory is unreadable"),
            OutdatedReason::SourceChanged => write!(f, "sources changed since the last build"),
            OutdatedReason::ArtifactMissing(path) => write!(f, "artifact {} is missing", path.display()),
            OutdatedReason::ArtifactChanged(path) => write!(f, "artifact {} was modified", path.display()),
        }
    }
}

/// Whether previously produced artifacts are reusable.
///
/// Always derived from the metadata ledger and the filesystem; never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CircuitStatus {
    UpToDate,
    Outdated { reason: OutdatedReason },
}

impl CircuitStatus {
    pub fn outdated(reason: OutdatedReason) -> Self {
        CircuitStatus::Outdated { reason }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, CircuitStatus::UpToDate)
    }
}

/// Key pair locations produced by the setup phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkSetup {
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
}

/// Fixed artifact paths inside an artifact directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub compiled_circuit: PathBuf,
    pub data_dir: PathBuf,
    pub setup: ZkSetup,
}

impl ArtifactLayout {
    pub fn new(artifact_dir: &Path) -> Self {
        Self {
            compiled_circuit: artifact_dir.join(COMPILED_CIRCUIT_FILE_NAME),
            data_dir: artifact_dir.join(DATA_DIR_NAME),
            setup: ZkSetup {
                proving_key: artifact_dir.join(PROVING_KEY_FILE_NAME),
                verifying_key: artifact_dir.join(VERIFYING_KEY_FILE_NAME),
            },
        }
    }
}

/// Opaque proof produced by the toolchain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, String> {
        hex::decode(value)
            .map(Self)
            .map_err(|e| format!("invalid hex: {e}"))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    pub fn from_base64(value: &str) -> Result<Self, String> {
        base64::engine::general_purpose::STANDARD
            .decode(value)
            .map(Self)
            .map_err(|e| format!("invalid base64: {e}"))
    }
}

/// Values the verifier checks a proof against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicData(serde_json::Value);

impl PublicData {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// A byte sequence rendered as an array of unsigned byte values.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(serde_json::Value::from(bytes.to_vec()))
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Compact rendering handed to the toolchain.
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }
}
