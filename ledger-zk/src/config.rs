use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Scheme;
use crate::constants::{
    DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_PROVE_TIMEOUT_SECS, DEFAULT_SETUP_TIMEOUT_SECS,
    DEFAULT_VERIFY_TIMEOUT_SECS,
};
use crate::toolchain::Phase;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Where the toolchain lives and how long each phase may run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Circuit compiler, used by the build phase.
    #[serde(default = "default_compiler")]
    pub compiler: PathBuf,
    /// Virtual machine driving setup, prove and verify.
    #[serde(default = "default_vm")]
    pub vm: PathBuf,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub timeouts: PhaseTimeouts,
}

fn default_compiler() -> PathBuf {
    PathBuf::from("znc")
}

fn default_vm() -> PathBuf {
    PathBuf::from("zvm")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            vm: default_vm(),
            scheme: Scheme::default(),
            timeouts: PhaseTimeouts::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTimeouts {
    pub build_secs: u64,
    pub setup_secs: u64,
    pub prove_secs: u64,
    pub verify_secs: u64,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            build_secs: DEFAULT_BUILD_TIMEOUT_SECS,
            setup_secs: DEFAULT_SETUP_TIMEOUT_SECS,
            prove_secs: DEFAULT_PROVE_TIMEOUT_SECS,
            verify_secs: DEFAULT_VERIFY_TIMEOUT_SECS,
        }
    }
}

impl PhaseTimeouts {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        let secs = match phase {
            Phase::Build => self.build_secs,
            Phase::Setup => self.setup_secs,
            Phase::Prove => self.prove_secs,
            Phase::Verify => self.verify_secs,
        };
        Duration::from_secs(secs)
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Defaults overridden by `ZK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(compiler) = lookup("ZK_COMPILER") {
            self.compiler = PathBuf::from(compiler);
        }
        if let Some(vm) = lookup("ZK_VM") {
            self.vm = PathBuf::from(vm);
        }
        if let Some(scheme) = lookup("ZK_SCHEME") {
            self.scheme = match scheme.as_str() {
                "bits" => Scheme::Bits,
                "bytes" => Scheme::Bytes,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "ZK_SCHEME",
                        value: scheme,
                    });
                }
            };
        }
        let timeouts = [
            ("ZK_BUILD_TIMEOUT_SECS", &mut self.timeouts.build_secs),
            ("ZK_SETUP_TIMEOUT_SECS", &mut self.timeouts.setup_secs),
            ("ZK_PROVE_TIMEOUT_SECS", &mut self.timeouts.prove_secs),
            ("ZK_VERIFY_TIMEOUT_SECS", &mut self.timeouts.verify_secs),
        ];
        for (var, slot) in timeouts {
            if let Some(value) = lookup(var) {
                *slot = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv { var, value })?;
            }
        }
        Ok(self)
    }

    pub fn timeout(&self, phase: Phase) -> Duration {
        self.timeouts.for_phase(phase)
    }
}
