use crate::errors::ApiError;
use ledger_zk::{
    CircuitDescription, CircuitManager, CircuitStatus, PipelineConfig, ProveOutput, PublicData,
    ZkError, ZkService, ZkSetup,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub api_key: Arc<str>,
    circuits: Arc<BTreeMap<String, Circuit>>,
}

#[derive(Clone)]
struct Circuit {
    service: Arc<ZkService>,
    // Setup rewrites the artifact directory and holds this exclusively; key
    // readers share it. Guards move into the blocking task so a dropped
    // request cannot release them while the toolchain still runs.
    artifacts: Arc<RwLock<()>>,
}

impl AppState {
    pub fn new(services: Vec<ZkService>, api_key: impl Into<Arc<str>>) -> Self {
        let circuits = services
            .into_iter()
            .map(|service| {
                let circuit = Circuit {
                    service: Arc::new(service),
                    artifacts: Arc::new(RwLock::new(())),
                };
                (circuit.service.description().name(), circuit)
            })
            .collect();
        Self {
            api_key: api_key.into(),
            circuits: Arc::new(circuits),
        }
    }

    /// One circuit per subdirectory of `circuits_dir`, with artifacts under
    /// `artifacts_dir/<name>`.
    pub fn discover(
        circuits_dir: &Path,
        artifacts_dir: &Path,
        config: PipelineConfig,
        api_key: impl Into<Arc<str>>,
    ) -> std::io::Result<Self> {
        let manager = Arc::new(CircuitManager::new());
        let mut services = Vec::new();
        for entry in std::fs::read_dir(circuits_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let description = CircuitDescription::new(entry.path(), artifacts_dir.join(entry.file_name()));
            tracing::info!(circuit = %description.name(), "found circuit");
            services.push(ZkService::new(description, config.clone(), manager.clone()));
        }
        Ok(Self::new(services, api_key))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.circuits.keys().map(String::as_str)
    }

    fn circuit(&self, name: &str) -> Result<&Circuit, ApiError> {
        self.circuits
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("circuit '{name}' not found")))
    }

    pub async fn status(&self, name: &str) -> Result<CircuitStatus, ApiError> {
        let service = self.circuit(name)?.service.clone();
        blocking(move || Ok(service.status())).await
    }

    pub async fn setup(&self, name: &str) -> Result<ZkSetup, ApiError> {
        let circuit = self.circuit(name)?;
        let guard = circuit.artifacts.clone().write_owned().await;
        let service = circuit.service.clone();
        blocking(move || {
            let _guard = guard;
            service.setup()
        })
        .await
    }

    pub async fn prove(&self, name: &str, witness_json: String) -> Result<ProveOutput, ApiError> {
        let circuit = self.circuit(name)?;
        let guard = circuit.artifacts.clone().read_owned().await;
        let service = circuit.service.clone();
        blocking(move || {
            let _guard = guard;
            service.prove(&witness_json)
        })
        .await
    }

    /// `Ok(Err(_))` carries a proof the toolchain rejected.
    pub async fn verify(
        &self,
        name: &str,
        proof: Vec<u8>,
        public_data: PublicData,
    ) -> Result<Result<(), String>, ApiError> {
        let circuit = self.circuit(name)?;
        let guard = circuit.artifacts.clone().read_owned().await;
        let service = circuit.service.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            service.verify(&proof, &public_data.to_json())
        })
        .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        match outcome {
            Ok(()) => Ok(Ok(())),
            Err(ZkError::Verification(msg)) => Ok(Err(msg)),
            Err(err) => Err(err.into()),
        }
    }

    /// Verifying key bytes; only present once setup has run.
    pub async fn verifying_key(&self, name: &str) -> Result<Vec<u8>, ApiError> {
        let circuit = self.circuit(name)?;
        let guard = circuit.artifacts.clone().read_owned().await;
        let service = circuit.service.clone();
        blocking(move || {
            let _guard = guard;
            let path = service.zk_setup().verifying_key.clone();
            if !path.is_file() {
                return Err(ZkError::MissingArtifact { path });
            }
            Ok(std::fs::read(path)?)
        })
        .await
    }
}

// Toolchain calls block for up to their phase timeout.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ZkError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}
