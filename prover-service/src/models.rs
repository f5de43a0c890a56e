use ledger_zk::{CircuitStatus, PublicData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub name: String,
    #[serde(flatten)]
    pub status: CircuitStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CircuitListResponse {
    pub circuits: Vec<CircuitSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetupResponse {
    pub name: String,
    /// Base64 of the verifying key, for counterparties verifying offline.
    pub vk_b64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VkResponse {
    pub name: String,
    pub vk_b64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveRequest {
    /// Witness JSON handed to the toolchain as is.
    pub witness: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProveResponse {
    pub proof_b64: String,
    pub public_data: PublicData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub proof_b64: String,
    pub public_data: PublicData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
