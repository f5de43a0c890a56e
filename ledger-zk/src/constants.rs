//! Crate-wide constants shared by the codec, the artifact cache and the pipeline.

/// Width of the element/byte count written before lists, byte arrays and strings.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Width of an enum ordinal.
pub const ENUM_ORDINAL_BYTES: usize = 4;

/// Byte used to pad fixed-byte strings up to their budget.
pub const STRING_FILLER: u8 = 0;

/// Metadata ledger written into an artifact directory once its artifacts are complete.
pub const METADATA_FILE_NAME: &str = ".circuit-metadata";

/// Staging name for the ledger; never read as a ledger.
pub const METADATA_STAGING_FILE_NAME: &str = ".circuit-metadata.partial";

// Artifact layout inside a circuit's artifact directory.
pub const COMPILED_CIRCUIT_FILE_NAME: &str = "circuit.bin";
pub const DATA_DIR_NAME: &str = "data";
pub const PROVING_KEY_FILE_NAME: &str = "proving_key";
pub const VERIFYING_KEY_FILE_NAME: &str = "verifying_key";

/// Default per-phase timeouts, in seconds.
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_PROVE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 60;

/// How often a running toolchain process is polled for exit.
pub const PROCESS_POLL_INTERVAL_MS: u64 = 10;
