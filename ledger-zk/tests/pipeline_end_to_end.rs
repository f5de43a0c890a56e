#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use ledger_zk::codec::{CodecRegistry, Scheme, U8Codec};
use ledger_zk::config::PhaseTimeouts;
use ledger_zk::toolchain::Phase;
use ledger_zk::types::OutdatedReason;
use ledger_zk::{
    CircuitDescription, CircuitManager, CircuitStatus, CommandMetadata, ComponentGroup,
    PipelineConfig, PublicData, WitnessBuilder, ZkError, ZkService,
};
use tempfile::TempDir;

const COMPILER: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --binary) bin="$2"; shift 2 ;;
    --data) data="$2"; shift 2 ;;
    *) src="$1"; shift ;;
  esac
done
if [ ! -f "$src/main.zn" ]; then
  echo "error: $src/main.zn not found" >&2
  exit 1
fi
echo build >> "@LOG@"
mkdir -p "$data"
echo '{"secret":"0"}' > "$data/input.json"
cat "$src/main.zn" > "$bin"
"#;

// output = hash(secret), where hash(s) = (s * 2654435761 + 7) mod 2^32 as four big-endian bytes.
const VM: &str = r#"#!/bin/sh
cmd="$1"; shift
while [ $# -gt 0 ]; do
  case "$1" in
    --binary) bin="$2"; shift 2 ;;
    --proving-key) pk="$2"; shift 2 ;;
    --verifying-key) vk="$2"; shift 2 ;;
    --witness) witness="$2"; shift 2 ;;
    --public-data) public="$2"; shift 2 ;;
    *) echo "error: unknown argument $1" >&2; exit 2 ;;
  esac
done
case "$cmd" in
  setup)
    @SETUP_HOOK@
    echo setup >> "@LOG@"
    printf 'pk' > "$pk"
    printf 'vk' > "$vk"
    ;;
  prove)
    @PROVE_HOOK@
    secret=$(sed -n 's/.*"secret"[[:space:]]*:[[:space:]]*"\([0-9]*\)".*/\1/p' "$witness")
    if [ -z "$secret" ]; then
      echo "error: witness is missing field secret" >&2
      exit 1
    fi
    h=$(( (secret * 2654435761 + 7) % 4294967296 ))
    pub="[$(( (h >> 24) & 255 )),$(( (h >> 16) & 255 )),$(( (h >> 8) & 255 )),$(( h & 255 ))]"
    printf '%s' "$pub" > "$public"
    printf 'proof:%s' "$pub"
    ;;
  verify)
    proof=$(cat)
    expected="proof:$(tr -d ' \n\t' < "$public")"
    if [ "$proof" != "$expected" ]; then
      echo "error: public data does not match proof" >&2
      exit 1
    fi
    ;;
  *)
    echo "error: unknown command $cmd" >&2
    exit 2
    ;;
esac
"#;

struct Toolchain {
    root: TempDir,
    config: PipelineConfig,
}

impl Toolchain {
    fn new() -> Self {
        Self::with_hooks("", "")
    }

    fn with_prove_hook(hook: &str) -> Self {
        Self::with_hooks("", hook)
    }

    fn with_setup_hook(hook: &str) -> Self {
        Self::with_hooks(hook, "")
    }

    fn with_hooks(setup_hook: &str, prove_hook: &str) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let log = root.path().join("toolchain.log");
        let compiler = write_script(root.path(), "znc", &COMPILER.replace("@LOG@", &log.to_string_lossy()));
        let vm = write_script(
            root.path(),
            "zvm",
            &VM.replace("@LOG@", &log.to_string_lossy())
                .replace("@SETUP_HOOK@", setup_hook)
                .replace("@PROVE_HOOK@", prove_hook),
        );

        let source = root.path().join("circuits/hash");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("main.zn"), "fn main(secret: u32) -> [u8; 4] { hash(secret) }").unwrap();

        let config = PipelineConfig {
            compiler,
            vm,
            timeouts: PhaseTimeouts {
                build_secs: 10,
                setup_secs: 10,
                prove_secs: 10,
                verify_secs: 10,
            },
            ..PipelineConfig::default()
        };
        Self { root, config }
    }

    fn source_dir(&self) -> PathBuf {
        self.root.path().join("circuits/hash")
    }

    fn description(&self) -> CircuitDescription {
        CircuitDescription::new(self.source_dir(), self.root.path().join("artifacts/hash"))
    }

    fn service(&self) -> ZkService {
        ZkService::new(self.description(), self.config.clone(), Arc::new(CircuitManager::new()))
    }

    fn runs(&self, phase: &str) -> usize {
        fs::read_to_string(self.root.path().join("toolchain.log"))
            .unwrap_or_default()
            .lines()
            .filter(|line| *line == phase)
            .count()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn hash(secret: u64) -> PublicData {
    let h = ((secret * 2_654_435_761 + 7) % (1 << 32)) as u32;
    PublicData::from_bytes(&h.to_be_bytes())
}

#[test]
fn proof_verifies_against_matching_public_data_only() {
    let toolchain = Toolchain::new();
    let service = toolchain.service();

    let setup = service.setup().expect("setup");
    assert!(setup.proving_key.is_file());
    assert!(setup.verifying_key.is_file());
    assert_eq!(service.status(), CircuitStatus::UpToDate);

    let output = service.prove(r#"{"secret": "2"}"#).expect("prove");
    assert_eq!(output.public_data, hash(2));

    service
        .verify(output.proof.as_bytes(), &hash(2).to_json())
        .expect("matching public data verifies");

    let err = service
        .verify(output.proof.as_bytes(), &hash(5).to_json())
        .expect_err("mismatched public data must fail");
    assert!(matches!(err, ZkError::Verification(ref msg) if msg.contains("does not match")));
    assert_eq!(err.phase(), Some(Phase::Verify));
}

#[test]
fn malformed_witness_is_a_proving_error() {
    let toolchain = Toolchain::new();
    let service = toolchain.service();
    service.setup().expect("setup");

    let err = service
        .prove(r#"{"wrong_field": "2"}"#)
        .expect_err("unknown field must fail");
    assert!(matches!(err, ZkError::Proving(ref msg) if msg.contains("missing field secret")));
}

#[test]
fn assembled_witness_reaches_the_toolchain() {
    let toolchain = Toolchain::new();
    let service = toolchain.service();
    service.setup().expect("setup");

    let mut registry = CodecRegistry::new();
    registry.register(U8Codec::new());
    let mut builder = WitnessBuilder::new(&registry, Scheme::Bits);
    builder.add(ComponentGroup::Outputs, &9u8).unwrap();
    let witness = builder
        .build(&CommandMetadata::new("Issue").expect(ComponentGroup::Outputs, 1))
        .unwrap();

    // The toy circuit only understands `secret`, so a ledger witness is rejected by the prover.
    let err = service.prove_witness(&witness).expect_err("toy circuit has no outputs field");
    assert!(matches!(err, ZkError::Proving(_)));
}

#[test]
fn cached_keys_are_reused_without_setup() {
    let toolchain = Toolchain::new();
    let first = toolchain.service();
    first.setup().expect("setup");
    let proof = first.prove(r#"{"secret": "2"}"#).expect("prove").proof;
    drop(first);

    // A fresh pipeline over the same directories, as after a restart.
    let second = toolchain.service();
    assert_eq!(second.status(), CircuitStatus::UpToDate);
    second.verify_public(&proof, &hash(2)).expect("verify with cached keys");
    let again = second.prove(r#"{"secret": "2"}"#).expect("prove with cached keys");
    second.verify_public(&again.proof, &hash(2)).expect("verify");

    second.setup().expect("setup on a cached circuit");
    assert_eq!(toolchain.runs("build"), 1);
    assert_eq!(toolchain.runs("setup"), 1);
}

#[test]
fn source_edit_triggers_rebuild() {
    let toolchain = Toolchain::new();
    let service = toolchain.service();
    service.setup().expect("setup");

    let main = toolchain.source_dir().join("main.zn");
    let file = fs::File::options().write(true).open(&main).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(30)).unwrap();

    assert_eq!(
        service.status(),
        CircuitStatus::outdated(OutdatedReason::SourceChanged)
    );
    service.setup().expect("second setup");
    assert_eq!(toolchain.runs("build"), 2);
    assert_eq!(service.status(), CircuitStatus::UpToDate);
}

#[test]
fn prove_before_setup_reports_missing_keys() {
    let toolchain = Toolchain::new();
    let service = toolchain.service();
    let err = service.prove(r#"{"secret": "2"}"#).expect_err("no keys yet");
    assert!(matches!(err, ZkError::MissingArtifact { .. }));
    let err = service.verify(b"proof:[]", "[]").expect_err("no keys yet");
    assert!(matches!(err, ZkError::MissingArtifact { .. }));
}

#[test]
fn failed_build_leaves_circuit_outdated() {
    let toolchain = Toolchain::new();
    fs::remove_file(toolchain.source_dir().join("main.zn")).unwrap();
    fs::write(toolchain.source_dir().join("other.zn"), "").unwrap();
    let service = toolchain.service();

    let err = service.setup().expect_err("build must fail");
    assert!(matches!(err, ZkError::Build(ref msg) if msg.contains("main.zn not found")));
    assert!(!service.description().metadata_path().exists());
    assert!(!service.status().is_up_to_date());
}

#[test]
fn slow_prover_times_out() {
    let mut toolchain = Toolchain::with_prove_hook("exec sleep 30");
    toolchain.config.timeouts.prove_secs = 1;
    let service = toolchain.service();
    service.setup().expect("setup");

    let err = service.prove(r#"{"secret": "2"}"#).expect_err("must time out");
    assert!(matches!(err, ZkError::Timeout { phase: Phase::Prove, .. }));
    assert!(err.to_string().starts_with("proving timed out"));
}

#[test]
fn slow_key_generation_times_out_and_stays_outdated() {
    let mut toolchain = Toolchain::with_setup_hook("exec sleep 30");
    toolchain.config.timeouts.setup_secs = 1;
    let service = toolchain.service();

    let err = service.setup().expect_err("must time out");
    assert!(matches!(err, ZkError::Timeout { phase: Phase::Setup, .. }));
    assert_eq!(toolchain.runs("build"), 1);
    assert!(!service.description().metadata_path().exists());
    assert!(!service.status().is_up_to_date());
}

#[test]
fn unreadable_public_data_is_a_toolchain_fault() {
    let toolchain = Toolchain::with_prove_hook(r#"printf 'not json' > "$public"; printf proof; exit 0"#);
    let service = toolchain.service();
    service.setup().expect("setup");

    let err = service.prove(r#"{"secret": "2"}"#).expect_err("public data is garbage");
    assert!(matches!(err, ZkError::ToolchainOutput(ref msg) if msg.contains("public data")));
}

#[test]
fn ephemeral_circuit_cleans_up() {
    let toolchain = Toolchain::new();
    let mut service = ZkService::ephemeral(toolchain.source_dir(), toolchain.config.clone()).expect("ephemeral");
    let artifact_dir = service.description().artifact_dir.clone();

    service.setup().expect("setup");
    let output = service.prove(r#"{"secret": "7"}"#).expect("prove");
    service.verify_public(&output.proof, &hash(7)).expect("verify");
    assert!(artifact_dir.exists());

    service.cleanup().expect("cleanup");
    assert!(!artifact_dir.exists());
    service.cleanup().expect("second cleanup is a no-op");
}
