//! Circuit artifact cache.
//!
//! Decides whether a circuit's compiled and setup artifacts can be reused by
//! comparing a metadata ledger in the artifact directory with the live
//! filesystem. Ledger layout, one entry per line:
//!
//! ```text
//! <newest source mtime, ns since epoch>
//! <artifact path relative to the artifact dir>:<mtime, ns since epoch>
//! ...
//! ```
//!
//! The check is modification-time based, not content based. It may report a
//! spurious `Outdated`, never a spurious `UpToDate`.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::{METADATA_FILE_NAME, METADATA_STAGING_FILE_NAME};
use crate::types::{CircuitDescription, CircuitStatus, OutdatedReason};

/// Modification time as nanoseconds since the epoch.
pub type Mtime = u128;

/// Tracks registered circuits and answers staleness queries for them.
#[derive(Debug, Default)]
pub struct CircuitManager {
    registered: Mutex<HashSet<CircuitDescription>>,
}

impl CircuitManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `description` for later queries. Idempotent.
    pub fn register(&self, description: &CircuitDescription) {
        let mut registered = self.registry();
        if registered.insert(description.clone()) {
            debug!(circuit = %description.name(), "registered circuit");
        }
    }

    pub fn unregister(&self, description: &CircuitDescription) {
        self.registry().remove(description);
    }

    pub fn is_registered(&self, description: &CircuitDescription) -> bool {
        self.registry().contains(description)
    }

    /// Current status. Reads the ledger and the filesystem but never modifies them.
    pub fn status(&self, description: &CircuitDescription) -> CircuitStatus {
        if !self.is_registered(description) {
            return CircuitStatus::outdated(OutdatedReason::Unregistered);
        }
        compute_status(description)
    }

    /// Like [`status`](Self::status), but deletes a stale ledger so the next
    /// build regenerates everything.
    pub fn refresh(&self, description: &CircuitDescription) -> CircuitStatus {
        let status = self.status(description);
        if let CircuitStatus::Outdated { reason } = &status {
            let ledger = description.metadata_path();
            match fs::remove_file(&ledger) {
                Ok(()) => info!(circuit = %description.name(), %reason, "removed stale circuit metadata"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!(circuit = %description.name(), %err, "could not remove stale circuit metadata"),
            }
        }
        status
    }

    /// Writes the ledger for the artifacts currently in the artifact directory.
    ///
    /// Call only once every artifact is complete. `source_mtime` must be
    /// captured before the build started, so edits made during the build
    /// invalidate the result.
    pub fn record(&self, description: &CircuitDescription, source_mtime: Mtime) -> io::Result<()> {
        let artifact_dir = &description.artifact_dir;
        let artifacts = artifact_mtimes(artifact_dir)?;
        if artifacts.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no artifacts under {}", artifact_dir.display()),
            ));
        }

        let mut ledger = format!("{source_mtime}\n");
        for (path, mtime) in &artifacts {
            ledger.push_str(&format!("{}:{mtime}\n", path.display()));
        }

        // Staged then renamed: a reader never sees a half-written ledger.
        let staging = artifact_dir.join(METADATA_STAGING_FILE_NAME);
        fs::write(&staging, ledger)?;
        fs::rename(&staging, description.metadata_path())?;
        info!(
            circuit = %description.name(),
            artifacts = artifacts.len(),
            "recorded circuit metadata"
        );
        Ok(())
    }

    // The set stays consistent even if a holder panicked.
    fn registry(&self) -> MutexGuard<'_, HashSet<CircuitDescription>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forces the next status query to report `Outdated`.
    pub fn invalidate(&self, description: &CircuitDescription) -> io::Result<()> {
        match fs::remove_file(description.metadata_path()) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

struct Ledger {
    source_mtime: Mtime,
    artifacts: Vec<(PathBuf, Mtime)>,
}

fn parse_ledger(contents: &str) -> Option<Ledger> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let source_mtime = lines.next()?.trim().parse().ok()?;
    let artifacts = lines
        .map(|line| {
            let (path, mtime) = line.rsplit_once(':')?;
            Some((PathBuf::from(path), mtime.trim().parse().ok()?))
        })
        .collect::<Option<Vec<_>>>()?;
    if artifacts.is_empty() {
        return None;
    }
    Some(Ledger {
        source_mtime,
        artifacts,
    })
}

fn compute_status(description: &CircuitDescription) -> CircuitStatus {
    let contents = match fs::read_to_string(description.metadata_path()) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return CircuitStatus::outdated(OutdatedReason::MissingMetadata);
        }
        Err(_) => return CircuitStatus::outdated(OutdatedReason::MalformedMetadata),
    };
    let Some(ledger) = parse_ledger(&contents) else {
        return CircuitStatus::outdated(OutdatedReason::MalformedMetadata);
    };

    match newest_source_mtime(&description.source_dir) {
        Ok(Some(newest)) if newest > ledger.source_mtime => {
            return CircuitStatus::outdated(OutdatedReason::SourceChanged);
        }
        Ok(_) => {}
        Err(_) => return CircuitStatus::outdated(OutdatedReason::SourceUnreadable),
    }

    for (path, recorded) in &ledger.artifacts {
        let full = description.artifact_dir.join(path);
        match mtime_of(&full) {
            Ok(current) if current == *recorded => {}
            Ok(_) => return CircuitStatus::outdated(OutdatedReason::ArtifactChanged(path.clone())),
            Err(_) => return CircuitStatus::outdated(OutdatedReason::ArtifactMissing(path.clone())),
        }
    }

    CircuitStatus::UpToDate
}

/// Newest modification time among the files under `dir`, `None` if it has none.
pub fn newest_source_mtime(dir: &Path) -> io::Result<Option<Mtime>> {
    let mut newest = None;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let mtime = mtime_of(entry.path())?;
        newest = newest.max(Some(mtime));
    }
    Ok(newest)
}

fn artifact_mtimes(artifact_dir: &Path) -> io::Result<Vec<(PathBuf, Mtime)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(artifact_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name();
        if name == METADATA_FILE_NAME || name == METADATA_STAGING_FILE_NAME {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(artifact_dir)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?
            .to_path_buf();
        out.push((relative, mtime_of(entry.path())?));
    }
    Ok(out)
}

fn mtime_of(path: &Path) -> io::Result<Mtime> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(to_mtime(modified))
}

fn to_mtime(time: SystemTime) -> Mtime {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        description: CircuitDescription,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().expect("tempdir");
        let source = root.path().join("src");
        let artifacts = root.path().join("artifacts");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::create_dir_all(artifacts.join("data")).unwrap();
        fs::write(source.join("main.zn"), "fn main() {}").unwrap();
        fs::write(source.join("nested/lib.zn"), "fn helper() {}").unwrap();
        fs::write(artifacts.join("circuit.bin"), b"bin").unwrap();
        fs::write(artifacts.join("proving_key"), b"pk").unwrap();
        fs::write(artifacts.join("data/input.json"), b"{}").unwrap();
        Fixture {
            _root: root,
            description: CircuitDescription::new(source, artifacts),
        }
    }

    fn touch(path: &Path, offset: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + offset).unwrap();
    }

    fn record_now(manager: &CircuitManager, description: &CircuitDescription) {
        let stamp = newest_source_mtime(&description.source_dir).unwrap().unwrap();
        manager.record(description, stamp).unwrap();
    }

    #[test]
    fn fresh_circuit_is_outdated() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        assert_eq!(
            manager.status(&fx.description),
            CircuitStatus::outdated(OutdatedReason::MissingMetadata)
        );
    }

    #[test]
    fn unregistered_circuit_is_outdated() {
        let fx = fixture();
        let manager = CircuitManager::new();
        record_now(&manager, &fx.description);
        assert_eq!(
            manager.status(&fx.description),
            CircuitStatus::outdated(OutdatedReason::Unregistered)
        );
    }

    #[test]
    fn consistent_ledger_is_up_to_date() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        manager.register(&fx.description);
        record_now(&manager, &fx.description);
        assert_eq!(manager.status(&fx.description), CircuitStatus::UpToDate);

        let ledger = fs::read_to_string(fx.description.metadata_path()).unwrap();
        assert_eq!(ledger.lines().count(), 4);
        assert!(ledger.contains("data/input.json:"));
    }

    #[test]
    fn touched_artifact_invalidates_and_refresh_removes_ledger() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        record_now(&manager, &fx.description);

        touch(&fx.description.artifact_dir.join("proving_key"), Duration::from_secs(10));

        // A plain status query leaves the ledger alone.
        assert!(!manager.status(&fx.description).is_up_to_date());
        assert!(fx.description.metadata_path().exists());

        assert_eq!(
            manager.refresh(&fx.description),
            CircuitStatus::outdated(OutdatedReason::ArtifactChanged(PathBuf::from("proving_key")))
        );
        assert!(!fx.description.metadata_path().exists());
        assert_eq!(
            manager.status(&fx.description),
            CircuitStatus::outdated(OutdatedReason::MissingMetadata)
        );
    }

    #[test]
    fn newer_source_invalidates() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        record_now(&manager, &fx.description);

        touch(&fx.description.source_dir.join("nested/lib.zn"), Duration::from_secs(10));
        assert_eq!(
            manager.status(&fx.description),
            CircuitStatus::outdated(OutdatedReason::SourceChanged)
        );
    }

    #[test]
    fn deleted_artifact_invalidates() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        record_now(&manager, &fx.description);

        fs::remove_file(fx.description.artifact_dir.join("circuit.bin")).unwrap();
        assert_eq!(
            manager.status(&fx.description),
            CircuitStatus::outdated(OutdatedReason::ArtifactMissing(PathBuf::from("circuit.bin")))
        );
    }

    #[test]
    fn malformed_ledger_is_outdated_not_an_error() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);

        for garbage in ["", "not-a-number\n", "12\n", "12\ncircuit.bin\n", "12\ncircuit.bin:xyz\n"] {
            fs::write(fx.description.metadata_path(), garbage).unwrap();
            assert_eq!(
                manager.status(&fx.description),
                CircuitStatus::outdated(OutdatedReason::MalformedMetadata),
                "ledger {garbage:?}"
            );
        }
    }

    #[test]
    fn staging_file_is_never_tracked() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        fs::write(fx.description.artifact_dir.join(METADATA_STAGING_FILE_NAME), "junk").unwrap();
        record_now(&manager, &fx.description);
        let ledger = fs::read_to_string(fx.description.metadata_path()).unwrap();
        assert!(!ledger.contains(METADATA_STAGING_FILE_NAME));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let fx = fixture();
        let manager = CircuitManager::new();
        manager.register(&fx.description);
        record_now(&manager, &fx.description);
        manager.invalidate(&fx.description).unwrap();
        manager.invalidate(&fx.description).unwrap();
        assert!(!manager.status(&fx.description).is_up_to_date());
    }
}
