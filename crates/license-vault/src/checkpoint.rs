//! # Sealed Checkpoint Store
//!
//! A cheap, tamper-evident monotone time anchor on the local filesystem.
//! Three independently Fernet-sealed files hold the same timestamp; a
//! checkpoint is trusted only when at least two of the three decrypt and
//! agree within a small tolerance. This triplication survives accidental
//! corruption and casual single-file tampering — it is not a defense
//! against an attacker with root on the box (see crate-level docs).

use crate::error::CheckpointError;
use crate::fernet::{self, FernetKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const FILE_NAMES: [&str; 3] = ["timestamp_1.dat", "timestamp_2.dat", "timestamp_3.dat"];

/// Encrypted, triplicated, tamper-evident timestamp store.
#[derive(Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
    key: FernetKey,
    agreement_tolerance: Duration,
}

/// Result of [`CheckpointStore::validate_storage`]: the agreed-upon
/// timestamp, for callers that want to use it as a monotone floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointReading {
    /// Mean of the agreeing decrypted timestamps.
    pub agreed_unix_time: f64,
    /// How many of the three files decrypted and agreed.
    pub agreeing_replicas: usize,
}

impl CheckpointStore {
    /// Opens a checkpoint store rooted at `dir`, which must already exist.
    ///
    /// Does not read or write any files; call [`validate_storage`](Self::validate_storage)
    /// explicitly (construction failures in this crate are never fatal —
    /// that policy belongs to the caller).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, secret: &[u8; 32], agreement_tolerance: Duration) -> Self {
        Self { dir: dir.into(), key: FernetKey::from_secret(secret), agreement_tolerance }
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// True iff none of the three checkpoint files exist yet, i.e. this is a
    /// fresh store that has never been sealed. Callers use this to tell a
    /// first-run bootstrap (not an error) apart from genuine corruption.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        FILE_NAMES.iter().any(|name| self.file_path(name).exists())
    }

    /// Decrypts all three files and checks 2-of-3 agreement.
    ///
    /// # Errors
    /// Returns [`CheckpointError::InsufficientReplicas`] if fewer than two
    /// files decrypt successfully, or [`CheckpointError::Disagreement`] if
    /// two or more decrypt but disagree beyond the configured tolerance.
    pub fn validate_storage(&self) -> Result<CheckpointReading, CheckpointError> {
        let mut readings = Vec::with_capacity(3);
        for name in FILE_NAMES {
            let path = self.file_path(name);
            let Ok(raw) = fs::read_to_string(&path) else { continue };
            let Ok(plaintext) = fernet::open(&self.key, &raw) else { continue };
            let Ok(text) = String::from_utf8(plaintext) else { continue };
            let Ok(value) = text.trim().parse::<f64>() else { continue };
            readings.push(value);
        }

        if readings.len() < 2 {
            return Err(CheckpointError::InsufficientReplicas { readable: readings.len() });
        }

        let min = readings.iter().copied().fold(f64::INFINITY, f64::min);
        let max = readings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spread = max - min;
        if spread > self.agreement_tolerance.as_secs_f64() {
            return Err(CheckpointError::Disagreement {
                spread_secs: spread,
                tolerance_secs: self.agreement_tolerance.as_secs_f64(),
            });
        }

        let agreed_unix_time = readings.iter().sum::<f64>() / readings.len() as f64;
        Ok(CheckpointReading { agreed_unix_time, agreeing_replicas: readings.len() })
    }

    /// Rewrites all three files with the given instant, sealing each
    /// independently (distinct IVs, so the three ciphertexts differ even
    /// though the plaintext is identical).
    ///
    /// Each file is written atomically (write-to-temp, then rename) and its
    /// permissions are restricted to the owner. The three-file set itself is
    /// not transactional; a concurrent reader tolerates one stale or
    /// mid-write file via the 2-of-3 agreement rule.
    ///
    /// # Errors
    /// Returns [`CheckpointError::Io`] if any file cannot be written, and
    /// [`CheckpointError::Encryption`] if sealing fails (not expected in
    /// practice — see [`fernet::seal`]).
    pub fn update_timestamps(&self, now: SystemTime) -> Result<(), CheckpointError> {
        let unix_time = now
            .duration_since(UNIX_EPOCH)
            .expect("system clock predates the Unix epoch")
            .as_secs_f64();
        let plaintext = format!("{unix_time:.6}");

        fs::create_dir_all(&self.dir)
            .map_err(|source| CheckpointError::Io { path: self.dir.clone(), source })?;

        for name in FILE_NAMES {
            let token = fernet::seal(&self.key, plaintext.as_bytes(), unix_time as u64)?;
            self.write_atomic(&self.file_path(name), token.as_bytes())?;
        }
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), CheckpointError> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)
            .map_err(|source| CheckpointError::Io { path: tmp_path.clone(), source })?;
        set_owner_only_permissions(&tmp_path)
            .map_err(|source| CheckpointError::Io { path: tmp_path.clone(), source })?;
        fs::rename(&tmp_path, path)
            .map_err(|source| CheckpointError::Io { path: path.to_path_buf(), source })?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
