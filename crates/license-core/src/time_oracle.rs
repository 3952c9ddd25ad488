//! # Trusted-Time Oracle
//!
//! Produces a single "trusted now" instant together with a trustworthiness
//! verdict, by requiring agreement across three independent sources: a
//! boot-time floor, external NTP sync (corroborated by the OS sync
//! indicator), and the sealed checkpoint floor in [`license_vault`].
//!
//! Construction performs the full three-source initialization and is the
//! only place a [`LicenseError::SystemTimeTampered`] or
//! [`LicenseError::CheckpointCorrupt`] is raised; every later call to
//! [`TrustedTimeOracle::assess`] only ever downgrades trust, never panics or
//! propagates an error.

use crate::error::LicenseError;
use crate::ntp::{self, ExternalTimeSource, SntpTimeSource, SystemSyncProbe, TimedatectlSyncProbe};
use license_vault::CheckpointStore;
use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use sysinfo::System;

/// A source of wall-clock and monotonic readings.
///
/// Exists so tests (notably a clock-rollback simulation) can substitute a
/// fake clock without touching the real OS clock.
pub trait Clock: fmt::Debug + Send + Sync {
    fn wall_now(&self) -> SystemTime;
    fn monotonic_now(&self) -> Instant;
}

/// The real OS clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wall_now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// Configuration the oracle needs beyond the checkpoint store itself.
#[derive(Debug, Clone)]
pub struct TimeOracleConfig {
    pub external_time_sources: Vec<String>,
    pub max_clock_skew: Duration,
    pub external_reprobe_interval: Duration,
    pub checkpoint_agreement_tolerance: Duration,
}

impl Default for TimeOracleConfig {
    fn default() -> Self {
        Self {
            external_time_sources: ntp::DEFAULT_EXTERNAL_TIME_SOURCES
                .iter()
                .map(|&s| s.to_owned())
                .collect(),
            max_clock_skew: Duration::from_secs(300),
            external_reprobe_interval: Duration::from_secs(300),
            checkpoint_agreement_tolerance: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ExternalTimeCache {
    last_external_time: SystemTime,
    last_probe_local: Instant,
}

/// Result of [`TrustedTimeOracle::assess`]: the candidate instant read from
/// the clock at assessment time, and whether all three sources agree it is
/// trustworthy.
#[derive(Debug, Clone, Copy)]
pub struct TimeAssessment {
    pub now: SystemTime,
    pub trusted: bool,
}

/// Combines a boot floor, external NTP sync, and a sealed checkpoint into a
/// single trust verdict over the host clock.
pub struct TrustedTimeOracle {
    clock: Box<dyn Clock>,
    external_source: Box<dyn ExternalTimeSource>,
    sync_probe: Box<dyn SystemSyncProbe>,
    checkpoint: CheckpointStore,
    boot_instant: SystemTime,
    config: TimeOracleConfig,
    external_cache: Option<ExternalTimeCache>,
}

impl fmt::Debug for TrustedTimeOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedTimeOracle")
            .field("boot_instant", &self.boot_instant)
            .field("config", &self.config)
            .field("external_cache", &self.external_cache)
            .finish_non_exhaustive()
    }
}

impl TrustedTimeOracle {
    /// Initializes the oracle against the real system clock, a real SNTP
    /// client, and `timedatectl`.
    ///
    /// # Errors
    /// See [`Self::with_sources`].
    pub fn new(config: TimeOracleConfig, checkpoint: CheckpointStore) -> Result<Self, LicenseError> {
        Self::with_sources(
            config,
            checkpoint,
            Box::new(SystemClock),
            Box::new(SntpTimeSource),
            Box::new(TimedatectlSyncProbe),
        )
    }

    /// Initializes the oracle against injected sources. Production callers
    /// use [`Self::new`]; tests use this directly to substitute a fake clock
    /// or a scripted external-time source.
    ///
    /// # Errors
    /// Returns [`LicenseError::SystemTimeTampered`] if the host clock reads
    /// before the computed boot instant, or if a *reachable* external source
    /// diverges from the host clock beyond `max_clock_skew`. Returns
    /// [`LicenseError::CheckpointCorrupt`] if the sealed store already has at
    /// least one file on disk but fails to validate (a store with zero files
    /// is treated as an unsealed first run and bootstrapped, not an error).
    pub fn with_sources(
        config: TimeOracleConfig,
        checkpoint: CheckpointStore,
        clock: Box<dyn Clock>,
        external_source: Box<dyn ExternalTimeSource>,
        sync_probe: Box<dyn SystemSyncProbe>,
    ) -> Result<Self, LicenseError> {
        let wall_now = clock.wall_now();

        let boot_instant = boot_instant(wall_now);
        if wall_now < boot_instant {
            return Err(LicenseError::SystemTimeTampered {
                message: "host clock reads before the computed system boot instant".into(),
            });
        }

        let per_host_timeout = Duration::from_secs(1);
        if let Some((host, external_time)) =
            ntp::probe_first_success(external_source.as_ref(), &config.external_time_sources, per_host_timeout)
        {
            let skew = abs_duration(wall_now, external_time);
            if skew > config.max_clock_skew {
                return Err(LicenseError::SystemTimeTampered {
                    message: format!(
                        "host clock diverges from external time source {host} by {skew:?}, exceeding the configured {:?} tolerance",
                        config.max_clock_skew
                    )
                    .into(),
                });
            }
        }

        if checkpoint.is_initialized() {
            checkpoint.validate_storage().map_err(|source| LicenseError::CheckpointCorrupt { source })?;
        } else {
            checkpoint
                .update_timestamps(wall_now)
                .map_err(|source| LicenseError::CheckpointCorrupt { source })?;
        }

        Ok(Self {
            clock,
            external_source,
            sync_probe,
            checkpoint,
            boot_instant,
            config,
            external_cache: None,
        })
    }

    /// Reads the clock, checks it against all three trust sources, and
    /// returns the verdict. Re-probes external time sources only when the
    /// cached reading is older than `external_reprobe_interval`.
    pub fn assess(&mut self) -> TimeAssessment {
        let now = self.clock.wall_now();
        let trusted = self.boot_floor_satisfied(now)
            && self.external_sync_satisfied(now)
            && self.checkpoint_floor_satisfied(now);
        TimeAssessment { now, trusted }
    }

    /// Reseals the checkpoint at `at`. Called by the verifier facade after a
    /// successful license validation, ratcheting the floor forward.
    ///
    /// # Errors
    /// Propagates [`license_vault::CheckpointError`] from the underlying
    /// file write.
    pub fn ratchet(&self, at: SystemTime) -> Result<(), license_vault::CheckpointError> {
        self.checkpoint.update_timestamps(at)
    }

    fn boot_floor_satisfied(&self, now: SystemTime) -> bool {
        now >= self.boot_instant
    }

    fn external_sync_satisfied(&mut self, now: SystemTime) -> bool {
        self.refresh_external_cache_if_stale();

        let external_reading = self.external_cache.map(|cache| {
            let elapsed_since_probe = self.clock.monotonic_now().saturating_duration_since(cache.last_probe_local);
            let projected_external_now = cache.last_external_time + elapsed_since_probe;
            abs_duration(now, projected_external_now) <= self.config.max_clock_skew
        });

        let sync_reading = self.sync_probe.is_synchronized();

        // No external source has ever answered and the OS carries no sync
        // indicator either: there is no evidence to weigh, so this source
        // does not veto trust. A genuinely air-gapped host must still be
        // able to verify offline via the boot floor and sealed checkpoint —
        // only an *observed* out-of-tolerance reading, or an explicit
        // `Some(false)` sync indicator, counts against this source.
        match (external_reading, sync_reading) {
            (None, None) => true,
            (Some(in_tolerance), None) => in_tolerance,
            (None, Some(synced)) => synced,
            (Some(in_tolerance), Some(synced)) => in_tolerance || synced,
        }
    }

    fn refresh_external_cache_if_stale(&mut self) {
        let stale = match self.external_cache {
            None => true,
            Some(cache) => {
                self.clock.monotonic_now().saturating_duration_since(cache.last_probe_local)
                    >= self.config.external_reprobe_interval
            }
        };
        if !stale {
            return;
        }

        let per_host_timeout = Duration::from_secs(1);
        if let Some((_, external_time)) = ntp::probe_first_success(
            self.external_source.as_ref(),
            &self.config.external_time_sources,
            per_host_timeout,
        ) {
            self.external_cache = Some(ExternalTimeCache {
                last_external_time: external_time,
                last_probe_local: self.clock.monotonic_now(),
            });
        }
    }

    fn checkpoint_floor_satisfied(&self, now: SystemTime) -> bool {
        let Ok(reading) = self.checkpoint.validate_storage() else { return false };
        let Some(floor) = UNIX_EPOCH.checked_add(Duration::from_secs_f64(reading.agreed_unix_time)) else {
            return false;
        };
        let tolerance = self.config.checkpoint_agreement_tolerance;
        now + tolerance >= floor
    }
}

fn boot_instant(wall_now: SystemTime) -> SystemTime {
    wall_now - Duration::from_secs(System::uptime())
}

fn abs_duration(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or_else(|e| e.duration())
}
