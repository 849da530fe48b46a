//! The scan-filter-advance scheduling core.
//!
//! Owns the current snapshot, the pointer into its matching sequence, and the
//! two-timer state machine. Performs no I/O and reads no clocks: the caller
//! supplies `now` on every tick, and scanning happens outside the engine via
//! the [`begin_rescan`](SlideshowEngine::begin_rescan) /
//! [`apply_scan`](SlideshowEngine::apply_scan) protocol so a tick scheduler is
//! never blocked and at most one rescan is in flight.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{AdvanceMode, Configuration};
use crate::events::EngineStatus;
use crate::scan::ScanSnapshot;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub advance_interval: Duration,
    pub refresh_interval: Duration,
    pub advance_mode: AdvanceMode,
    pub smart_random_sequence_length: u32,
}

impl EngineOptions {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            advance_interval: cfg.advance_interval,
            refresh_interval: cfg.refresh_interval,
            advance_mode: cfg.advance_mode,
            smart_random_sequence_length: cfg.smart_random_sequence_length.max(1),
        }
    }
}

/// Proof that a rescan was started under a particular configuration
/// generation. Results carrying a stale ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
}

/// What a single tick decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A rescan is due; the caller should start one unless a scan is
    /// already in flight (in which case this trigger is skipped).
    pub rescan_due: bool,
    /// The pointer moved on this tick.
    pub advanced: bool,
}

pub struct SlideshowEngine {
    opts: EngineOptions,
    snapshot: ScanSnapshot,
    /// Index into `snapshot.matching`; `None` is the EMPTY state.
    pointer: Option<usize>,
    /// Sequential steps taken since the last smart-random jump.
    run_len: u32,
    last_rescan_at: Option<Instant>,
    last_advance_at: Instant,
    version: u64,
    generation: u64,
    rng: StdRng,
}

impl SlideshowEngine {
    pub fn new(opts: EngineOptions, seed: Option<u64>, started_at: Instant) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            opts,
            snapshot: ScanSnapshot::empty(),
            pointer: None,
            run_len: 0,
            last_rescan_at: None,
            last_advance_at: started_at,
            version: 0,
            generation: 0,
            rng,
        }
    }

    /// Drive the engine. Invoked at a cadence of at most the advance
    /// interval; a tick may both signal a rescan and advance.
    pub fn on_tick(&mut self, now: Instant) -> TickOutcome {
        let rescan_due = self
            .last_rescan_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.opts.refresh_interval);

        let mut advanced = false;
        if now.saturating_duration_since(self.last_advance_at) >= self.opts.advance_interval {
            self.last_advance_at = now;
            advanced = self.advance();
        }

        TickOutcome {
            rescan_due,
            advanced,
        }
    }

    /// Stamp the rescan clock and hand out a ticket for the scan that the
    /// caller is about to run. The stamp lives at scan start so the engine
    /// never rescans more often than configured, even for slow scans.
    pub fn begin_rescan(&mut self, now: Instant) -> ScanTicket {
        self.last_rescan_at = Some(now);
        ScanTicket {
            generation: self.generation,
        }
    }

    /// Atomically replace the snapshot, remapping the pointer so the
    /// displayed image survives re-ordering when its path is still present.
    /// Returns `false` when the ticket predates a reconfiguration and the
    /// result was discarded.
    pub fn apply_scan(&mut self, ticket: ScanTicket, snapshot: ScanSnapshot) -> bool {
        if ticket.generation != self.generation {
            debug!("discarding scan result from a superseded configuration");
            return false;
        }

        let previous = self.current_path().map(Path::to_path_buf);
        self.pointer = match &previous {
            Some(path) => match snapshot.matching.iter().position(|r| &r.path == path) {
                Some(idx) => Some(idx),
                None if snapshot.matching.is_empty() => None,
                None => Some(0),
            },
            None if snapshot.matching.is_empty() => None,
            None => Some(0),
        };
        self.snapshot = snapshot;
        self.bump_version_if_moved(previous.as_deref());
        true
    }

    /// Switching modes resets the smart-random run without moving the pointer.
    pub fn set_advance_mode(&mut self, mode: AdvanceMode) {
        if self.opts.advance_mode != mode {
            self.opts.advance_mode = mode;
            self.run_len = 0;
        }
    }

    /// Apply new options wholesale: the snapshot and pointer are dropped,
    /// in-flight scan results from the old generation will be discarded, and
    /// the next tick rescans immediately.
    pub fn reconfigure(&mut self, opts: EngineOptions) {
        let previous = self.current_path().map(Path::to_path_buf);
        self.opts = opts;
        self.generation += 1;
        self.snapshot = ScanSnapshot::empty();
        self.pointer = None;
        self.run_len = 0;
        self.last_rescan_at = None;
        self.bump_version_if_moved(previous.as_deref());
        info!(generation = self.generation, "engine reconfigured");
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.pointer
            .and_then(|idx| self.snapshot.matching.get(idx))
            .map(|record| record.path.as_path())
    }

    pub fn is_active(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            current_path: self.current_path().map(Path::to_path_buf),
            version: self.version,
            matching_count: self.snapshot.matching.len(),
            discovered_count: self.snapshot.discovered.len(),
            failed_count: self.snapshot.failed_count,
            non_image_count: self.snapshot.non_image_count,
        }
    }

    fn advance(&mut self) -> bool {
        let len = self.snapshot.matching.len();
        let Some(ptr) = self.pointer else {
            return false;
        };
        if len == 0 {
            return false;
        }

        let previous = self.current_path().map(Path::to_path_buf);
        let next = match self.opts.advance_mode {
            AdvanceMode::Sequential => (ptr + 1) % len,
            AdvanceMode::SmartRandom => {
                if self.run_len + 1 < self.opts.smart_random_sequence_length {
                    self.run_len += 1;
                    (ptr + 1) % len
                } else {
                    self.run_len = 0;
                    self.random_jump(ptr, len)
                }
            }
        };
        self.pointer = Some(next);
        self.bump_version_if_moved(previous.as_deref());
        next != ptr
    }

    /// Uniform over the other `len - 1` slots; stays put when only one
    /// image matches.
    fn random_jump(&mut self, current: usize, len: usize) -> usize {
        if len <= 1 {
            return current;
        }
        let mut idx = self.rng.random_range(0..len - 1);
        if idx >= current {
            idx += 1;
        }
        idx
    }

    fn bump_version_if_moved(&mut self, previous: Option<&Path>) {
        if self.current_path() != previous {
            self.version += 1;
        }
    }
}
