//! SyncEngine implementation
//!
//! The engine owns every collaborator of a sync run (settings, scanner,
//! identity store, concurrency guard and clock) and sequences them. It is
//! `Send + Sync`; watch handling shares one engine across blocking workers.

use std::sync::Arc;
use std::time::Duration;

use readme_fs::{FileState, NormalizedPath, RobustnessConfig, checksum};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::decision::{Baseline, DecisionInputs, Verdict, decide, resolve_conflict};
use crate::guard::ConcurrencyGuard;
use crate::scanner::{ScanResult, Scanner, SourceCandidate, TargetFile};
use crate::store::{FileMapping, IdentityStore};
use crate::watch::{EventAction, EventKind, Side, WatchEvent};
use crate::{Error, Result};

use super::executor::{Executor, Pair};
use super::reconcile;
use super::report::{ConflictEntry, FileOutcome, PlanEntry, ReverseReport, StatusReport, SyncReport};

/// Bidirectional README synchronizer
///
/// Besides full cycles ([`SyncEngine::sync_all`]) every step of a cycle can
/// be invoked on its own, which is what the command line and watch mode do.
#[derive(Debug)]
pub struct SyncEngine {
    settings: Settings,
    store: IdentityStore,
    scanner: Scanner,
    guard: ConcurrencyGuard,
    clock: Arc<dyn Clock>,
    robustness: RobustnessConfig,
}

impl SyncEngine {
    /// Create an engine on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclusion pattern does not compile.
    pub fn new(settings: Settings, store: IdentityStore) -> Result<Self> {
        Self::with_clock(settings, store, Arc::new(SystemClock))
    }

    /// Create an engine whose cooldowns run on `clock`.
    pub fn with_clock(settings: Settings, store: IdentityStore, clock: Arc<dyn Clock>) -> Result<Self> {
        let scanner = Scanner::new(&settings)?;
        let cooldown = Duration::try_from_secs_f64(settings.sync_settings.cooldown_seconds).unwrap_or_default();
        let guard = ConcurrencyGuard::new(cooldown, clock.clone());
        Ok(Self {
            settings,
            store,
            scanner,
            guard,
            clock,
            robustness: RobustnessConfig::default(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn executor(&self) -> Executor<'_> {
        Executor {
            store: &self.store,
            scanner: &self.scanner,
            robustness: self.robustness,
        }
    }

    fn tolerance(&self) -> f64 {
        self.settings.sync_settings.tolerance_seconds
    }

    fn inputs<'a>(&self, source: &'a FileState, target: &'a FileState, mapping: Option<&FileMapping>) -> DecisionInputs<'a> {
        DecisionInputs {
            source,
            target,
            baseline: mapping.map(Baseline::from).unwrap_or_default(),
            tolerance: self.tolerance(),
            tie_break: self.settings.sync_settings.tie_break,
        }
    }

    /// Run a full cycle: move detection, forward pass, orphan purge,
    /// unlinked quarantine, reverse pass.
    ///
    /// # Errors
    ///
    /// Fails before touching any file when the configuration is unusable, and
    /// when the identity store cannot be queried. Per-file failures are
    /// counted in the report instead.
    pub fn sync_all(&self) -> Result<SyncReport> {
        self.settings.ensure_runnable()?;
        let mut report = SyncReport {
            moved_detected: reconcile::detect_moves(&self.store, &self.scanner)?,
            ..SyncReport::default()
        };

        let scan = self.scanner.scan_all_sources();
        report.scanned = scan.candidates.len();
        report.ambiguous = scan.ambiguities.iter().map(|a| a.skipped.len()).sum();
        report.missing_roots = scan.missing_roots;
        for candidate in &scan.candidates {
            let outcome = self.sync_file(candidate);
            report.tally(&outcome);
        }

        report.orphans_purged = self.purge_orphans()?;
        if self.settings.sync_settings.move_unlinked_files {
            report.unlinked_moved = self.quarantine_unlinked()?;
        }

        let reverse = self.reverse_pass(false)?;
        report.reverse_synced += reverse.synced;
        report.errors += reverse.errors;

        info!(
            scanned = report.scanned,
            synced = report.synced,
            reverse_synced = report.reverse_synced,
            conflicts = report.conflicts,
            errors = report.errors,
            "sync cycle finished"
        );
        Ok(report)
    }

    /// Reconcile one scanned pair under the concurrency guard.
    ///
    /// Never fails: errors become [`FileOutcome::Error`].
    pub fn sync_file(&self, candidate: &SourceCandidate) -> FileOutcome {
        let _permit = match self.guard.try_acquire(&candidate.source_path) {
            Ok(permit) => permit,
            Err(rejection) => return rejection.into(),
        };
        match self.reconcile_pair(candidate) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(source = %candidate.source_path, error = %e, "sync failed");
                FileOutcome::Error(e.to_string())
            }
        }
    }

    fn reconcile_pair(&self, candidate: &SourceCandidate) -> Result<FileOutcome> {
        let executor = self.executor();
        let mapping = self.store.get_by_source(&candidate.source_path)?;
        let target = executor.resolve_target(candidate, mapping.as_ref())?;
        let mapping = match mapping {
            Some(m) if m.target_path != target => self.store.get_by_source(&candidate.source_path)?,
            other => other,
        };

        let source_state = FileState::read(candidate.source_path.as_ref())?;
        let target_state = FileState::read(target.as_ref())?;
        let inputs = self.inputs(&source_state, &target_state, mapping.as_ref());
        let decision = decide(&inputs);
        let pair = Pair::of_candidate(candidate, &target);

        let verdict = match decision.verdict {
            Verdict::Conflict => resolve_conflict(
                self.settings.sync_settings.conflict_resolution,
                candidate.source_path.as_ref(),
                inputs.source_mtime(),
                inputs.target_mtime(),
            ),
            other => other,
        };

        match verdict {
            Verdict::NoSync => {
                let stale = mapping.as_ref().is_none_or(|m| {
                    m.source_hash != source_state.hash || m.target_hash != target_state.hash
                });
                if decision.converged && stale {
                    executor.record(&pair)?;
                } else if mapping.as_ref().is_none_or(|m| {
                    m.logical_name != candidate.logical_name
                        || m.canonical_filename != candidate.canonical_filename
                }) {
                    // A missing mapping is created without a baseline so the
                    // mirror is not treated as unlinked.
                    executor.link(&pair)?;
                }
                Ok(FileOutcome::NoChange)
            }
            Verdict::SourceToTarget => {
                executor.push(&pair)?;
                Ok(FileOutcome::Synced)
            }
            Verdict::TargetToSource => {
                executor.pull(&pair)?;
                Ok(FileOutcome::ReverseSynced)
            }
            Verdict::Conflict => {
                if mapping.is_none() {
                    executor.link(&pair)?;
                }
                let unresolved = Error::ConflictUnresolved {
                    source_path: candidate.source_path.to_native(),
                    target_path: target.to_native(),
                };
                warn!(rule = decision.rule, "{unresolved}");
                Ok(FileOutcome::Conflict)
            }
        }
    }

    /// Propagate edits made on the mirror back to their sources.
    ///
    /// With `force`, every mirror whose content differs from its source wins.
    pub fn reverse_sync_from_target(&self, force: bool) -> Result<ReverseReport> {
        self.settings.ensure_runnable()?;
        self.reverse_pass(force)
    }

    fn reverse_pass(&self, force: bool) -> Result<ReverseReport> {
        let mut report = ReverseReport::default();
        let mut sources: Option<Vec<SourceCandidate>> = None;

        for file in self.scanner.scan_target_files() {
            if self.scanner.is_quarantined(&file.path) {
                continue;
            }
            report.scanned += 1;

            let Some(mapping) = self.mapping_for_target(&file, &mut sources)? else {
                report.no_mapping += 1;
                continue;
            };
            if !mapping.source_path.is_file() {
                debug!(source = %mapping.source_path, "source missing, reverse skipped");
                continue;
            }

            let permit = if force {
                self.guard.force_acquire(&mapping.source_path)
            } else {
                self.guard.try_acquire(&mapping.source_path)
            };
            let Ok(_permit) = permit else {
                continue;
            };

            match self.reverse_one(&mapping, force) {
                Ok(true) => report.synced += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(target = %file.path, error = %e, "reverse sync failed");
                    report.errors += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            synced = report.synced,
            no_mapping = report.no_mapping,
            errors = report.errors,
            "reverse pass finished"
        );
        Ok(report)
    }

    fn reverse_one(&self, mapping: &FileMapping, force: bool) -> Result<bool> {
        let source = FileState::read(mapping.source_path.as_ref())?;
        let target = FileState::read(mapping.target_path.as_ref())?;
        if !target.exists || source.hash == target.hash {
            return Ok(false);
        }

        let pull = force || {
            let inputs = self.inputs(&source, &target, Some(mapping));
            inputs.target_lead() > self.tolerance() || decide(&inputs).verdict == Verdict::TargetToSource
        };
        if pull {
            self.executor().pull(&Pair::of_mapping(mapping))?;
        }
        Ok(pull)
    }

    /// The mapping a mirror file belongs to: by recorded target, then by
    /// content, then by filename, then by scanning sources for one that would
    /// produce this filename.
    fn mapping_for_target(
        &self,
        file: &TargetFile,
        sources: &mut Option<Vec<SourceCandidate>>,
    ) -> Result<Option<FileMapping>> {
        if let Some(mapping) = self.store.get_by_target(&file.path)? {
            return Ok(Some(mapping));
        }
        if let Ok(digest) = checksum::file_digest(file.path.as_ref())
            && let Some(mapping) = self.store.get_by_hash(&digest)?
        {
            return self.adopt(mapping, &file.path);
        }
        if let Some(mapping) = self.store.get_by_filename(&file.filename)? {
            return self.adopt(mapping, &file.path);
        }

        let sources = sources.get_or_insert_with(|| self.scanner.scan_all_sources().candidates);
        let Some(candidate) = sources.iter().find(|c| c.canonical_filename == file.filename) else {
            return Ok(None);
        };
        if let Some(existing) = self.store.get_by_source(&candidate.source_path)? {
            return self.adopt(existing, &file.path);
        }
        self.executor().link(&Pair::of_candidate(candidate, &file.path))?;
        self.store.get_by_source(&candidate.source_path)
    }

    /// Point `mapping` at `path` unless it still has a live mirror elsewhere.
    fn adopt(&self, mut mapping: FileMapping, path: &NormalizedPath) -> Result<Option<FileMapping>> {
        if mapping.target_path == *path {
            return Ok(Some(mapping));
        }
        if mapping.target_path.is_file() && !self.scanner.is_quarantined(&mapping.target_path) {
            debug!(target = %path, live = %mapping.target_path, "duplicate mirror not adopted");
            return Ok(None);
        }
        self.store.retarget(&mapping.target_path, path)?;
        mapping.target_path = path.clone();
        Ok(Some(mapping))
    }

    /// Every mapping whose two sides both changed since the baseline.
    pub fn get_conflicts(&self) -> Result<Vec<ConflictEntry>> {
        let mut conflicts = Vec::new();
        for mapping in self.store.all()? {
            let (source, target) = match (
                FileState::read(mapping.source_path.as_ref()),
                FileState::read(mapping.target_path.as_ref()),
            ) {
                (Ok(s), Ok(t)) if s.exists && t.exists => (s, t),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(source = %mapping.source_path, error = %e, "cannot inspect pair");
                    continue;
                }
                _ => continue,
            };
            if source.hash == target.hash {
                continue;
            }

            let inputs = self.inputs(&source, &target, Some(&mapping));
            if inputs.source_changed() && inputs.target_changed() {
                let (source_mtime, target_mtime) = (inputs.source_mtime(), inputs.target_mtime());
                conflicts.push(ConflictEntry {
                    source_mtime,
                    target_mtime,
                    last_sync_time: mapping.last_sync_time,
                    source_newer: source_mtime > target_mtime,
                    target_newer: target_mtime > source_mtime,
                    source_path: mapping.source_path,
                    target_path: mapping.target_path,
                });
            }
        }
        Ok(conflicts)
    }

    /// Settle the pair owning `target_path` by letting `keep` overwrite the
    /// other side, ignoring cooldowns.
    ///
    /// # Errors
    ///
    /// `NotFound` when the mirror has no mapping or the source is gone.
    pub fn force_resolve(&self, target_path: &NormalizedPath, keep: Side) -> Result<()> {
        let mapping = match self.store.get_by_target(target_path)? {
            Some(mapping) => mapping,
            None => {
                let digest = checksum::file_digest(target_path.as_ref())?;
                let mapping = self
                    .store
                    .get_by_hash(&digest)?
                    .ok_or_else(|| Error::NotFound(format!("mapping for {target_path}")))?;
                if mapping.target_path != *target_path {
                    self.store.retarget(&mapping.target_path, target_path)?;
                }
                mapping
            }
        };
        if !mapping.source_path.is_file() {
            return Err(Error::NotFound(format!("source {}", mapping.source_path)));
        }

        let _permit = self
            .guard
            .force_acquire(&mapping.source_path)
            .map_err(|_| Error::ConflictUnresolved {
                source_path: mapping.source_path.to_native(),
                target_path: target_path.to_native(),
            })?;
        let pair = Pair {
            target: target_path,
            ..Pair::of_mapping(&mapping)
        };
        match keep {
            Side::Source => self.executor().push(&pair),
            Side::Target => self.executor().pull(&pair),
        }
    }

    /// Copy a mirror over its source regardless of the decision rules.
    pub fn force_sync_target_to_source(&self, target_path: &NormalizedPath) -> Result<()> {
        self.force_resolve(target_path, Side::Target)
    }

    pub fn get_status(&self) -> Result<StatusReport> {
        let mappings = self.store.all()?;
        let mut status = StatusReport {
            total_mappings: mappings.len(),
            source_files: self.scanner.scan_all_sources().candidates.len(),
            target_files: self
                .scanner
                .scan_target_files()
                .iter()
                .filter(|f| !self.scanner.is_quarantined(&f.path))
                .count(),
            source_folders: self.settings.enabled_roots().len(),
            last_sync_time: mappings.iter().filter_map(|m| m.last_sync_time).reduce(f64::max),
            ..StatusReport::default()
        };

        for mapping in &mappings {
            if !mapping.source_path.is_file() {
                status.missing_source += 1;
            } else if !mapping.target_path.is_file() {
                status.missing_target += 1;
            } else {
                let source = checksum::file_digest(mapping.source_path.as_ref()).ok();
                let target = checksum::file_digest(mapping.target_path.as_ref()).ok();
                if source != mapping.source_hash || target != mapping.target_hash {
                    status.outdated_files += 1;
                }
            }
        }
        Ok(status)
    }

    /// The verdict every scanned pair would receive right now, touching nothing.
    pub fn plan(&self) -> Result<Vec<PlanEntry>> {
        self.settings.ensure_runnable()?;
        let root = self
            .scanner
            .target_root()
            .map(NormalizedPath::new)
            .ok_or_else(|| Error::config("target folder is not set"))?;

        let mut plan = Vec::new();
        for candidate in self.scanner.scan_all_sources().candidates {
            let mapping = self.store.get_by_source(&candidate.source_path)?;
            let target = match &mapping {
                Some(m) if m.target_path.is_file() => m.target_path.clone(),
                _ => self
                    .scanner
                    .find_existing_target(&candidate.canonical_filename)
                    .unwrap_or_else(|| root.join(&candidate.canonical_filename)),
            };

            let source_state = FileState::read(candidate.source_path.as_ref())?;
            let target_state = FileState::read(target.as_ref())?;
            let inputs = self.inputs(&source_state, &target_state, mapping.as_ref());
            let decision = decide(&inputs);
            let verdict = match decision.verdict {
                Verdict::Conflict => resolve_conflict(
                    self.settings.sync_settings.conflict_resolution,
                    candidate.source_path.as_ref(),
                    inputs.source_mtime(),
                    inputs.target_mtime(),
                ),
                other => other,
            };
            plan.push(PlanEntry {
                source_path: candidate.source_path,
                target_path: target,
                verdict,
                rule: decision.rule,
            });
        }
        Ok(plan)
    }

    pub fn mappings(&self) -> Result<Vec<FileMapping>> {
        self.store.all()
    }

    pub fn scan(&self) -> ScanResult {
        self.scanner.scan_all_sources()
    }

    pub fn find_unlinked(&self) -> Result<Vec<NormalizedPath>> {
        reconcile::find_unlinked(&self.store, &self.scanner)
    }

    /// Move every unlinked mirror into the quarantine folder.
    pub fn quarantine_unlinked(&self) -> Result<usize> {
        let Some(dir) = self.settings.unlinked_dir() else {
            return Err(Error::config("target folder is not set"));
        };
        let unlinked = self.find_unlinked()?;
        Ok(reconcile::quarantine_all(&unlinked, &dir, self.robustness))
    }

    pub fn purge_orphans(&self) -> Result<usize> {
        self.store.purge_orphans(&self.settings.enabled_roots())
    }

    /// Evict stale cooldown entries.
    pub fn sweep_guard(&self) -> usize {
        self.guard.sweep()
    }

    /// React to one debounced watch event.
    pub fn handle_event(&self, event: &WatchEvent) -> Result<EventAction> {
        debug!(path = %event.path, kind = ?event.kind, side = ?event.side, "watch event");
        match (event.side, &event.kind) {
            (Side::Source, EventKind::Modified | EventKind::Created) => Ok(self.sync_source(&event.path)),
            (Side::Source, EventKind::Moved { to }) => self.source_moved(&event.path, to),
            (Side::Source, EventKind::Deleted) => self.source_deleted(&event.path),
            (Side::Target, EventKind::Modified | EventKind::Created) => self.target_changed(&event.path),
            (Side::Target, EventKind::Moved { to }) => {
                if self.scanner.is_quarantined(to) {
                    return Ok(EventAction::Ignored);
                }
                if self.store.retarget(&event.path, to)? {
                    Ok(EventAction::Retargeted)
                } else {
                    self.target_changed(to)
                }
            }
            (Side::Target, EventKind::Deleted) => {
                if event.path.exists() {
                    return Ok(EventAction::Ignored);
                }
                match self.store.get_by_target(&event.path)? {
                    Some(mapping) => Ok(self.sync_source(&mapping.source_path)),
                    None => Ok(EventAction::Ignored),
                }
            }
        }
    }

    fn sync_source(&self, path: &NormalizedPath) -> EventAction {
        match self.scanner.classify_source(path.as_ref()) {
            Some(candidate) => EventAction::Reconciled(self.sync_file(&candidate)),
            None => EventAction::Ignored,
        }
    }

    /// Carry the mapping over to the new source path, then reconcile there.
    fn source_moved(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<EventAction> {
        let Some(candidate) = self.scanner.classify_source(to.as_ref()) else {
            return self.source_deleted(from);
        };
        if let Some(mut mapping) = self.store.get_by_source(from)?
            && self.store.get_by_source(to)?.is_none()
        {
            self.store.remove(from)?;
            mapping.source_path = candidate.source_path.clone();
            mapping.logical_name = candidate.logical_name.clone();
            mapping.canonical_filename = candidate.canonical_filename.clone();
            self.store.put(&mapping)?;
            info!(from = %from, to = %to, "source moved, mapping carried over");
        }
        Ok(EventAction::Reconciled(self.sync_file(&candidate)))
    }

    /// Quarantine the mirror of a deleted source and drop its mapping.
    fn source_deleted(&self, path: &NormalizedPath) -> Result<EventAction> {
        if path.exists() {
            return Ok(EventAction::Ignored);
        }
        let Some(mapping) = self.store.get_by_source(path)? else {
            return Ok(EventAction::Ignored);
        };
        let Some(dir) = self.settings.unlinked_dir() else {
            return Err(Error::config("target folder is not set"));
        };

        let _permit = self.guard.force_acquire(path).map_err(|_| Error::ConflictUnresolved {
            source_path: path.to_native(),
            target_path: mapping.target_path.to_native(),
        })?;
        let action = if mapping.target_path.is_file() && !self.scanner.is_quarantined(&mapping.target_path) {
            let moved = reconcile::quarantine_file(&mapping.target_path, &dir, self.robustness)?;
            EventAction::Quarantined(NormalizedPath::new(moved))
        } else {
            EventAction::Ignored
        };
        self.store.remove(path)?;
        Ok(action)
    }

    /// Reconcile the source owning a mirror that was edited or appeared.
    fn target_changed(&self, path: &NormalizedPath) -> Result<EventAction> {
        if self.scanner.is_quarantined(path) || !path.is_file() {
            return Ok(EventAction::Ignored);
        }
        let mapping = match self.store.get_by_target(path)? {
            Some(mapping) => Some(mapping),
            None => match checksum::file_digest(path.as_ref()) {
                Ok(digest) => match self.store.get_by_hash(&digest)? {
                    Some(mapping) => self.adopt(mapping, path)?,
                    None => None,
                },
                Err(e) => {
                    warn!(target = %path, error = %e, "cannot hash target");
                    None
                }
            },
        };
        match mapping {
            Some(mapping) => Ok(self.sync_source(&mapping.source_path)),
            None => Ok(EventAction::Ignored),
        }
    }
}
