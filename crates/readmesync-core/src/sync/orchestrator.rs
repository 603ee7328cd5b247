//! Sync orchestration - coordinates full and single-pair passes

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use super::actions::{PlannedPair, Phase, after_write};
use super::executor::FileOperationExecutor;
use super::guard::AntiLoopGuard;
use super::{
    ConflictRecord, META_DAEMON_HEARTBEAT, META_DAEMON_PID, META_LAST_CLEANUP, PairOutcome,
    PairReport, StatusReport, SyncReport,
};
use crate::comparison::{
    ConflictResolver, Direction, FileHasher, FileState, ResolveOptions, SyncDecision,
};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::scanner::{FsScanner, NameAllocator, ScannedSource, Scanner, scan_target_files};
use crate::store::{Mapping, MappingStatus, MappingStore, is_under_any};

/// Pair whose states were read and decision computed
struct Evaluated {
    pair: PlannedPair,
    source: FileState,
    target: FileState,
    decision: SyncDecision,
}

/// Main sync engine
///
/// Every pass and every cleanup run holds the pass lock for its whole
/// duration. Per-path leases from the [`AntiLoopGuard`] additionally keep the
/// event path away from pairs being written.
pub struct SyncEngine {
    pub(super) config: Config,
    pub(super) store: MappingStore,
    scanner: Box<dyn Scanner>,
    pub(super) guard: AntiLoopGuard,
    pass_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create an engine from its collaborators
    #[must_use]
    pub fn new(config: Config, store: MappingStore, scanner: Box<dyn Scanner>) -> Self {
        let guard = AntiLoopGuard::new(Duration::from_secs(config.sync_cooldown));
        Self {
            config,
            store,
            scanner,
            guard,
            pass_lock: Mutex::new(()),
        }
    }

    /// Create an engine with the filesystem scanner and the configured store
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if no database path is configured,
    /// [`SyncError::Pattern`] for a bad exclusion, or
    /// [`SyncError::StoreUnavailable`] if the store cannot be opened.
    pub fn from_config(config: Config) -> Result<Self> {
        let db_path = config
            .database_path
            .clone()
            .ok_or_else(|| SyncError::config("database_path is not set"))?;
        let store = MappingStore::open(&db_path)?;
        let scanner = FsScanner::from_config(&config)?;
        debug!("Opened mapping store at {}", db_path.display());
        Ok(Self::new(config, store, Box::new(scanner)))
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying mapping store
    #[must_use]
    pub const fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Anti-loop guard shared with the event path
    #[must_use]
    pub const fn guard(&self) -> &AntiLoopGuard {
        &self.guard
    }

    pub(super) fn lock_pass(&self) -> MutexGuard<'_, ()> {
        self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            policy: self.config.conflict_resolution,
            tolerance_seconds: self.config.tolerance_seconds,
            reverse_sync: self.config.reverse_sync,
        }
    }

    /// Run a full pass over every scanned source and stored mapping
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] if the mapping store fails;
    /// nothing from the failing phase is persisted. All other failures are
    /// recorded in the report.
    pub fn run_full_sync(&self) -> Result<SyncReport> {
        let _pass = self.lock_pass();
        let mut report = SyncReport::default();

        let outcome = self.scanner.scan();
        let mut failed_roots = Vec::new();
        for error in outcome.errors {
            if let SyncError::Scan { root, .. } = &error {
                failed_roots.push(root.clone());
            }
            report.scan_errors.push(error.to_string());
        }

        let stored: BTreeMap<PathBuf, Mapping> = self
            .store
            .list_all()?
            .into_iter()
            .map(|m| (m.source_path.clone(), m))
            .collect();
        let mut working = stored.clone();

        let mut unmapped = self.unmapped_targets(working.values());
        Self::detect_moved_targets(working.values_mut(), &mut unmapped);

        let mut names = Self::name_allocator(working.values());
        let scanned: BTreeSet<&Path> = outcome
            .sources
            .iter()
            .map(|s| s.source_path.as_path())
            .collect();

        let mut plan = Vec::with_capacity(outcome.sources.len());
        for source in &outcome.sources {
            let pair = match working.get(&source.source_path) {
                Some(mapping) => PlannedPair {
                    stored: stored.get(&source.source_path).cloned(),
                    working: mapping.clone(),
                },
                None => self.plan_new_source(source, &mut names, &mut unmapped),
            };
            plan.push(pair);
        }

        for (path, mapping) in &working {
            if !scanned.contains(path.as_path()) && self.should_revisit(mapping, &failed_roots) {
                plan.push(PlannedPair {
                    stored: stored.get(path).cloned(),
                    working: mapping.clone(),
                });
            }
        }

        info!("Sync pass over {} pair(s)", plan.len());
        self.execute_plan(plan, &mut report)?;
        Ok(report)
    }

    /// Sync the one pair that `path` belongs to
    ///
    /// `path` may be a mapped source, a mapped target, or a new source
    /// document. Any other path yields an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] if the mapping store fails.
    pub fn run_single_pair_sync(&self, path: &Path) -> Result<SyncReport> {
        let _pass = self.lock_pass();
        let mut report = SyncReport::default();

        let mapping = match self.store.get(path)? {
            Some(mapping) => Some(mapping),
            None => self.store.get_by_target(path)?,
        };

        let pair = if let Some(mapping) = mapping {
            let mut pair = PlannedPair::existing(mapping);
            if !pair.working.target_path.exists() {
                let all = self.store.list_all()?;
                let mut unmapped = self.unmapped_targets(all.iter());
                Self::detect_moved_targets(std::iter::once(&mut pair.working), &mut unmapped);
            }
            pair
        } else {
            let Some(source) = self.scanner.propose(path).filter(|_| path.is_file()) else {
                debug!("Ignoring event for untracked path {}", path.display());
                return Ok(report);
            };
            let all = self.store.list_all()?;
            let mut unmapped = self.unmapped_targets(all.iter());
            let mut names = Self::name_allocator(all.iter());
            self.plan_new_source(&source, &mut names, &mut unmapped)
        };

        self.execute_plan(vec![pair], &mut report)?;
        Ok(report)
    }

    /// Mapping counts, last cleanup time and daemon health
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] if the mapping store fails.
    pub fn status(&self) -> Result<StatusReport> {
        let (active, conflict, orphaned) = self.store.count_by_status()?;
        Ok(StatusReport {
            active,
            conflict,
            orphaned,
            last_cleanup_at: self.store.get_meta(META_LAST_CLEANUP)?,
            daemon_pid: self
                .store
                .get_meta(META_DAEMON_PID)?
                .and_then(|pid| pid.parse().ok()),
            daemon_heartbeat: self.store.get_meta(META_DAEMON_HEARTBEAT)?,
        })
    }

    /// Collection files not owned by any of `mappings`
    pub(super) fn unmapped_targets<'a>(
        &self,
        mappings: impl Iterator<Item = &'a Mapping>,
    ) -> Vec<PathBuf> {
        let owned: BTreeSet<&Path> = mappings.map(|m| m.target_path.as_path()).collect();
        scan_target_files(&self.config.target_folder, &self.config.unlinked_subfolder)
            .into_iter()
            .filter(|path| !owned.contains(path.as_path()))
            .collect()
    }

    fn name_allocator<'a>(mappings: impl Iterator<Item = &'a Mapping>) -> NameAllocator {
        NameAllocator::with_taken(
            mappings
                .filter_map(|m| m.target_path.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
        )
    }

    /// Follow targets the user moved inside the collection
    ///
    /// A missing target is rebound to an unmapped collection file with the
    /// same file name (case-insensitive). Among several such files the one
    /// whose content hash equals the recorded target hash wins. Content alone
    /// never rebinds a mapping, since unrelated documents can share a hash.
    pub(super) fn detect_moved_targets<'a>(
        mappings: impl Iterator<Item = &'a mut Mapping>,
        unmapped: &mut Vec<PathBuf>,
    ) -> Vec<Mapping> {
        let mut hashes: HashMap<PathBuf, Option<String>> = HashMap::new();
        let mut moved = Vec::new();

        for mapping in mappings {
            if mapping.target_path.exists() {
                continue;
            }
            let Some(name) = lowercase_name(&mapping.target_path) else {
                continue;
            };

            let same_name: Vec<usize> = unmapped
                .iter()
                .enumerate()
                .filter(|(_, candidate)| lowercase_name(candidate).as_deref() == Some(name.as_str()))
                .map(|(idx, _)| idx)
                .collect();

            let recorded = mapping.target_hash.as_deref();
            let found = same_name
                .iter()
                .copied()
                .find(|&idx| {
                    let candidate = &unmapped[idx];
                    recorded.is_some()
                        && hashes
                            .entry(candidate.clone())
                            .or_insert_with(|| FileHasher::hash(candidate).ok())
                            .as_deref()
                            == recorded
                })
                .or_else(|| same_name.first().copied());

            if let Some(idx) = found {
                let moved_to = unmapped.remove(idx);
                info!(
                    "Target moved: {} -> {}",
                    mapping.target_path.display(),
                    moved_to.display()
                );
                mapping.target_path = moved_to;
                moved.push(mapping.clone());
            }
        }

        moved
    }

    /// Mapping for a source seen for the first time
    fn plan_new_source(
        &self,
        source: &ScannedSource,
        names: &mut NameAllocator,
        unmapped: &mut Vec<PathBuf>,
    ) -> PlannedPair {
        let name = names.allocate(&source.target_name);
        if name != source.target_name {
            info!(
                "Name {} taken; {} maps to {}",
                source.target_name,
                source.source_path.display(),
                name
            );
        }

        let adopted = unmapped.iter().position(|candidate| {
            candidate
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(&name))
        });

        let target_path = match adopted {
            Some(idx) => {
                let path = unmapped.remove(idx);
                info!("Adopting existing collection file {}", path.display());
                path
            }
            None => self.config.target_folder.join(&name),
        };

        PlannedPair::new_source(Mapping::new(source.source_path.clone(), target_path))
    }

    /// Whether a mapping missing from the scan still needs a pass
    fn should_revisit(&self, mapping: &Mapping, failed_roots: &[PathBuf]) -> bool {
        mapping.status != MappingStatus::Orphaned
            && !mapping.source_path.exists()
            && is_under_any(&mapping.source_path, &self.config.source_folders)
            && !is_under_any(&mapping.source_path, failed_roots)
    }

    fn execute_plan(&self, plan: Vec<PlannedPair>, report: &mut SyncReport) -> Result<()> {
        let options = self.resolve_options();
        let mut forward_updates = Vec::new();
        let mut reverse = Vec::new();

        for pair in plan {
            let evaluated = match Self::evaluate(pair, &options) {
                Ok(evaluated) => evaluated,
                Err((pair, error)) => {
                    warn!("{error}");
                    report.pairs.push(pair_report(&pair.working, None, PairOutcome::Failed(error.to_string())));
                    continue;
                }
            };

            match Phase::of(evaluated.decision) {
                Phase::Reverse => reverse.push(evaluated),
                Phase::Idle => {
                    let SyncDecision::Skip(reason) = evaluated.decision else {
                        continue;
                    };
                    debug!(
                        "Skipping {} ({})",
                        evaluated.pair.working.source_path.display(),
                        reason.label()
                    );
                    if let Some(update) =
                        evaluated.pair.idle_update(reason, &evaluated.source, &evaluated.target)
                    {
                        forward_updates.push(update);
                    }
                    report.pairs.push(pair_report(
                        &evaluated.pair.working,
                        Some(evaluated.decision),
                        PairOutcome::Skipped(reason),
                    ));
                }
                Phase::Forward => {
                    let (outcome, update) = self.apply(&evaluated);
                    forward_updates.extend(update);
                    report
                        .pairs
                        .push(pair_report(&evaluated.pair.working, Some(evaluated.decision), outcome));
                }
            }
        }

        self.store.upsert_many(&forward_updates)?;

        let mut reverse_updates = Vec::new();
        for evaluated in reverse {
            let outcome = if self.guard.is_cooling_down(&evaluated.pair.working.source_path) {
                PairOutcome::Deferred("cooldown")
            } else {
                let (outcome, update) = self.apply(&evaluated);
                reverse_updates.extend(update);
                outcome
            };
            report
                .pairs
                .push(pair_report(&evaluated.pair.working, Some(evaluated.decision), outcome));
        }

        self.store.upsert_many(&reverse_updates)?;
        Ok(())
    }

    fn evaluate(
        pair: PlannedPair,
        options: &ResolveOptions,
    ) -> std::result::Result<Evaluated, (PlannedPair, SyncError)> {
        let source = match FileState::read(&pair.working.source_path) {
            Ok(state) => state,
            Err(error) => return Err((pair, error)),
        };
        let target = match FileState::read(&pair.working.target_path) {
            Ok(state) => state,
            Err(error) => return Err((pair, error)),
        };
        let decision = ConflictResolver::resolve(pair.stored.as_ref(), &source, &target, options);
        Ok(Evaluated {
            pair,
            source,
            target,
            decision,
        })
    }

    /// Perform the writes for one decision under a per-path lease
    fn apply(&self, evaluated: &Evaluated) -> (PairOutcome, Option<Mapping>) {
        let mapping = &evaluated.pair.working;
        let source_path = mapping.source_path.as_path();
        let target_path = mapping.target_path.as_path();

        let Some(_lease) = self.guard.try_acquire(&[source_path, target_path]) else {
            debug!("{} is busy; deferring", source_path.display());
            return (PairOutcome::Deferred("path busy"), None);
        };

        match self.write(evaluated) {
            Ok((outcome, status)) => match (FileState::read(source_path), FileState::read(target_path)) {
                (Ok(source), Ok(target)) => {
                    let update = after_write(mapping, &source, &target, status);
                    (outcome, Some(update))
                }
                (Err(error), _) | (_, Err(error)) => {
                    warn!("{error}");
                    (PairOutcome::Failed(error.to_string()), None)
                }
            },
            Err(error) => {
                warn!("Sync failed for {}: {error}", source_path.display());
                (PairOutcome::Failed(error.to_string()), None)
            }
        }
    }

    fn write(&self, evaluated: &Evaluated) -> Result<(PairOutcome, MappingStatus)> {
        let source = evaluated.pair.working.source_path.as_path();
        let target = evaluated.pair.working.target_path.as_path();

        let outcome = match evaluated.decision {
            SyncDecision::CreateTarget => {
                self.push(source, target)?;
                info!("Created {}", target.display());
                PairOutcome::Created(Direction::SourceToTarget)
            }
            SyncDecision::PushSourceToTarget => {
                self.push(source, target)?;
                info!("Updated {} from source", target.display());
                PairOutcome::Updated(Direction::SourceToTarget)
            }
            SyncDecision::CreateSource => {
                self.push(target, source)?;
                info!("Restored {} from collection", source.display());
                PairOutcome::Created(Direction::TargetToSource)
            }
            SyncDecision::PushTargetToSource => {
                self.push(target, source)?;
                info!("Updated {} from collection", source.display());
                PairOutcome::Updated(Direction::TargetToSource)
            }
            SyncDecision::ForkConflict { then } => {
                let stamp = FileOperationExecutor::stamp(Local::now());
                let losing = if then == Some(Direction::TargetToSource) {
                    source
                } else {
                    target
                };
                let copy = FileOperationExecutor::write_conflict_copy(target, losing, &stamp)?;
                self.guard.mark_synced(&copy);
                warn!(
                    "Conflict between {} and {}; {} saved as {}",
                    source.display(),
                    target.display(),
                    losing.display(),
                    copy.display()
                );

                match then {
                    Some(Direction::SourceToTarget) => self.push(source, target)?,
                    Some(Direction::TargetToSource) => self.push(target, source)?,
                    None => {}
                }

                let status = if then.is_some() {
                    MappingStatus::Active
                } else {
                    MappingStatus::Conflict
                };
                let record = ConflictRecord {
                    source: evaluated.source.clone(),
                    target: evaluated.target.clone(),
                    resolution: self.config.conflict_resolution,
                    conflict_copy: copy,
                    pushed: then,
                };
                return Ok((PairOutcome::Conflict(Box::new(record)), status));
            }
            SyncDecision::Skip(reason) => PairOutcome::Skipped(reason),
        };

        Ok((outcome, MappingStatus::Active))
    }

    fn push(&self, from: &Path, to: &Path) -> Result<()> {
        FileOperationExecutor::copy_file(from, to)?;
        self.guard.mark_synced(to);
        Ok(())
    }
}

fn lowercase_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_lowercase())
}

fn pair_report(mapping: &Mapping, decision: Option<SyncDecision>, outcome: PairOutcome) -> PairReport {
    PairReport {
        source_path: mapping.source_path.clone(),
        target_path: mapping.target_path.clone(),
        decision,
        outcome,
    }
}
