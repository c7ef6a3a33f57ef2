use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::attribution::NamespaceAttribution;
use crate::config::PollIntervals;
use crate::container::ContainerID;
use crate::diff::{self, Diff};
use crate::namespace::NamespaceExtractor;
use crate::registry::{Registry, UpsertOutcome};
use crate::runtime::{self, ContainerRuntime};

/// Where the loop currently is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Polling,
    Idle,
    Stopped,
}

/// Cycles a container with unresolved namespaces is retried before it is
/// tracked as is.
const MAX_NAMESPACE_ATTEMPTS: u32 = 5;

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Live and tracked sets had equal size; the diff was deferred to the next cycle.
    ShortCircuit,
    /// The full diff found nothing to do.
    Unchanged,
    /// Containers were registered and/or evicted.
    Changed {
        added: usize,
        removed: usize,
        /// Added ids that could not be registered and will be retried.
        retry: Vec<ContainerID>,
    },
}

impl CycleOutcome {
    pub fn is_idle(&self) -> bool {
        !matches!(self, CycleOutcome::Changed { .. })
    }
}

/// How registering one added container ended.
enum Registration {
    /// Registered, or already registered with namespaces.
    Done,
    /// Nothing registered; the container is looked at again next cycle.
    Failed,
    /// Registered, but both namespace ids are still `0`.
    Unresolved,
}

/// Polling driver keeping the [`Registry`] in line with a container runtime.
///
/// Each cycle lists the live container ids, diffs them against the ids it
/// tracks, registers the added ones and evicts the removed ones. An added id
/// that fails to register is left out of the tracked set so the next cycle
/// reports it as added again. An id registered without namespaces is kept
/// pending: it is retried for a few cycles and evicted like any other
/// container once it disappears.
pub struct Reconciler<R, A> {
    runtime: R,
    registry: Arc<Registry>,
    extractor: NamespaceExtractor,
    attribution: Option<Arc<A>>,
    intervals: PollIntervals,
    tracked: HashSet<ContainerID>,
    /// Registered ids with unresolved namespaces and the attempts made so far.
    pending: HashMap<ContainerID, u32>,
    verify_next: bool,
    state: LoopState,
}

impl<R, A> Reconciler<R, A>
where
    R: ContainerRuntime + Send,
    A: NamespaceAttribution,
{
    /// Creates a loop over `runtime`.
    ///
    /// `attribution` is notified of namespace mappings; pass `None` when
    /// policy enforcement is disabled.
    pub fn new(
        runtime: R,
        registry: Arc<Registry>,
        extractor: NamespaceExtractor,
        attribution: Option<Arc<A>>,
        intervals: PollIntervals,
    ) -> Self {
        Self {
            runtime,
            registry,
            extractor,
            attribution,
            intervals,
            tracked: HashSet::default(),
            pending: HashMap::default(),
            verify_next: false,
            state: LoopState::Starting,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tracked_ids(&self) -> &HashSet<ContainerID> {
        &self.tracked
    }

    /// Registered ids whose namespaces are still being resolved.
    pub fn pending_ids(&self) -> impl Iterator<Item = &ContainerID> {
        self.pending.keys()
    }

    /// Polls until `token` is cancelled or the runtime stops answering.
    ///
    /// Cancellation is observed between cycles; a cycle in flight runs to its
    /// end. Returns the runtime so the caller can release it.
    pub async fn run(mut self, token: CancellationToken) -> R {
        loop {
            if token.is_cancelled() {
                break;
            }

            let pause = match self.poll_once().await {
                Ok(outcome) if outcome.is_idle() => self.intervals.idle,
                Ok(_) => self.intervals.active,
                Err(err) => {
                    log::error!("Stopping container discovery: {err}");
                    break;
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.state = LoopState::Stopped;
        self.runtime
    }

    /// Runs a single poll cycle.
    ///
    /// When live and tracked sets have the same size the diff is skipped, but
    /// the following cycle always diffs in full, so a swap of ids is picked up
    /// one cycle late at most.
    ///
    /// # Errors
    ///
    /// Returns the runtime error if the live containers cannot be listed.
    pub async fn poll_once(&mut self) -> runtime::Result<CycleOutcome> {
        self.state = LoopState::Polling;
        let live = self.runtime.list_container_ids().await?;

        if !self.verify_next
            && self.pending.is_empty()
            && diff::probably_unchanged(&live, &self.tracked)
        {
            self.verify_next = true;
            self.state = LoopState::Idle;
            return Ok(CycleOutcome::ShortCircuit);
        }
        self.verify_next = false;

        let mut diff = Diff::compute(&live, &self.tracked);
        diff.removed.extend(
            self.pending
                .keys()
                .filter(|container_id| !live.contains(*container_id))
                .cloned(),
        );
        if diff.is_empty() {
            self.state = LoopState::Idle;
            return Ok(CycleOutcome::Unchanged);
        }
        log::debug!(
            "Container diff: {} added, {} removed",
            diff.added.len(),
            diff.removed.len()
        );

        let mut retry = Vec::new();
        for container_id in &diff.added {
            match self.register(container_id).await {
                Registration::Done => {
                    self.pending.remove(container_id);
                }
                Registration::Failed => retry.push(container_id.clone()),
                Registration::Unresolved => {
                    if !self.note_unresolved(container_id) {
                        retry.push(container_id.clone());
                    }
                }
            }
        }
        for container_id in &diff.removed {
            self.pending.remove(container_id);
            self.unregister(container_id);
        }

        let mut tracked = live;
        for container_id in &retry {
            tracked.remove(container_id);
        }
        self.tracked = tracked;

        Ok(CycleOutcome::Changed {
            added: diff.added.len(),
            removed: diff.removed.len(),
            retry,
        })
    }

    /// Registers one added container.
    async fn register(&mut self, container_id: &ContainerID) -> Registration {
        let details = match self.runtime.container_details(container_id).await {
            Ok(details) => details,
            Err(err) => {
                log::warn!(
                    "Unable to get container info ({}): {err}",
                    container_id.short()
                );
                return Registration::Failed;
            }
        };

        let pid = details.pid;
        let namespaces = match self.extractor.resolve(pid) {
            Ok(namespaces) => namespaces,
            Err(err) => {
                log::warn!(
                    "Unable to get namespaces ({}, pid={pid}): {err}",
                    container_id.short()
                );
                return Registration::Failed;
            }
        };

        match self.registry.upsert(details.into_container(namespaces)) {
            UpsertOutcome::Rejected => {
                log::debug!("Container {} is already registered", container_id.short());
                return Registration::Done;
            }
            UpsertOutcome::Inserted => {
                log::info!("Detected a container (added/{})", container_id.short());
            }
            UpsertOutcome::Completed => {
                log::debug!("Completed container {}", container_id.short());
            }
        }

        if namespaces.is_unresolved() {
            return Registration::Unresolved;
        }
        if let Some(attribution) = &self.attribution {
            attribution.register(container_id, namespaces);
        }
        Registration::Done
    }

    /// Counts one more unresolved attempt for `container_id`.
    ///
    /// Returns `true` once the attempts are used up and the container is to be
    /// tracked with its namespaces unset.
    fn note_unresolved(&mut self, container_id: &ContainerID) -> bool {
        let attempts = self.pending.entry(container_id.clone()).or_default();
        *attempts += 1;

        if *attempts == 1 {
            log::warn!(
                "Namespaces of container {} unresolved, retrying",
                container_id.short()
            );
        }
        if *attempts < MAX_NAMESPACE_ATTEMPTS {
            return false;
        }

        log::warn!(
            "Giving up on namespaces of container {} after {attempts} attempts",
            container_id.short()
        );
        self.pending.remove(container_id);
        true
    }

    fn unregister(&self, container_id: &ContainerID) {
        let Some(container) = self.registry.evict(container_id) else {
            log::debug!("Container {} was not registered", container_id.short());
            return;
        };

        let mapped = !container.namespaces().is_unresolved();
        if let Some(attribution) = self.attribution.as_ref().filter(|_| mapped) {
            attribution.unregister(container_id);
        }
        log::info!("Detected a container (removed/{})", container_id.short());
    }
}
