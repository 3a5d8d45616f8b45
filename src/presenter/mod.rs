//! Keeps a presentation surface in sync with the version-control backend and
//! relays user intents back to it.

pub mod projection;
pub mod surface;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ai::AiGateway;
use crate::commit::{CommitMessageOrchestrator, Generation};
use crate::error::{PresenterError, VcsError};
use crate::vcs::{ChangeSet, CommitReport, VcsGateway};

pub use projection::{FileEntry, FileId, Projection};
pub use surface::{Notice, NoticeLevel, PresentationSurface, TerminalSurface, render};

/// The most recently published snapshot and the refresh that produced it.
struct Published {
    ticket: u64,
    change_set: Arc<ChangeSet>,
    projection: Arc<Projection>,
}

/// Owns the current [`ChangeSet`] and mirrors it to a [`PresentationSurface`].
///
/// The projection is only ever replaced after a backend read; mutations are
/// delegated and the resulting change notification drives the next refresh.
pub struct SyncPresenter {
    vcs: Arc<dyn VcsGateway>,
    orchestrator: CommitMessageOrchestrator,
    surface: Arc<dyn PresentationSurface>,
    roots: Vec<PathBuf>,
    next_ticket: AtomicU64,
    published: Mutex<Published>,
    projection_tx: watch::Sender<Arc<Projection>>,
    generating: tokio::sync::Mutex<()>,
    wake: Arc<Notify>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncPresenter {
    pub fn new(
        vcs: Arc<dyn VcsGateway>,
        ai: Arc<dyn AiGateway>,
        surface: Arc<dyn PresentationSurface>,
    ) -> Self {
        let projection = Arc::new(Projection::default());
        let (projection_tx, _) = watch::channel(Arc::clone(&projection));

        Self {
            orchestrator: CommitMessageOrchestrator::new(Arc::clone(&vcs), ai),
            vcs,
            surface,
            roots: Vec::new(),
            next_ticket: AtomicU64::new(0),
            published: Mutex::new(Published {
                ticket: 0,
                change_set: Arc::new(ChangeSet::default()),
                projection,
            }),
            projection_tx,
            generating: tokio::sync::Mutex::new(()),
            wake: Arc::new(Notify::new()),
            refresh_task: Mutex::new(None),
        }
    }

    /// Show paths relative to these workspace roots.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Subscribe to backend changes and start refreshing in the background.
    ///
    /// The observer only wakes the refresh task, so a burst of notifications
    /// collapses into as few refreshes as possible and each refresh reads the
    /// backend as it is when it runs. An initial refresh is scheduled
    /// immediately.
    pub fn attach(self) -> Arc<Self> {
        let presenter = Arc::new(self);

        let wake = Arc::clone(&presenter.wake);
        presenter
            .vcs
            .on_change(Arc::new(move || wake.notify_one()));

        let weak: Weak<Self> = Arc::downgrade(&presenter);
        let wake = Arc::clone(&presenter.wake);
        let handle = tokio::spawn(async move {
            loop {
                wake.notified().await;
                let Some(presenter) = weak.upgrade() else {
                    return;
                };
                presenter.refresh().await;
            }
        });
        *lock(&presenter.refresh_task) = Some(handle);

        presenter.wake.notify_one();
        presenter
    }

    /// Re-read the backend and publish a new projection.
    ///
    /// Overlapping calls are ordered by when they started: a refresh whose
    /// read finishes after a later one has already published is dropped, so
    /// the surface only ever moves forward and each projection comes from a
    /// single read. Returns the projection that is current afterwards.
    pub async fn refresh(&self) -> Arc<Projection> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let change_set = ChangeSet::read(self.vcs.as_ref()).await;
        let projection = Arc::new(Projection::build(&change_set, &self.roots));

        let mut published = lock(&self.published);
        if ticket < published.ticket {
            debug!(
                "Dropping stale refresh {} (already at {})",
                ticket, published.ticket
            );
            return Arc::clone(&published.projection);
        }

        debug!(
            "Publishing refresh {}: {} staged, {} unstaged",
            ticket,
            projection.staged_count(),
            projection.unstaged_count()
        );

        *published = Published {
            ticket,
            change_set: Arc::new(change_set),
            projection: Arc::clone(&projection),
        };
        self.projection_tx.send_replace(Arc::clone(&projection));
        self.surface.publish(&projection);

        projection
    }

    /// The last published projection.
    pub fn projection(&self) -> Arc<Projection> {
        Arc::clone(&lock(&self.published).projection)
    }

    /// The snapshot behind the last published projection.
    pub fn change_set(&self) -> Arc<ChangeSet> {
        Arc::clone(&lock(&self.published).change_set)
    }

    /// Receive every projection as it is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Projection>> {
        self.projection_tx.subscribe()
    }

    pub async fn request_stage(&self, id: &str) -> Result<(), PresenterError> {
        let id = FileId::parse(id)?;
        let result = self.vcs.stage(id.path()).await;
        self.relay(result)
    }

    pub async fn request_unstage(&self, id: &str) -> Result<(), PresenterError> {
        let id = FileId::parse(id)?;
        let result = self.vcs.unstage(id.path()).await;
        self.relay(result)
    }

    pub async fn request_discard(&self, id: &str) -> Result<(), PresenterError> {
        let id = FileId::parse(id)?;
        let result = self.vcs.discard(id.path()).await;
        self.relay(result)
    }

    pub async fn request_stage_all(&self) -> Result<(), PresenterError> {
        let result = self.vcs.stage_all().await;
        self.relay(result)
    }

    pub async fn request_unstage_all(&self) -> Result<(), PresenterError> {
        let result = self.vcs.unstage_all().await;
        self.relay(result)
    }

    pub async fn request_discard_all(&self) -> Result<(), PresenterError> {
        let result = self.vcs.discard_all().await;
        self.relay(result)
    }

    /// Generate a commit message from the staged diff.
    ///
    /// Only one generation runs at a time; a second request while one is in
    /// flight fails with [`PresenterError::GenerationInFlight`].
    pub async fn request_generate(&self) -> Result<Generation, PresenterError> {
        let Ok(_guard) = self.generating.try_lock() else {
            self.surface
                .notify(Notice::warning(PresenterError::GenerationInFlight.to_string()));
            return Err(PresenterError::GenerationInFlight);
        };

        match self.orchestrator.generate().await {
            Ok(Generation::Message(message)) => {
                self.surface.set_message(message.as_str());
                Ok(Generation::Message(message))
            }
            Ok(guidance) => {
                self.surface.notify(Notice::info(guidance.text()));
                Ok(guidance)
            }
            Err(e) => {
                self.surface.notify(Notice::error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Commit the staged changes with `message`.
    pub async fn request_commit(&self, message: &str) -> Result<CommitReport, PresenterError> {
        match self.vcs.commit(message).await {
            Ok(report) => {
                self.surface.set_message("");
                let count = report.committed.len();
                self.surface.notify(Notice::info(format!(
                    "Committed in {} {}",
                    count,
                    if count == 1 { "repository" } else { "repositories" }
                )));
                for (root, reason) in &report.failed {
                    self.surface.notify(Notice::warning(format!(
                        "Commit failed in {}: {}",
                        root.display(),
                        reason
                    )));
                }
                Ok(report)
            }
            Err(e @ (VcsError::EmptyMessage | VcsError::NoStagedChanges)) => {
                self.surface.notify(Notice::warning(e.to_string()));
                Err(e.into())
            }
            Err(e) => {
                self.surface.notify(Notice::error(e.to_string()));
                Err(e.into())
            }
        }
    }

    fn relay(&self, result: Result<(), VcsError>) -> Result<(), PresenterError> {
        result.map_err(|e| {
            self.surface.notify(Notice::error(e.to_string()));
            PresenterError::from(e)
        })
    }
}

impl Drop for SyncPresenter {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.refresh_task).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
