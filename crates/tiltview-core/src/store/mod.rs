// ── Reactive session store ──
//
// Lock-free reads through `ArcSwap<SessionView>`; every applied message
// publishes a whole new view with one copy-on-write swap and bumps a
// `watch` version counter. Views are tagged with an epoch so a reset can
// fence off messages still in flight from an older connection.

mod label_index;
mod view;

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, warn};

use tiltview_api::{ResourceVersion, UiResource, ViewMessage, decode};

use crate::stream::Changes;

pub use label_index::{LabelIndex, UNLABELED};
pub use view::SessionView;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// At least one slice merged; carries the new view version.
    Applied(u64),
    /// Nothing in the message was applicable.
    Ignored,
    /// The message belongs to an epoch that has since been reset.
    Stale,
}

/// Central store for the resource view of one Tilt server.
pub struct Store {
    view: Arc<ArcSwap<SessionView>>,
    version: watch::Sender<u64>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            view: Arc::new(ArcSwap::from_pointee(SessionView::empty(0, 0))),
            version,
        }
    }

    // ── Snapshot access ──────────────────────────────────────────────

    /// The currently published view.
    pub fn view(&self) -> Arc<SessionView> {
        self.view.load_full()
    }

    pub fn epoch(&self) -> u64 {
        self.view.load().epoch()
    }

    pub fn version(&self) -> u64 {
        self.view.load().version()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> Changes {
        Changes::new(Arc::clone(&self.view), self.version.subscribe())
    }

    // ── Query facade ─────────────────────────────────────────────────

    pub fn list_labels(&self) -> Vec<String> {
        self.view.load().list_labels()
    }

    pub fn list_resources_for_label(&self, label: &str) -> Vec<Arc<UiResource>> {
        self.view.load().list_resources_for_label(label)
    }

    pub fn get_resource(&self, name: &str) -> Option<Arc<UiResource>> {
        self.view.load().get_resource(name)
    }

    pub fn get_button_version(&self, name: &str) -> Option<ResourceVersion> {
        self.view.load().get_button_version(name)
    }

    pub fn is_initialized(&self) -> bool {
        self.view.load().is_initialized()
    }

    pub fn manifests(&self) -> Vec<String> {
        self.view.load().manifests().to_vec()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Decode one raw frame and merge whatever validated, on behalf of a
    /// connection opened during `epoch`. Rejected slices are logged and
    /// dropped.
    pub fn apply_raw(&self, epoch: u64, raw: &str) -> ApplyOutcome {
        let decoded = decode(raw);
        for rejection in &decoded.rejected {
            warn!(
                field = rejection.field().unwrap_or("message"),
                error = %rejection,
                "rejected view update"
            );
        }
        match decoded.message {
            Some(message) => self.apply(epoch, &message),
            None => ApplyOutcome::Ignored,
        }
    }

    /// Merge a validated message into the view for the current epoch.
    pub fn ingest(&self, raw: &str) -> ApplyOutcome {
        self.apply_raw(self.epoch(), raw)
    }

    /// Merge one validated message as a single atomic swap.
    pub fn apply(&self, epoch: u64, message: &ViewMessage) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Ignored;
        self.view.rcu(|current| {
            if current.epoch() != epoch {
                outcome = ApplyOutcome::Stale;
                return Arc::clone(current);
            }
            let mut next = SessionView::clone(current);
            if !next.apply(message) {
                outcome = ApplyOutcome::Ignored;
                return Arc::clone(current);
            }
            let version = current.version() + 1;
            next.set_version(version);
            outcome = ApplyOutcome::Applied(version);
            Arc::new(next)
        });

        match outcome {
            ApplyOutcome::Applied(version) => self.notify(version),
            ApplyOutcome::Stale => debug!(epoch, "dropped message from a previous session"),
            ApplyOutcome::Ignored => {}
        }
        outcome
    }

    /// Discard all session state in one swap and start a new epoch.
    /// Returns the new epoch.
    pub fn reset(&self) -> u64 {
        let mut published = (0, 0);
        self.view.rcu(|current| {
            let epoch = current.epoch() + 1;
            let version = current.version() + 1;
            published = (epoch, version);
            SessionView::empty(epoch, version)
        });

        let (epoch, version) = published;
        self.notify(version);
        debug!(epoch, "store reset");
        epoch
    }

    fn notify(&self, version: u64) {
        // Concurrent writers may finish out of order; keep the counter monotonic.
        self.version.send_if_modified(|current| {
            if version > *current {
                *current = version;
                true
            } else {
                false
            }
        });
    }
}
