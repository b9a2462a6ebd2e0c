// ── Session view ──
//
// One immutable, internally consistent picture of everything the current
// session has learned: resources, the label index, buttons and manifests.
// The store publishes a fresh `SessionView` per applied message; readers
// hold an `Arc` and never see a half-merged state.

use std::sync::Arc;

use indexmap::IndexMap;
use tiltview_api::models::InitialView;
use tiltview_api::{ResourceVersion, UiButton, UiResource, ViewDelta, ViewMessage};

use super::label_index::LabelIndex;

#[derive(Debug, Clone)]
pub struct SessionView {
    epoch: u64,
    version: u64,
    initialized: bool,
    resources: IndexMap<String, Arc<UiResource>>,
    labels: LabelIndex,
    buttons: IndexMap<String, Arc<UiButton>>,
    manifests: Vec<String>,
}

impl SessionView {
    pub(crate) fn empty(epoch: u64, version: u64) -> Self {
        Self {
            epoch,
            version,
            initialized: false,
            resources: IndexMap::new(),
            labels: LabelIndex::new(),
            buttons: IndexMap::new(),
            manifests: Vec::new(),
        }
    }

    // ── Structural queries ───────────────────────────────────────────

    /// Labels that currently hold at least one resource, in first-seen
    /// order. Empty until the initial snapshot has been applied.
    pub fn list_labels(&self) -> Vec<String> {
        if !self.initialized {
            return Vec::new();
        }
        self.labels.labels().map(str::to_owned).collect()
    }

    /// Resources filed under `label`. Empty for unknown labels and before
    /// the initial snapshot.
    pub fn list_resources_for_label(&self, label: &str) -> Vec<Arc<UiResource>> {
        if !self.initialized {
            return Vec::new();
        }
        self.labels
            .members(label)
            .filter_map(|name| self.resources.get(name).cloned())
            .collect()
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get_resource(&self, name: &str) -> Option<Arc<UiResource>> {
        self.resources.get(name).cloned()
    }

    pub fn get_button(&self, name: &str) -> Option<Arc<UiButton>> {
        self.buttons.get(name).cloned()
    }

    /// The optimistic-concurrency token to send with a click on `name`.
    pub fn get_button_version(&self, name: &str) -> Option<ResourceVersion> {
        self.buttons
            .get(name)
            .map(|button| button.metadata.resource_version.clone())
    }

    /// All known resources in arrival order.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<UiResource>> {
        self.resources.values()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Arc<UiButton>> {
        self.buttons.values()
    }

    pub fn label_index(&self) -> &LabelIndex {
        &self.labels
    }

    /// Manifest names seen in the snapshot's log spans. Advisory only.
    pub fn manifests(&self) -> &[String] {
        &self.manifests
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Monotonic counter, bumped once per published view.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    // ── Merging ──────────────────────────────────────────────────────

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Merge one validated message. Returns whether any slice was applied.
    pub(crate) fn apply(&mut self, message: &ViewMessage) -> bool {
        match message {
            ViewMessage::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            ViewMessage::Delta(delta) => self.apply_delta(delta),
        }
    }

    fn apply_snapshot(&mut self, snapshot: &InitialView) {
        self.manifests = snapshot.manifest_names();
        self.ingest_resources(&snapshot.ui_resources);
        self.ingest_buttons(&snapshot.ui_buttons);
        self.initialized = true;
    }

    fn apply_delta(&mut self, delta: &ViewDelta) -> bool {
        let mut applied = false;
        if let Some(resources) = &delta.resources {
            self.ingest_resources(resources);
            applied = true;
        }
        if let Some(buttons) = &delta.buttons {
            self.ingest_buttons(buttons);
            applied = true;
        }
        applied
    }

    fn ingest_resources(&mut self, resources: &[UiResource]) {
        for resource in resources {
            let name = resource.name().to_owned();
            self.labels.assign(&name, resource.label_names());
            self.resources.insert(name, Arc::new(resource.clone()));
        }
    }

    fn ingest_buttons(&mut self, buttons: &[UiButton]) {
        for button in buttons {
            self.buttons
                .insert(button.name().to_owned(), Arc::new(button.clone()));
        }
    }
}
