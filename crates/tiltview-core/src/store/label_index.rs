// ── Label → resource index ──
//
// Derived grouping of resource names by label. Rebuilt per resource on
// every ingest, so a resource always sits in exactly the buckets its
// current label set names (or only in `unlabeled`).

use indexmap::{IndexMap, IndexSet};

/// Bucket for resources that carry no labels.
pub const UNLABELED: &str = "unlabeled";

/// Ordered mapping of label name to the resource names carrying it.
///
/// Bucket order is first-seen order for the session, with `unlabeled`
/// always seeded first. Buckets that empty out keep their slot so a
/// label that comes back reappears where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex {
    buckets: IndexMap<String, IndexSet<String>>,
}

impl Default for LabelIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelIndex {
    pub fn new() -> Self {
        let mut buckets = IndexMap::new();
        buckets.insert(UNLABELED.to_owned(), IndexSet::new());
        Self { buckets }
    }

    /// Place `resource` in exactly the buckets for `labels`, or in
    /// `unlabeled` when `labels` is empty. Memberships it no longer has
    /// are dropped.
    pub fn assign<'a>(&mut self, resource: &str, labels: impl IntoIterator<Item = &'a str>) {
        let mut wanted: Vec<&str> = labels.into_iter().collect();
        if wanted.is_empty() {
            wanted.push(UNLABELED);
        }

        for (label, members) in &mut self.buckets {
            if !wanted.contains(&label.as_str()) {
                members.shift_remove(resource);
            }
        }

        for label in wanted {
            self.buckets
                .entry(label.to_owned())
                .or_default()
                .insert(resource.to_owned());
        }
    }

    /// Non-empty labels in bucket order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(label, _)| label.as_str())
    }

    /// Resource names under `label`, in the order they were first filed.
    pub fn members(&self, label: &str) -> impl Iterator<Item = &str> {
        self.buckets
            .get(label)
            .into_iter()
            .flat_map(|members| members.iter().map(String::as_str))
    }

    /// Every label whose bucket currently holds `resource`.
    pub fn buckets_of(&self, resource: &str) -> Vec<&str> {
        self.buckets
            .iter()
            .filter(|(_, members)| members.contains(resource))
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(IndexSet::is_empty)
    }
}
