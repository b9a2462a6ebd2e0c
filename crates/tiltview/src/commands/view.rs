//! Read-only commands over one session snapshot: labels, resources, get.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use tiltview_core::{SessionView, UNLABELED, UiResource};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LabelSummary {
    label: String,
    resources: usize,
}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Resources")]
    resources: usize,
}

impl From<&LabelSummary> for LabelRow {
    fn from(s: &LabelSummary) -> Self {
        Self {
            label: s.label.clone(),
            resources: s.resources,
        }
    }
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Runtime")]
    runtime: String,
    #[tabled(rename = "Update")]
    update: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Arc<UiResource>> for ResourceRow {
    fn from(r: &Arc<UiResource>) -> Self {
        Self {
            name: r.name().to_owned(),
            labels: label_list(r),
            runtime: r.status.runtime_status.to_string(),
            update: r.status.update_status.to_string(),
            enabled: r
                .disable_state()
                .map_or_else(|| "-".into(), |state| state.to_string()),
        }
    }
}

fn label_list(r: &UiResource) -> String {
    if r.is_unlabeled() {
        return UNLABELED.to_owned();
    }
    r.label_names().collect::<Vec<_>>().join(", ")
}

fn detail(r: &Arc<UiResource>) -> String {
    let status = &r.status;
    let mut pairs = vec![
        ("Name", r.name().to_owned()),
        ("UID", r.metadata.uid.clone()),
        ("Labels", label_list(r)),
        ("Runtime", status.runtime_status.to_string()),
        ("Update", status.update_status.to_string()),
        ("Order", status.order.to_string()),
        ("Created", r.metadata.creation_timestamp.to_string()),
    ];
    if let Some(state) = r.disable_state() {
        pairs.push(("Enabled", state.to_string()));
    }
    if let Some(mode) = status.trigger_mode {
        pairs.push(("Trigger mode", mode.to_string()));
    }
    if let Some(deployed) = status.last_deploy_time {
        pairs.push(("Last deploy", deployed.to_string()));
    }
    if status.has_pending_changes == Some(true) {
        pairs.push(("Pending changes", "yes".into()));
    }
    output::detail_lines(&pairs)
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn labels(view: &SessionView, global: &GlobalOpts) -> Result<(), CliError> {
    let summaries: Vec<LabelSummary> = view
        .list_labels()
        .into_iter()
        .map(|label| LabelSummary {
            resources: view.list_resources_for_label(&label).len(),
            label,
        })
        .collect();

    let out = output::render_list(global.output, &summaries, |s| LabelRow::from(s), |s| {
        s.label.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// All resources in arrival order, or the members of one label.
pub fn resources(view: &SessionView, label: Option<&str>, global: &GlobalOpts) -> Result<(), CliError> {
    let list: Vec<Arc<UiResource>> = match label {
        Some(label) => view.list_resources_for_label(label),
        None => view.resources().cloned().collect(),
    };

    let out = output::render_list(global.output, &list, |r| ResourceRow::from(r), |r| {
        r.name().to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn get(view: &SessionView, name: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let resource = view.get_resource(name).ok_or_else(|| CliError::NotFound {
        name: name.to_owned(),
    })?;

    let out = output::render_single(global.output, &resource, detail, |r| r.name().to_owned())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tiltview_core::Store;

    use super::*;

    fn store() -> Store {
        let store = Store::new();
        store.ingest(
            &json!({
                "isComplete": true,
                "logList": { "segments": [], "spans": {} },
                "uiResources": [{
                    "metadata": {
                        "name": "api",
                        "uid": "uid-api",
                        "resourceVersion": "1",
                        "creationTimestamp": "2024-06-15T10:30:00Z",
                        "labels": { "backend": "backend", "go": "go" },
                    },
                    "status": {
                        "runtimeStatus": "error",
                        "updateStatus": "ok",
                        "order": 2,
                        "disableStatus": { "state": "Enabled", "sources": [], "enabledCount": 1 },
                    }
                }],
                "uiButtons": [],
            })
            .to_string(),
        );
        store
    }

    #[test]
    fn resource_row_summarises_status() {
        let resource = store().get_resource("api").unwrap();
        let row = ResourceRow::from(&resource);

        assert_eq!(row.labels, "backend, go");
        assert_eq!(row.runtime, "error");
        assert_eq!(row.enabled, "Enabled");
    }

    #[test]
    fn detail_includes_enable_state() {
        let resource = store().get_resource("api").unwrap();
        let text = detail(&resource);

        assert!(text.contains("uid-api"));
        assert!(text.lines().any(|l| l.starts_with("Enabled") && l.ends_with("Enabled")));
    }
}
