//! The label tree: labels at the top level, their resources beneath.
//!
//! Built from one `SessionView`, so a render never mixes two versions.

use owo_colors::OwoColorize;
use serde::Serialize;

use tiltview_core::{DisableState, RuntimeStatus, SessionView, UiResource};

/// Icon shown next to a resource, derived from its runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Passed,
    Failed,
    Queued,
}

impl StatusIcon {
    /// `None` for statuses that carry no icon.
    pub fn for_runtime(status: RuntimeStatus) -> Option<Self> {
        match status {
            RuntimeStatus::Ok => Some(Self::Passed),
            RuntimeStatus::Error => Some(Self::Failed),
            RuntimeStatus::Pending => Some(Self::Queued),
            RuntimeStatus::NotApplicable | RuntimeStatus::Unknown | RuntimeStatus::None => None,
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            Self::Passed => "✔",
            Self::Failed => "✘",
            Self::Queued => "◷",
        }
    }

    fn paint(self, color: bool) -> String {
        if !color {
            return self.glyph().to_owned();
        }
        match self {
            Self::Passed => self.glyph().green().to_string(),
            Self::Failed => self.glyph().red().to_string(),
            Self::Queued => self.glyph().yellow().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub resources: Vec<ResourceNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    pub name: String,
    pub runtime_status: RuntimeStatus,
    pub icon: Option<StatusIcon>,
    pub disabled: bool,
}

impl From<&UiResource> for ResourceNode {
    fn from(resource: &UiResource) -> Self {
        let runtime_status = resource.status.runtime_status;
        Self {
            name: resource.name().to_owned(),
            runtime_status,
            icon: StatusIcon::for_runtime(runtime_status),
            disabled: resource.disable_state() == Some(DisableState::Disabled),
        }
    }
}

/// Build the tree. Empty until the initial snapshot has arrived.
pub fn render_tree(view: &SessionView) -> Vec<TreeNode> {
    view.list_labels()
        .into_iter()
        .map(|label| {
            let resources = view
                .list_resources_for_label(&label)
                .iter()
                .map(|r| ResourceNode::from(r.as_ref()))
                .collect();
            TreeNode { label, resources }
        })
        .collect()
}

/// Draw the tree with box-drawing connectors.
pub fn format_tree(nodes: &[TreeNode], color: bool) -> String {
    let mut lines = Vec::new();
    for node in nodes {
        if color {
            lines.push(node.label.bold().to_string());
        } else {
            lines.push(node.label.clone());
        }

        let last = node.resources.len().saturating_sub(1);
        for (i, resource) in node.resources.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            let icon = resource.icon.map_or_else(|| " ".to_owned(), |icon| icon.paint(color));
            let mut line = format!("{branch} {icon} {}", resource.name);
            if resource.disabled {
                if color {
                    line.push_str(&format!(" {}", "(disabled)".dimmed()));
                } else {
                    line.push_str(" (disabled)");
                }
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}
