// Tilt view-stream models
//
// Typed mirrors of the `v1alpha1` UI objects the Tilt server pushes over
// `/ws/view`. Only fields the view needs are modelled; everything else the
// server sends is ignored. Required fields fail closed, so a message that
// omits one is rejected as a whole slice rather than half-applied.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

// ── Resource ─────────────────────────────────────────────────────────

/// A named build/deploy unit (`UIResource`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiResource {
    pub metadata: ResourceMetadata,
    pub status: ResourceStatus,
}

impl UiResource {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Label names in the order the server listed them.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .labels
            .iter()
            .flat_map(IndexMap::keys)
            .map(String::as_str)
    }

    /// `true` when the resource carries no labels at all.
    pub fn is_unlabeled(&self) -> bool {
        self.metadata.labels.as_ref().is_none_or(IndexMap::is_empty)
    }

    pub fn disable_state(&self) -> Option<DisableState> {
        self.status.disable_status.as_ref().map(|d| d.state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub name: String,
    pub uid: String,
    pub resource_version: String,
    pub creation_timestamp: DateTime<Utc>,
    /// Label keys are the grouping tags; values are not used for grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_history: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deploy_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_mode: Option<TriggerMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_build_since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_pending_changes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_resource_info: Option<LocalResourceInfo>,
    pub runtime_status: RuntimeStatus,
    pub update_status: UpdateStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<TargetSpec>,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_status: Option<DisableStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuntimeStatus {
    Ok,
    Pending,
    Error,
    NotApplicable,
    Unknown,
    None,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateStatus {
    Ok,
    Pending,
    Error,
    NotApplicable,
    Unknown,
    None,
    InProgress,
}

/// How a resource reacts to file changes. Sent as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(try_from = "u8", into = "u8")]
pub enum TriggerMode {
    Auto,
    ManualWithAutoInit,
    Manual,
    AutoWithManualInit,
}

impl TryFrom<u8> for TriggerMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Auto),
            1 => Ok(Self::ManualWithAutoInit),
            2 => Ok(Self::Manual),
            3 => Ok(Self::AutoWithManualInit),
            other => Err(format!("unknown trigger mode {other}")),
        }
    }
}

impl From<TriggerMode> for u8 {
    fn from(mode: TriggerMode) -> Self {
        match mode {
            TriggerMode::Auto => 0,
            TriggerMode::ManualWithAutoInit => 1,
            TriggerMode::Manual => 2,
            TriggerMode::AutoWithManualInit => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Unspecified,
    Image,
    K8s,
    DockerCompose,
    Local,
}

// ── Disable status ───────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
pub enum DisableState {
    Enabled,
    Disabled,
}

/// Whether a resource is enabled, plus where that decision is stored.
///
/// The server reports exactly one of `enabledCount` / `disabledCount`;
/// a payload with both or neither is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDisableStatus", into = "RawDisableStatus")]
pub struct DisableStatus {
    pub state: DisableState,
    pub sources: Vec<DisableSource>,
    pub count: DisableCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableCount {
    Enabled(u32),
    Disabled(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableSource {
    pub config_map: ConfigMapSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapSource {
    pub name: String,
    pub key: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDisableStatus {
    state: DisableState,
    #[serde(default)]
    sources: Vec<DisableSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled_count: Option<u32>,
}

impl TryFrom<RawDisableStatus> for DisableStatus {
    type Error = String;

    fn try_from(raw: RawDisableStatus) -> Result<Self, Self::Error> {
        let count = match (raw.enabled_count, raw.disabled_count) {
            (Some(n), None) => DisableCount::Enabled(n),
            (None, Some(n)) => DisableCount::Disabled(n),
            (Some(_), Some(_)) => {
                return Err("disableStatus carries both enabledCount and disabledCount".into());
            }
            (None, None) => {
                return Err("disableStatus carries neither enabledCount nor disabledCount".into());
            }
        };
        Ok(Self {
            state: raw.state,
            sources: raw.sources,
            count,
        })
    }
}

impl From<DisableStatus> for RawDisableStatus {
    fn from(status: DisableStatus) -> Self {
        let (enabled_count, disabled_count) = match status.count {
            DisableCount::Enabled(n) => (Some(n), None),
            DisableCount::Disabled(n) => (None, Some(n)),
        };
        Self {
            state: status.state,
            sources: status.sources,
            enabled_count,
            disabled_count,
        }
    }
}

// ── Conditions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    UpToDate(ConditionDetail<UpToDateReason>),
    Ready(ConditionDetail<ReadyReason>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct ConditionDetail<R> {
    /// Sent as `"True"` / `"False"`; plain booleans are accepted too.
    #[serde(deserialize_with = "condition_status")]
    pub status: bool,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<R>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpToDateReason {
    Disabled,
    UpdateError,
    UpdatePending,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyReason {
    Disabled,
    RuntimeError,
    UpdateError,
    RuntimePending,
    UpdatePending,
    Unknown,
}

fn condition_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(text) => match text.as_str() {
            "True" => Ok(true),
            "False" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"True\" or \"False\", got {other:?}"
            ))),
        },
    }
}

// ── Button ───────────────────────────────────────────────────────────

/// A server-tracked triggerable action (`UIButton`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiButton {
    pub metadata: ButtonMetadata,
    pub spec: ButtonSpec,
}

impl UiButton {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonMetadata {
    pub name: String,
    pub resource_version: ResourceVersion,
}

/// Opaque optimistic-concurrency token assigned by the API server.
///
/// Tilt only ever issues decimal digits; anything else is rejected at
/// parse time so a bogus token can never reach a write request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value))
        } else {
            Err(format!("resourceVersion must be numeric, got {value:?}"))
        }
    }
}

impl From<ResourceVersion> for String {
    fn from(version: ResourceVersion) -> Self {
        version.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSpec {
    pub location: ButtonLocation,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_confirmation: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ButtonInputSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonLocation {
    #[serde(rename = "componentID")]
    pub component_id: String,
    pub component_type: ComponentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    Resource,
    Global,
}

/// An input declared on a button spec. Only hidden inputs are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonInputSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<HiddenInputSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenInputSpec {
    pub value: String,
}

// ── Initial view ─────────────────────────────────────────────────────

/// The complete-state message that opens every `/ws/view` session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialView {
    pub is_complete: bool,
    pub log_list: LogList,
    #[serde(default)]
    pub ui_resources: Vec<UiResource>,
    pub ui_buttons: Vec<UiButton>,
}

impl InitialView {
    /// Distinct manifest names referenced by log spans, first-seen order.
    pub fn manifest_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for span in self.log_list.spans.values() {
            if let Some(name) = span.manifest_name.as_deref().filter(|n| !n.is_empty()) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_owned());
                }
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogList {
    #[serde(default)]
    pub segments: Vec<LogSegment>,
    #[serde(default)]
    pub spans: IndexMap<String, Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    pub level: LogLevel,
    pub text: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

// ── Tests ────────────────────────────────────────────────────────────
