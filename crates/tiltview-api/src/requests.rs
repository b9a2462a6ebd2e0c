// Outbound request bodies
//
// Payloads for the two write endpoints the view uses. Field names follow
// the server exactly: the trigger endpoint is snake_case, the UIButton
// status subresource is camelCase.

use serde::{Deserialize, Serialize};

use crate::datetime::{self, DatetimeInput, FormatError};
use crate::models::{DisableState, ResourceVersion};

/// `BuildReasonFlagTriggerWeb`: the build was requested from the web UI.
pub const BUILD_REASON_TRIGGER_WEB: u32 = 16;

/// Name of the hidden input carried by enable/disable toggle buttons.
pub const TOGGLE_INPUT_NAME: &str = "action";

/// Body of `POST /api/trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// The endpoint accepts a list but the view only ever sends one name.
    pub manifest_names: [String; 1],
    pub build_reason: u32,
}

impl TriggerRequest {
    pub fn for_manifest(name: impl Into<String>) -> Self {
        Self {
            manifest_names: [name.into()],
            build_reason: BUILD_REASON_TRIGGER_WEB,
        }
    }
}

/// Body of `PUT /proxy/apis/tilt.dev/v1alpha1/uibuttons/{name}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStatusUpdate {
    pub metadata: ButtonRef,
    pub status: ButtonClick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonRef {
    pub resource_version: ResourceVersion,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonClick {
    /// ISO-8601 with microsecond precision.
    pub last_clicked_at: String,
    pub inputs: Vec<ButtonInputValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonInputValue {
    pub name: String,
    pub hidden: HiddenValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenValue {
    pub value: ToggleValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToggleValue {
    On,
    Off,
}

impl ToggleValue {
    /// The value the toggle button expects given the resource's *current*
    /// state: `on` while enabled (click disables), `off` while disabled
    /// (click enables).
    pub fn for_current_state(state: DisableState) -> Self {
        match state {
            DisableState::Enabled => Self::On,
            DisableState::Disabled => Self::Off,
        }
    }
}

impl ButtonStatusUpdate {
    /// Build the click payload for an enable/disable toggle button.
    pub fn toggle<'a>(
        button_name: impl Into<String>,
        resource_version: ResourceVersion,
        current: DisableState,
        clicked_at: impl Into<DatetimeInput<'a>>,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            metadata: ButtonRef {
                resource_version,
                name: button_name.into(),
            },
            status: ButtonClick {
                last_clicked_at: datetime::with_microseconds(clicked_at)?,
                inputs: vec![ButtonInputValue {
                    name: TOGGLE_INPUT_NAME.to_owned(),
                    hidden: HiddenValue {
                        value: ToggleValue::for_current_state(current),
                    },
                }],
            },
        })
    }
}
