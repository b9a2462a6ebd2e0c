//! Message classification and validation for the `/ws/view` stream.
//!
//! The server sends two shapes over one socket and never tags them:
//!
//! - a complete **snapshot**, recognised by the presence of `isComplete`;
//! - a **delta**, carrying `uiResources` and/or `uiButtons`.
//!
//! Each list in a delta is an independent slice: a slice that fails
//! validation is reported and skipped while the rest of the message still
//! applies. Absence of a slice means "unchanged", never "empty".
//! [`decode`] never fails outright; every problem ends up in
//! [`Decoded::rejected`] for the caller to log.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{InitialView, UiButton, UiResource};

/// Field whose presence marks the initial snapshot.
pub const SNAPSHOT_MARKER: &str = "isComplete";
pub const RESOURCES_FIELD: &str = "uiResources";
pub const BUTTONS_FIELD: &str = "uiButtons";

/// Why (part of) a message was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed message: {reason}")]
    Malformed { reason: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// The offending top-level field, when the failure is field-scoped.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { field, .. } => Some(*field),
            Self::Malformed { .. } => None,
        }
    }
}

/// A validated message, ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewMessage {
    Snapshot(Box<InitialView>),
    Delta(ViewDelta),
}

/// The independently-optional slices of a delta message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewDelta {
    pub resources: Option<Vec<UiResource>>,
    pub buttons: Option<Vec<UiButton>>,
}

impl ViewDelta {
    pub fn is_empty(&self) -> bool {
        self.resources.is_none() && self.buttons.is_none()
    }
}

/// Outcome of [`decode`]: whatever validated, plus everything that didn't.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub message: Option<ViewMessage>,
    pub rejected: Vec<ValidationError>,
}

impl Decoded {
    fn malformed(reason: impl Into<String>) -> Self {
        Self {
            message: None,
            rejected: vec![ValidationError::Malformed {
                reason: reason.into(),
            }],
        }
    }
}

/// Classify and validate one raw text frame.
pub fn decode(raw: &str) -> Decoded {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return Decoded::malformed(e.to_string()),
    };
    let Some(object) = value.as_object() else {
        return Decoded::malformed(format!("expected a JSON object, got {}", kind(&value)));
    };

    let mut rejected = Vec::new();

    if object.contains_key(SNAPSHOT_MARKER) {
        match InitialView::deserialize(&value) {
            Ok(view) => {
                return Decoded {
                    message: Some(ViewMessage::Snapshot(Box::new(view))),
                    rejected,
                };
            }
            Err(e) => {
                rejected.push(ValidationError::Invalid {
                    field: "snapshot",
                    reason: e.to_string(),
                });
                // The button list is still an independent slice.
                let delta = ViewDelta {
                    resources: None,
                    buttons: slice(object, BUTTONS_FIELD, &mut rejected),
                };
                return Decoded {
                    message: (!delta.is_empty()).then_some(ViewMessage::Delta(delta)),
                    rejected,
                };
            }
        }
    }

    let delta = ViewDelta {
        resources: slice(object, RESOURCES_FIELD, &mut rejected),
        buttons: slice(object, BUTTONS_FIELD, &mut rejected),
    };

    Decoded {
        message: (!delta.is_empty()).then_some(ViewMessage::Delta(delta)),
        rejected,
    }
}

/// Validate one optional list slice. `None` when absent or rejected.
fn slice<T: DeserializeOwned>(
    object: &Map<String, Value>,
    field: &'static str,
    rejected: &mut Vec<ValidationError>,
) -> Option<Vec<T>> {
    let raw = object.get(field)?;
    match Vec::<T>::deserialize(raw) {
        Ok(items) => Some(items),
        Err(e) => {
            rejected.push(ValidationError::Invalid {
                field,
                reason: e.to_string(),
            });
            None
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
