// tiltview-core: Session lifecycle and reactive view state between tiltview-api and consumers (CLI).

pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ServerConfig;
pub use error::CoreError;
pub use session::{ConnectionState, Session, SessionPhase, toggle_button_name};
pub use store::{ApplyOutcome, LabelIndex, SessionView, Store, UNLABELED};
pub use stream::{Changes, ViewStream};

// Wire types consumers need to read a view.
pub use tiltview_api::{DisableState, Endpoint, ResourceVersion, RuntimeStatus, UiButton, UiResource, UpdateStatus};
