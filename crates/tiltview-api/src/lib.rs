// tiltview-api: wire layer for the Tilt server (view stream + actions)

pub mod client;
pub mod datetime;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod requests;
pub mod schema;
pub mod websocket;

pub use client::TiltClient;
pub use endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};
pub use error::Error;
pub use models::{DisableState, ResourceVersion, RuntimeStatus, UiButton, UiResource, UpdateStatus};
pub use schema::{Decoded, ValidationError, ViewDelta, ViewMessage, decode};
pub use websocket::ViewSocket;
