// Tilt HTTP action client
//
// Wraps `reqwest::Client` for the two write endpoints the view fires:
// resource triggers and UIButton clicks. Responses never carry state the
// view needs; success is a 2xx and anything else becomes `Error::Rejected`
// with whatever body the server sent.

use tracing::debug;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::requests::{ButtonStatusUpdate, TriggerRequest};

const TRIGGER_PATH: &str = "api/trigger";
const UIBUTTONS_PATH: &str = "proxy/apis/tilt.dev/v1alpha1/uibuttons";

/// HTTP client for Tilt's action endpoints.
#[derive(Debug, Clone)]
pub struct TiltClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl TiltClient {
    /// Build a client with the transport's default timeouts.
    pub fn new(endpoint: Endpoint) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tiltview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoint: Endpoint) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// `POST /api/trigger`: ask Tilt to rebuild one resource.
    pub async fn trigger(&self, request: &TriggerRequest) -> Result<(), Error> {
        let url = self.endpoint.http_url(TRIGGER_PATH)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).json(request).send().await?;
        check_status(resp).await
    }

    /// `PUT /proxy/apis/tilt.dev/v1alpha1/uibuttons/{name}/status`:
    /// record a button click.
    pub async fn update_button_status(&self, update: &ButtonStatusUpdate) -> Result<(), Error> {
        let url = self.button_status_url(&update.metadata.name)?;
        debug!("PUT {}", url);

        let resp = self.http.put(url).json(update).send().await?;
        check_status(resp).await
    }

    fn button_status_url(&self, button_name: &str) -> Result<Url, Error> {
        let mut url = self.endpoint.http_url(UIBUTTONS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(button_name)
            .push("status");
        Ok(url)
    }
}

/// Map a non-2xx response to [`Error::Rejected`], keeping the body when
/// it can be read.
async fn check_status(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }

    let body = resp.text().await.ok().and_then(|text| {
        if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
        }
    });

    Err(Error::Rejected {
        status: status.as_u16(),
        body,
    })
}
