//! WebSocket transport for the Tilt `/ws/view` stream.
//!
//! Opens a single connection and pumps text frames to a caller-supplied
//! sink until the server closes it, the transport errors, or the caller
//! cancels. Reconnection and state reset belong to the session supervisor
//! in `tiltview-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use tiltview_api::{Endpoint, websocket::ViewSocket};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let socket = ViewSocket::connect(&Endpoint::default().view_url()?).await?;
//! socket.read_until_closed(&cancel, |text| println!("{text}")).await?;
//! ```

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

/// An open `/ws/view` connection.
pub struct ViewSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ViewSocket {
    /// Perform the WebSocket handshake.
    pub async fn connect(url: &Url) -> Result<Self, Error> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");
        Ok(Self { stream })
    }

    /// Read messages until the connection drops, handing every text frame
    /// to `on_text` in arrival order.
    ///
    /// Returns `Ok(())` on a clean close (normal close frame, end of
    /// stream, or cancellation). A close frame with any other code yields
    /// [`Error::WebSocketClosed`]; a transport failure yields
    /// [`Error::WebSocketConnect`].
    pub async fn read_until_closed(
        mut self,
        cancel: &CancellationToken,
        mut on_text: impl FnMut(&str),
    ) -> Result<(), Error> {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    // Best effort; the peer may already be gone.
                    let _ = self.stream.close(None).await;
                    return Ok(());
                }
                frame = self.stream.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => on_text(&text),
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tungstenite handles pong replies automatically
                            tracing::trace!("WebSocket ping");
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            let Some(cf) = frame else {
                                tracing::info!("WebSocket close frame received (no payload)");
                                return Ok(());
                            };
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                            if cf.code == CloseCode::Normal {
                                return Ok(());
                            }
                            return Err(Error::WebSocketClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.to_string(),
                            });
                        }
                        Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Ok(());
                        }
                        _ => {
                            // Binary, Pong, Frame -- ignore
                        }
                    }
                }
            }
        }
    }
}
