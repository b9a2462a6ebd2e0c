// ── Session ──
//
// Full lifecycle for one Tilt server: a supervisor that keeps a single
// `/ws/view` connection alive while the view is visible, the store the
// connection feeds, and the outbound actions (trigger, enable/disable).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tiltview_api::requests::{ButtonStatusUpdate, TriggerRequest};
use tiltview_api::{DisableState, ResourceVersion, TiltClient, UiResource, ViewSocket};

use crate::config::{DEFAULT_HEALTH_CHECK_INTERVAL, ServerConfig};
use crate::error::CoreError;
use crate::store::{SessionView, Store};
use crate::stream::Changes;

/// Suffix Tilt appends to a resource name for its enable/disable button.
pub const DISABLE_BUTTON_SUFFIX: &str = "-disable";

/// Name of the UIButton that toggles `resource` on and off.
pub fn toggle_button_name(resource: &str) -> String {
    format!("{resource}{DISABLE_BUTTON_SUFFIX}")
}

// ── ConnectionState ──────────────────────────────────────────────

/// Transport-level state of the view stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Externally observable session phase: connection state combined with
/// whether the initial snapshot has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    ConnectedUninitialized,
    ConnectedInitialized,
}

// ── Session ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Owns the store, the
/// supervisor task and at most one live connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ServerConfig,
    store: Arc<Store>,
    client: TiltClient,
    connection_state: watch::Sender<ConnectionState>,
    last_error: watch::Sender<Option<String>>,
    visible: AtomicBool,
    connection: Mutex<Option<ActiveConnection>>,
    generation: AtomicU64,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// The connection task currently owned by the session.
struct ActiveConnection {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Session {
    /// Create a new Session. Does NOT connect -- call
    /// [`start()`](Self::start) to spawn the supervisor.
    pub fn new(config: ServerConfig) -> Result<Self, CoreError> {
        let client = TiltClient::new(config.endpoint.clone())?;
        Ok(Self::with_client(config, client))
    }

    /// Create a Session around a pre-built action client.
    pub fn with_client(config: ServerConfig, client: TiltClient) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (last_error, _) = watch::channel(None);
        let visible = AtomicBool::new(config.start_visible);

        Self {
            inner: Arc::new(SessionInner {
                config,
                store: Arc::new(Store::new()),
                client,
                connection_state,
                last_error,
                visible,
                connection: Mutex::new(None),
                generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the supervisor. Its first tick fires immediately, so a
    /// visible session starts connecting right away.
    pub async fn start(&self) {
        if self.is_shut_down() {
            debug!("session shut down; not starting supervisor");
            return;
        }
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("supervisor already running");
            return;
        }

        let mut period = self.inner.config.health_check_interval;
        if period.is_zero() {
            period = DEFAULT_HEALTH_CHECK_INTERVAL;
        }

        let session = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(supervisor_task(session, period, cancel)));
        info!(endpoint = %self.inner.config.endpoint, "session started");
    }

    /// One supervisor tick.
    ///
    /// A connection stuck in `Connecting` with a recorded error is closed
    /// so the following tick can retry. With no live connection and the
    /// view visible, the session is reset and a new attempt opened.
    pub async fn check_health(&self) {
        let mut slot = self.inner.connection.lock().await;
        if self.is_shut_down() {
            return;
        }

        if self.state() == ConnectionState::Connecting && self.last_error().is_some() {
            if let Some(conn) = slot.take() {
                conn.cancel.cancel();
            }
            self.set_state(ConnectionState::Disconnected);
            debug!("closed failed connection attempt");
            return;
        }

        let live = slot.as_ref().is_some_and(|conn| !conn.handle.is_finished());
        if !live && self.is_visible() {
            self.reset_locked(&mut slot);
            self.open_locked(&mut slot);
        }
    }

    /// Close any connection and discard all session state atomically.
    pub async fn reset(&self) {
        let mut slot = self.inner.connection.lock().await;
        if self.is_shut_down() {
            debug!("session shut down; ignoring reset");
            return;
        }
        self.reset_locked(&mut slot);
    }

    /// Reset, then reconnect immediately without waiting for a tick.
    pub async fn resync(&self) {
        let mut slot = self.inner.connection.lock().await;
        if self.is_shut_down() {
            debug!("session shut down; ignoring resync");
            return;
        }
        info!("resyncing with Tilt");
        self.reset_locked(&mut slot);
        self.open_locked(&mut slot);
    }

    /// Visibility hint. While hidden no new connections are opened; an
    /// open connection keeps running.
    pub fn set_visible(&self, visible: bool) {
        let previous = self.inner.visible.swap(visible, Ordering::Relaxed);
        if previous != visible {
            debug!(visible, "visibility changed");
        }
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::Relaxed)
    }

    /// Whether [`shutdown()`](Self::shutdown) has been called. A shut
    /// down session never connects again.
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Stop the supervisor and close the connection.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        // check_health and resync test for shutdown under this lock, so
        // nothing opens a connection after it is taken.
        let active = self.inner.connection.lock().await.take();
        if let Some(conn) = active {
            conn.cancel.cancel();
            let _ = conn.handle.await;
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("session shut down");
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, wait for the initial snapshot, run closure, shut
    /// down.
    pub async fn oneshot<F, Fut, T>(config: ServerConfig, wait: Duration, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.start_visible = true;

        let session = Session::new(cfg)?;
        session.start().await;
        let result = match session.wait_until_initialized(wait).await {
            Ok(_) => f(session.clone()).await,
            Err(e) => Err(e),
        };
        session.shutdown().await;
        result
    }

    /// Wait until the initial snapshot has been applied.
    pub async fn wait_until_initialized(&self, timeout: Duration) -> Result<Arc<SessionView>, CoreError> {
        let mut changes = self.change_subscription();
        let wait = async {
            loop {
                let view = changes.latest();
                if view.is_initialized() {
                    return Ok(view);
                }
                if changes.changed().await.is_none() {
                    return Err(CoreError::Disconnected);
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(match self.last_error() {
                Some(reason) => CoreError::ConnectionFailed {
                    url: self.inner.config.endpoint.to_string(),
                    reason,
                },
                None => CoreError::Timeout {
                    timeout_secs: timeout.as_secs(),
                },
            }),
        }
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.connection_state.borrow()
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state() {
            ConnectionState::Disconnected => SessionPhase::Disconnected,
            ConnectionState::Connecting => SessionPhase::Connecting,
            ConnectionState::Open if self.inner.store.is_initialized() => {
                SessionPhase::ConnectedInitialized
            }
            ConnectionState::Open => SessionPhase::ConnectedUninitialized,
        }
    }

    /// The most recent transport error of the current session, if any.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.borrow().clone()
    }

    /// Subscribe to view changes.
    pub fn change_subscription(&self) -> Changes {
        self.inner.store.subscribe()
    }

    pub fn view(&self) -> Arc<SessionView> {
        self.inner.store.view()
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn list_labels(&self) -> Vec<String> {
        self.inner.store.list_labels()
    }

    pub fn list_resources_for_label(&self, label: &str) -> Vec<Arc<UiResource>> {
        self.inner.store.list_resources_for_label(label)
    }

    pub fn get_resource(&self, name: &str) -> Option<Arc<UiResource>> {
        self.inner.store.get_resource(name)
    }

    /// Current resourceVersion for `button`, read fresh from the store.
    pub fn button_version(&self, button: &str) -> Result<ResourceVersion, CoreError> {
        self.inner.store.get_button_version(button).ok_or_else(|| {
            warn!(button, "no resourceVersion known for button");
            CoreError::ButtonVersionMissing {
                button: button.to_owned(),
            }
        })
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Ask Tilt to rebuild `name`.
    pub async fn restart(&self, name: &str) -> Result<(), CoreError> {
        info!(resource = name, "triggering update");
        self.inner
            .client
            .trigger(&TriggerRequest::for_manifest(name))
            .await
            .map_err(|e| action_failed("trigger", name, e))
    }

    /// Click the enable/disable button of `name`. Returns the state the
    /// resource was in when the click was sent.
    pub async fn toggle_enable(&self, name: &str) -> Result<DisableState, CoreError> {
        let resource = self
            .get_resource(name)
            .ok_or_else(|| CoreError::ResourceNotFound {
                name: name.to_owned(),
            })?;
        let current = resource
            .disable_state()
            .ok_or_else(|| CoreError::NotToggleable {
                name: name.to_owned(),
            })?;

        let button = toggle_button_name(name);
        let version = self.button_version(&button)?;
        let update = ButtonStatusUpdate::toggle(button, version, current, chrono::Utc::now())?;

        info!(resource = name, state = %current, "toggling resource");
        self.inner
            .client
            .update_button_status(&update)
            .await
            .map_err(|e| action_failed("toggle", name, e))?;
        Ok(current)
    }

    // ── Internals ────────────────────────────────────────────────

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = %current, to = %state, "connection state");
            *current = state;
            true
        });
    }

    fn reset_locked(&self, slot: &mut Option<ActiveConnection>) {
        if let Some(conn) = slot.take() {
            conn.cancel.cancel();
        }
        let epoch = self.inner.store.reset();
        self.inner.last_error.send_replace(None);
        self.set_state(ConnectionState::Disconnected);
        debug!(epoch, "session reset");
    }

    fn open_locked(&self, slot: &mut Option<ActiveConnection>) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let epoch = self.inner.store.epoch();
        let cancel = self.inner.cancel.child_token();

        self.set_state(ConnectionState::Connecting);
        let handle = tokio::spawn(connection_task(
            self.clone(),
            generation,
            epoch,
            cancel.clone(),
        ));
        *slot = Some(ActiveConnection {
            generation,
            cancel,
            handle,
        });
    }

    /// The handshake succeeded. Returns `false` if the attempt has been
    /// superseded in the meantime.
    async fn connection_opened(&self, generation: u64) -> bool {
        let slot = self.inner.connection.lock().await;
        if !is_current(slot.as_ref(), generation) {
            return false;
        }
        self.set_state(ConnectionState::Open);
        true
    }

    /// The handshake failed. The attempt stays in `Connecting` with the
    /// error recorded until the supervisor closes it.
    async fn connection_failed(&self, generation: u64, err: &tiltview_api::Error) {
        let slot = self.inner.connection.lock().await;
        if is_current(slot.as_ref(), generation) {
            warn!(endpoint = %self.inner.config.endpoint, error = %err, "cannot connect to Tilt");
            self.inner.last_error.send_replace(Some(err.to_string()));
        }
    }

    /// The stream ended, cleanly or not.
    async fn connection_closed(&self, generation: u64, err: Option<tiltview_api::Error>) {
        let mut slot = self.inner.connection.lock().await;
        if !is_current(slot.as_ref(), generation) {
            return;
        }
        match err {
            Some(e) => {
                warn!(error = %e, "view stream failed");
                self.inner.last_error.send_replace(Some(e.to_string()));
            }
            None => info!("view stream closed"),
        }
        *slot = None;
        self.set_state(ConnectionState::Disconnected);
    }
}

fn is_current(slot: Option<&ActiveConnection>, generation: u64) -> bool {
    slot.is_some_and(|conn| conn.generation == generation)
}

fn action_failed(action: &'static str, resource: &str, err: tiltview_api::Error) -> CoreError {
    match &err {
        tiltview_api::Error::Rejected { status, body } => {
            error!(action, resource, status, body = ?body, "Tilt rejected request");
        }
        other => error!(action, resource, error = %other, "request failed"),
    }
    CoreError::from(err)
}

// ── Background tasks ─────────────────────────────────────────────

/// Run a health check every `period` until cancelled.
async fn supervisor_task(session: Session, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => session.check_health().await,
        }
    }
}

/// Own one `/ws/view` connection from handshake to close. Every frame is
/// merged on behalf of `epoch`, so frames that race a reset are dropped.
async fn connection_task(session: Session, generation: u64, epoch: u64, cancel: CancellationToken) {
    let url = match session.inner.config.endpoint.view_url() {
        Ok(url) => url,
        Err(e) => {
            session.connection_failed(generation, &e).await;
            return;
        }
    };

    let connected = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = ViewSocket::connect(&url) => result,
    };
    let socket = match connected {
        Ok(socket) => socket,
        Err(e) => {
            session.connection_failed(generation, &e).await;
            return;
        }
    };

    if !session.connection_opened(generation).await {
        return;
    }

    let store = Arc::clone(&session.inner.store);
    let result = socket
        .read_until_closed(&cancel, |text| {
            store.apply_raw(epoch, text);
        })
        .await;
    session.connection_closed(generation, result.err()).await;
}
