// ── Reactive view streams ──
//
// Subscription type for consuming view changes from the Store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::SessionView;

/// A subscription to the session view.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`. Each
/// notification corresponds to exactly one applied message or reset.
pub struct Changes {
    views: Arc<ArcSwap<SessionView>>,
    current: Arc<SessionView>,
    receiver: watch::Receiver<u64>,
}

impl Changes {
    pub(crate) fn new(views: Arc<ArcSwap<SessionView>>, mut receiver: watch::Receiver<u64>) -> Self {
        receiver.mark_unchanged();
        let current = views.load_full();
        Self {
            views,
            current,
            receiver,
        }
    }

    /// Get the view captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<SessionView> {
        &self.current
    }

    /// Get the latest view (may have changed since creation).
    pub fn latest(&self) -> Arc<SessionView> {
        self.views.load_full()
    }

    /// Whether a change has been published since the last observation.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new view.
    /// Returns `None` if the Store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<SessionView>> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update();
        let view = self.views.load_full();
        self.current = Arc::clone(&view);
        Some(view)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The first item is the view at the time of conversion.
    pub fn into_stream(self) -> ViewStream {
        ViewStream {
            views: self.views,
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the store's version counter.
///
/// Yields the published `SessionView` each time the counter moves. Bursts
/// of changes may coalesce into one item carrying the newest view.
pub struct ViewStream {
    views: Arc<ArcSwap<SessionView>>,
    inner: WatchStream<u64>,
}

impl Stream for ViewStream {
    type Item = Arc<SessionView>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        Pin::new(&mut this.inner)
            .poll_next(cx)
            .map(|version| version.map(|_| this.views.load_full()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tokio_stream::StreamExt;

    use crate::store::Store;

    #[tokio::test]
    async fn stream_yields_current_view_then_changes() {
        let store = Store::new();
        let mut views = store.subscribe().into_stream();

        let first = views.next().await.unwrap();
        assert_eq!(first.epoch(), 0);
        assert!(!first.is_initialized());

        store.ingest(
            &json!({
                "isComplete": true,
                "logList": { "segments": [], "spans": {} },
                "uiResources": [],
                "uiButtons": [],
            })
            .to_string(),
        );
        let second = views.next().await.unwrap();
        assert!(second.is_initialized());

        store.reset();
        let third = views.next().await.unwrap();
        assert_eq!(third.epoch(), 1);
        assert!(!third.is_initialized());
    }
}
