//! In-process queue for save events.
//!
//! A single worker drains the queue in arrival order, so pushes never
//! overlap and each push reflects content as of when its event is
//! processed.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ChangeDispatcher, ItemSaved};

enum Message {
    Event(ItemSaved),
    Flush(oneshot::Sender<()>),
}

/// Handle for enqueueing save events.
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::UnboundedSender<Message>,
}

impl SyncQueue {
    /// Spawn the worker and return a handle to its queue.
    ///
    /// The worker exits once every handle has been dropped.
    pub fn start(dispatcher: Arc<ChangeDispatcher>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(dispatcher, rx));
        (Self { tx }, handle)
    }

    /// Queue an event. Never blocks.
    pub fn enqueue(&self, event: ItemSaved) -> Result<()> {
        self.tx
            .send(Message::Event(event))
            .map_err(|_| anyhow::anyhow!("sync worker has stopped"))?;
        Ok(())
    }

    /// Wait until every event queued before this call has been handled.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(done_tx))
            .map_err(|_| anyhow::anyhow!("sync worker has stopped"))?;
        done_rx.await.context("sync worker dropped flush")
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

async fn run_worker(dispatcher: Arc<ChangeDispatcher>, mut rx: mpsc::UnboundedReceiver<Message>) {
    info!(enabled = dispatcher.enabled(), "sync worker started");

    while let Some(message) = rx.recv().await {
        match message {
            Message::Event(event) => match dispatcher.handle(&event).await {
                Ok(outcome) => debug!(item_id = event.item_id, ?outcome, "save event processed"),
                Err(e) => warn!(item_id = event.item_id, error = %e, "save event failed"),
            },
            Message::Flush(done) => {
                // Receiver may have given up waiting
                let _ = done.send(());
            }
        }
    }

    info!("sync worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::content::MemoryContentSource;
    use crate::metrics::Metrics;
    use crate::models::{ListingConfig, SerializedItem};
    use crate::settings::{self, MemorySettingsStore};
    use crate::sync::Pusher;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Urls(Mutex<Vec<String>>);

    #[async_trait]
    impl Pusher for Urls {
        async fn push(&self, url: &str, _items: &[SerializedItem]) -> anyhow::Result<u16> {
            self.0.lock().push(url.to_string());
            Ok(200)
        }
    }

    #[tokio::test]
    async fn events_are_handled_in_order() {
        let settings = Arc::new(MemorySettingsStore::new());
        settings::save_listing_config(settings.as_ref(), &ListingConfig::new("a,b"))
            .await
            .unwrap();
        let pusher = Arc::new(Urls::default());
        let dispatcher = Arc::new(ChangeDispatcher::new(
            settings.clone(),
            Arc::new(MemoryContentSource::new("post")),
            pusher.clone(),
            Some("http://collector.test".to_string()),
            "post",
            Arc::new(Metrics::new()),
        ));
        let (queue, worker) = SyncQueue::start(dispatcher);

        let save = |id| ItemSaved {
            item_id: id,
            item_type: "post".to_string(),
            autosave: false,
        };
        queue.enqueue(save(1)).unwrap();
        queue.flush().await.unwrap();

        // Configuration is read when the event is processed
        settings::save_listing_config(settings.as_ref(), &ListingConfig::new("c"))
            .await
            .unwrap();
        queue.enqueue(save(2)).unwrap();
        queue.flush().await.unwrap();

        assert_eq!(
            *pusher.0.lock(),
            vec![
                "http://collector.test/a",
                "http://collector.test/b",
                "http://collector.test/c"
            ]
        );

        drop(queue);
        worker.await.unwrap();
    }
}
