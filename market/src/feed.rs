//! Market feed lifecycle.
//!
//! Owns the spawned websocket ingest task and the stop signal used to
//! cancel it. The control loop holds a `MarketFeed` for the lifetime of
//! the process and awaits `stop()` during shutdown so the socket is
//! closed before the process exits.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ws::BinanceWsClient;

pub struct MarketFeed {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MarketFeed {
    /// Spawn the ingest task for `client`.
    pub fn start(client: BinanceWsClient) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(client.run(stop_rx));

        info!("market feed started");
        Self { stop_tx, handle }
    }

    /// Signal the ingest task to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
        info!("market feed stopped");
    }
}
