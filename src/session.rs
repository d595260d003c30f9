//! Connection sessions
//!
//! A session bridges one player's transport to a lobby with two tasks: the
//! inbound task decodes and dispatches actions, the outbound task drains a
//! bounded queue into the transport. Lobby broadcasts enqueue with
//! `try_send`, so a slow client only ever loses its own messages.

use crate::common::types::{CardId, PlayerId};
use crate::lobby::Lobby;
use crate::metrics::EngineMetrics;
use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Time the outbound task gets to close the transport during teardown
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Actions a client can send
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    SelectCard { card_id: CardId },
    #[serde(alias = "bingo")]
    ClaimBingo,
}

impl ClientAction {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The lobby-facing side of a session
pub struct SessionHandle {
    player_id: PlayerId,
    connection_id: u64,
    outbound: mpsc::Sender<Arc<str>>,
    shutdown: watch::Sender<bool>,
    dropped: AtomicU64,
    metrics: Arc<EngineMetrics>,
}

impl SessionHandle {
    pub fn new(
        player_id: PlayerId,
        connection_id: u64,
        capacity: usize,
        metrics: Arc<EngineMetrics>,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let handle = Arc::new(Self {
            player_id,
            connection_id,
            outbound,
            shutdown,
            dropped: AtomicU64::new(0),
            metrics,
        });
        (handle, rx)
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Queue a message without waiting; dropped when the queue is full
    pub fn try_deliver(&self, message: Arc<str>) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                self.metrics.record_message_dropped();
                debug!(player_id = self.player_id, dropped, "Outbound queue full, message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Request session shutdown. Returns true for the first request only.
    pub fn close(&self) -> bool {
        !self.shutdown.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn dropped_messages(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

async fn closed(shutdown: &mut watch::Receiver<bool>) {
    // a dropped sender also counts as closed
    let _ = shutdown.wait_for(|closed| *closed).await;
}

/// One player's live connection to a lobby
pub struct Session {
    lobby: Arc<Lobby>,
    handle: Arc<SessionHandle>,
    outbound_rx: mpsc::Receiver<Arc<str>>,
}

impl Session {
    pub fn new(lobby: Arc<Lobby>, player_id: PlayerId) -> Self {
        let (handle, outbound_rx) = SessionHandle::new(
            player_id,
            lobby.next_connection_id(),
            lobby.config().outbound_capacity,
            Arc::clone(lobby.metrics()),
        );
        Self {
            lobby,
            handle,
            outbound_rx,
        }
    }

    pub fn handle(&self) -> Arc<SessionHandle> {
        Arc::clone(&self.handle)
    }

    /// Attach to the lobby and pump messages until the session ends.
    ///
    /// Ends when the transport fails on either side or the session is
    /// closed (e.g. superseded). Teardown runs once, here.
    pub async fn run<S, E, K>(self, inbound: S, outbound: K)
    where
        S: Stream<Item = Result<String, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        K: Sink<String> + Send + Unpin + 'static,
        K::Error: Display + Send,
    {
        let Session {
            lobby,
            handle,
            outbound_rx,
        } = self;
        let player_id = handle.player_id();
        let stake = lobby.stake();

        lobby.metrics().session_opened();
        lobby.join(Arc::clone(&handle)).await;

        let mut inbound_task = tokio::spawn(read_loop(
            Arc::clone(&lobby),
            player_id,
            inbound,
            handle.subscribe(),
        ));
        let mut outbound_task = tokio::spawn(write_loop(Arc::clone(&handle), outbound_rx, outbound));
        let mut shutdown = handle.subscribe();

        let (inbound_finished, outbound_finished) = tokio::select! {
            _ = &mut inbound_task => (true, false),
            _ = &mut outbound_task => (false, true),
            _ = closed(&mut shutdown) => (false, false),
        };

        // the inbound task stops between frames, so an action being handled completes
        handle.close();
        if !inbound_finished && tokio::time::timeout(FLUSH_TIMEOUT, &mut inbound_task).await.is_err() {
            warn!(stake, player_id, "Inbound task did not stop in time, aborting");
            inbound_task.abort();
        }
        if !outbound_finished && tokio::time::timeout(FLUSH_TIMEOUT, &mut outbound_task).await.is_err() {
            outbound_task.abort();
        }

        lobby.leave(player_id, handle.connection_id()).await;
        lobby.metrics().session_closed();
        info!(stake, player_id, dropped = handle.dropped_messages(), "Session closed");
    }
}

async fn read_loop<S, E>(
    lobby: Arc<Lobby>,
    player_id: PlayerId,
    mut inbound: S,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Stream<Item = Result<String, E>> + Unpin,
    E: Display,
{
    let stake = lobby.stake();
    loop {
        let frame = tokio::select! {
            biased;
            _ = closed(&mut shutdown) => break,
            frame = inbound.next() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let text = match frame {
            Ok(text) => text,
            Err(e) => {
                info!(stake, player_id, "Transport read failed: {}", e);
                return;
            }
        };

        let action = match ClientAction::decode(&text) {
            Ok(action) => action,
            Err(e) => {
                warn!(stake, player_id, "Skipping undecodable message: {}", e);
                continue;
            }
        };
        debug!(stake, player_id, ?action, "Action received");

        let outcome = AssertUnwindSafe(lobby.dispatch(player_id, action))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!(stake, player_id, "Recovered from failure while handling action");
        }
    }
    debug!(stake, player_id, "Inbound loop ended");
}

async fn write_loop<K>(handle: Arc<SessionHandle>, mut queue: mpsc::Receiver<Arc<str>>, mut sink: K)
where
    K: Sink<String> + Unpin,
    K::Error: Display,
{
    let mut shutdown = handle.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = closed(&mut shutdown) => break,
            message = queue.recv() => match message {
                Some(message) => {
                    if let Err(e) = sink.send(message.to_string()).await {
                        info!(player_id = handle.player_id(), "Transport write failed: {}", e);
                        break;
                    }
                }
                None => break,
            },
        }
    }
    if let Err(e) = sink.close().await {
        debug!(player_id = handle.player_id(), "Transport close failed: {}", e);
    }
}
