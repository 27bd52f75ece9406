//! Live feed over WebSocket.
//!
//! Each connection activates its own [`FeedViewModel`] against the shared
//! listing feed and streams every view change to the client as listing
//! cards. Closing the socket tears the view-model down, which releases its
//! subscription and cancels any pending highlight.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use jobsphere_feed::{FeedStatus, FeedView, FeedViewModel};
use jobsphere_models::{Listing, ListingCard, ListingId};

use crate::metrics;
use crate::state::AppState;

const ENDPOINT: &str = "feed";

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    /// Initial filter query.
    #[serde(default)]
    pub q: Option<String>,
}

/// Messages accepted from the client.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Filter {
        #[serde(default)]
        query: String,
    },
}

/// Feed view with listings resolved to cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedMessage {
    pub status: FeedStatus,
    pub filter_query: String,
    pub total: usize,
    pub highlighted_id: Option<ListingId>,
    pub items: Vec<ListingCard>,
}

impl From<&FeedView> for FeedMessage {
    fn from(view: &FeedView) -> Self {
        Self {
            status: view.status.clone(),
            filter_query: view.filter_query.clone(),
            total: view.total,
            highlighted_id: view.highlighted_id.clone(),
            items: view.items.iter().map(Listing::card).collect(),
        }
    }
}

/// Messages sent to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Feed(FeedMessage),
    Error { message: String },
}

impl ServerMessage {
    fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Feed(_) => "feed",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// Send a message with backpressure; false once the connection is gone.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: ServerMessage) -> bool {
    let json = match serde_json::to_string(&msg) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize feed message: {}", e);
            return false;
        }
    };
    let sent = match tx.try_send(Message::Text(json)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(message)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(message).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    };
    if sent {
        metrics::record_ws_message_sent(ENDPOINT, msg.kind());
    }
    sent
}

async fn send_view(tx: &mpsc::Sender<Message>, view: &FeedView) -> bool {
    send_ws_message(tx, ServerMessage::Feed(FeedMessage::from(view))).await
}

/// GET /ws/feed
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let _active = track_connection();
        handle_feed_socket(socket, state, params.q.unwrap_or_default()).await;
    })
}

/// Count an upgraded connection until the returned guard drops.
fn track_connection() -> scopeguard::ScopeGuard<(), impl FnOnce(())> {
    metrics::record_ws_connection(ENDPOINT);
    metrics::set_ws_active_connections(ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1);
    scopeguard::guard((), |_| {
        metrics::set_ws_active_connections(ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1);
    })
}

async fn handle_feed_socket(socket: WebSocket, state: AppState, query: String) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let view_model =
        FeedViewModel::activate_with_filter(state.feed.as_ref(), &state.feed_config, query);
    let mut views = view_model.watch();
    info!("Feed WebSocket connected");

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    let initial = views.borrow_and_update().clone();
    let mut open = send_view(&tx, &initial).await;

    while open {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                open = send_view(&tx, &view).await;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    metrics::record_ws_message_received(ENDPOINT);
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Filter { query }) => view_model.set_filter_query(query),
                        Err(e) => {
                            let error = ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            };
                            open = send_ws_message(&tx, error).await;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Feed WebSocket receive error: {}", e);
                    break;
                }
                // Pings are answered by the transport; binary frames are ignored.
                Some(Ok(_)) => {}
            },
            _ = heartbeat.tick() => {
                open = tx.send(Message::Ping(Vec::new())).await.is_ok();
            }
        }
    }

    view_model.shutdown().await;
    drop(tx);
    let _ = send_task.await;
    info!("Feed WebSocket closed");
}
