//! WebSocket endpoint for lobby sessions
//!
//! Adapts an upgraded socket into the text stream/sink pair a
//! [`Session`] runs on. The player id is trusted as already authenticated,
//! but must exist in the ledger.

use super::{errors::ApiError, handlers::AppState, middleware::RequestId, models::ConnectQuery};
use crate::common::types::{PlayerId, Stake};
use crate::lobby::Lobby;
use crate::session::Session;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    Extension,
};
use futures_util::{future, SinkExt, StreamExt};
use std::sync::Arc;
use tracing::info;

/// GET /ws/:stake?player_id=N
pub async fn lobby_websocket_handler(
    ws: WebSocketUpgrade,
    Path(stake): Path<Stake>,
    Query(query): Query<ConnectQuery>,
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let lobby = state.registry.get(stake).ok_or_else(|| {
        ApiError::not_found(request_id.0.clone(), format!("No lobby for stake {}", stake))
    })?;
    let player_id = query.player_id.ok_or_else(|| {
        ApiError::bad_request(request_id.0.clone(), "player_id is required".to_string())
    })?;
    state
        .ledger
        .balance(player_id)
        .await
        .map_err(|e| ApiError::from_ledger(request_id.0.clone(), e))?;

    info!(stake, player_id, request_id = %request_id.0, "🔌 WebSocket upgrade");
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, lobby, player_id)))
}

async fn serve_socket(socket: WebSocket, lobby: Arc<Lobby>, player_id: PlayerId) {
    let (sender, receiver) = socket.split();

    let inbound = receiver
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                // pings are answered by axum, binary frames are not part of the protocol
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
        .boxed();
    let outbound = sender.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));

    Session::new(lobby, player_id).run(inbound, outbound).await;
}
