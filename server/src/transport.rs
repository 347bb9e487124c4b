//! WebSocket listener. One JSON event per text frame.
//!
//! Each connection gets a reader loop feeding the router and a writer task
//! draining the connection's outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;

use chess_proto::{codec, Event, IdentityPayload};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::Instrument;

use crate::identity::{Credentials, Handshake, IdentityError, IdentityResolver};
use crate::router::{EventRouter, Sender};

const OUTBOUND_QUEUE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TransportFault {
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),
    #[error("Identity rejected: {0}")]
    Identity(#[from] IdentityError),
}

/// Accept connections until the listener fails.
pub async fn serve(
    listener: TcpListener,
    router: Arc<EventRouter>,
    resolver: Arc<dyn IdentityResolver>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        };

        let router = Arc::clone(&router);
        let resolver = Arc::clone(&resolver);
        tokio::spawn(
            async move {
                if let Err(e) = handle_connection(stream, peer, router, resolver).await {
                    tracing::warn!(error = %e, "Connection ended with error");
                }
            }
            .instrument(tracing::info_span!("conn", %peer)),
        );
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<EventRouter>,
    resolver: Arc<dyn IdentityResolver>,
) -> Result<(), TransportFault> {
    let mut query = None;
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            query = req.uri().query().map(str::to_owned);
            Ok(resp)
        },
    )
    .await
    .map_err(TransportFault::Handshake)?;

    let handshake = Handshake {
        query,
        peer: Some(peer),
    };
    let Credentials { user, token } = match resolver.resolve(&handshake) {
        Ok(creds) => creds,
        Err(e) => {
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Policy,
                    reason: e.to_string().into(),
                }))
                .await;
            return Err(e.into());
        }
    };

    let (mut sink, mut frames) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Event>(OUTBOUND_QUEUE);
    let subscription = router.connections().register(user.clone(), tx);
    let sender = Sender {
        user,
        conn: subscription.conn(),
    };
    tracing::info!(user = %sender.user.id, conn = sender.conn, "Client connected");

    // Ends once the queue closes: on release, or when a newer connection of
    // the same user takes over.
    tokio::spawn(
        async move {
            while let Some(event) = rx.recv().await {
                let text = match codec::encode(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(action = %event.action(), error = %e, "Encode failed");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(error = %e, "Write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        }
        .in_current_span(),
    );

    router.connections().send(
        &sender.user.id,
        Event::Identity(IdentityPayload {
            user: sender.user.to_payload(),
            token,
        }),
    );
    let greeting = router.on_connect(&sender).await;
    router.deliver(greeting);

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let out = router.handle_text(&sender, &text).await;
                router.deliver(out);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(user = %sender.user.id, "Binary frame ignored");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Read failed");
                break;
            }
        }
    }

    if subscription.release() {
        let out = router.on_disconnect(&sender).await;
        router.deliver(out);
    }
    tracing::info!(user = %sender.user.id, conn = sender.conn, "Client disconnected");
    Ok(())
}
