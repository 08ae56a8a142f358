//! Live channel: a WebSocket that receives the current state on connect and
//! every broadcast after that. Clients never send commands through it.

use crate::lobby::{error, Lobby};
use alloc::{string::String, sync::Arc};
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, UPGRADE},
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    tungstenite::{handshake::derive_accept_key, protocol::Role, Message},
    WebSocketStream,
};

/// Whether a comma-separated header contains the token (case-insensitive).
fn has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|value| value.trim().eq_ignore_ascii_case(token))
}

/// Accepts the WebSocket handshake and detaches a task that serves the
/// connection once hyper hands over the upgraded stream.
pub fn upgrade<B>(mut req: Request<B>, lobby: Arc<Lobby>) -> error::Result<Response<Full<Bytes>>> {
    let headers = req.headers();
    if !has_token(headers, CONNECTION, "upgrade") || !has_token(headers, UPGRADE, "websocket") {
        return Err(error::Error::NotWebSocket);
    }

    let key = headers.get(SEC_WEBSOCKET_KEY).ok_or(error::Error::NotWebSocket)?;
    let accept = HeaderValue::from_str(&derive_accept_key(key.as_bytes())).map_err(|_| error::Error::Fatal)?;

    let pending = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        let upgraded = match pending.await {
            Ok(upgraded) => upgraded,
            Err(err) => {
                log::warn!("websocket upgrade failed: {err}");
                return;
            }
        };
        let socket = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
        serve(socket, &lobby).await;
    });

    let mut res = Response::new(Full::default());
    *res.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = res.headers_mut();
    assert!(headers.insert(CONNECTION, HeaderValue::from_static("upgrade")).is_none());
    assert!(headers.insert(UPGRADE, HeaderValue::from_static("websocket")).is_none());
    assert!(headers.insert(SEC_WEBSOCKET_ACCEPT, accept).is_none());
    Ok(res)
}

/// Pumps snapshots into the socket until either side goes away. The
/// subscription unsubscribes itself when dropped, whichever way this returns.
pub async fn serve<S>(socket: WebSocketStream<S>, lobby: &Lobby)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut subscription = match lobby.subscribe() {
        Ok(subscription) => subscription,
        Err(err) => {
            log::error!("cannot subscribe live client: {err}");
            return;
        }
    };

    let id = subscription.id();
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            payload = subscription.recv() => {
                let Some(payload) = payload else {
                    log::debug!("subscriber {id} fell behind");
                    break;
                };
                if let Err(err) = sink.send(Message::text(String::from(&*payload))).await {
                    log::debug!("subscriber {id} is unreachable: {err}");
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        log::debug!("subscriber {id} read failed: {err}");
                        break;
                    }
                }
            }
        }
    }

    // The peer may already be gone.
    let _ = sink.close().await;
}
