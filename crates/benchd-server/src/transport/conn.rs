//! Per-connection loop.
//!
//! Reads request heads one at a time (keep-alive and pipelining included),
//! runs an [`Exchange`] for each, and discards any declared request body so
//! the next head starts on a clean boundary. The loop watches the listener's
//! [`DrainPhase`]: while draining it stops waiting for new requests, and on
//! force-close it abandons whatever it is doing.

use std::io;
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use benchd_core::error::BenchError;
use benchd_core::protocol::{parse_head, BodyFraming, Parsed, RequestHead};

use crate::app_state::AppState;
use crate::transport::exchange::Exchange;
use crate::transport::listener::{on_malformed_request, DrainPhase};

const READ_BUF_CAPACITY: usize = 4096;

enum NextRequest {
    Head(RequestHead),
    Closed,
    Malformed(BenchError),
}

pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: AppState,
    mut phase: watch::Receiver<DrainPhase>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(%peer, error = %e, "set_nodelay failed");
    }
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(READ_BUF_CAPACITY);
    let max_head = app.cfg().server.max_head_bytes;

    loop {
        let head = match next_request(&mut reader, &mut buf, max_head, &mut phase).await {
            NextRequest::Head(head) => head,
            NextRequest::Closed => break,
            NextRequest::Malformed(err) => {
                on_malformed_request(&app, &mut writer, &err).await;
                return;
            }
        };

        let mut exchange = Exchange::begin(&app, &head, peer);
        let sent = tokio::select! {
            res = exchange.send(&mut writer) => res,
            _ = force_closed(&mut phase) => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection force-closed during drain",
            )),
        };
        if let Err(e) = sent {
            exchange.fail(&e);
            return;
        }
        exchange.complete();

        let reusable = match head.framing {
            BodyFraming::None => true,
            BodyFraming::Length(n) => {
                let discarded = tokio::select! {
                    res = discard_body(&mut reader, &mut buf, n) => res,
                    _ = force_closed(&mut phase) => Err(io::ErrorKind::ConnectionAborted.into()),
                };
                match discarded {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!(%peer, error = %e, "request body read failed");
                        false
                    }
                }
            }
            // Chunked bodies are not decoded; the connection cannot be reused.
            BodyFraming::Chunked => false,
        };

        if !reusable || !head.keep_alive {
            break;
        }
    }

    let _ = writer.shutdown().await;
}

async fn next_request<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    max_head: usize,
    phase: &mut watch::Receiver<DrainPhase>,
) -> NextRequest
where
    R: AsyncRead + Unpin,
{
    loop {
        if !buf.is_empty() {
            match parse_head(&buf[..], max_head) {
                Ok(Parsed::Complete { head, consumed }) => {
                    buf.advance(consumed);
                    return NextRequest::Head(head);
                }
                Ok(Parsed::Partial) => {}
                Err(e) => return NextRequest::Malformed(e),
            }
        }

        let idle = buf.is_empty();
        let current = *phase.borrow_and_update();
        match current {
            DrainPhase::ForceClose => return NextRequest::Closed,
            DrainPhase::Draining if idle => return NextRequest::Closed,
            _ => {}
        }

        tokio::select! {
            read = reader.read_buf(buf) => match read {
                Ok(0) if idle => return NextRequest::Closed,
                Ok(0) => {
                    return NextRequest::Malformed(BenchError::Malformed(
                        "connection closed mid-request".into(),
                    ));
                }
                Ok(_) => {}
                Err(e) if idle => {
                    tracing::debug!(error = %e, "read failed on idle connection");
                    return NextRequest::Closed;
                }
                Err(e) => return NextRequest::Malformed(e.into()),
            },
            changed = phase.changed() => {
                if changed.is_err() {
                    return NextRequest::Closed;
                }
            }
        }
    }
}

/// Skip `len` body bytes, taking what is already buffered first. Bytes past
/// the body stay in `buf` for the next head.
async fn discard_body<R>(reader: &mut R, buf: &mut BytesMut, len: u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut remaining = len;
    loop {
        let take = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        buf.advance(take);
        remaining -= take as u64;
        if remaining == 0 {
            return Ok(());
        }

        if reader.read_buf(buf).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
    }
}

/// Resolve when the listener switches to [`DrainPhase::ForceClose`].
async fn force_closed(phase: &mut watch::Receiver<DrainPhase>) {
    loop {
        if *phase.borrow_and_update() == DrainPhase::ForceClose {
            return;
        }
        if phase.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
