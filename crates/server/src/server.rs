//! TCP server: one task per connection, commands run on the blocking pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracebase_api::SubstrateImpl;
use tracebase_core::{Error, ErrorCode, WireError};
use tracebase_engine::Database;
use tracebase_executor::Executor;
use tracebase_security::Principal;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::{decode_request, Request, Response};

/// Serves one database over TCP
#[derive(Debug, Clone)]
pub struct Server {
    executor: Executor,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Create a server for `db`.
    pub fn new(db: Arc<Database>, config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        Ok(Self {
            executor: Executor::new(SubstrateImpl::new(db)),
            config: Arc::new(config),
        })
    }

    /// Server settings.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        self.run(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// Connections already open keep running until their clients hang up.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "tracebase server listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(%addr, "shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, peer).await {
                            debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
            }
        }

        let db = Arc::clone(self.executor.substrate().database());
        tokio::task::spawn_blocking(move || db.shutdown())
            .await
            .map_err(|e| ServerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), ServerError> {
        debug!(%peer, "connection opened");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let max = self.config.max_line_bytes;

        loop {
            let response = match read_frame(&mut reader, max).await? {
                Frame::Eof => break,
                Frame::Oversized(len) => Response::error(None, too_long(len, max)),
                Frame::Line(bytes) => match String::from_utf8(bytes) {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => self.respond(&line).await,
                    Err(e) => Response::error(
                        None,
                        invalid(format!("request is not valid UTF-8: {}", e.utf8_error())),
                    ),
                },
            };
            let mut out = response.to_line();
            out.push('\n');
            write_half.write_all(out.as_bytes()).await?;
        }

        debug!(%peer, "connection closed");
        Ok(())
    }

    /// Answer one request line.
    pub async fn respond(&self, line: &str) -> Response {
        if line.len() > self.config.max_line_bytes {
            return Response::error(None, too_long(line.len(), self.config.max_line_bytes));
        }
        let request = match decode_request(line) {
            Ok(request) => request,
            Err((id, err)) => return Response::error(id, err),
        };
        let Request {
            id,
            principal,
            command,
        } = request;

        let principal = match self.resolve_principal(principal) {
            Ok(p) => p,
            Err(e) => return Response::error(id, e.to_wire()),
        };

        let executor = self.executor.clone();
        let result =
            tokio::task::spawn_blocking(move || executor.execute_as(principal, command)).await;
        match result {
            Ok(Ok(output)) => Response::ok(id, output),
            Ok(Err(e)) => Response::error(id, e.to_wire()),
            Err(join) => Response::error(
                id,
                WireError {
                    code: ErrorCode::InternalError,
                    message: format!("service error: command task failed: {}", join),
                },
            ),
        }
    }

    fn resolve_principal(&self, requested: Option<String>) -> Result<Principal, Error> {
        let name = requested.unwrap_or_else(|| self.config.default_principal.clone());
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("principal must not be empty"));
        }
        let principal = Principal::new(name);
        if principal.is_system() && !self.config.allow_system {
            return Err(Error::permission_denied(
                "this server does not accept the system principal",
            ));
        }
        Ok(principal)
    }
}

fn invalid(message: String) -> WireError {
    Error::invalid_argument(message).to_wire()
}

fn too_long(len: usize, max: usize) -> WireError {
    invalid(format!("request of {} bytes exceeds the {} byte limit", len, max))
}

/// One newline-terminated request as read off the socket
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// Bytes before the newline, newline excluded
    Line(Vec<u8>),
    /// A line longer than the limit; its bytes were discarded
    Oversized(usize),
    /// Peer closed with nothing pending
    Eof,
}

/// Read up to the next newline, buffering at most `max` bytes
///
/// Bytes past the limit are consumed and dropped until the newline, so a
/// client that never sends one cannot grow the buffer.
async fn read_frame<R>(reader: &mut R, max: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match total {
                0 => Frame::Eof,
                n if n > max => Frame::Oversized(n),
                _ => Frame::Line(line),
            });
        }

        let (chunk_len, used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(at) => (at, at + 1, true),
            None => (available.len(), available.len(), false),
        };
        total = total.saturating_add(chunk_len);
        if total <= max {
            line.extend_from_slice(&available[..chunk_len]);
        } else if !line.is_empty() {
            line = Vec::new();
        }
        reader.consume(used);

        if done {
            return Ok(if total > max {
                Frame::Oversized(total)
            } else {
                Frame::Line(line)
            });
        }
    }
}
