//! Async client for the line protocol.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracebase_executor::{Command, Output};

use crate::error::ClientError;
use crate::protocol::{Reply, Request, Response};

/// One connection to a Tracebase server
///
/// Requests are answered in order, so a client issues one at a time.
#[derive(Debug)]
pub struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    principal: Option<String>,
    next_id: u64,
}

impl Client {
    /// Connect to `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            principal: None,
            next_id: 1,
        })
    }

    /// Send later requests as `principal`.
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Run a command on the server.
    pub async fn execute(&mut self, command: Command) -> Result<Output, ClientError> {
        let principal = self.principal.clone();
        self.send(principal, command).await
    }

    /// Run one command as `principal`.
    pub async fn execute_as(
        &mut self,
        principal: impl Into<String>,
        command: Command,
    ) -> Result<Output, ClientError> {
        self.send(Some(principal.into()), command).await
    }

    async fn send(
        &mut self,
        principal: Option<String>,
        command: Command,
    ) -> Result<Output, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id: Some(id),
            principal,
            command,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| ClientError::Protocol(format!("could not encode request: {}", e)))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let reply = self.lines.next_line().await?.ok_or(ClientError::Closed)?;
        let response: Response = serde_json::from_str(&reply)
            .map_err(|e| ClientError::Protocol(format!("could not decode response: {}", e)))?;
        if response.id != Some(id) {
            return Err(ClientError::Protocol(format!(
                "response id {:?} does not match request id {}",
                response.id, id
            )));
        }
        match response.reply {
            Reply::Ok(output) => Ok(output),
            Reply::Error(e) => Err(ClientError::Remote(e)),
        }
    }
}
