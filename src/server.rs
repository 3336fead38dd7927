//! TCP listener for the chat protocol
//!
//! Accepts connections and spawns one session per client. A failed bind or
//! accept is fatal: there is no recovery path for the accept loop.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::ChatError;
use crate::service::ChatService;
use crate::session::run_session;

/// Chat server bound to a TCP address
pub struct ChatServer {
    listener: TcpListener,
    service: ChatService,
}

impl ChatServer {
    /// Bind the listener
    pub async fn bind(addr: &str, service: ChatService) -> Result<Self, ChatError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Chat server listening on {}", listener.local_addr()?);
        Ok(Self { listener, service })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ChatError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared state served by this listener
    pub fn service(&self) -> &ChatService {
        &self.service
    }

    /// Run the accept loop
    ///
    /// Only returns on an accept failure.
    pub async fn run(self) -> Result<(), ChatError> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    return Err(e.into());
                }
            };
            info!("New connection from {}", addr);

            let service = self.service.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(service, stream, addr).await {
                    error!("Connection handler error for {}: {}", addr, e);
                }
            });
        }
    }
}

/// Run one client session over a TCP stream
pub async fn handle_connection(
    service: ChatService,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<(), ChatError> {
    let (reader, writer) = stream.into_split();
    let peer = addr.to_string();
    let result = run_session(service, reader, writer, &peer).await;
    debug!("Connection from {} closed", peer);
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = ChatServer::bind("127.0.0.1:0", ChatService::default())
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_is_error() {
        let first = ChatServer::bind("127.0.0.1:0", ChatService::default())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let second = ChatServer::bind(&addr, ChatService::default()).await;
        assert!(matches!(second, Err(ChatError::Io(_))));
    }

    #[tokio::test]
    async fn test_accepts_and_registers() {
        let server = ChatServer::bind("127.0.0.1:0", ChatService::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let service = server.service().clone();
        tokio::spawn(server.run());

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"foouser\r\n").await.unwrap();

        let mut line = String::new();
        loop {
            line.clear();
            let n = tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0);
            if line.contains("Welcome") {
                break;
            }
        }

        assert_eq!(service.directory().list_users().await, vec!["foouser".to_string()]);
    }
}
