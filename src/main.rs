//! Line-oriented Chat Server - Entry Point
//!
//! Loads configuration, starts the HTTP control plane and runs the chat
//! accept loop.

use std::env;
use std::sync::Arc;

use tracing::{error, info};

use linechat::{http, logging, ChatServer, ChatService, Config, ControlPlane};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;

    // Optional first argument overrides the chat listen address
    if let Some(addr) = env::args().nth(1) {
        config.chat_addr = addr;
    }

    logging::init(&config)?;

    let service = ChatService::new(config.mailbox_capacity);

    // Bind before starting the control plane; bind failure is fatal
    let server = ChatServer::bind(&config.chat_addr, service.clone()).await?;

    let control = Arc::new(ControlPlane::new(service, config.log_file.clone()));
    let http_addr = config.http_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = http::serve(&http_addr, control).await {
            error!("Control plane error: {}", e);
        }
    });

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Chat server stopped");
    Ok(())
}
