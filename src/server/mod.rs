//! HTTP/1.1 facade over [`FeedService`].
//!
//! One request per connection. Each connection runs on its own task so a
//! slow upstream never blocks the accept loop.

pub mod request;
pub mod response;
pub mod routes;

use crate::constants::server::HEADER_READ_TIMEOUT_SECONDS;
use crate::error::AppError;
use crate::service::FeedService;
use http::StatusCode;
use request::{RequestError, read_request};
use response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct Server {
    listener: TcpListener,
    service: Arc<FeedService>,
}

impl Server {
    pub async fn bind(address: &str, service: Arc<FeedService>) -> Result<Self, AppError> {
        let address: SocketAddr = address.parse()?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| AppError::server_error(format!("Failed to bind {address}: {e}")))?;
        Ok(Server { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
        info!("Listening on http://{}", self.local_addr()?);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        warn!("Failed to accept connection: {e}");
                        continue;
                    }
                },
                _ = shutdown.wait_for(|stop| *stop) => break,
            };

            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &service).await {
                    debug!("Connection from {peer} ended with error: {e}");
                }
            });
        }

        info!("Server stopped accepting connections");
        Ok(())
    }
}

async fn handle_connection(mut stream: TcpStream, service: &FeedService) -> std::io::Result<()> {
    let head_timeout = Duration::from_secs(HEADER_READ_TIMEOUT_SECONDS);
    let response = match read_request(&mut stream, head_timeout).await {
        Ok(request) => routes::route(service, &request).await,
        Err(RequestError::Closed) => return Ok(()),
        Err(RequestError::Io(e)) => return Err(e),
        Err(e) => {
            let status = match e {
                RequestError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                RequestError::HeadTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                RequestError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            };
            Response::error(status, "Bad request", e.to_string())
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await
}
