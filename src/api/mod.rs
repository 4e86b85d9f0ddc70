//! CANAGROSA REST API client and types.
//!
//! This module provides the interface for talking to the administrative
//! REST API: authentication, record CRUD, paged lists and lookups.

pub mod auth;
pub mod client;
pub mod error;
pub mod samples;
pub mod source;
pub mod types;

pub use auth::{BearerAuth, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use client::ApiClient;
pub use error::ApiError;
pub use samples::{SampleCache, SampleRepository, SharedSampleCache};
pub use source::{DataSource, Lookups};
pub use types::{CatalogItem, Lookup, Page};

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response on a local port. The raw request is
    /// sent back through the receiver.
    pub async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        (format!("http://{}", addr), rx)
    }
}
