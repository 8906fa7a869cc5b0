//! Binding client for server reflexive address discovery.

use crate::error::StunError;
use crate::message::{BindingRequest, parse_binding_response};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Default STUN timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// STUN client
pub struct StunClient {
    socket: UdpSocket,
    timeout: Duration,
}

impl StunClient {
    /// Bind a new STUN client to a local address
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound
    pub async fn bind(addr: SocketAddr) -> Result<Self, StunError> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set query timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Get local socket address
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be determined
    pub fn local_addr(&self) -> Result<SocketAddr, StunError> {
        Ok(self.socket.local_addr()?)
    }

    /// Ask `server` for the address this client's requests arrive from
    ///
    /// # Errors
    ///
    /// Returns `StunError` if:
    /// - Network I/O fails
    /// - The server doesn't respond within the timeout
    /// - The response is malformed, answers another transaction, or lacks
    ///   XOR-MAPPED-ADDRESS
    pub async fn get_mapped_address(&self, server: SocketAddr) -> Result<SocketAddr, StunError> {
        let request = BindingRequest::new_random();
        self.socket.send_to(&request.encode(), server).await?;

        let mut buf = [0u8; 1024];
        let (len, _from) = tokio::time::timeout(self.timeout, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| StunError::Timeout)??;

        let (transaction_id, mapped) = parse_binding_response(&buf[..len])?;
        if &transaction_id != request.transaction_id() {
            return Err(StunError::TransactionMismatch);
        }

        debug!(%server, %mapped, "binding response");
        Ok(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_timeout() {
        // A bound socket that never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = silent.local_addr().unwrap();

        let mut client = StunClient::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        client.set_timeout(Duration::from_millis(100));

        let result = client.get_mapped_address(server).await;
        assert!(matches!(result, Err(StunError::Timeout)));
    }

    #[tokio::test]
    async fn test_client_rejects_wrong_transaction() {
        let fake = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = fake.local_addr().unwrap();

        let client = StunClient::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let query = tokio::spawn(async move { client.get_mapped_address(server).await });

        let mut buf = [0u8; 64];
        let (_, from) = fake.recv_from(&mut buf).await.unwrap();
        let reply = crate::message::encode_binding_response(&[0xAB; 12], from);
        fake.send_to(&reply, from).await.unwrap();

        let result = query.await.unwrap();
        assert!(matches!(result, Err(StunError::TransactionMismatch)));
    }
}
