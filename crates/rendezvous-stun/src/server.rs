//! UDP transport for the Binding responder.

use crate::error::StunError;
use crate::responder::BindingResponder;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// Largest datagram the server will read (maximum UDP payload)
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// STUN Binding server
pub struct StunServer {
    /// UDP socket
    socket: UdpSocket,
    /// Request handler
    responder: BindingResponder,
}

impl StunServer {
    /// Bind a new server
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, StunError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(Self {
            socket,
            responder: BindingResponder::new(),
        })
    }

    /// Get local socket address
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be determined
    pub fn local_addr(&self) -> Result<SocketAddr, StunError> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the server
    ///
    /// Handles one datagram at a time until the task is dropped. Receive and
    /// send failures are logged and never end the loop.
    ///
    /// # Errors
    ///
    /// Returns error if the local address cannot be read at startup.
    pub async fn run(&self) -> Result<(), StunError> {
        info!(addr = %self.local_addr()?, "STUN binding responder listening");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    let Some((response, to)) = self.responder.handle_datagram(&buf[..len], from)
                    else {
                        continue;
                    };

                    if let Err(e) = self.socket.send_to(&response, to).await {
                        warn!(%to, error = %e, "failed to send binding response");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "receive error");
                }
            }
        }
    }
}
