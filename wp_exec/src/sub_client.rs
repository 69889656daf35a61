//! # Subscriber Client
//!
//! Generic client for the JSON streams carried on the PUB/SUB endpoints. Each client owns one
//! subscriber socket and deserializes every message into `T`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::marker::PhantomData;

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions};
use log::{error, info, warn};
use serde::de::DeserializeOwned;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A subscriber to a stream of `T` messages.
pub struct SubClient<T> {
    socket: MonitoredSocket,

    endpoint: String,

    _msg: PhantomData<fn() -> T>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SubClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a message from the stream: {0}")]
    RecvError(zmq::Error),

    #[error("The stream sent a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Could not deserialize the message: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: DeserializeOwned> SubClient<T> {
    /// Create a new subscriber connected to `endpoint`, receiving every message on it.
    ///
    /// Does not block waiting for the publisher, receives time out after `recv_timeout_ms`.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        recv_timeout_ms: i32
    ) -> Result<Self, SubClientError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            SocketOptions::subscriber(recv_timeout_ms),
            endpoint
        ).map_err(SubClientError::SocketError)?;

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
            _msg: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns true while the subscriber has a live connection to a publisher.
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Receive the next message, if one arrives before the receive timeout.
    pub fn receive(&mut self) -> Result<Option<T>, SubClientError> {
        let msg_str = match self.socket.recv_string(0) {
            // Valid message
            Ok(Ok(s)) => s,
            // Invalid message
            Ok(Err(_)) => return Err(SubClientError::NonUtf8Message),
            // No message
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // Recv error
            Err(e) => return Err(SubClientError::RecvError(e)),
        };

        serde_json::from_str(&msg_str)
            .map(Some)
            .map_err(SubClientError::DeserializeError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Log a receive error on the named stream.
///
/// Malformed messages are only warned about, since the stream itself is still healthy.
pub fn log_recv_error(stream: &str, e: SubClientError) {
    match e {
        SubClientError::DeserializeError(_) | SubClientError::NonUtf8Message => {
            warn!("Dropping malformed {} message: {}", stream, e)
        },
        e => error!("Error receiving {} message: {}", stream, e),
    }
}

/// Log when a client connects to or loses its publisher.
///
/// `was_connected` holds the state seen on the previous call and is updated.
pub fn log_connection_change<T: DeserializeOwned>(
    stream: &str,
    client: &SubClient<T>,
    was_connected: &mut bool
) {
    let connected = client.is_connected();

    if connected != *was_connected {
        if connected {
            info!("Connected to the {} publisher on {}", stream, client.endpoint());
        }
        else {
            warn!("Lost the {} publisher on {}", stream, client.endpoint());
        }
        *was_connected = connected;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    #[test]
    fn test_receive_json() {
        let ctx = zmq::Context::new();
        let endpoint = "inproc://test_sub_client_receive_json";

        let publisher = MonitoredSocket::new(
            &ctx, zmq::PUB, SocketOptions::publisher(), endpoint
        ).unwrap();
        let mut client: SubClient<Ping> = SubClient::new(&ctx, endpoint, 100).unwrap();

        let mut received = None;
        for _ in 0..50 {
            publisher.send("{\"n\": 3}", 0).unwrap();
            if let Some(msg) = client.receive().unwrap() {
                received = Some(msg);
                break
            }
        }

        assert_eq!(received, Some(Ping { n: 3 }));
    }

    #[test]
    fn test_malformed_message() {
        let ctx = zmq::Context::new();
        let endpoint = "inproc://test_sub_client_malformed";

        let publisher = MonitoredSocket::new(
            &ctx, zmq::PUB, SocketOptions::publisher(), endpoint
        ).unwrap();
        let mut client: SubClient<Ping> = SubClient::new(&ctx, endpoint, 100).unwrap();

        let mut result = Ok(None);
        for _ in 0..50 {
            publisher.send("not json", 0).unwrap();
            result = client.receive();
            if !matches!(result, Ok(None)) {
                break
            }
        }

        assert!(matches!(result, Err(SubClientError::DeserializeError(_))));
    }

    #[test]
    fn test_connection_change_tracking() {
        let ctx = zmq::Context::new();

        // Nothing is publishing here
        let client: SubClient<Ping> = SubClient::new(
            &ctx, "inproc://test_sub_client_no_publisher", 10
        ).unwrap();
        assert!(!client.is_connected());

        let mut was_connected = false;
        log_connection_change("ping", &client, &mut was_connected);
        assert!(!was_connected);

        was_connected = true;
        log_connection_change("ping", &client, &mut was_connected);
        assert!(!was_connected);
    }
}
