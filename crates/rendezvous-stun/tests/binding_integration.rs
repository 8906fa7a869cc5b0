//! Integration tests for the Binding responder over UDP

use rendezvous_stun::{BindingRequest, StunClient, StunServer, parse_binding_response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

async fn spawn_server() -> SocketAddr {
    let server = StunServer::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let server = Arc::new(server);
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

#[tokio::test]
async fn test_client_learns_its_own_address() {
    let server = spawn_server().await;

    let client = StunClient::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let mapped = client.get_mapped_address(server).await.unwrap();

    assert_eq!(mapped, client.local_addr().unwrap());
}

#[tokio::test]
async fn test_junk_is_ignored_and_request_answered() {
    let server = spawn_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Too short, then wrong type: neither gets a reply
    socket.send_to(&[0x00, 0x01, 0x00], server).await.unwrap();
    socket.send_to(&[0x01u8; 20], server).await.unwrap();

    let txid = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B];
    socket
        .send_to(&BindingRequest::new(txid).encode(), server)
        .await
        .unwrap();

    let mut buf = [0u8; 256];
    let (len, from) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(from, server);
    assert_eq!(len, 32);

    let (got_txid, mapped) = parse_binding_response(&buf[..len]).unwrap();
    assert_eq!(got_txid, txid);
    assert_eq!(mapped, socket.local_addr().unwrap());

    // Nothing else queued
    let extra = tokio::time::timeout(Duration::from_millis(200), socket.recv_from(&mut buf)).await;
    assert!(extra.is_err());
}

#[tokio::test]
async fn test_every_request_gets_one_response() {
    let server = spawn_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    for i in 0..5u8 {
        socket
            .send_to(&BindingRequest::new([i; 12]).encode(), server)
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let (txid, _) = parse_binding_response(&buf[..len]).unwrap();
        assert_eq!(txid, [i; 12]);
    }
}

#[tokio::test]
async fn test_oversized_request_answered() {
    let server = spawn_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Well past an Ethernet MTU; only the header is inspected
    let txid = [0x5A; 12];
    let mut request = BindingRequest::new(txid).encode();
    request.resize(4000, 0xEE);
    socket.send_to(&request, server).await.unwrap();

    let mut buf = [0u8; 256];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(len, 32);

    let (got, mapped) = parse_binding_response(&buf[..len]).unwrap();
    assert_eq!(got, txid);
    assert_eq!(mapped, socket.local_addr().unwrap());
}
