use super::engine::{announce_peer_reply, get_peers_reply};
use super::*;
use crate::bencode::{encode, Dict, Value};
use crate::dht::{format_nodes, Node, NodeId, UdpSender};
use bytes::Bytes;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;

#[test]
fn test_info_hash_display() {
    let hash = InfoHash([0xAB; 20]);
    assert_eq!(hash.to_string(), "ab".repeat(20));
    assert!(InfoHash::from_bytes(&[0u8; 19]).is_none());
    assert_eq!(InfoHash::from_bytes(&[0xAB; 20]), Some(hash));
}

#[test]
fn test_hash_store_dedup() {
    let store = HashStore::new();
    let hash = InfoHash([1u8; 20]);
    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 51413));

    assert!(store.insert(hash, from));
    assert!(!store.insert(hash, from));
    assert!(store.contains(&hash));
    assert_eq!(store.len(), 1);

    assert!(store.insert(InfoHash([2u8; 20]), from));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_get_peers_reply_bytes() {
    // the exact wire shape of the neighbor-trick reply
    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let requester = NodeId(*b"CCCCCCCCCCDDDDDDDDDD");
    let tid = Bytes::from_static(b"xy");

    let reply = get_peers_reply(tid, &info_hash, &requester);
    let encoded = encode(&Value::Dict(reply)).unwrap();

    let expected =
        b"d1:rd2:id20:AAAAAAAAAADDDDDDDDDD5:nodes0:5:token2:AAe1:t2:xy1:y1:re".to_vec();
    assert_eq!(encoded, expected);
}

#[test]
fn test_announce_peer_reply_bytes() {
    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let requester = NodeId(*b"CCCCCCCCCCDDDDDDDDDD");
    let tid = Bytes::from_static(b"xy");

    let reply = announce_peer_reply(tid, &info_hash, &requester);
    let encoded = encode(&Value::Dict(reply)).unwrap();

    let expected = b"d1:rd2:id20:AAAAAAAAAADDDDDDDDDDe1:t2:xy1:y1:re".to_vec();
    assert_eq!(encoded, expected);
}

fn test_options() -> CrawlerOptions {
    CrawlerOptions {
        fetch_metadata: false,
        ..CrawlerOptions::default()
    }
}

async fn test_crawler() -> (Arc<Crawler>, Arc<UdpSocket>) {
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let sender = UdpSender::spawn(socket.clone(), 16);
    let crawler = Arc::new(Crawler::new(
        sender,
        Arc::new(HashStore::new()),
        &test_options(),
    ));
    (crawler, socket)
}

fn query_dict(q: &str, tid: &'static [u8], args: Dict) -> Vec<u8> {
    let dict = Dict::from_pairs([
        (Bytes::from_static(b"a"), Value::Dict(args)),
        (Bytes::from_static(b"q"), Value::string(q)),
        (Bytes::from_static(b"t"), Value::Bytes(Bytes::from_static(tid))),
        (Bytes::from_static(b"y"), Value::string("q")),
    ]);
    encode(&Value::Dict(dict)).unwrap()
}

#[tokio::test]
async fn test_get_peers_query_is_answered() {
    let (crawler, _socket) = test_crawler().await;
    let dispatcher = crawler.clone().dispatcher().unwrap();

    let peer = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let peer_addr = peer.local_addr().unwrap();

    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let requester = NodeId(*b"CCCCCCCCCCDDDDDDDDDD");
    let args = Dict::from_pairs([
        (
            Bytes::from_static(b"id"),
            Value::Bytes(Bytes::copy_from_slice(requester.as_bytes())),
        ),
        (
            Bytes::from_static(b"info_hash"),
            Value::Bytes(Bytes::copy_from_slice(&info_hash)),
        ),
    ]);
    let datagram = query_dict("get_peers", b"xy", args);

    dispatcher.dispatch(peer_addr, &datagram).await.unwrap();

    let mut buf = [0u8; 1024];
    let (n, _) = peer.recv_from(&mut buf).await.unwrap();
    assert_eq!(
        &buf[..n],
        &b"d1:rd2:id20:AAAAAAAAAADDDDDDDDDD5:nodes0:5:token2:AAe1:t2:xy1:y1:re"[..]
    );
}

#[tokio::test]
async fn test_announce_records_hash() {
    let (crawler, _socket) = test_crawler().await;
    let dispatcher = crawler.clone().dispatcher().unwrap();

    let peer = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let peer_addr = peer.local_addr().unwrap();

    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let args = Dict::from_pairs([
        (
            Bytes::from_static(b"id"),
            Value::Bytes(Bytes::copy_from_slice(&[7u8; 20])),
        ),
        (
            Bytes::from_static(b"info_hash"),
            Value::Bytes(Bytes::copy_from_slice(&info_hash)),
        ),
        (Bytes::from_static(b"port"), Value::Integer(51413)),
        (
            Bytes::from_static(b"token"),
            Value::Bytes(Bytes::from_static(b"AA")),
        ),
    ]);
    let datagram = query_dict("announce_peer", b"xy", args);

    dispatcher.dispatch(peer_addr, &datagram).await.unwrap();

    assert!(crawler.store().contains(&InfoHash(info_hash)));

    let mut buf = [0u8; 1024];
    let (n, _) = peer.recv_from(&mut buf).await.unwrap();
    let reply = crate::bencode::decode(&buf[..n]).unwrap();
    assert_eq!(reply.get(b"y").and_then(|v| v.as_str()), Some("r"));
}

#[tokio::test]
async fn test_announce_rejects_bad_token() {
    let (crawler, _socket) = test_crawler().await;

    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let args = Dict::from_pairs([
        (
            Bytes::from_static(b"id"),
            Value::Bytes(Bytes::copy_from_slice(&[7u8; 20])),
        ),
        (
            Bytes::from_static(b"info_hash"),
            Value::Bytes(Bytes::copy_from_slice(&info_hash)),
        ),
        (Bytes::from_static(b"port"), Value::Integer(51413)),
        (
            Bytes::from_static(b"token"),
            Value::Bytes(Bytes::from_static(b"ZZ")),
        ),
    ]);
    let dict = crate::bencode::decode(&query_dict("announce_peer", b"xy", args))
        .unwrap()
        .into_dict()
        .unwrap();

    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));
    let result = crawler.handle_query(from, dict).await;
    assert!(matches!(result, Err(CrawlerError::InvalidToken)));
    assert!(crawler.store().is_empty());
}

#[tokio::test]
async fn test_announce_implied_port_and_range() {
    let (crawler, _socket) = test_crawler().await;

    let info_hash = *b"AAAAAAAAAABBBBBBBBBB";
    let build = |port: i64, implied: i64| {
        let mut args = Dict::from_pairs([
            (
                Bytes::from_static(b"id"),
                Value::Bytes(Bytes::copy_from_slice(&[7u8; 20])),
            ),
            (
                Bytes::from_static(b"info_hash"),
                Value::Bytes(Bytes::copy_from_slice(&info_hash)),
            ),
            (
                Bytes::from_static(b"token"),
                Value::Bytes(Bytes::from_static(b"AA")),
            ),
        ]);
        args.put(Bytes::from_static(b"port"), Value::Integer(port));
        args.put(Bytes::from_static(b"implied_port"), Value::Integer(implied));
        crate::bencode::decode(&query_dict("announce_peer", b"xy", args))
            .unwrap()
            .into_dict()
            .unwrap()
    };

    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));

    // out-of-range port with no implied_port fails
    let result = crawler.handle_query(from, build(0, 0)).await;
    assert!(matches!(result, Err(CrawlerError::InvalidPort(0))));
    assert!(crawler.store().is_empty());

    // implied_port overrides the bogus announced port with the requester's
    crawler.handle_query(from, build(0, 1)).await.unwrap();
    assert!(crawler.store().contains(&InfoHash(info_hash)));
}

#[tokio::test]
async fn test_unknown_query_is_an_error() {
    let (crawler, _socket) = test_crawler().await;

    let args = Dict::from_pairs([(
        Bytes::from_static(b"id"),
        Value::Bytes(Bytes::copy_from_slice(&[7u8; 20])),
    )]);
    let dict = crate::bencode::decode(&query_dict("ping", b"xy", args))
        .unwrap()
        .into_dict()
        .unwrap();

    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));
    let result = crawler.handle_query(from, dict).await;
    assert!(matches!(result, Err(CrawlerError::UnknownQuery(q)) if q == "ping"));
}

#[tokio::test]
async fn test_response_nodes_become_candidates() {
    let (crawler, _socket) = test_crawler().await;
    assert_eq!(crawler.candidate_count(), 0);

    let good = Node::new(
        NodeId([1u8; 20]),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 6881),
    );
    let zero_ip = Node::new(
        NodeId([2u8; 20]),
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 6881),
    );
    let ourselves = Node::new(
        *crawler.our_id(),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 6881),
    );

    let body = Dict::from_pairs([
        (
            Bytes::from_static(b"id"),
            Value::Bytes(Bytes::copy_from_slice(&[3u8; 20])),
        ),
        (
            Bytes::from_static(b"nodes"),
            Value::Bytes(Bytes::from(format_nodes(&[good, zero_ip, ourselves]))),
        ),
    ]);
    let dict = Dict::from_pairs([
        (Bytes::from_static(b"r"), Value::Dict(body)),
        (Bytes::from_static(b"t"), Value::string("xy")),
        (Bytes::from_static(b"y"), Value::string("r")),
    ]);

    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));
    crawler.handle_response(from, dict).await.unwrap();

    // the zero-IP node and our own id are filtered out
    assert_eq!(crawler.candidate_count(), 1);
}

#[tokio::test]
async fn test_response_without_nodes_is_an_error() {
    let (crawler, _socket) = test_crawler().await;

    let body = Dict::from_pairs([(
        Bytes::from_static(b"id"),
        Value::Bytes(Bytes::copy_from_slice(&[3u8; 20])),
    )]);
    let dict = Dict::from_pairs([
        (Bytes::from_static(b"r"), Value::Dict(body)),
        (Bytes::from_static(b"t"), Value::string("xy")),
        (Bytes::from_static(b"y"), Value::string("r")),
    ]);

    let from = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40000));
    let result = crawler.handle_response(from, dict).await;
    assert!(matches!(result, Err(CrawlerError::MissingKey("nodes"))));
}
