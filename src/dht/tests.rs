use super::*;
use crate::bencode::{encode, Dict, Value};
use bytes::Bytes;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_node_id_random() {
    let id1 = NodeId::random();
    let id2 = NodeId::random();
    assert_ne!(id1.0, id2.0);
}

#[test]
fn test_node_id_from_bytes() {
    let bytes = [1u8; 20];
    let id = NodeId::from_bytes(&bytes).unwrap();
    assert_eq!(id.0, bytes);

    assert!(NodeId::from_bytes(&[1u8; 10]).is_err());
    assert!(NodeId::from_bytes(&[1u8; 21]).is_err());
}

#[test]
fn test_neighbor_id() {
    let target = [0xAA; 20];
    let own = NodeId([0xBB; 20]);

    let neighbor = NodeId::neighbor(&target, &own);
    assert_eq!(&neighbor.0[..10], &target[..10]);
    assert_eq!(&neighbor.0[10..], &own.0[10..]);
}

#[test]
fn test_node_compact_roundtrip() {
    // id "FGHIJKLMNO" twice, ip 90.90.90.90, port 0x4141
    let mut data = Vec::new();
    data.extend(70u8..80);
    data.extend(70u8..80);
    data.extend_from_slice(&[90, 90, 90, 90, 0x41, 0x41]);

    let node = Node::from_compact(&data).unwrap();
    assert_eq!(&node.id.0[..10], b"FGHIJKLMNO");
    assert_eq!(*node.addr.ip(), Ipv4Addr::new(90, 90, 90, 90));
    assert_eq!(node.addr.port(), 16705);

    assert_eq!(node.to_compact().as_slice(), data.as_slice());
}

#[test]
fn test_parse_nodes() {
    let a = Node::new(
        NodeId([1u8; 20]),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 6881),
    );
    let b = Node::new(
        NodeId([2u8; 20]),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 6882),
    );

    // every complete chunk is parsed, including the last one
    let data = format_nodes(&[a, b]);
    assert_eq!(data.len(), 52);
    let nodes = parse_nodes(&data).unwrap();
    assert_eq!(nodes, vec![a, b]);

    assert_eq!(format_nodes(&nodes), data);
    assert!(parse_nodes(&[]).unwrap().is_empty());
}

#[test]
fn test_parse_nodes_wrong_size() {
    assert!(matches!(
        parse_nodes(&[0u8; 25]),
        Err(DhtError::InvalidCompactNodes(25))
    ));
    assert!(matches!(
        parse_nodes(&[0u8; 27]),
        Err(DhtError::InvalidCompactNodes(27))
    ));
}

#[test]
fn test_node_validity() {
    let reference = NodeId([7u8; 20]);

    let good = Node::new(
        NodeId([1u8; 20]),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 6881),
    );
    assert!(good.is_valid(&reference));

    let zero_ip = Node::new(
        NodeId([1u8; 20]),
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 6881),
    );
    assert!(!zero_ip.is_valid(&reference));

    let own_id = Node::new(
        reference,
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 6881),
    );
    assert!(!own_id.is_valid(&reference));
}

fn query_datagram(tag: &'static [u8]) -> Vec<u8> {
    let dict = Dict::from_pairs([
        (Bytes::from_static(b"t"), Value::string("aa")),
        (Bytes::from_static(b"y"), Value::Bytes(Bytes::from_static(tag))),
    ]);
    encode(&Value::Dict(dict)).unwrap()
}

fn test_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 6881))
}

#[test]
fn test_register_rejects_multibyte_tag() {
    let mut dispatcher = Dispatcher::new();
    let result = dispatcher.register(b"qq", |_, _| Box::pin(async { Ok(()) }));
    assert!(matches!(result, Err(DhtError::InvalidTag)));

    assert!(dispatcher.register(b"", |_, _| Box::pin(async { Ok(()) })).is_err());
    assert!(dispatcher.register(b"q", |_, _| Box::pin(async { Ok(()) })).is_ok());
}

#[tokio::test]
async fn test_dispatch_routes_by_tag() {
    let queries = Arc::new(AtomicUsize::new(0));
    let responses = Arc::new(AtomicUsize::new(0));

    let mut dispatcher = Dispatcher::new();
    let q = queries.clone();
    dispatcher
        .register(b"q", move |_, _| {
            let q = q.clone();
            Box::pin(async move {
                q.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();
    let r = responses.clone();
    dispatcher
        .register(b"r", move |_, _| {
            let r = r.clone();
            Box::pin(async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();

    dispatcher
        .dispatch(test_addr(), &query_datagram(b"q"))
        .await
        .unwrap();
    dispatcher
        .dispatch(test_addr(), &query_datagram(b"r"))
        .await
        .unwrap();
    dispatcher
        .dispatch(test_addr(), &query_datagram(b"q"))
        .await
        .unwrap();

    assert_eq!(queries.load(Ordering::SeqCst), 2);
    assert_eq!(responses.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispatch_errors() {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register(b"q", |_, _| Box::pin(async { Ok(()) }))
        .unwrap();

    // no handler for this tag
    assert!(dispatcher
        .dispatch(test_addr(), &query_datagram(b"e"))
        .await
        .is_err());

    // not a dict at the top level
    assert!(dispatcher.dispatch(test_addr(), b"i42e").await.is_err());

    // undecodable datagram
    assert!(dispatcher.dispatch(test_addr(), b"x").await.is_err());

    // multi-byte message type
    assert!(dispatcher
        .dispatch(test_addr(), &query_datagram(b"qr"))
        .await
        .is_err());

    // missing message type
    let no_y = encode(&Value::Dict(Dict::from_pairs([(
        Bytes::from_static(b"t"),
        Value::string("aa"),
    )])))
    .unwrap();
    assert!(dispatcher.dispatch(test_addr(), &no_y).await.is_err());
}
