//! magpie - a passive BitTorrent Mainline DHT crawler
//!
//! magpie joins the DHT overlay ([BEP-5]) with random identities,
//! attracts `get_peers` and `announce_peer` traffic with a Sybil-style
//! neighbor-id trick, and harvests the info-hashes real peers announce.
//! Announcing peers can be dialed back over TCP to pull the torrent
//! metadata through the extension protocol ([BEP-10], [BEP-9]).
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`bitfield`] - packed bit array for peer-wire state and reserved bits
//! - [`peer`] - peer wire protocol, extension protocol, metadata exchange
//! - [`dht`] - node identities, compact nodes, KRPC dispatch, UDP sender
//! - [`crawler`] - the crawl engine and hash store
//!
//! # Getting Started
//!
//! ```no_run
//! use magpie::crawler::{Crawler, CrawlerOptions, HashStore};
//! use magpie::dht::UdpSender;
//! use std::sync::Arc;
//! use tokio::net::UdpSocket;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CrawlerOptions::default();
//! let socket = Arc::new(UdpSocket::bind(("0.0.0.0", options.port)).await?);
//!
//! let sender = UdpSender::spawn(socket.clone(), options.queue_size);
//! let store = Arc::new(HashStore::new());
//! let crawler = Arc::new(Crawler::new(sender, store, &options));
//!
//! crawler.run(socket).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [BEP-5]: http://bittorrent.org/beps/bep_0005.html
//! [BEP-9]: http://bittorrent.org/beps/bep_0009.html
//! [BEP-10]: http://bittorrent.org/beps/bep_0010.html

pub mod bencode;
pub mod bitfield;
pub mod crawler;
pub mod dht;
pub mod peer;

pub use bencode::{decode, encode, BencodeError, Dict, Value};
pub use bitfield::Bitfield;
pub use crawler::{Crawler, CrawlerError, CrawlerOptions, HashStore, InfoHash, MetadataFetcher};
pub use dht::{DhtError, Dispatcher, Node, NodeId, Outbound, UdpSender};
pub use peer::{
    ExtensionHandshake, Handshake, Message, MetadataMessage, PeerError, PeerId, PeerTransport,
};
