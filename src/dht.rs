//! DHT plumbing (BEP-5): identities, compact nodes, KRPC dispatch, and
//! the shared UDP sender.
//!
//! The crawler does not maintain a routing table. It harvests whatever
//! nodes come back in `find_node` responses, burns through them once per
//! refresh tick, and relies on the Sybil neighbor-id trick to pull
//! `get_peers` and `announce_peer` traffic toward itself. This module
//! provides the pieces that strategy is built from:
//!
//! - [`NodeId`] / [`Node`] - 160-bit identities and the 26-byte compact
//!   wire form
//! - [`Dispatcher`] - routes each decoded datagram to a handler by its
//!   one-byte message type
//! - [`UdpSender`] - a bounded outbound queue draining onto the shared
//!   socket

mod error;
mod krpc;
mod node;
mod sender;

pub use error::DhtError;
pub use krpc::{Dispatcher, Handler, HandlerError, HandlerFuture};
pub use node::{format_nodes, parse_nodes, resolve_node, Node, NodeId, COMPACT_NODE_LEN, ID_LEN};
pub use sender::{Outbound, UdpSender};

#[cfg(test)]
mod tests;
