use super::error::DhtError;
use rand::Rng as _;
use sha1::{Digest, Sha1};
use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};

/// Length of a node id or info-hash in bytes.
pub const ID_LEN: usize = 20;

/// Length of a node in compact wire form: `id(20) || ipv4(4) || port(2)`.
pub const COMPACT_NODE_LEN: usize = 26;

/// A 160-bit DHT node identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; ID_LEN]);

impl NodeId {
    /// Generates a fresh, well-distributed id: the SHA-1 of 20 random
    /// bytes. Used for the crawler's own identity and `find_node` targets.
    pub fn random() -> Self {
        let mut seed = [0u8; ID_LEN];
        rand::rng().fill(&mut seed[..]);
        Self(Sha1::digest(seed).into())
    }

    /// Creates an id from a byte slice, requiring exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DhtError> {
        if bytes.len() != ID_LEN {
            return Err(DhtError::InvalidNodeId);
        }
        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Fabricates an identity close to `target` in XOR distance: the
    /// target's first half spliced onto our own second half. Replying
    /// with this id makes the queried peer believe we are among the
    /// nodes responsible for `target`, so its follow-up `announce_peer`
    /// comes to us.
    pub fn neighbor(target: &[u8; ID_LEN], own: &NodeId) -> Self {
        let mut id = [0u8; ID_LEN];
        id[..ID_LEN / 2].copy_from_slice(&target[..ID_LEN / 2]);
        id[ID_LEN / 2..].copy_from_slice(&own.0[ID_LEN / 2..]);
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A DHT node: a 160-bit id plus an IPv4 socket address.
///
/// The crawler speaks udp4 only, so the address is a `SocketAddrV4` and
/// the compact form is always producible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub addr: SocketAddrV4,
}

impl Node {
    pub fn new(id: NodeId, addr: SocketAddrV4) -> Self {
        Self { id, addr }
    }

    /// Parses a node from its 26-byte compact form.
    pub fn from_compact(data: &[u8]) -> Result<Self, DhtError> {
        if data.len() != COMPACT_NODE_LEN {
            return Err(DhtError::InvalidCompactNodes(data.len()));
        }

        let id = NodeId::from_bytes(&data[..ID_LEN])?;
        let ip = std::net::Ipv4Addr::new(data[20], data[21], data[22], data[23]);
        let port = u16::from_be_bytes([data[24], data[25]]);

        Ok(Self::new(id, SocketAddrV4::new(ip, port)))
    }

    /// Serializes the node to its 26-byte compact form.
    pub fn to_compact(&self) -> [u8; COMPACT_NODE_LEN] {
        let mut compact = [0u8; COMPACT_NODE_LEN];
        compact[..ID_LEN].copy_from_slice(&self.id.0);
        compact[20..24].copy_from_slice(&self.addr.ip().octets());
        compact[24..26].copy_from_slice(&self.addr.port().to_be_bytes());
        compact
    }

    /// A node is worth querying iff its IP is routable (not 0.0.0.0) and
    /// its id is not `reference` -- peers echoing our own identity back
    /// at us are useless as neighbors.
    pub fn is_valid(&self, reference: &NodeId) -> bool {
        !self.addr.ip().is_unspecified() && self.id != *reference
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.addr)
    }
}

/// Parses a compact node string into nodes.
///
/// The input length must be a multiple of 26; every chunk is parsed.
pub fn parse_nodes(data: &[u8]) -> Result<Vec<Node>, DhtError> {
    if data.len() % COMPACT_NODE_LEN != 0 {
        return Err(DhtError::InvalidCompactNodes(data.len()));
    }
    data.chunks_exact(COMPACT_NODE_LEN)
        .map(Node::from_compact)
        .collect()
}

/// Serializes nodes to a compact node string.
pub fn format_nodes(nodes: &[Node]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nodes.len() * COMPACT_NODE_LEN);
    for node in nodes {
        out.extend_from_slice(&node.to_compact());
    }
    out
}

/// Resolves a bootstrap hostname to a node with a fresh random id.
///
/// Takes the first IPv4 address the resolver returns.
pub async fn resolve_node(host: &str, port: u16) -> Result<Node, DhtError> {
    let addrs = tokio::net::lookup_host((host, port)).await?;
    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Ok(Node::new(NodeId::random(), v4));
        }
    }
    Err(DhtError::ResolveFailed(host.to_string()))
}
