use super::error::CrawlerError;
use super::fetch::MetadataFetcher;
use super::store::{HashStore, InfoHash};
use crate::bencode::{Dict, Value};
use crate::dht::{
    parse_nodes, resolve_node, Dispatcher, Node, NodeId, Outbound, UdpSender,
};
use bytes::Bytes;
use futures::future::join_all;
use parking_lot::Mutex;
use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Well-known entry points into the DHT.
pub const BOOTSTRAP_NODES: &[(&str, u16)] = &[
    ("router.bittorrent.com", 6881),
    ("dht.transmissionbt.com", 6881),
];

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Announce tokens are the first two bytes of the info-hash they cover.
const TOKEN_LEN: usize = 2;

/// Knobs the reference implementation hard-codes, surfaced to the caller.
#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    /// UDP port to crawl from.
    pub port: u16,
    /// Capacity of the outbound datagram queue.
    pub queue_size: usize,
    /// Frame bound for peer wire sessions.
    pub max_frame: usize,
    /// Whether new hashes trigger a metadata connect-back.
    pub fetch_metadata: bool,
    /// TCP dial deadline for connect-backs.
    pub dial_timeout: Duration,
    /// Overall deadline for one metadata session.
    pub fetch_timeout: Duration,
    /// Concurrent connect-back sessions.
    pub max_fetch_workers: usize,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            port: 6881,
            queue_size: 8192,
            max_frame: 512 * 1024,
            fetch_metadata: true,
            dial_timeout: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(15),
            max_fetch_workers: 64,
        }
    }
}

/// The crawl engine.
///
/// Holds the crawler's identity, the candidate node list the refresh tick
/// feeds on, the outbound sender, and the hash store. Handlers run on the
/// socket read loop; the candidate list is the only state they share with
/// the tick, and it is mutex-guarded.
pub struct Crawler {
    our_id: NodeId,
    sender: UdpSender,
    store: Arc<HashStore>,
    candidates: Mutex<Vec<Node>>,
    fetcher: MetadataFetcher,
    fetch_permits: Arc<Semaphore>,
    fetch_metadata: bool,
}

impl Crawler {
    pub fn new(sender: UdpSender, store: Arc<HashStore>, options: &CrawlerOptions) -> Self {
        Self {
            our_id: NodeId::random(),
            sender,
            store,
            candidates: Mutex::new(Vec::new()),
            fetcher: MetadataFetcher::new(
                options.dial_timeout,
                options.fetch_timeout,
                options.max_frame,
            ),
            fetch_permits: Arc::new(Semaphore::new(options.max_fetch_workers)),
            fetch_metadata: options.fetch_metadata,
        }
    }

    /// The identity this crawler joined the DHT with.
    pub fn our_id(&self) -> &NodeId {
        &self.our_id
    }

    /// The hash store receiving announced info-hashes.
    pub fn store(&self) -> &Arc<HashStore> {
        &self.store
    }

    /// Number of candidate nodes queued for the next refresh tick.
    pub fn candidate_count(&self) -> usize {
        self.candidates.lock().len()
    }

    /// Resolves the bootstrap seeds.
    ///
    /// Seeds that fail to resolve are logged and skipped; at least one
    /// must survive.
    pub async fn bootstrap(&self) -> Result<Vec<Node>, CrawlerError> {
        let lookups = BOOTSTRAP_NODES
            .iter()
            .map(|(host, port)| resolve_node(host, *port));

        let mut seeds = Vec::with_capacity(BOOTSTRAP_NODES.len());
        for ((host, _), result) in BOOTSTRAP_NODES.iter().zip(join_all(lookups).await) {
            match result {
                Ok(node) => seeds.push(node),
                Err(e) => warn!("could not resolve bootstrap seed {}: {}", host, e),
            }
        }

        if seeds.is_empty() {
            return Err(crate::dht::DhtError::ResolveFailed("all bootstrap seeds".into()).into());
        }
        Ok(seeds)
    }

    /// Builds a dispatcher with this crawler's query, response, and error
    /// handlers registered.
    pub fn dispatcher(self: Arc<Self>) -> Result<Dispatcher, CrawlerError> {
        let mut dispatcher = Dispatcher::new();

        let crawler = self.clone();
        dispatcher.register(b"q", move |from, dict| {
            let crawler = crawler.clone();
            Box::pin(async move { Ok(crawler.handle_query(from, dict).await?) })
        })?;

        let crawler = self.clone();
        dispatcher.register(b"r", move |from, dict| {
            let crawler = crawler.clone();
            Box::pin(async move { Ok(crawler.handle_response(from, dict).await?) })
        })?;

        let crawler = self.clone();
        dispatcher.register(b"e", move |from, dict| {
            let crawler = crawler.clone();
            Box::pin(async move { Ok(crawler.handle_error(from, dict).await?) })
        })?;

        Ok(dispatcher)
    }

    /// Runs the crawl until the socket fails.
    ///
    /// One task, two duties: datagrams are read, decoded, and dispatched
    /// in arrival order; once a second the refresh tick rewrites the
    /// candidate list and launches the next `find_node` wave. Bad
    /// datagrams are logged and dropped; only a socket error ends the
    /// loop.
    pub async fn run(self: Arc<Self>, socket: Arc<UdpSocket>) -> Result<(), CrawlerError> {
        let dispatcher = self.clone().dispatcher()?;
        let seeds = self.bootstrap().await?;
        info!(
            "crawling as {} with {} bootstrap seeds",
            self.our_id,
            seeds.len()
        );

        *self.candidates.lock() = seeds.clone();

        let mut tick = tokio::time::interval(REFRESH_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut buf = vec![0u8; 64 * 1024];
        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    let (n, from) = result?;
                    if let Err(e) = dispatcher.dispatch(from, &buf[..n]).await {
                        debug!("dropping datagram from {}: {}", from, e);
                    }
                }
                _ = tick.tick() => {
                    self.refresh(&seeds).await;
                }
            }
        }
    }

    /// One refresh tick: swap the candidate list for a fresh copy of the
    /// seeds, then query every valid node from the old list. Candidates
    /// live exactly one tick; whatever the wave attracts refills the list.
    async fn refresh(&self, seeds: &[Node]) {
        let snapshot = mem::replace(&mut *self.candidates.lock(), seeds.to_vec());

        for node in snapshot {
            if node.is_valid(&self.our_id) {
                self.send_find_node(&node).await;
            } else {
                debug!("skipping invalid candidate {:?}", node);
            }
        }
    }

    async fn send_find_node(&self, node: &Node) {
        let target = NodeId::random();
        let tid: [u8; TOKEN_LEN] = rand::random();

        let args = Dict::from_pairs([
            (
                Bytes::from_static(b"id"),
                Value::Bytes(Bytes::copy_from_slice(self.our_id.as_bytes())),
            ),
            (
                Bytes::from_static(b"target"),
                Value::Bytes(Bytes::copy_from_slice(target.as_bytes())),
            ),
        ]);
        let query = Dict::from_pairs([
            (Bytes::from_static(b"a"), Value::Dict(args)),
            (Bytes::from_static(b"q"), Value::string("find_node")),
            (
                Bytes::from_static(b"t"),
                Value::Bytes(Bytes::copy_from_slice(&tid)),
            ),
            (Bytes::from_static(b"y"), Value::string("q")),
        ]);

        self.sender
            .send(Outbound {
                data: query,
                to: node.socket_addr(),
            })
            .await;
    }

    /// Response handler: harvest the compact node list into candidates.
    pub async fn handle_response(
        &self,
        _from: SocketAddr,
        dict: Dict,
    ) -> Result<(), CrawlerError> {
        let response = dict
            .get(b"r")
            .and_then(|v| v.as_dict())
            .ok_or(CrawlerError::MissingKey("r"))?;
        let compact = response
            .get(b"nodes")
            .and_then(|v| v.as_bytes())
            .ok_or(CrawlerError::MissingKey("nodes"))?;

        let nodes = parse_nodes(compact)?;

        let mut candidates = self.candidates.lock();
        candidates.extend(nodes.into_iter().filter(|n| n.is_valid(&self.our_id)));
        Ok(())
    }

    /// Query handler: `get_peers` and `announce_peer` get answers, anything
    /// else is an error the read loop logs.
    pub async fn handle_query(&self, from: SocketAddr, dict: Dict) -> Result<(), CrawlerError> {
        let query = dict
            .get(b"q")
            .and_then(|v| v.as_bytes())
            .ok_or(CrawlerError::MissingKey("q"))?;

        match query.as_ref() {
            b"get_peers" => self.handle_get_peers(from, &dict).await,
            b"announce_peer" => self.handle_announce_peer(from, &dict).await,
            other => Err(CrawlerError::UnknownQuery(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Error handler: log and drop.
    pub async fn handle_error(&self, from: SocketAddr, dict: Dict) -> Result<(), CrawlerError> {
        debug!("dht error message from {}: {:?}", from, dict.get(b"e"));
        Ok(())
    }

    async fn handle_get_peers(&self, from: SocketAddr, dict: &Dict) -> Result<(), CrawlerError> {
        let query = GetPeersQuery::parse(dict)?;

        let reply = get_peers_reply(query.tid, &query.info_hash, &query.requester_id);
        self.sender.send(Outbound { data: reply, to: from }).await;
        Ok(())
    }

    async fn handle_announce_peer(
        &self,
        from: SocketAddr,
        dict: &Dict,
    ) -> Result<(), CrawlerError> {
        let query = AnnounceQuery::parse(dict)?;

        if query.token.as_ref() != &query.info_hash[..TOKEN_LEN] {
            return Err(CrawlerError::InvalidToken);
        }

        let port = if query.implied_port != 0 {
            from.port() as i64
        } else {
            query.port
        };
        if !(1..65536).contains(&port) {
            return Err(CrawlerError::InvalidPort(port));
        }

        let reply = announce_peer_reply(query.tid, &query.info_hash, &query.requester_id);
        self.sender.send(Outbound { data: reply, to: from }).await;

        let hash = InfoHash(query.info_hash);
        let peer_addr = SocketAddr::new(from.ip(), port as u16);
        if self.store.insert(hash, peer_addr) && self.fetch_metadata {
            self.spawn_fetch(hash, peer_addr);
        }
        Ok(())
    }

    /// Launches a connect-back session for a freshly observed hash.
    ///
    /// The session runs on its own task under the worker-cap semaphore;
    /// its outcome only ever affects itself.
    fn spawn_fetch(&self, hash: InfoHash, peer: SocketAddr) {
        let fetcher = self.fetcher.clone();
        let permits = self.fetch_permits.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match fetcher.fetch(hash, peer).await {
                Ok(metadata) => info!("fetched {} bytes of metadata for {}", metadata.len(), hash),
                Err(e) => debug!("metadata fetch for {} from {} failed: {}", hash, peer, e),
            }
        });
    }
}

struct GetPeersQuery {
    tid: Bytes,
    info_hash: [u8; 20],
    requester_id: NodeId,
}

impl GetPeersQuery {
    fn parse(dict: &Dict) -> Result<Self, CrawlerError> {
        let tid = transaction_id(dict)?;
        let args = query_args(dict)?;
        Ok(Self {
            tid,
            info_hash: info_hash(args)?,
            requester_id: requester_id(args)?,
        })
    }
}

struct AnnounceQuery {
    tid: Bytes,
    info_hash: [u8; 20],
    requester_id: NodeId,
    token: Bytes,
    port: i64,
    implied_port: i64,
}

impl AnnounceQuery {
    fn parse(dict: &Dict) -> Result<Self, CrawlerError> {
        let tid = transaction_id(dict)?;
        let args = query_args(dict)?;
        let token = args
            .get(b"token")
            .and_then(|v| v.as_bytes())
            .cloned()
            .ok_or(CrawlerError::MissingKey("token"))?;
        let port = args
            .get(b"port")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);
        let implied_port = args
            .get(b"implied_port")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);
        Ok(Self {
            tid,
            info_hash: info_hash(args)?,
            requester_id: requester_id(args)?,
            token,
            port,
            implied_port,
        })
    }
}

fn transaction_id(dict: &Dict) -> Result<Bytes, CrawlerError> {
    dict.get(b"t")
        .and_then(|v| v.as_bytes())
        .cloned()
        .ok_or(CrawlerError::MissingKey("t"))
}

fn query_args(dict: &Dict) -> Result<&Dict, CrawlerError> {
    dict.get(b"a")
        .and_then(|v| v.as_dict())
        .ok_or(CrawlerError::MissingKey("a"))
}

fn info_hash(args: &Dict) -> Result<[u8; 20], CrawlerError> {
    args.get(b"info_hash")
        .and_then(|v| v.as_bytes())
        .ok_or(CrawlerError::MissingKey("info_hash"))?
        .as_ref()
        .try_into()
        .map_err(|_| CrawlerError::WrongLength("info_hash"))
}

fn requester_id(args: &Dict) -> Result<NodeId, CrawlerError> {
    let id = args
        .get(b"id")
        .and_then(|v| v.as_bytes())
        .ok_or(CrawlerError::MissingKey("id"))?;
    Ok(NodeId::from_bytes(id)?)
}

/// Builds the reply to a `get_peers` query.
///
/// The id is a neighbor of the queried hash, the node list is empty, and
/// the token is the hash's first two bytes -- the same token
/// `announce_peer` must echo back.
pub(super) fn get_peers_reply(tid: Bytes, info_hash: &[u8; 20], requester_id: &NodeId) -> Dict {
    let body = Dict::from_pairs([
        (
            Bytes::from_static(b"id"),
            Value::Bytes(Bytes::copy_from_slice(
                NodeId::neighbor(info_hash, requester_id).as_bytes(),
            )),
        ),
        (Bytes::from_static(b"nodes"), Value::Bytes(Bytes::new())),
        (
            Bytes::from_static(b"token"),
            Value::Bytes(Bytes::copy_from_slice(&info_hash[..TOKEN_LEN])),
        ),
    ]);
    Dict::from_pairs([
        (Bytes::from_static(b"r"), Value::Dict(body)),
        (Bytes::from_static(b"t"), Value::Bytes(tid)),
        (Bytes::from_static(b"y"), Value::string("r")),
    ])
}

/// Builds the reply to an `announce_peer` query.
pub(super) fn announce_peer_reply(tid: Bytes, info_hash: &[u8; 20], requester_id: &NodeId) -> Dict {
    let body = Dict::from_pairs([(
        Bytes::from_static(b"id"),
        Value::Bytes(Bytes::copy_from_slice(
            NodeId::neighbor(info_hash, requester_id).as_bytes(),
        )),
    )]);
    Dict::from_pairs([
        (Bytes::from_static(b"r"), Value::Dict(body)),
        (Bytes::from_static(b"t"), Value::Bytes(tid)),
        (Bytes::from_static(b"y"), Value::string("r")),
    ])
}
