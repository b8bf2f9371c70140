//! The passive crawl engine.
//!
//! The crawler joins the DHT with a random identity, then spends its life
//! doing three things:
//!
//! 1. Every second it burns through its harvested node list, sending each
//!    node a `find_node` query for a fresh random target. The responses
//!    refill the list for the next tick.
//! 2. Inbound `get_peers` queries are answered with a fabricated
//!    neighbor id and a token derived from the info-hash, steering the
//!    peer's follow-up `announce_peer` back to us.
//! 3. Inbound `announce_peer` queries yield info-hashes. New ones go into
//!    the [`HashStore`] and optionally trigger a TCP connect-back that
//!    fetches the torrent metadata over `ut_metadata`.

mod engine;
mod error;
mod fetch;
mod store;

pub use engine::{Crawler, CrawlerOptions, BOOTSTRAP_NODES};
pub use error::CrawlerError;
pub use fetch::MetadataFetcher;
pub use store::{HashStore, InfoHash};

#[cfg(test)]
mod tests;
