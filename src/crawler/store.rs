use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use tracing::info;

/// A 20-byte torrent info-hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    /// Creates an info-hash from a byte slice, requiring exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 20 {
            return None;
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(bytes);
        Some(Self(hash))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The set of info-hashes observed over the crawl's lifetime.
///
/// Append-only and keyed by the raw 20 bytes; the first insertion of a
/// hash is the observable "new hash" event and is logged.
#[derive(Default)]
pub struct HashStore {
    seen: Mutex<HashSet<[u8; 20]>>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hash announced by `from`.
    ///
    /// Returns `true` iff the hash had not been seen before.
    pub fn insert(&self, hash: InfoHash, from: SocketAddr) -> bool {
        let new = self.seen.lock().insert(hash.0);
        if new {
            info!("new hash {} announced by {}", hash, from);
        }
        new
    }

    /// Returns `true` if the hash has been observed.
    pub fn contains(&self, hash: &InfoHash) -> bool {
        self.seen.lock().contains(&hash.0)
    }

    /// Number of distinct hashes observed so far.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
