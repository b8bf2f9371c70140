use super::error::DhtError;
use crate::bencode::{decode, Dict};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

/// Error type handlers may return; the read loop only logs it, so any
/// error works.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The boxed future a handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// An async handler for one KRPC message type.
pub type Handler = Box<dyn Fn(SocketAddr, Dict) -> HandlerFuture + Send + Sync>;

/// Routes decoded KRPC messages to handlers by their one-byte type tag.
///
/// Every DHT datagram is a bencoded dictionary whose `y` key names its
/// type: `q` for queries, `r` for responses, `e` for errors. The
/// dispatcher decodes one dictionary per datagram and hands it to the
/// handler registered for that tag. Every failure shape -- undecodable
/// datagram, non-dictionary top level, missing or multi-byte `y`, missing
/// handler -- surfaces as an error for the caller to log; none of them
/// may kill the read loop.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u8, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a message type tag.
    ///
    /// The tag must be exactly one byte (`b"q"`, `b"r"`, or `b"e"` in
    /// practice); anything else is rejected.
    pub fn register<F>(&mut self, tag: &[u8], handler: F) -> Result<(), DhtError>
    where
        F: Fn(SocketAddr, Dict) -> HandlerFuture + Send + Sync + 'static,
    {
        if tag.len() != 1 {
            return Err(DhtError::InvalidTag);
        }
        self.handlers.insert(tag[0], Box::new(handler));
        Ok(())
    }

    /// Decodes one datagram and dispatches it to the matching handler.
    pub async fn dispatch(&self, from: SocketAddr, data: &[u8]) -> Result<(), HandlerError> {
        let dict = decode(data)
            .map_err(DhtError::from)?
            .into_dict()
            .ok_or_else(|| DhtError::InvalidMessage("top-level value is not a dict".into()))?;

        let tag = {
            let tag = dict
                .get(b"y")
                .and_then(|v| v.as_bytes())
                .ok_or_else(|| DhtError::InvalidMessage("missing message type".into()))?;
            if tag.len() != 1 {
                return Err(
                    DhtError::InvalidMessage("message type is not a single byte".into()).into(),
                );
            }
            tag[0]
        };

        let handler = self.handlers.get(&tag).ok_or(DhtError::NoHandler(tag))?;
        handler(from, dict).await
    }
}
