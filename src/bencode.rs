//! Bencode encoding and decoding (BEP-3)
//!
//! Bencode is the encoding used by BitTorrent for storing and transmitting
//! loosely structured data; every DHT datagram and extension-protocol
//! payload in this crate passes through it.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::{encode, encode_to};
pub use error::BencodeError;
pub use value::{Dict, Value};
