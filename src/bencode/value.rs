use bytes::Bytes;

/// A bencode value.
///
/// Bencode has four data types: integers, byte strings, lists, and
/// dictionaries. This enum represents any bencode value and provides
/// methods for type-safe access.
///
/// # Examples
///
/// ```
/// use magpie::bencode::Value;
///
/// let int = Value::Integer(42);
/// let string = Value::string("hello");
///
/// assert_eq!(int.as_integer(), Some(42));
/// assert_eq!(string.as_str(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A signed 64-bit integer.
    Integer(i64),
    /// A byte string (may or may not be valid UTF-8).
    Bytes(Bytes),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A dictionary with byte string keys in lexicographic order.
    Dict(Dict),
}

impl Value {
    /// Creates a byte string value from a UTF-8 string.
    pub fn string(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Returns the value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a byte string, if it is one.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a UTF-8 string, if it is a valid UTF-8 byte string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the value as a list, if it is one.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the value as a dictionary reference, if it is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Consumes the value and returns the dictionary, if it is one.
    ///
    /// This avoids cloning the dictionary when you need ownership.
    pub fn into_dict(self) -> Option<Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up a key in this value if it is a dictionary.
    ///
    /// Returns `None` if the value is not a dictionary or if the key is
    /// not present.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie::bencode::decode;
    ///
    /// let value = decode(b"d3:foo3:bare").unwrap();
    /// assert_eq!(value.get(b"foo").and_then(|v| v.as_str()), Some("bar"));
    /// assert_eq!(value.get(b"missing"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

/// A bencode dictionary: a sequence of key/value pairs ordered by key.
///
/// Unlike a map type, `Dict` keeps its pairs in an explicit order. The wire
/// format requires keys in lexicographic byte order, which [`Dict::from_pairs`]
/// and [`Dict::put`] maintain; decoding preserves whatever order the input
/// had, so re-encoding a decoded value reproduces the input byte-for-byte.
///
/// Two dictionaries are equal iff their key sequences and values are
/// pairwise equal, which is exactly equality of their canonical encodings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dict {
    pairs: Vec<(Bytes, Value)>,
}

impl Dict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from key/value pairs, sorting them by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie::bencode::{encode, Dict, Value};
    /// use bytes::Bytes;
    ///
    /// let dict = Dict::from_pairs([
    ///     (Bytes::from_static(b"spam"), Value::Integer(1)),
    ///     (Bytes::from_static(b"cow"), Value::string("moo")),
    /// ]);
    /// assert_eq!(encode(&Value::Dict(dict)).unwrap(), b"d3:cow3:moo4:spami1ee");
    /// ```
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Bytes, Value)>,
    {
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self { pairs }
    }

    /// Inserts a key/value pair, keeping the pairs sorted.
    ///
    /// The position is found by binary search; an existing key has its
    /// value replaced in place.
    pub fn put(&mut self, key: Bytes, value: Value) {
        match self.index_of(&key) {
            Ok(idx) => self.pairs[idx].1 = value,
            Err(idx) => self.pairs.insert(idx, (key, value)),
        }
    }

    /// Looks up a key by binary search.
    ///
    /// Lookups assume canonical key order, which holds for every dictionary
    /// built through [`Dict::from_pairs`]/[`Dict::put`] and for conforming
    /// wire input.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.index_of(key).ok().map(|idx| &self.pairs[idx].1)
    }

    // Appends a pair without re-sorting; the decoder uses this to keep
    // wire order.
    pub(crate) fn push(&mut self, key: Bytes, value: Value) {
        self.pairs.push((key, value));
    }

    fn index_of(&self, key: &[u8]) -> Result<usize, usize> {
        self.pairs.binary_search_by(|(k, _)| k.as_ref().cmp(key))
    }

    /// Iterates over the pairs in their stored order.
    pub fn iter(&self) -> std::slice::Iter<'_, (Bytes, Value)> {
        self.pairs.iter()
    }

    /// Iterates over the keys in their stored order.
    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.pairs.iter().map(|(k, _)| k)
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the dictionary has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = &'a (Bytes, Value);
    type IntoIter = std::slice::Iter<'a, (Bytes, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

impl FromIterator<(Bytes, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Bytes, Value)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
