//! Ordered pair serialization
//!
//! The wire form is a sequence of `[key, value]` pairs in head to tail
//! order. Loading replays `set` with [`Touch::None`] in sequence order, which
//! appends every entry at the tail and so rebuilds the same order.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::error::Result;
use crate::map::{OrderedMap, Touch};

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Copy out the entries, head to tail
    pub fn to_pairs(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Clear the map and insert `pairs` in order
    pub fn load_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.clear();
        self.extend(pairs);
        trace!(len = self.len(), "loaded pairs");
    }

    /// Encode the entries as a JSON array of `[key, value]` pairs
    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
        V: Serialize,
    {
        Ok(serde_json::to_string(self)?)
    }

    /// Replace the contents with the pairs decoded from `json`.
    ///
    /// The map is left untouched if decoding fails.
    pub fn load_json(&mut self, json: &str) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        let pairs: Vec<(K, V)> = serde_json::from_str(json)?;
        self.load_pairs(pairs);
        Ok(())
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for entry in self.iter() {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }
}

struct PairsVisitor<K, V> {
    marker: PhantomData<fn() -> OrderedMap<K, V>>,
}

impl<'de, K, V> Visitor<'de> for PairsVisitor<K, V>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de>,
{
    type Value = OrderedMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of [key, value] pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = OrderedMap::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some((key, value)) = seq.next_element::<(K, V)>()? {
            map.set(key, value, Touch::None);
        }
        Ok(map)
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_seq(PairsVisitor {
            marker: PhantomData,
        })
    }
}
