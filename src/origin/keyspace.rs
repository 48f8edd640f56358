//! Keyspace Generation
//!
//! Builds the origin's immutable key → value map before the socket opens.

use std::collections::HashMap;

use rand::Rng;

/// Characters origin values are drawn from.
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// == Keyspace ==
/// The full origin dataset. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Keyspace {
    values: HashMap<u64, String>,
}

impl Keyspace {
    /// Generates keys `1..=size`, each with a random `value_length` letter string.
    pub fn generate<R: Rng + ?Sized>(size: u64, value_length: usize, rng: &mut R) -> Self {
        let values = (1..=size)
            .map(|key| (key, random_value(value_length, rng)))
            .collect();
        Self { values }
    }

    /// Wraps explicit entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, key: u64) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn random_value<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
