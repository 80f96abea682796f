//! Shard mappings: routing key to group name.
//!
//! A mapping holds the lower bound of every shard. A key belongs to the
//! shard with the greatest lower bound not above it. Bounds are kept in
//! sorted maps, so lookups do not depend on the order shards were added.
//!
//! | Kind | Key | Bound | Below the smallest bound |
//! |------|-----|-------|--------------------------|
//! | [`Range`](MappingKind::Range) | integer | integer | error |
//! | [`RangeString`](MappingKind::RangeString) | text | text, byte order | error |
//! | [`Hash`](MappingKind::Hash) | text, hashed | `u64` ring position | wraps to the largest bound |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use crate::error::ShardError;

/// How a mapping interprets keys and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// Integer ranges.
    Range,
    /// Lexicographic string ranges.
    RangeString,
    /// Ranges over the SHA-1 hash of the key.
    Hash,
}

impl MappingKind {
    /// Name as used by directory services.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Range => "RANGE",
            Self::RangeString => "RANGE_STRING",
            Self::Hash => "HASH",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RANGE" | "RANGE_INTEGER" => Ok(Self::Range),
            "RANGE_STRING" => Ok(Self::RangeString),
            "HASH" => Ok(Self::Hash),
            _ => Err(format!("unknown mapping kind: {s}")),
        }
    }
}

/// Position of a key on the hash ring: the first 8 bytes of its SHA-1
/// digest, big-endian.
#[must_use]
pub fn hash_key(key: &str) -> u64 {
    let digest = Sha1::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[derive(Debug, Clone)]
enum Bounds {
    Integer(BTreeMap<i64, String>),
    Text(BTreeMap<String, String>),
    Hash(BTreeMap<u64, String>),
}

/// A shard mapping.
#[derive(Debug, Clone)]
pub struct ShardMapping {
    id: u32,
    global_group: String,
    bounds: Bounds,
}

impl ShardMapping {
    /// Create an empty mapping.
    ///
    /// `global_group` serves operations not tied to a shard key.
    pub fn new(id: u32, kind: MappingKind, global_group: impl Into<String>) -> Self {
        let bounds = match kind {
            MappingKind::Range => Bounds::Integer(BTreeMap::new()),
            MappingKind::RangeString => Bounds::Text(BTreeMap::new()),
            MappingKind::Hash => Bounds::Hash(BTreeMap::new()),
        };
        Self {
            id,
            global_group: global_group.into(),
            bounds,
        }
    }

    /// Add a shard by its lower bound.
    ///
    /// Integer bounds are decimal; hash bounds are a ring position written
    /// as up to 16 hex digits. A bound given twice keeps the later group.
    pub fn add_shard(
        &mut self,
        lower_bound: &str,
        group: impl Into<String>,
    ) -> Result<&mut Self, ShardError> {
        let group = group.into();
        match &mut self.bounds {
            Bounds::Integer(map) => {
                map.insert(parse_integer(lower_bound)?, group);
            }
            Bounds::Text(map) => {
                map.insert(lower_bound.to_string(), group);
            }
            Bounds::Hash(map) => {
                let position =
                    u64::from_str_radix(lower_bound, 16).map_err(|e| ShardError::InvalidKey {
                        key: lower_bound.to_string(),
                        reason: format!("hash bound is not hex: {e}"),
                    })?;
                map.insert(position, group);
            }
        }
        Ok(self)
    }

    /// Builder form of [`add_shard`](Self::add_shard).
    pub fn with_shard(
        mut self,
        lower_bound: &str,
        group: impl Into<String>,
    ) -> Result<Self, ShardError> {
        self.add_shard(lower_bound, group)?;
        Ok(self)
    }

    /// Mapping identifier.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Mapping kind.
    #[must_use]
    pub fn kind(&self) -> MappingKind {
        match self.bounds {
            Bounds::Integer(_) => MappingKind::Range,
            Bounds::Text(_) => MappingKind::RangeString,
            Bounds::Hash(_) => MappingKind::Hash,
        }
    }

    /// Group for operations not tied to a shard key.
    #[must_use]
    pub fn global_group(&self) -> &str {
        &self.global_group
    }

    /// Number of shards.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.bounds {
            Bounds::Integer(map) => map.len(),
            Bounds::Text(map) => map.len(),
            Bounds::Hash(map) => map.len(),
        }
    }

    /// Whether the mapping has no shards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every group a key can resolve to, in bound order.
    pub fn groups(&self) -> Vec<&str> {
        match &self.bounds {
            Bounds::Integer(map) => map.values().map(String::as_str).collect(),
            Bounds::Text(map) => map.values().map(String::as_str).collect(),
            Bounds::Hash(map) => map.values().map(String::as_str).collect(),
        }
    }

    /// Resolve a key to its group name.
    pub fn group_for(&self, key: &str) -> Result<&str, ShardError> {
        let found = match &self.bounds {
            Bounds::Integer(map) => {
                let key = parse_integer(key)?;
                map.range(..=key).next_back().map(|(_, group)| group)
            }
            Bounds::Text(map) => map
                .range::<str, _>((std::ops::Bound::Unbounded, std::ops::Bound::Included(key)))
                .next_back()
                .map(|(_, group)| group),
            Bounds::Hash(map) => {
                let position = hash_key(key);
                map.range(..=position)
                    .next_back()
                    .or_else(|| map.iter().next_back())
                    .map(|(_, group)| group)
            }
        };
        found.map(String::as_str).ok_or_else(|| ShardError::NoShardForKey {
            key: key.to_string(),
            mapping: self.id,
        })
    }
}

fn parse_integer(value: &str) -> Result<i64, ShardError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| ShardError::InvalidKey {
            key: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn range() -> ShardMapping {
        ShardMapping::new(1, MappingKind::Range, "global")
            .with_shard("1", "g1")
            .unwrap()
            .with_shard("1000", "g2")
            .unwrap()
            .with_shard("10000", "g3")
            .unwrap()
    }

    #[test]
    fn test_range_lookup() {
        let mapping = range();
        assert_eq!(mapping.group_for("1").unwrap(), "g1");
        assert_eq!(mapping.group_for("999").unwrap(), "g1");
        assert_eq!(mapping.group_for("1000").unwrap(), "g2");
        assert_eq!(mapping.group_for(" 5000 ").unwrap(), "g2");
        assert_eq!(mapping.group_for("9223372036854775807").unwrap(), "g3");
    }

    #[test]
    fn test_range_below_first_bound() {
        assert!(matches!(
            range().group_for("0"),
            Err(ShardError::NoShardForKey { mapping: 1, .. })
        ));
    }

    #[test]
    fn test_range_rejects_non_integer_key() {
        assert!(matches!(
            range().group_for("abc"),
            Err(ShardError::InvalidKey { .. })
        ));
        let mut mapping = ShardMapping::new(2, MappingKind::Range, "global");
        assert!(mapping.add_shard("1.5", "g").is_err());
    }

    #[test]
    fn test_lookup_is_independent_of_insertion_order() {
        let reversed = ShardMapping::new(1, MappingKind::Range, "global")
            .with_shard("10000", "g3")
            .unwrap()
            .with_shard("1000", "g2")
            .unwrap()
            .with_shard("1", "g1")
            .unwrap();
        let forward = range();
        for key in ["1", "500", "1000", "1001", "20000"] {
            assert_eq!(forward.group_for(key).unwrap(), reversed.group_for(key).unwrap());
        }
        assert_eq!(reversed.groups(), vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn test_range_string_lookup() {
        let mapping = ShardMapping::new(3, MappingKind::RangeString, "global")
            .with_shard("a", "early")
            .unwrap()
            .with_shard("m", "late")
            .unwrap();
        assert_eq!(mapping.group_for("alice").unwrap(), "early");
        assert_eq!(mapping.group_for("m").unwrap(), "late");
        assert_eq!(mapping.group_for("zed").unwrap(), "late");
        assert!(matches!(
            mapping.group_for("Alice"),
            Err(ShardError::NoShardForKey { .. })
        ));
    }

    #[test]
    fn test_hash_wraps_around() {
        let key = "customer-42";
        let position = hash_key(key);
        let above = format!("{:x}", position.saturating_add(1));

        let mapping = ShardMapping::new(4, MappingKind::Hash, "global")
            .with_shard(&above, "high")
            .unwrap();
        // below the only bound: wraps to the largest
        assert_eq!(mapping.group_for(key).unwrap(), "high");

        let exact = format!("{position:x}");
        let mapping = mapping.with_shard(&exact, "exact").unwrap();
        assert_eq!(mapping.group_for(key).unwrap(), "exact");
    }

    #[test]
    fn test_hash_is_stable() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(hash_key("abc"), 0xa999_3e36_4706_816a);

        let mapping = ShardMapping::new(5, MappingKind::Hash, "global")
            .with_shard("0", "a")
            .unwrap()
            .with_shard("8000000000000000", "b")
            .unwrap();
        assert_eq!(mapping.group_for("abc").unwrap(), "b");
        assert_eq!(mapping.group_for("abc").unwrap(), mapping.group_for("abc").unwrap());
    }

    #[test]
    fn test_empty_mapping() {
        let mapping = ShardMapping::new(6, MappingKind::Hash, "global");
        assert!(mapping.is_empty());
        assert!(matches!(
            mapping.group_for("x"),
            Err(ShardError::NoShardForKey { .. })
        ));
        assert_eq!(mapping.global_group(), "global");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("range".parse::<MappingKind>().unwrap(), MappingKind::Range);
        assert_eq!("RANGE_STRING".parse::<MappingKind>().unwrap(), MappingKind::RangeString);
        assert_eq!("Hash".parse::<MappingKind>().unwrap(), MappingKind::Hash);
        assert!("list".parse::<MappingKind>().is_err());
        assert_eq!(MappingKind::RangeString.to_string(), "RANGE_STRING");
    }
}
