//! UID-hash sharding.

use crate::ConfigError;

/// 64-bit FNV-1a over the UID string.
pub fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

/// Selects the objects owned by one shard: `fnv1a64(uid) % total == shard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shard: u32,
    total: u32,
}

impl Default for ShardSelector {
    fn default() -> Self { Self { shard: 0, total: 1 } }
}

impl ShardSelector {
    pub fn new(shard: u32, total: u32) -> Result<Self, ConfigError> {
        if total == 0 || shard >= total {
            return Err(ConfigError::InvalidShard { shard, total });
        }
        Ok(Self { shard, total })
    }

    pub fn shard(&self) -> u32 { self.shard }
    pub fn total(&self) -> u32 { self.total }

    /// Single-shard selection admits everything without hashing.
    pub fn is_identity(&self) -> bool { self.total <= 1 }

    pub fn owns(&self, uid: &str) -> bool {
        if self.is_identity() {
            return true;
        }
        fnv1a64(uid) % self.total as u64 == self.shard as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_shards() {
        assert!(ShardSelector::new(0, 0).is_err());
        assert!(ShardSelector::new(2, 2).is_err());
        assert!(ShardSelector::new(1, 2).is_ok());
    }

    #[test]
    fn exactly_one_shard_owns_each_uid() {
        for total in 1..=7u32 {
            let shards: Vec<_> = (0..total).map(|s| ShardSelector::new(s, total).unwrap()).collect();
            for n in 0..200 {
                let uid = format!("00000000-0000-0000-0000-{:012}", n);
                assert_eq!(shards.iter().filter(|s| s.owns(&uid)).count(), 1, "uid {} total {}", uid, total);
            }
        }
    }

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a64(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a64("a"), 0xaf63dc4c8601ec8c);
    }
}
