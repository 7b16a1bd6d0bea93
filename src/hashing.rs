//! Deterministic hashing. The hashing data structures in the standard library are randomly
//! seeded, which would make iteration order (and therefore any random draws that depend on it)
//! differ between runs. The model only uses the `FxHashMap` re-exported here.
//!
//! `hash_str` is used to derive a per-stream seed offset in `crate::random`.

pub use rustc_hash::FxHashMap as HashMap;
use xxhash_rust::xxh3::xxh3_64;

/// A convenience method to compute a stable hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("PopulationRng");
        let b = hash_str("PopulationRng");
        let c = hash_str("ContactRng");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
