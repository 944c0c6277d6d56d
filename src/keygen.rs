//! Access-key generation.
//!
//! Keys are short uppercase-alphanumeric tokens granting a participant
//! access to their certificate. Uniqueness is checked against the caller's
//! taken-key set here and enforced again by the store's UNIQUE constraint
//! at commit time; the generator itself reserves nothing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const DEFAULT_KEY_LENGTH: usize = 8;

/// Generates candidate access keys from an injectable random source.
///
/// Tests seed the RNG for determinism; production use draws from OS entropy.
#[derive(Debug)]
pub struct KeyGenerator<R> {
    rng: R,
    length: usize,
}

impl KeyGenerator<StdRng> {
    pub fn new(length: usize) -> Self {
        Self::with_rng(StdRng::from_entropy(), length)
    }
}

impl<R: Rng> KeyGenerator<R> {
    pub fn with_rng(rng: R, length: usize) -> Self {
        Self { rng, length }
    }

    /// Draw one candidate key of the configured length.
    pub fn candidate(&mut self) -> String {
        (0..self.length)
            .map(|_| {
                let idx = self.rng.gen_range(0..ALPHABET.len());
                ALPHABET[idx] as char
            })
            .collect()
    }

    /// Draw candidates until one is absent from `taken`.
    ///
    /// No retry bound: with a 36^length keyspace, collisions are rare and
    /// import favors correctness over latency. The caller is responsible
    /// for inserting the returned key into `taken` once it is staged.
    pub fn next_unused(&mut self, taken: &std::collections::HashSet<String>) -> String {
        loop {
            let key = self.candidate();
            if !taken.contains(&key) {
                return key;
            }
        }
    }
}
