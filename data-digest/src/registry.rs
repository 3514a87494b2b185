use std::collections::BTreeMap;

use digest::DynDigest;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// A streaming digest state, fed consecutive byte windows and consumed
/// exactly once to produce the raw digest bytes.
pub trait DigestAccumulator {
    /// Absorb the next window of the byte sequence.
    fn update(&mut self, bytes: &[u8]);

    /// Finalize the digest, consuming the accumulator.
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// Factory producing a fresh accumulator per computation.
pub type AccumulatorFactory =
    Box<dyn Fn() -> Box<dyn DigestAccumulator> + Send + Sync>;

struct RustCryptoAccumulator(Box<dyn DynDigest>);

impl DigestAccumulator for RustCryptoAccumulator {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

struct Blake3Accumulator(blake3::Hasher);

impl DigestAccumulator for Blake3Accumulator {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().as_bytes().to_vec()
    }
}

struct Crc32Accumulator(crc32fast::Hasher);

impl DigestAccumulator for Crc32Accumulator {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

/// Explicit digest-algorithm capability, passed to the computer instead of
/// being looked up through process-wide state.
///
/// Name matching is exact. [`DigestRegistry::default`] registers
/// `"SHA-256"`, `"SHA-512"`, `"SHA-1"`, `"BLAKE3"` and `"CRC32"`; callers
/// may [`register`](DigestRegistry::register) additional algorithms under
/// any name.
pub struct DigestRegistry {
    factories: BTreeMap<String, AccumulatorFactory>,
}

impl DigestRegistry {
    /// Create an empty registry with no algorithms.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register an algorithm under the given name,
    /// replacing any previous registration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: AccumulatorFactory,
    ) {
        self.factories.insert(name.into(), factory);
    }

    /// Create a fresh accumulator for the named algorithm,
    /// or `None` if the name is not registered.
    pub fn resolve(&self, name: &str) -> Option<Box<dyn DigestAccumulator>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Pure capability query. Never fails.
    pub fn is_supported(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered algorithms, in sorted order.
    pub fn algorithms(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|name| name.as_str())
    }
}

impl Default for DigestRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(
            "SHA-256",
            Box::new(|| {
                Box::new(RustCryptoAccumulator(Box::new(Sha256::default())))
            }),
        );
        registry.register(
            "SHA-512",
            Box::new(|| {
                Box::new(RustCryptoAccumulator(Box::new(Sha512::default())))
            }),
        );
        registry.register(
            "SHA-1",
            Box::new(|| {
                Box::new(RustCryptoAccumulator(Box::new(Sha1::default())))
            }),
        );
        registry.register(
            "BLAKE3",
            Box::new(|| Box::new(Blake3Accumulator(blake3::Hasher::new()))),
        );
        registry.register(
            "CRC32",
            Box::new(|| Box::new(Crc32Accumulator(crc32fast::Hasher::new()))),
        );
        registry
    }
}
