use sha2::Digest as _;

/// Incremental hash state. Bytes are fed as they stream past and the
/// digest is produced once at the end.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

pub struct Sha256Hasher(sha2::Sha256);

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256Hasher {
    pub fn new() -> Self { Self(sha2::Sha256::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha256::digest(data).to_vec() }
}

pub struct Sha512Hasher(sha2::Sha512);

impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Sha512Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha512Hasher {
    pub fn new() -> Self { Self(sha2::Sha512::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha512::digest(data).to_vec() }
}

/// Hasher picked at runtime from a [`DigestAlgorithm`](crate::DigestAlgorithm).
pub enum AnyHasher {
    Sha256(Sha256Hasher),
    Sha512(Sha512Hasher),
}

impl Hasher for AnyHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            AnyHasher::Sha256(h) => h.update(data),
            AnyHasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            AnyHasher::Sha256(h) => h.finalize(),
            AnyHasher::Sha512(h) => h.finalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hasher() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello world");
        let hash = hasher.finalize();

        let expected =
            hex::decode("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_sha256_chunked_matches_one_shot() {
        let data: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();

        let mut hasher = Sha256Hasher::new();
        for chunk in data.chunks(777) {
            hasher.update(chunk);
        }

        assert_eq!(hasher.finalize(), Sha256Hasher::digest(&data));
    }

    #[test]
    fn test_sha512_length() {
        let mut hasher = Sha512Hasher::new();
        hasher.update(b"hello world");
        assert_eq!(hasher.finalize().len(), 64);
    }

    #[test]
    fn test_any_hasher_dispatch() {
        let mut hasher = AnyHasher::Sha512(Sha512Hasher::new());
        hasher.update(b"abc");
        assert_eq!(hasher.finalize(), Sha512Hasher::digest(b"abc"));
    }

    #[test]
    fn test_empty_input() {
        let hasher = Sha256Hasher::new();
        assert_eq!(
            hex::encode(hasher.finalize()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
