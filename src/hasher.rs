//! Byte hashers: the digest contract and the default polynomial hash.

/// Maps a byte sequence to an unsigned digest.
///
/// Implementations must be pure: the same bytes always produce the same
/// digest and no table state is consulted. The table folds the digest into
/// a bucket index itself, so a hasher never needs to know the capacity.
///
/// Any `Fn(&[u8]) -> u64` is a `ByteHasher`, which makes plain functions
/// and closures usable directly:
///
/// ```
/// use chain_hashmap::ChainHashMap;
///
/// fn first_byte(bytes: &[u8]) -> u64 {
///     bytes.first().copied().unwrap_or(0) as u64
/// }
///
/// let mut m = ChainHashMap::with_hasher(4, first_byte).unwrap();
/// m.insert(b"apple", b"red").unwrap();
/// assert_eq!(m.lookup(b"apple"), Some(&b"red"[..]));
/// ```
pub trait ByteHasher {
    fn digest(&self, bytes: &[u8]) -> u64;
}

impl<F> ByteHasher for F
where
    F: Fn(&[u8]) -> u64,
{
    #[inline]
    fn digest(&self, bytes: &[u8]) -> u64 {
        self(bytes)
    }
}

/// Polynomial rolling hash: `sum(b[i] * PRIME^i mod MODULUS)`.
///
/// Each term is reduced before it is added; the sum itself uses wrapping
/// addition, so very long keys wrap instead of overflowing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PolynomialHasher;

impl PolynomialHasher {
    pub const PRIME: u64 = 251;
    pub const MODULUS: u64 = 1_000_000_009;
}

impl ByteHasher for PolynomialHasher {
    fn digest(&self, bytes: &[u8]) -> u64 {
        let mut digest = 0u64;
        let mut power = 1u64;
        for &b in bytes {
            // power < MODULUS, so neither product can overflow u64.
            digest = digest.wrapping_add((b as u64 * power) % Self::MODULUS);
            power = (power * Self::PRIME) % Self::MODULUS;
        }
        digest
    }
}
