/// Number of hex characters kept by [`short_hash`].
pub const SHORT_HASH_LEN: usize = 7;

/// Compute a short content hash: the first [`SHORT_HASH_LEN`] lowercase hex
/// characters of the BLAKE3 digest.
#[must_use]
pub fn short_hash(data: &[u8]) -> String {
    let hex = blake3::hash(data).to_hex();
    hex.as_str()[..SHORT_HASH_LEN].to_string()
}
