use sha2::{Digest, Sha256};
use sqlx::PgExecutor;
use syncd_core::SyncError;

/// A content fingerprint: a SHA-256 digest (hex-encoded, lowercase) paired
/// with the byte length. Uniqueness is on the pair, not the hash alone, to
/// cheapen the index and immunize against deliberate length-preserving
/// collisions (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash_hex: String,
    pub size_bytes: i64,
}

/// Computes the fixed-length fingerprint of a fully-buffered download.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    Fingerprint {
        hash_hex: hex::encode(digest),
        size_bytes: bytes.len() as i64,
    }
}

/// Queries the processed-file ledger for a prior successful commit of this
/// (hash, size) pair. A positive hit means the caller should skip decoding
/// entirely (spec §4.4).
pub async fn seen<'e, E>(executor: E, schema: &str, fp: &Fingerprint) -> Result<bool, SyncError>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {schema}.processed_file WHERE file_hash = $1 AND file_size_bytes = $2 AND status = 'Success')"
    );
    let exists: (bool,) = sqlx::query_as(&query)
        .bind(&fp.hash_hex)
        .bind(fp.size_bytes)
        .fetch_one(executor)
        .await?;
    Ok(exists.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_by_content() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello worlD");
        assert_ne!(a.hash_hex, b.hash_hex);
    }

    #[test]
    fn fingerprint_tracks_byte_length() {
        let fp = fingerprint(b"abcd");
        assert_eq!(fp.size_bytes, 4);
    }
}
