//! Streaming SHA-256 checksums.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::Digest;
use sha2::Sha256;

use crate::CancelToken;
use crate::Result;

/// Computes the SHA-256 checksum of a file by streaming fixed-size chunks.
///
/// The file is never buffered whole; multi-gigabyte archives hash in
/// constant memory. The cancellation token is polled at every chunk
/// boundary.
///
/// # Errors
///
/// Returns `VerifyError::Io` if the file cannot be read and
/// `VerifyError::Interrupted` if the token is set mid-stream.
///
/// # Examples
///
/// ```no_run
/// use restcheck_core::CancelToken;
/// use restcheck_core::hash::sha256_file;
/// use std::path::Path;
///
/// # fn main() -> restcheck_core::Result<()> {
/// let digest = sha256_file(Path::new("backup.tar.gz"), 8192, &CancelToken::new())?;
/// assert_eq!(digest.len(), 64);
/// # Ok(())
/// # }
/// ```
pub fn sha256_file(path: &Path, chunk_size: usize, cancel: &CancelToken) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        cancel.check()?;
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::VerifyError;
    use std::io::Write;

    #[test]
    fn test_sha256_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"abc")
            .unwrap();

        let digest = sha256_file(&path, 8192, &CancelToken::new()).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_chunking_is_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data = vec![0x5au8; 10_000];
        std::fs::write(&path, &data).unwrap();

        let small = sha256_file(&path, 7, &CancelToken::new()).unwrap();
        let large = sha256_file(&path, 64 * 1024, &CancelToken::new()).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_sha256_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"payload").unwrap();

        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            sha256_file(&path, 8192, &token),
            Err(VerifyError::Interrupted)
        ));
    }

    #[test]
    fn test_sha256_missing_file() {
        let result = sha256_file(Path::new("/nonexistent/file"), 8192, &CancelToken::new());
        assert!(matches!(result, Err(VerifyError::Io(_))));
    }
}
