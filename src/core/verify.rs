//! BLAKE3 hashing of copied files for verification records.

use std::io::BufRead;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a staged file's contents. Returns `"blake3:{hex}"`, the form
/// recorded in manifest entries.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {} for verification: {}", path.display(), e))?;
    let mut reader = std::io::BufReader::with_capacity(STREAM_BUF_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    loop {
        let chunk = reader
            .fill_buf()
            .map_err(|e| format!("cannot read {} for verification: {}", path.display(), e))?;
        if chunk.is_empty() {
            break;
        }
        hasher.update(chunk);
        let consumed = chunk.len();
        reader.consume(consumed);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}
