//! Streaming SHA-224 content hashing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha224};

use filemeta_core::{ContentHash, DIGEST_LEN};

const BUFFER_SIZE: usize = 64 * 1024;

/// Hash the full content of a file without loading it into memory.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    hash_reader(file)
}

/// Hash everything readable from `reader`.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Sha224::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&hasher.finalize());
    Ok(ContentHash::new(bytes))
}
