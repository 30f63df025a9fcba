//! Streaming file digests.

use crate::error::{FsError, IoContext};
use crate::types::HashAlgorithm;
use md5::Md5;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK: usize = 64 * 1024;

/// Lowercase hex digest of the file at `path`.
pub fn hash_file(path: &str, algorithm: HashAlgorithm) -> Result<String, FsError> {
    let file = File::open(Path::new(path))
        .context(|| format!("Cannot open file for hashing: {}", path))?;
    hash_reader(file, algorithm).context(|| format!("Error reading file: {}", path))
}

pub fn hash_reader<R: Read>(reader: R, algorithm: HashAlgorithm) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => digest::<Md5, R>(reader),
        HashAlgorithm::Sha224 => digest::<Sha224, R>(reader),
        HashAlgorithm::Sha256 => digest::<Sha256, R>(reader),
        HashAlgorithm::Sha384 => digest::<Sha384, R>(reader),
        HashAlgorithm::Sha512 => digest::<Sha512, R>(reader),
        HashAlgorithm::Crc32 => {
            let mut hasher = crc32fast::Hasher::new();
            for_each_chunk(reader, |chunk| hasher.update(chunk))?;
            Ok(format!("{:08x}", hasher.finalize()))
        }
    }
}

fn digest<D: Digest, R: Read>(reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    for_each_chunk(reader, |chunk| hasher.update(chunk))?;
    Ok(hex::encode(hasher.finalize()))
}

fn for_each_chunk<R: Read>(mut reader: R, mut f: impl FnMut(&[u8])) -> std::io::Result<()> {
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        f(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(data: &[u8], algorithm: HashAlgorithm) -> String {
        hash_reader(data, algorithm).unwrap()
    }

    #[test]
    fn known_digests_of_abc() {
        assert_eq!(hash(b"abc", HashAlgorithm::Md5), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            hash(b"abc", HashAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash(b"abc", HashAlgorithm::Crc32), "352441c2");
    }

    #[test]
    fn digest_lengths_match_algorithms() {
        assert_eq!(hash(b"", HashAlgorithm::Sha224).len(), 56);
        assert_eq!(hash(b"", HashAlgorithm::Sha384).len(), 96);
        assert_eq!(hash(b"", HashAlgorithm::Sha512).len(), 128);
    }

    #[test]
    fn chunking_does_not_change_the_digest() {
        let data = vec![42u8; CHUNK * 2 + 7];
        let expected = hex::encode(Sha256::digest(&data));
        assert_eq!(hash(&data, HashAlgorithm::Sha256), expected);
    }
}
