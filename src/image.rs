//! Raw binary images.
//!
//! An image is a headerless byte dump of the start of the address space:
//! byte `i` of the file lands at address `i`. There is no relocation,
//! checksum or metadata, so any file up to 64KB is a valid image.

use crate::cpu::MEMORY_SIZE;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Read an image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len(),
        });
    }

    log::debug!("read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Write `bytes` to disk as an image.
pub fn save_image<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    let path = path.as_ref();
    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len(),
        });
    }

    std::fs::write(path, bytes).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size} bytes, larger than the {}-byte address space", .path.display(), MEMORY_SIZE)]
    TooLarge { path: PathBuf, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sea16-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_image_roundtrip() {
        let path = temp_path("roundtrip.bin");
        save_image(&path, &[0xd9, 0x01, 0x42]).unwrap();

        let bytes = load_image(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bytes, vec![0xd9, 0x01, 0x42]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_image(temp_path("does-not-exist.bin")).unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }

    #[test]
    fn test_oversized_file() {
        let path = temp_path("oversized.bin");
        std::fs::write(&path, vec![0u8; MEMORY_SIZE + 1]).unwrap();

        let err = load_image(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ImageError::TooLarge { size, .. } if size == MEMORY_SIZE + 1));
    }
}
