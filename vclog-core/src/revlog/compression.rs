//! Helpers around whole-buffer revlog compression.
//!
//! Stored chunks are tagged by their first byte:
//!
//! - `b'\0'`: an empty or NUL-leading chunk, stored as-is
//! - `b'u'`: incompressible data, stored raw after the tag byte
//! - `b'x'`: zlib data (the tag is the RFC 1950 magic itself)
//!
//! The escape hatch guarantees incompressible input never grows by more than
//! the one tag byte.

use std::io::Read;

use flate2::read::ZlibDecoder;
use flate2::read::ZlibEncoder;
use flate2::Compression;

use crate::errors::RevlogError;

/// Header byte of zlib-compressed chunks (RFC 1950 magic).
pub const ZLIB_BYTE: u8 = b'x';
/// Header byte marking a chunk stored raw.
pub const STORED_BYTE: u8 = b'u';

pub const ZLIB_DEFAULT_LEVEL: u32 = 6;

/// Compress a chunk for storage, tagging it as described in the module doc.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>, RevlogError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut compressed = Vec::with_capacity(data.len());
    ZlibEncoder::new(data, Compression::new(level))
        .read_to_end(&mut compressed)
        .map_err(|e| RevlogError::corrupted(e.to_string()))?;
    if compressed.len() < data.len() {
        return Ok(compressed);
    }
    if data[0] == b'\0' {
        // The decompression dispatch reads a leading NUL as "the chunk is
        // the data", so no escape byte is needed.
        Ok(data.to_vec())
    } else {
        let mut stored = Vec::with_capacity(data.len() + 1);
        stored.push(STORED_BYTE);
        stored.extend_from_slice(data);
        Ok(stored)
    }
}

/// Inverse of [`compress`]. Unknown tags are a protocol violation, a broken
/// zlib stream is corruption.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, RevlogError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    match data[0] {
        b'\0' => Ok(data.to_vec()),
        STORED_BYTE => Ok(data[1..].to_vec()),
        ZLIB_BYTE => {
            let mut decompressed = Vec::with_capacity(data.len() * 2);
            ZlibDecoder::new(data)
                .read_to_end(&mut decompressed)
                .map_err(|e| {
                    RevlogError::corrupted(format!(
                        "zlib chunk does not decompress: {}",
                        e
                    ))
                })?;
            Ok(decompressed)
        }
        unknown => Err(RevlogError::protocol(format!(
            "unknown compression tag {:#x}",
            unknown
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_compressible() {
        let data = b"the quick brown fox ".repeat(64);
        let stored = compress(&data, ZLIB_DEFAULT_LEVEL).unwrap();
        assert_eq!(stored[0], ZLIB_BYTE);
        assert!(stored.len() < data.len());
        assert_eq!(decompress(&stored).unwrap(), data);
    }

    #[test]
    fn test_incompressible_input_is_stored_raw() {
        // Too short for zlib to win.
        let data = b"abc";
        let stored = compress(data, ZLIB_DEFAULT_LEVEL).unwrap();
        assert_eq!(stored[0], STORED_BYTE);
        assert_eq!(stored.len(), data.len() + 1);
        assert_eq!(decompress(&stored).unwrap(), data);
    }

    #[test]
    fn test_nul_leading_input_is_its_own_tag() {
        let data = b"\0binary";
        let stored = compress(data, ZLIB_DEFAULT_LEVEL).unwrap();
        assert_eq!(stored, data);
        assert_eq!(decompress(&stored).unwrap(), data);
    }

    #[test]
    fn test_empty() {
        assert_eq!(compress(b"", ZLIB_DEFAULT_LEVEL).unwrap(), b"");
        assert_eq!(decompress(b"").unwrap(), b"");
    }

    #[test]
    fn test_unknown_tag() {
        match decompress(b"zzz") {
            Err(RevlogError::Protocol(_)) => (),
            other => panic!("expected a protocol error, got {:?}", other.ok()),
        }
    }
}
