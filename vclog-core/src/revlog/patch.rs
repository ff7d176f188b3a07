//! Parsing and application of binary deltas.
//!
//! Terminology:
//!
//! **Full-text:** a blob of bytes that constitutes a consistent content
//! (usually a revision).
//!
//! **Delta:** a series of [`DeltaPiece`] that can be applied to a full-text
//! to produce another full-text.
//!
//! **Delta chain:** a full-text followed by a list of deltas, applied in
//! order.

use byteorder::BigEndian;
use byteorder::ByteOrder;

use crate::errors::RevlogError;

/// A piece of data to insert, delete or replace in a delta.
///
/// A `DeltaPiece` is:
/// - an insertion when `!data.is_empty() && start == end`
/// - a deletion when `data.is_empty() && start < end`
/// - a replacement when `!data.is_empty() && start < end`
#[derive(Clone)]
pub struct DeltaPiece<'a> {
    /// The start position of the chunk of data to replace
    pub start: u32,
    /// The end position of the chunk of data to replace (open end interval)
    pub end: u32,
    /// The data replacing the chunk
    pub data: &'a [u8],
}

impl DeltaPiece<'_> {
    /// Append the wire encoding of this piece to `out`.
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u32::to_be_bytes(self.start));
        out.extend_from_slice(&u32::to_be_bytes(self.end));
        out.extend_from_slice(&u32::to_be_bytes(self.data.len() as u32));
        out.extend_from_slice(self.data);
    }
}

impl std::fmt::Debug for DeltaPiece<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaPiece")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("size", &self.data.len())
            .finish()
    }
}

/// The delta between two revisions' data.
#[derive(Debug, Clone)]
pub struct Delta<'a> {
    /// Pieces ordered from the left-most replacement to the right-most,
    /// non-overlapping.
    pub pieces: Vec<DeltaPiece<'a>>,
}

impl<'a> Delta<'a> {
    /// Parse a `Delta` from its wire encoding: repeated
    /// `start: u32, end: u32, length: u32, data` groups, big-endian.
    pub fn parse(mut data: &'a [u8]) -> Result<Self, RevlogError> {
        let mut pieces = vec![];
        let mut last_end = 0u32;
        while !data.is_empty() {
            if data.len() < 12 {
                return Err(RevlogError::corrupted(
                    "truncated delta piece header",
                ));
            }
            let start = BigEndian::read_u32(&data[0..]);
            let end = BigEndian::read_u32(&data[4..]);
            let len = BigEndian::read_u32(&data[8..]) as usize;
            if start > end || start < last_end {
                return Err(RevlogError::corrupted(
                    "delta pieces out of order",
                ));
            }
            if data.len() - 12 < len {
                return Err(RevlogError::corrupted(
                    "delta piece data is truncated",
                ));
            }
            pieces.push(DeltaPiece {
                start,
                end,
                data: &data[12..12 + len],
            });
            last_end = end;
            data = &data[12 + len..];
        }
        Ok(Delta { pieces })
    }

    /// A delta for a full snapshot, going from nothing to `data`.
    pub fn full_snapshot(data: &'a [u8]) -> Self {
        Self { pieces: vec![DeltaPiece { start: 0, end: 0, data }] }
    }

    /// Apply the delta to a full-text.
    ///
    /// Fails with an integrity error when a piece references data beyond the
    /// end of the base, which happens with corrupted chains.
    pub fn apply(&self, initial: &[u8]) -> Result<Vec<u8>, RevlogError> {
        let mut result =
            Vec::with_capacity(initial.len() + self.data_len());
        let mut last = 0usize;
        for DeltaPiece { start, end, data } in self.pieces.iter() {
            let (start, end) = (*start as usize, *end as usize);
            if end > initial.len() {
                return Err(RevlogError::corrupted(
                    "delta piece is out of the base's bounds",
                ));
            }
            result.extend_from_slice(&initial[last..start]);
            result.extend_from_slice(data);
            last = end;
        }
        result.extend_from_slice(&initial[last..]);
        Ok(result)
    }

    /// The wire encoding of this delta.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.pieces.len() * 12 + self.data_len());
        for piece in &self.pieces {
            piece.write(&mut out);
        }
        out
    }

    fn data_len(&self) -> usize {
        self.pieces.iter().map(|p| p.data.len()).sum()
    }
}

/// Apply a chain of encoded deltas, in order, to a full-text.
pub fn apply_chain(
    base: &[u8],
    deltas: impl IntoIterator<Item = impl AsRef<[u8]>>,
) -> Result<Vec<u8>, RevlogError> {
    let mut text = base.to_vec();
    for delta in deltas {
        text = Delta::parse(delta.as_ref())?.apply(&text)?;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(start: u32, end: u32, data: &[u8]) -> Vec<u8> {
        Delta { pieces: vec![DeltaPiece { start, end, data }] }.serialize()
    }

    #[test]
    fn test_parse_apply_round_trip() {
        let encoded = piece(4, 7, b"replacement");
        let delta = Delta::parse(&encoded).unwrap();
        assert_eq!(
            delta.apply(b"the quick fox").unwrap(),
            b"the replacementck fox",
        );
        assert_eq!(delta.serialize(), encoded);
    }

    #[test]
    fn test_full_snapshot() {
        let delta = Delta::full_snapshot(b"whole new text");
        assert_eq!(delta.apply(b"").unwrap(), b"whole new text");
    }

    #[test]
    fn test_deletion_and_insertion() {
        // delete "quick ", then insert at the old end
        let mut encoded = piece(4, 10, b"");
        encoded.extend_from_slice(&piece(13, 13, b" jumps"));
        let delta = Delta::parse(&encoded).unwrap();
        assert_eq!(
            delta.apply(b"the quick fox").unwrap(),
            b"the fox jumps",
        );
    }

    #[test]
    fn test_out_of_bounds_piece() {
        let encoded = piece(0, 100, b"x");
        let delta = Delta::parse(&encoded).unwrap();
        assert!(delta.apply(b"short").is_err());
    }

    #[test]
    fn test_malformed_encodings() {
        // truncated header
        assert!(Delta::parse(b"\x00\x00\x00").is_err());
        // start > end
        assert!(Delta::parse(&piece(5, 2, b"")).is_err());
        // data length larger than what remains
        let mut encoded = piece(0, 0, b"");
        let last = encoded.len() - 1;
        encoded[last] = 200;
        assert!(Delta::parse(&encoded).is_err());
    }

    #[test]
    fn test_apply_chain() {
        let first = piece(0, 3, b"a cunning");
        let second = piece(10, 19, b"wolf");
        assert_eq!(
            apply_chain(b"the quick fox", [first, second]).unwrap(),
            b"a cunning wolf",
        );
    }
}
