//! The changegroup wire format: a framed byte stream carrying deltas for
//! several revlogs at once.
//!
//! A stream is a sequence of *chunks*. Each chunk is length-prefixed by a
//! big-endian `u32` that counts the prefix itself, so an empty chunk has
//! length 4 and doubles as the group terminator. The stream layout is one
//! delta group for the changelog, one for the manifest, then for each file a
//! chunk holding its path followed by its delta group, and a final empty
//! path chunk closing the stream.

pub mod packer;
pub mod unpacker;

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::errors::IoErrorContext;
use crate::errors::IoResultExt;
use crate::errors::RevlogError;
use crate::revlog::Node;
use crate::revlog::NODE_BYTES_LENGTH;

pub use packer::Packer;
pub use unpacker::Unpacker;

/// Wire version of a changegroup, fixed once for a whole stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangegroupVersion {
    /// 80-byte chunk headers; the delta base is implicit (the previous
    /// chunk's node, or the revision's first parent for the first chunk).
    V1,
    /// 100-byte chunk headers carrying an explicit delta base.
    V2,
}

impl ChangegroupVersion {
    const fn header_len(self) -> usize {
        match self {
            ChangegroupVersion::V1 => 4 * NODE_BYTES_LENGTH,
            ChangegroupVersion::V2 => 5 * NODE_BYTES_LENGTH,
        }
    }
}

/// One parsed delta chunk of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaChunk {
    pub node: Node,
    pub p1: Node,
    pub p2: Node,
    /// Explicit delta base, only carried by [`ChangegroupVersion::V2`].
    pub delta_base: Option<Node>,
    /// The changelog node this revision is bound to.
    pub link: Node,
    /// Encoded delta turning the base's text into this revision's.
    pub delta: Vec<u8>,
}

impl DeltaChunk {
    /// Parse a chunk payload (header plus delta, the length prefix already
    /// stripped).
    pub fn parse(
        payload: &[u8],
        version: ChangegroupVersion,
    ) -> Result<Self, RevlogError> {
        let header_len = version.header_len();
        if payload.len() < header_len {
            return Err(RevlogError::protocol(format!(
                "changegroup chunk of {} bytes, header needs {}",
                payload.len(),
                header_len,
            )));
        }
        let node_at = |i: usize| {
            Node::from_bytes(
                &payload[i * NODE_BYTES_LENGTH..(i + 1) * NODE_BYTES_LENGTH],
            )
        };
        let (delta_base, link) = match version {
            ChangegroupVersion::V1 => (None, node_at(3)?),
            ChangegroupVersion::V2 => (Some(node_at(3)?), node_at(4)?),
        };
        Ok(DeltaChunk {
            node: node_at(0)?,
            p1: node_at(1)?,
            p2: node_at(2)?,
            delta_base,
            link,
            delta: payload[header_len..].to_vec(),
        })
    }

    /// Write this chunk, length prefix included.
    pub fn write(
        &self,
        version: ChangegroupVersion,
        out: &mut impl Write,
    ) -> Result<(), RevlogError> {
        let mut payload =
            Vec::with_capacity(version.header_len() + self.delta.len());
        payload.extend_from_slice(self.node.as_bytes());
        payload.extend_from_slice(self.p1.as_bytes());
        payload.extend_from_slice(self.p2.as_bytes());
        if version == ChangegroupVersion::V2 {
            // A missing explicit base falls back to the first parent, the
            // same default the implicit-base version starts from.
            let base = self.delta_base.unwrap_or(self.p1);
            payload.extend_from_slice(base.as_bytes());
        }
        payload.extend_from_slice(self.link.as_bytes());
        payload.extend_from_slice(&self.delta);
        write_chunk(out, &payload)
    }
}

/// Write one length-prefixed chunk.
pub(crate) fn write_chunk(
    out: &mut impl Write,
    payload: &[u8],
) -> Result<(), RevlogError> {
    out.write_u32::<BigEndian>(payload.len() as u32 + 4)
        .with_context(|| IoErrorContext::WritingStream)?;
    out.write_all(payload).with_context(|| IoErrorContext::WritingStream)
}

/// Close a group (or the file-name sequence) with an empty chunk.
pub(crate) fn write_terminator(
    out: &mut impl Write,
) -> Result<(), RevlogError> {
    write_chunk(out, b"")
}

/// Read one chunk's payload. `None` is the terminator.
///
/// A length prefix strictly between 0 and 4 can never frame anything and is
/// rejected; 0 is accepted as a terminator for compatibility with writers
/// that do not count the prefix itself.
pub(crate) fn read_chunk(
    stream: &mut impl Read,
) -> Result<Option<Vec<u8>>, RevlogError> {
    let len = stream
        .read_u32::<BigEndian>()
        .map_err(truncated_stream)
        .with_context(|| IoErrorContext::ReadingStream)?;
    if len == 0 || len == 4 {
        return Ok(None);
    }
    if len < 4 {
        return Err(RevlogError::protocol(format!(
            "impossible changegroup chunk length {}",
            len
        )));
    }
    let mut payload = vec![0; len as usize - 4];
    stream
        .read_exact(&mut payload)
        .map_err(truncated_stream)
        .with_context(|| IoErrorContext::ReadingStream)?;
    Ok(Some(payload))
}

fn truncated_stream(error: std::io::Error) -> std::io::Error {
    if error.kind() == ErrorKind::UnexpectedEof {
        std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "changegroup stream ends before its terminator",
        )
    } else {
        error
    }
}
