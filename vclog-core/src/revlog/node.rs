//! Definitions and utilities for revision nodes.
//!
//! A node is the binary digest identifying one revision: its content plus
//! its two parent nodes.

use std::fmt;

use crate::errors::RevlogError;

/// The length in bytes of a [`Node`].
///
/// This constant is meant to ease refactors of this module, and calling code
/// should not assume all nodes have this size should several formats be
/// supported concurrently in the future.
pub const NODE_BYTES_LENGTH: usize = 20;

/// The length in hexadecimal digits of a [`Node`].
pub const NODE_HEX_LENGTH: usize = 2 * NODE_BYTES_LENGTH;

type NodeData = [u8; NODE_BYTES_LENGTH];

/// Binary revision digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node {
    data: NodeData,
}

/// The node value for the null revision.
///
/// Also doubles as the "missing parent" marker.
pub const NULL_NODE: Node = Node { data: [0; NODE_BYTES_LENGTH] };

impl From<NodeData> for Node {
    fn from(data: NodeData) -> Node {
        Node { data }
    }
}

impl Node {
    /// Build a node from exactly [`NODE_BYTES_LENGTH`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Node, RevlogError> {
        let data: NodeData = bytes.try_into().map_err(|_| {
            RevlogError::corrupted(format!(
                "node length is {} instead of {}",
                bytes.len(),
                NODE_BYTES_LENGTH,
            ))
        })?;
        Ok(Node { data })
    }

    /// Convert from hexadecimal string representation. Exact length is
    /// required.
    pub fn from_hex(hex: impl AsRef<[u8]>) -> Result<Node, RevlogError> {
        let hex = hex.as_ref();
        if hex.len() != NODE_HEX_LENGTH {
            return Err(RevlogError::corrupted(format!(
                "node hex length is {} instead of {}",
                hex.len(),
                NODE_HEX_LENGTH,
            )));
        }
        let mut data = [0; NODE_BYTES_LENGTH];
        for (i, chunk) in hex.chunks(2).enumerate() {
            data[i] = hex_digit(chunk[0])? << 4 | hex_digit(chunk[1])?;
        }
        Ok(Node { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The first hexadecimal digits, as used in diagnostics.
    pub fn short(&self) -> String {
        format!("{:x}", ShortFmt(self))
    }

    pub fn is_null(&self) -> bool {
        *self == NULL_NODE
    }
}

fn hex_digit(digit: u8) -> Result<u8, RevlogError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(RevlogError::corrupted(format!(
            "invalid hex digit {:#x} in node",
            digit,
        ))),
    }
}

struct ShortFmt<'a>(&'a Node);

impl fmt::LowerHex for ShortFmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0.data[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.data {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:x})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> Node {
        let mut data = [0; NODE_BYTES_LENGTH];
        data.copy_from_slice(&[
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc,
            0xba, 0x98, 0x76, 0x54, 0x32, 0x10, 0xde, 0xad, 0xbe, 0xef,
        ]);
        data.into()
    }

    const SAMPLE_HEX: &str = "0123456789abcdeffedcba9876543210deadbeef";

    #[test]
    fn test_node_from_hex() {
        assert_eq!(Node::from_hex(SAMPLE_HEX).unwrap(), sample_node());
        assert!(Node::from_hex(&SAMPLE_HEX[..10]).is_err());
        assert!(Node::from_hex("012... oops, not hex at all, and too short")
            .is_err());
    }

    #[test]
    fn test_node_encode_hex() {
        assert_eq!(format!("{:x}", sample_node()), SAMPLE_HEX);
        assert_eq!(sample_node().short(), &SAMPLE_HEX[..12]);
    }

    #[test]
    fn test_null_node() {
        assert!(NULL_NODE.is_null());
        assert!(!sample_node().is_null());
        assert_eq!(
            format!("{:x}", NULL_NODE),
            "0000000000000000000000000000000000000000",
        );
    }
}
