//! Canonical byte-tree encoding and convenience string radixes.
//!
//! Every element serializes to a length-prefixed, self-describing byte
//! tree. The encoding is unique per value, so downstream callers (proof
//! transcripts, hash chains, audit logs) can hash it canonically.

use crate::Error;
use base64::Engine;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::convert::TryFrom;

/// Wire tag for a byte-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
enum ByteTreeTag {
    Leaf = 0,
    Node = 1,
}

/// A self-describing tree of byte strings.
///
/// Wire format per node: 1 tag byte, then a 4-byte big-endian count
/// (payload length for leaves, child count for nodes), then the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteTree {
    Leaf(Vec<u8>),
    Node(Vec<ByteTree>),
}

impl ByteTree {
    pub fn leaf(bytes: impl Into<Vec<u8>>) -> Self {
        ByteTree::Leaf(bytes.into())
    }

    pub fn node(children: Vec<ByteTree>) -> Self {
        ByteTree::Node(children)
    }

    /// Serialize the whole tree.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ByteTree::Leaf(bytes) => {
                out.push(ByteTreeTag::Leaf.into());
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
            ByteTree::Node(children) => {
                out.push(ByteTreeTag::Node.into());
                out.extend_from_slice(&(children.len() as u32).to_be_bytes());
                for child in children {
                    child.encode_into(out);
                }
            }
        }
    }

    /// Deserialize a tree, rejecting trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (tree, consumed) = Self::decode_at(bytes)?;
        if consumed != bytes.len() {
            return Err(Error::MalformedByteTree("trailing bytes"));
        }
        Ok(tree)
    }

    fn decode_at(bytes: &[u8]) -> Result<(Self, usize), Error> {
        if bytes.len() < 5 {
            return Err(Error::MalformedByteTree("truncated header"));
        }
        let tag = ByteTreeTag::try_from(bytes[0])
            .map_err(|_| Error::MalformedByteTree("unknown node tag"))?;
        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&bytes[1..5]);
        let count = u32::from_be_bytes(count_bytes) as usize;

        match tag {
            ByteTreeTag::Leaf => {
                if bytes.len() < 5 + count {
                    return Err(Error::MalformedByteTree("truncated leaf payload"));
                }
                let payload = bytes[5..5 + count].to_vec();
                Ok((ByteTree::Leaf(payload), 5 + count))
            }
            ByteTreeTag::Node => {
                let mut children = Vec::with_capacity(count);
                let mut offset = 5;
                for _ in 0..count {
                    let (child, consumed) = Self::decode_at(&bytes[offset..])?;
                    children.push(child);
                    offset += consumed;
                }
                Ok((ByteTree::Node(children), offset))
            }
        }
    }

    /// The leaf payload, if this is a leaf.
    pub fn as_leaf(&self) -> Option<&[u8]> {
        match self {
            ByteTree::Leaf(bytes) => Some(bytes),
            ByteTree::Node(_) => None,
        }
    }

    /// The children, if this is an inner node.
    pub fn as_node(&self) -> Option<&[ByteTree]> {
        match self {
            ByteTree::Leaf(_) => None,
            ByteTree::Node(children) => Some(children),
        }
    }
}

/// Display radixes for byte strings.
///
/// Convenience-only: renderings are not canonical across radixes, the byte
/// tree is the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Hex,
    Base64,
}

impl Radix {
    pub fn render(&self, bytes: &[u8]) -> String {
        match self {
            Radix::Binary => bytes.iter().map(|b| format!("{:08b}", b)).collect(),
            Radix::Hex => hex::encode(bytes),
            Radix::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn parse(&self, s: &str) -> Result<Vec<u8>, Error> {
        match self {
            Radix::Binary => {
                if s.len() % 8 != 0 {
                    return Err(Error::MalformedEncoding {
                        radix: "binary",
                        message: "length not a multiple of 8".to_string(),
                    });
                }
                s.as_bytes()
                    .chunks(8)
                    .map(|chunk| {
                        let chunk = std::str::from_utf8(chunk).map_err(|e| {
                            Error::MalformedEncoding {
                                radix: "binary",
                                message: e.to_string(),
                            }
                        })?;
                        u8::from_str_radix(chunk, 2).map_err(|e| Error::MalformedEncoding {
                            radix: "binary",
                            message: e.to_string(),
                        })
                    })
                    .collect()
            }
            Radix::Hex => hex::decode(s).map_err(|e| Error::MalformedEncoding {
                radix: "hex",
                message: e.to_string(),
            }),
            Radix::Base64 => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| Error::MalformedEncoding {
                    radix: "base64",
                    message: e.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let tree = ByteTree::node(vec![
            ByteTree::leaf(vec![1, 2, 3]),
            ByteTree::node(vec![ByteTree::leaf(vec![]), ByteTree::leaf(vec![255])]),
        ]);
        let bytes = tree.encode();
        assert_eq!(ByteTree::decode(&bytes).unwrap(), tree);
    }

    #[test]
    fn distinct_trees_encode_distinctly() {
        let a = ByteTree::leaf(vec![0]);
        let b = ByteTree::leaf(vec![0, 0]);
        let c = ByteTree::node(vec![ByteTree::leaf(vec![0])]);
        assert_ne!(a.encode(), b.encode());
        assert_ne!(a.encode(), c.encode());
        assert_ne!(b.encode(), c.encode());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(ByteTree::decode(&[]).is_err());
        // unknown tag
        assert!(ByteTree::decode(&[2, 0, 0, 0, 0]).is_err());
        // truncated leaf
        assert!(ByteTree::decode(&[0, 0, 0, 0, 4, 1, 2]).is_err());
        // trailing bytes
        let mut bytes = ByteTree::leaf(vec![7]).encode();
        bytes.push(0);
        assert!(ByteTree::decode(&bytes).is_err());
    }

    #[test]
    fn radixes() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        for radix in [Radix::Binary, Radix::Hex, Radix::Base64] {
            let rendered = radix.render(&bytes);
            assert_eq!(radix.parse(&rendered).unwrap(), bytes);
        }
        assert_eq!(Radix::Hex.render(&bytes), "deadbeef");
        assert_eq!(Radix::Binary.render(&[5]), "00000101");
        assert!(Radix::Hex.parse("zz").is_err());
        assert!(Radix::Binary.parse("0101").is_err());
    }
}
