//! Computing deltas between two full-texts.
//!
//! The produced delta is a single replacement piece covering everything
//! between the common prefix and the common suffix of the two texts. Any
//! delta that reconstructs the target is acceptable to the storage format;
//! chain growth is bounded by the full-text cutover in `add_revision`, not
//! by how tight individual deltas are.

use super::patch::Delta;
use super::patch::DeltaPiece;

/// Compute an encoded delta turning `old` into `new`.
///
/// Identical inputs produce an empty delta.
pub fn diff(old: &[u8], new: &[u8]) -> Vec<u8> {
    if old == new {
        return Vec::new();
    }
    let shortest = old.len().min(new.len());

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // Align the cut to a line boundary when there is one, so that deltas of
    // line-oriented content stay readable in debug dumps.
    let prefix = match memrchr_newline(&old[..prefix]) {
        Some(position) => position + 1,
        None => prefix,
    };

    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
        .min(shortest - prefix);

    let delta = Delta {
        pieces: vec![DeltaPiece {
            start: prefix as u32,
            end: (old.len() - suffix) as u32,
            data: &new[prefix..new.len() - suffix],
        }],
    };
    delta.serialize()
}

fn memrchr_newline(data: &[u8]) -> Option<usize> {
    data.iter().rposition(|&byte| byte == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revlog::patch::Delta;

    fn apply(old: &[u8], delta: &[u8]) -> Vec<u8> {
        Delta::parse(delta).unwrap().apply(old).unwrap()
    }

    #[test]
    fn test_identical_texts_give_empty_delta() {
        assert!(diff(b"same\n", b"same\n").is_empty());
    }

    #[test]
    fn test_diff_reconstructs_target() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"", b"something"),
            (b"something", b""),
            (b"alpha\n", b"alpha\nbeta\n"),
            (b"alpha\nbeta\n", b"alpha\n"),
            (b"a\nb\nc\n", b"a\nx\nc\n"),
            (b"abc", b"xbc"),
            (b"abc", b"abx"),
            (b"\x00\x01\x02", b"\x00\xff\x02"),
        ];
        for (old, new) in cases {
            let delta = diff(old, new);
            assert_eq!(&apply(old, &delta), new, "{:?} -> {:?}", old, new);
        }
    }

    #[test]
    fn test_append_only_change_keeps_prefix() {
        let old = b"line one\nline two\n";
        let new = b"line one\nline two\nline three\n";
        let delta = diff(old, new);
        assert_eq!(apply(old, &delta), new);
        // the unchanged prefix is not re-sent
        assert!(delta.len() < new.len() + 12);
    }
}
