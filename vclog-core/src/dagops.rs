//! Miscellaneous DAG operations over revision numbers.

use crate::ancestors::AncestorsIterator;
use crate::revlog::BaseRevision;
use crate::Graph;
use crate::GraphError;
use crate::Revision;
use crate::NULL_REVISION;

/// Revisions of `graph` without any recorded child, in ascending order.
///
/// `len` is the number of revisions in the graph, which a bare [`Graph`]
/// does not know about.
pub fn heads(
    graph: impl Graph,
    len: usize,
) -> Result<Vec<Revision>, GraphError> {
    let mut has_child = vec![false; len];
    let mut heads = Vec::new();
    for r in (0..len as BaseRevision).rev() {
        let rev = Revision(r);
        if !has_child[r as usize] {
            heads.push(rev);
        }
        for parent in graph.parents(rev)? {
            if parent != NULL_REVISION {
                has_child[parent.0 as usize] = true;
            }
        }
    }
    heads.reverse();
    Ok(heads)
}

/// The revisions that are both descendants of a root and ancestors of a
/// head, in topological (ascending) order, together with the roots and
/// heads that effectively contributed.
///
/// `None` on either side means "unconstrained": all of history for roots
/// (equivalent to rooting at the null revision), the graph's heads for
/// heads. Roots that reach no head and heads not reachable from any root
/// are pruned from the returned pair.
pub fn nodes_between(
    graph: impl Graph,
    len: usize,
    roots: Option<&[Revision]>,
    heads: Option<&[Revision]>,
) -> Result<(Vec<Revision>, Vec<Revision>, Vec<Revision>), GraphError> {
    let used_heads: Vec<Revision> = match heads {
        Some(heads) => heads.to_vec(),
        None => self::heads(&graph, len)?,
    };
    let roots: Vec<Revision> = match roots {
        Some(roots) => roots.to_vec(),
        None => vec![NULL_REVISION],
    };
    let any_root = roots.contains(&NULL_REVISION);
    if used_heads.is_empty() || roots.is_empty() {
        return Ok((vec![], vec![], vec![]));
    }

    // Every candidate is an ancestor of some head.
    let lowest_root =
        roots.iter().map(|rev| rev.0).min().unwrap_or(-1).max(0);
    let mut ancestor_of_head = vec![false; len];
    let start_revs =
        used_heads.iter().copied().filter(|rev| *rev != NULL_REVISION);
    let iter = AncestorsIterator::new(
        &graph,
        start_revs,
        Revision(lowest_root),
        true,
    )?;
    for rev in iter {
        ancestor_of_head[rev?.0 as usize] = true;
    }

    // Ascending scan: a candidate qualifies if it is a root, or descends
    // from the null root, or has a qualifying parent. Parents precede their
    // children, so one pass settles everything, already in topological
    // order.
    let mut between = Vec::new();
    let mut qualifies = vec![false; len];
    for r in lowest_root..len as BaseRevision {
        let rev = Revision(r);
        if !ancestor_of_head[r as usize] {
            continue;
        }
        let from_parent = |parent: Revision| {
            parent != NULL_REVISION && qualifies[parent.0 as usize]
        };
        if any_root
            || roots.contains(&rev)
            || graph.parents(rev)?.into_iter().any(from_parent)
        {
            qualifies[r as usize] = true;
            between.push(rev);
        }
    }

    let used_roots = roots
        .into_iter()
        .filter(|rev| {
            *rev == NULL_REVISION
                || (ancestor_of_head[rev.0 as usize]
                    && qualifies[rev.0 as usize])
        })
        .collect();
    let used_heads = used_heads
        .into_iter()
        .filter(|rev| {
            *rev != NULL_REVISION && qualifies[rev.0 as usize]
        })
        .collect();
    Ok((between, used_roots, used_heads))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::SampleGraph;

    const SAMPLE_LEN: usize = 14;

    fn revs(revs: impl IntoIterator<Item = BaseRevision>) -> Vec<Revision> {
        revs.into_iter().map(Revision).collect()
    }

    #[test]
    fn test_heads() {
        assert_eq!(
            heads(SampleGraph, SAMPLE_LEN).unwrap(),
            revs([10, 11, 12, 13])
        );
        assert_eq!(heads(SampleGraph, 0).unwrap(), vec![]);
    }

    #[test]
    fn test_nodes_between_unconstrained_is_all_of_history() {
        let (between, roots, heads) =
            nodes_between(SampleGraph, SAMPLE_LEN, None, None).unwrap();
        assert_eq!(between, revs(0..14));
        assert_eq!(roots, vec![NULL_REVISION]);
        assert_eq!(heads, revs([10, 11, 12, 13]));
    }

    #[test]
    fn test_nodes_between_root_to_head() {
        let (between, roots, heads) = nodes_between(
            SampleGraph,
            SAMPLE_LEN,
            Some(&revs([4])),
            Some(&revs([12])),
        )
        .unwrap();
        assert_eq!(between, revs([4, 6, 7, 9, 12]));
        assert_eq!(roots, revs([4]));
        assert_eq!(heads, revs([12]));
    }

    #[test]
    fn test_nodes_between_prunes_unrelated_sides() {
        // 8 only reaches 13; 10 does not descend from 8
        let (between, roots, heads) = nodes_between(
            SampleGraph,
            SAMPLE_LEN,
            Some(&revs([8])),
            Some(&revs([10, 13])),
        )
        .unwrap();
        assert_eq!(between, revs([8, 13]));
        assert_eq!(roots, revs([8]));
        assert_eq!(heads, revs([13]));
    }

    #[test]
    fn test_nodes_between_disjoint_is_empty() {
        let (between, roots, heads) = nodes_between(
            SampleGraph,
            SAMPLE_LEN,
            Some(&revs([5])),
            Some(&revs([13])),
        )
        .unwrap();
        assert_eq!(between, vec![]);
        assert_eq!(roots, vec![]);
        assert_eq!(heads, vec![]);
    }
}
