//! Generic DAG ancestor algorithms, defined over any [`Graph`].

use std::collections::BinaryHeap;
use std::collections::HashSet;

use crate::revlog::BaseRevision;
use crate::Graph;
use crate::GraphError;
use crate::Revision;
use crate::NULL_REVISION;

/// Iterator over the ancestors of a given list of revisions.
///
/// This is a generic type, defined and implemented for any [`Graph`], so
/// that it can be unit tested against small in-memory DAGs as well as run
/// over a real index.
pub struct AncestorsIterator<G: Graph> {
    graph: G,
    visit: BinaryHeap<Revision>,
    seen: HashSet<Revision>,
    stoprev: Revision,
}

impl<G: Graph> AncestorsIterator<G> {
    /// Constructor.
    ///
    /// If `inclusive` is true, the init revisions are emitted in particular,
    /// otherwise iteration starts from their parents.
    pub fn new(
        graph: G,
        initrevs: impl IntoIterator<Item = Revision>,
        stoprev: Revision,
        inclusive: bool,
    ) -> Result<Self, GraphError> {
        let filtered_initrevs = initrevs
            .into_iter()
            .filter(|&r| r >= stoprev)
            .collect::<BinaryHeap<_>>();
        if inclusive {
            let seen = filtered_initrevs.iter().copied().collect();
            return Ok(AncestorsIterator {
                graph,
                visit: filtered_initrevs,
                seen,
                stoprev,
            });
        }
        let mut this = AncestorsIterator {
            graph,
            visit: BinaryHeap::new(),
            seen: HashSet::from([NULL_REVISION]),
            stoprev,
        };
        for rev in filtered_initrevs {
            for parent in this.graph.parents(rev)? {
                this.conditionally_push_rev(parent);
            }
        }
        Ok(this)
    }

    #[inline]
    fn conditionally_push_rev(&mut self, rev: Revision) {
        if self.stoprev <= rev && self.seen.insert(rev) {
            self.visit.push(rev);
        }
    }
}

/// Main implementation for the iterator.
///
/// The algorithm is the same as in `AncestorsIterator::__next__()` from the
/// original Python implementation, with a max-heap standing in for the
/// sorted-by-insertion lazy list.
impl<G: Graph> Iterator for AncestorsIterator<G> {
    type Item = Result<Revision, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.visit.pop()?;
        match self.graph.parents(current) {
            Ok(parents) => {
                for parent in parents {
                    self.conditionally_push_rev(parent);
                }
            }
            Err(e) => return Some(Err(e)),
        }
        Some(Ok(current))
    }
}

/// All ancestors of `rev` (inclusive), stopping below `stop`.
///
/// `stop` itself is part of the result when it is an ancestor of `rev`.
pub fn reachable(
    graph: impl Graph,
    rev: Revision,
    stop: Revision,
) -> Result<HashSet<Revision>, GraphError> {
    AncestorsIterator::new(graph, [rev], stop, true)?.collect()
}

/// One "generation" of ancestors: every ancestor sharing the same
/// longest-path distance from the null revision, visited in decreasing
/// distance order.
struct GenerationsIterator<'a, G: Graph> {
    graph: &'a G,
    distance: &'a [u32],
    visit: BinaryHeap<(u32, Revision)>,
    seen: HashSet<Revision>,
}

impl<'a, G: Graph> GenerationsIterator<'a, G> {
    fn new(graph: &'a G, distance: &'a [u32], start: Revision) -> Self {
        GenerationsIterator {
            graph,
            distance,
            visit: BinaryHeap::from([(distance[start.0 as usize], start)]),
            seen: HashSet::from([start]),
        }
    }

    /// Pop the whole generation at the current maximal distance, pushing its
    /// parents for later. Parents always have a strictly smaller distance,
    /// so generations come out in strictly decreasing distance order.
    fn next_generation(
        &mut self,
    ) -> Result<Option<(u32, HashSet<Revision>)>, GraphError> {
        let (generation, rev) = match self.visit.pop() {
            Some(deepest) => deepest,
            None => return Ok(None),
        };
        let mut revs = HashSet::from([rev]);
        while let Some(&(distance, rev)) = self.visit.peek() {
            if distance != generation {
                break;
            }
            revs.insert(rev);
            self.visit.pop();
        }
        for &rev in &revs {
            for parent in self.graph.parents(rev)? {
                if parent != NULL_REVISION && self.seen.insert(parent) {
                    self.visit
                        .push((self.distance[parent.0 as usize], parent));
                }
            }
        }
        Ok(Some((generation, revs)))
    }
}

/// A common ancestor of maximal longest-path distance from the null
/// revision, or [`NULL_REVISION`] when the two histories share nothing.
///
/// Both sides walk their ancestors one generation at a time, deepest first;
/// only the deeper frontier advances, so the first generation the two sides
/// share at equal distance holds the answer. Ties go to the highest revision
/// number, making the result deterministic.
pub fn common_ancestor(
    graph: &impl Graph,
    a: Revision,
    b: Revision,
) -> Result<Revision, GraphError> {
    if a == NULL_REVISION || b == NULL_REVISION {
        return Ok(NULL_REVISION);
    }
    if a == b {
        return Ok(a);
    }
    let distance = longest_path_distances(graph, a.0.max(b.0))?;
    let mut left = GenerationsIterator::new(graph, &distance, a);
    let mut right = GenerationsIterator::new(graph, &distance, b);
    let mut left_generation = left.next_generation()?;
    let mut right_generation = right.next_generation()?;
    loop {
        let (left_distance, left_revs) = match &left_generation {
            Some(generation) => generation,
            None => return Ok(NULL_REVISION),
        };
        let (right_distance, right_revs) = match &right_generation {
            Some(generation) => generation,
            None => return Ok(NULL_REVISION),
        };
        let (left_distance, right_distance) =
            (*left_distance, *right_distance);
        if left_distance > right_distance {
            left_generation = left.next_generation()?;
            continue;
        }
        if right_distance > left_distance {
            right_generation = right.next_generation()?;
            continue;
        }
        let deepest_common =
            left_revs.intersection(right_revs).copied().max();
        if let Some(ancestor) = deepest_common {
            return Ok(ancestor);
        }
        left_generation = left.next_generation()?;
        right_generation = right.next_generation()?;
    }
}

/// Longest-path distance from the null revision, for every revision up to
/// `limit` included. The null revision itself sits at distance 0.
///
/// A single ascending scan suffices because parents always have a smaller
/// revision number than their children.
fn longest_path_distances(
    graph: &impl Graph,
    limit: BaseRevision,
) -> Result<Vec<u32>, GraphError> {
    let mut distance = vec![0u32; limit as usize + 1];
    for rev in 0..=limit {
        let [p1, p2] = graph.parents(Revision(rev))?;
        let d1 = if p1 == NULL_REVISION {
            0
        } else {
            distance[p1.0 as usize]
        };
        let d2 = if p2 == NULL_REVISION {
            0
        } else {
            distance[p2.0 as usize]
        };
        distance[rev as usize] = d1.max(d2) + 1;
    }
    Ok(distance)
}
