//! Ranking of members by subtree sales volume

use tracing::instrument;

use crate::domain::{Hierarchy, Member};

/// A member together with the subtree sales volume it was ranked by.
#[derive(Debug, Clone, Copy)]
pub struct RankedMember<'a> {
    pub member: &'a Member,
    pub sales_volume: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingService;

impl RankingService {
    pub fn new() -> Self {
        Self
    }

    /// Every member by descending subtree sales volume.
    ///
    /// Input order is member insertion order; equal volumes keep that order.
    #[instrument(level = "debug", skip(self, hierarchy))]
    pub fn sort_by_sales_volume<'a>(&self, hierarchy: &'a Hierarchy) -> Vec<RankedMember<'a>> {
        let ranked = hierarchy
            .iter_indexed_members()
            .map(|(idx, member)| RankedMember {
                member,
                sales_volume: hierarchy.sales_volume_at(idx),
            })
            .collect();
        merge_sort_descending(ranked, |r| r.sales_volume)
    }
}

enum Step {
    Split(usize, usize),
    Merge(usize, usize, usize),
}

/// Top-down merge sort, largest key first.
///
/// Ranges split at `len / 2` and merge with `left >= right`, so ties emit the
/// left element first. The recursion is replayed with an explicit work stack.
pub fn merge_sort_descending<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let mut items = items;
    let mut buffer: Vec<T> = Vec::with_capacity(items.len());
    let mut stack = vec![Step::Split(0, items.len())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Split(lo, hi) if hi - lo <= 1 => {}
            Step::Split(lo, hi) => {
                let mid = lo + (hi - lo) / 2;
                // LIFO: left half runs first, then right, then the merge
                stack.push(Step::Merge(lo, mid, hi));
                stack.push(Step::Split(mid, hi));
                stack.push(Step::Split(lo, mid));
            }
            Step::Merge(lo, mid, hi) => {
                buffer.clear();
                let (mut i, mut j) = (lo, mid);
                while i < mid && j < hi {
                    if key(&items[i]) >= key(&items[j]) {
                        buffer.push(items[i].clone());
                        i += 1;
                    } else {
                        buffer.push(items[j].clone());
                        j += 1;
                    }
                }
                buffer.extend_from_slice(&items[i..mid]);
                buffer.extend_from_slice(&items[j..hi]);
                items[lo..hi].clone_from_slice(&buffer);
            }
        }
    }
    items
}
