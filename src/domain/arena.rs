use std::collections::{HashMap, VecDeque};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::entities::{Member, Topology};
use crate::domain::error::{DomainError, DomainResult};

/// Arena-based sponsor tree.
///
/// Members live in a generational arena and reference each other through
/// arena handles, so a sponsor link can never dangle. Lookups by member id go
/// through `ids`; `order` keeps insertion order for deterministic listings.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// Arena storage for all members
    arena: Arena<Member>,
    /// Member id to arena handle
    ids: HashMap<String, Index>,
    /// Handles in insertion order
    order: Vec<Index>,
    /// Designated root, None for an empty hierarchy
    root: Option<Index>,
    topology: Topology,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(Topology::Unbounded)
    }
}

impl Hierarchy {
    pub fn new(topology: Topology) -> Self {
        Self {
            arena: Arena::new(),
            ids: HashMap::new(),
            order: Vec::new(),
            root: None,
            topology,
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The designated root: the first top-level member.
    pub fn root(&self) -> Option<&Member> {
        self.root.and_then(|idx| self.arena.get(idx))
    }

    pub fn get(&self, idx: Index) -> Option<&Member> {
        self.arena.get(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<Index> {
        self.ids.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn find(&self, id: &str) -> Option<&Member> {
        self.index_of(id).and_then(|idx| self.arena.get(idx))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Member> {
        let idx = self.index_of(id)?;
        self.arena.get_mut(idx)
    }

    /// All members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.order.iter().filter_map(|&idx| self.arena.get(idx))
    }

    pub(crate) fn iter_indexed_members(&self) -> impl Iterator<Item = (Index, &Member)> + '_ {
        self.order
            .iter()
            .filter_map(|&idx| self.arena.get(idx).map(|m| (idx, m)))
    }

    /// Attach a new member under `sponsor_id`, or as a top-level member.
    ///
    /// A missing or blank `id` is synthesized as `<sponsor>-<n>` (n = sponsor's
    /// child count + 1) or `M<n>` (n = member count + 1). Collisions get a
    /// `-1`, `-2`, ... suffix. Every check runs before the hierarchy changes.
    #[instrument(level = "debug", skip(self))]
    pub fn attach(
        &mut self,
        id: Option<&str>,
        name: &str,
        sponsor_id: Option<&str>,
    ) -> DomainResult<&mut Member> {
        let sponsor = match sponsor_id {
            Some(sid) => Some(
                self.index_of(sid)
                    .ok_or_else(|| DomainError::SponsorNotFound(sid.to_string()))?,
            ),
            None => None,
        };

        let parent = match (sponsor, self.root) {
            (Some(sponsor), _) => {
                self.check_capacity(sponsor, None)?;
                Some(sponsor)
            }
            (None, None) => None,
            (None, Some(root)) => match self.topology {
                Topology::Binary => {
                    return Err(DomainError::RootAlreadyExists(
                        self.arena[root].id().to_string(),
                    ))
                }
                Topology::Unbounded => {
                    self.check_capacity(root, None)?;
                    Some(root)
                }
            },
        };

        let base = match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(given) => given.to_string(),
            None => match sponsor {
                Some(sponsor) => self.child_id_for(sponsor),
                None => format!("M{}", self.len() + 1),
            },
        };
        let id = self.unique_id(base);
        debug!("attach: id={} parent={:?}", id, parent);

        let idx = self.insert_detached(Member::new(id, name.to_string()));
        match parent {
            Some(parent) => self.append_child(parent, idx),
            None => self.root = Some(idx),
        }
        Ok(&mut self.arena[idx])
    }

    /// Ancestors from the immediate sponsor up to the top, nearest first.
    pub fn uplines(&self, id: &str) -> Vec<&Member> {
        self.index_of(id)
            .map(|idx| {
                self.upline_indices(idx)
                    .into_iter()
                    .filter_map(|up| self.arena.get(up))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn upline_indices(&self, idx: Index) -> Vec<Index> {
        let mut ups = Vec::new();
        let mut current = self.arena.get(idx).and_then(|m| m.sponsor);
        while let Some(up) = current {
            ups.push(up);
            current = self.arena.get(up).and_then(|m| m.sponsor);
        }
        ups
    }

    /// Every member below `id`, in pre-order. Empty for unknown ids and leaves.
    pub fn all_downlines(&self, id: &str) -> Vec<&Member> {
        match self.index_of(id) {
            Some(idx) => self.iter_subtree(idx).skip(1).map(|(_, m)| m).collect(),
            None => Vec::new(),
        }
    }

    /// Number of ancestors; 0 for a top-level member.
    pub fn level(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|idx| self.upline_indices(idx).len())
    }

    /// Own sales of `id` plus those of every descendant.
    pub fn sales_volume(&self, id: &str) -> Option<f64> {
        self.index_of(id).map(|idx| self.sales_volume_at(idx))
    }

    pub(crate) fn sales_volume_at(&self, idx: Index) -> f64 {
        self.iter_subtree(idx).map(|(_, m)| m.own_sales()).sum()
    }

    pub fn sponsor_of(&self, id: &str) -> Option<&Member> {
        self.find(id)
            .and_then(|m| m.sponsor)
            .and_then(|idx| self.arena.get(idx))
    }

    pub fn children_of(&self, id: &str) -> Vec<&Member> {
        self.find(id)
            .map(|m| {
                m.children
                    .iter()
                    .filter_map(|&c| self.arena.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn next_sibling_of(&self, id: &str) -> Option<&Member> {
        self.find(id)
            .and_then(|m| m.next_sibling)
            .and_then(|idx| self.arena.get(idx))
    }

    pub fn previous_sibling_of(&self, id: &str) -> Option<&Member> {
        self.find(id)
            .and_then(|m| m.previous_sibling)
            .and_then(|idx| self.arena.get(idx))
    }

    /// Move `member_id` to be the trailing child of `new_sponsor_id`.
    ///
    /// Rejects moves under the member itself or any of its descendants.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, member_id: &str, new_sponsor_id: &str) -> DomainResult<()> {
        let member = self
            .index_of(member_id)
            .ok_or_else(|| DomainError::MemberNotFound(member_id.to_string()))?;
        let sponsor = self
            .index_of(new_sponsor_id)
            .ok_or_else(|| DomainError::SponsorNotFound(new_sponsor_id.to_string()))?;

        if self.is_within(sponsor, member) {
            return Err(DomainError::CycleDetected {
                member: member_id.to_string(),
                sponsor: new_sponsor_id.to_string(),
            });
        }
        self.check_capacity(sponsor, Some(member))?;

        let was_root = self.root == Some(member);
        self.detach(member);
        self.append_child(sponsor, member);
        if was_root {
            self.root = self.first_rootless();
        }
        debug!("reparent: {} now under {}", member_id, new_sponsor_id);
        Ok(())
    }

    /// Splice a new member between `child_id` and its sponsor.
    ///
    /// The new member takes the child's position among its former siblings
    /// and the child becomes its only child. For a top-level child the new
    /// member becomes top-level instead.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_parent(&mut self, child_id: &str, name: &str) -> DomainResult<&mut Member> {
        let child = self
            .index_of(child_id)
            .ok_or_else(|| DomainError::MemberNotFound(child_id.to_string()))?;
        let old_sponsor = self.arena[child].sponsor;

        let base = match old_sponsor {
            Some(sponsor) => self.child_id_for(sponsor),
            None => format!("M{}", self.len() + 1),
        };
        let id = self.unique_id(base);
        let parent = self.insert_detached(Member::new(id, name.to_string()));

        match old_sponsor {
            Some(sponsor) => self.replace_child(sponsor, child, parent),
            None => {
                if self.root == Some(child) {
                    self.root = Some(parent);
                }
            }
        }
        self.append_child(parent, child);
        Ok(&mut self.arena[parent])
    }

    /// All sponsor-less members, designated root first.
    pub fn top_level_members(&self) -> Vec<&Member> {
        self.top_level_indices()
            .filter_map(|idx| self.arena.get(idx))
            .collect()
    }

    /// Sponsor-less handles: the designated root first, then the rest in
    /// insertion order.
    pub(crate) fn top_level_indices(&self) -> impl Iterator<Item = Index> + '_ {
        let root = self.root;
        root.into_iter().chain(
            self.order
                .iter()
                .copied()
                .filter(move |&idx| Some(idx) != root && self.is_rootless(idx)),
        )
    }

    fn is_rootless(&self, idx: Index) -> bool {
        self.arena.get(idx).is_some_and(|m| m.sponsor.is_none())
    }

    fn first_rootless(&self) -> Option<Index> {
        self.order.iter().copied().find(|&idx| self.is_rootless(idx))
    }

    /// Level-by-level listing starting from every top-level member.
    pub fn breadth_first(&self) -> Vec<&Member> {
        let mut out = Vec::with_capacity(self.len());
        let mut queue: VecDeque<Index> = self.top_level_indices().collect();
        while let Some(idx) = queue.pop_front() {
            if let Some(member) = self.arena.get(idx) {
                out.push(member);
                queue.extend(member.children.iter().copied());
            }
        }
        out
    }

    /// Height of the tallest tree (number of levels), 0 when empty.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(Index, usize)> = self.top_level_indices().map(|i| (i, 1)).collect();
        while let Some((idx, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some(member) = self.arena.get(idx) {
                stack.extend(member.children.iter().map(|&c| (c, level + 1)));
            }
        }
        deepest
    }

    /// Pre-order over every tree, starting with the designated root's.
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self, self.top_level_indices().collect())
    }

    /// Pre-order over the subtree rooted at `idx`, including `idx`.
    pub fn iter_subtree(&self, idx: Index) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self, vec![idx])
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.top_level_indices().collect())
    }

    pub fn iter_postorder_subtree(&self, idx: Index) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, vec![idx])
    }

    // ---- crate-internal building blocks (also used by the loader) ----

    pub(crate) fn get_mut(&mut self, idx: Index) -> Option<&mut Member> {
        self.arena.get_mut(idx)
    }

    /// Store a member without linking it anywhere.
    pub(crate) fn insert_detached(&mut self, member: Member) -> Index {
        let id = member.id().to_string();
        let idx = self.arena.insert(member);
        self.ids.insert(id, idx);
        self.order.push(idx);
        idx
    }

    /// Link an already stored, sponsor-less member under `parent`.
    pub(crate) fn link(&mut self, child: Index, parent: Index) -> DomainResult<()> {
        if self.is_within(parent, child) {
            return Err(DomainError::CycleDetected {
                member: self.arena[child].id().to_string(),
                sponsor: self.arena[parent].id().to_string(),
            });
        }
        self.check_capacity(parent, Some(child))?;
        self.detach(child);
        self.append_child(parent, child);
        Ok(())
    }

    pub(crate) fn set_root(&mut self, idx: Index) {
        self.root = Some(idx);
    }

    pub(crate) fn root_index(&self) -> Option<Index> {
        self.root
    }

    /// Remove members entirely. Callers pass whole detached groups so that no
    /// surviving member keeps a link to a removed one.
    pub(crate) fn prune(&mut self, doomed: &[Index]) {
        for &idx in doomed {
            if let Some(member) = self.arena.remove(idx) {
                self.ids.remove(member.id());
            }
        }
        self.order.retain(|idx| !doomed.contains(idx));
        if self.root.is_some_and(|r| doomed.contains(&r)) {
            self.root = self.first_rootless();
        }
    }

    fn child_id_for(&self, sponsor: Index) -> String {
        let s = &self.arena[sponsor];
        format!("{}-{}", s.id(), s.children.len() + 1)
    }

    fn unique_id(&self, base: String) -> String {
        if !self.contains(&base) {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{base}-{suffix}");
            if !self.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// True when `node` is `ancestor` or lies somewhere beneath it.
    fn is_within(&self, node: Index, ancestor: Index) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.arena.get(idx).and_then(|m| m.sponsor);
        }
        false
    }

    fn check_capacity(&self, parent: Index, moving: Option<Index>) -> DomainResult<()> {
        if let Some(capacity) = self.topology.capacity() {
            let node = &self.arena[parent];
            let occupied = node
                .children
                .iter()
                .filter(|&&c| Some(c) != moving)
                .count();
            if occupied >= capacity {
                return Err(DomainError::CapacityExceeded {
                    sponsor: node.id().to_string(),
                    capacity,
                });
            }
        }
        Ok(())
    }

    fn append_child(&mut self, parent: Index, child: Index) {
        let last = self.arena[parent].children.last().copied();
        if let Some(last) = last {
            self.arena[last].next_sibling = Some(child);
        }
        let node = &mut self.arena[child];
        node.sponsor = Some(parent);
        node.previous_sibling = last;
        node.next_sibling = None;
        self.arena[parent].children.push(child);
    }

    fn detach(&mut self, child: Index) {
        let (sponsor, prev, next) = {
            let node = &self.arena[child];
            (node.sponsor, node.previous_sibling, node.next_sibling)
        };
        if let Some(prev) = prev {
            self.arena[prev].next_sibling = next;
        }
        if let Some(next) = next {
            self.arena[next].previous_sibling = prev;
        }
        if let Some(sponsor) = sponsor {
            self.arena[sponsor].children.retain(|&c| c != child);
        }
        let node = &mut self.arena[child];
        node.sponsor = None;
        node.previous_sibling = None;
        node.next_sibling = None;
    }

    /// Put `new` into `old`'s slot under `parent`, leaving `old` detached.
    fn replace_child(&mut self, parent: Index, old: Index, new: Index) {
        let (prev, next) = {
            let node = &self.arena[old];
            (node.previous_sibling, node.next_sibling)
        };
        if let Some(slot) = self.arena[parent].children.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        if let Some(prev) = prev {
            self.arena[prev].next_sibling = Some(new);
        }
        if let Some(next) = next {
            self.arena[next].previous_sibling = Some(new);
        }
        let node = &mut self.arena[new];
        node.sponsor = Some(parent);
        node.previous_sibling = prev;
        node.next_sibling = next;

        let node = &mut self.arena[old];
        node.sponsor = None;
        node.previous_sibling = None;
        node.next_sibling = None;
    }
}

pub struct PreOrderIterator<'a> {
    hierarchy: &'a Hierarchy,
    stack: Vec<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(hierarchy: &'a Hierarchy, mut starts: Vec<Index>) -> Self {
        starts.reverse();
        Self {
            hierarchy,
            stack: starts,
        }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (Index, &'a Member);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(member) = self.hierarchy.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(member.children.iter().rev());
                return Some((current, member));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    hierarchy: &'a Hierarchy,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(hierarchy: &'a Hierarchy, starts: Vec<Index>) -> Self {
        let stack = starts.into_iter().rev().map(|idx| (idx, false)).collect();
        Self { hierarchy, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a Member);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(member) = self.hierarchy.get(current) {
                if visited {
                    return Some((current, member));
                }
                self.stack.push((current, true));
                for &child in member.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
