/*
Rendering lives in a trait so the domain layer stays free of termtree.
 */
use std::collections::HashMap;

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{Hierarchy, Member};

pub trait TreeNodeConvert {
    /// One rendered tree per top-level member, designated root first.
    fn to_tree_strings(&self) -> Vec<Tree<String>>;

    /// The subtree rooted at `id`, None for unknown ids.
    fn subtree_to_tree_string(&self, id: &str) -> Option<Tree<String>>;
}

fn label(member: &Member) -> String {
    format!(
        "{} [{}] sales {:.2} balance {:.2}",
        member.name(),
        member.id(),
        member.own_sales(),
        member.balance()
    )
}

/// Children finish before their sponsor in post-order, so each finished
/// subtree waits in `done` until its sponsor collects it.
fn assemble<'a>(
    nodes: impl Iterator<Item = (Index, &'a Member)>,
) -> Vec<(Index, Tree<String>)> {
    let mut done: HashMap<Index, Tree<String>> = HashMap::new();
    let mut seen = Vec::new();
    for (idx, member) in nodes {
        let leaves: Vec<Tree<String>> = member
            .children()
            .iter()
            .filter_map(|c| done.remove(c))
            .collect();
        let tree = Tree::new(label(member)).with_leaves(leaves);
        done.insert(idx, tree);
        seen.push(idx);
    }
    seen.into_iter()
        .filter_map(|idx| done.remove(&idx).map(|tree| (idx, tree)))
        .collect()
}

impl TreeNodeConvert for Hierarchy {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_strings(&self) -> Vec<Tree<String>> {
        let mut by_root: HashMap<Index, Tree<String>> =
            assemble(self.iter_postorder()).into_iter().collect();
        self.top_level_indices()
            .filter_map(|idx| by_root.remove(&idx))
            .collect()
    }

    fn subtree_to_tree_string(&self, id: &str) -> Option<Tree<String>> {
        let idx = self.index_of(id)?;
        assemble(self.iter_postorder_subtree(idx))
            .into_iter()
            .find(|(top, _)| *top == idx)
            .map(|(_, tree)| tree)
    }
}
