use crate::{
    error::{Error, Result},
    record::DirectoryRecord,
};
use std::collections::{hash_map::Entry, HashMap};
use tracing::{debug, warn};

/// Entry count and byte size of some part of the tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub entries: u64,
    pub bytes: u64,
}

impl Totals {
    pub fn new(entries: u64, bytes: u64) -> Self {
        Self { entries, bytes }
    }

    /// Adds `rhs`, clamping each component at `u64::MAX`. Returns `false` if anything was clamped.
    pub fn add_clamped(&mut self, rhs: Self) -> bool {
        let entries = self.entries.checked_add(rhs.entries);
        let bytes = self.bytes.checked_add(rhs.bytes);

        self.entries = entries.unwrap_or(u64::MAX);
        self.bytes = bytes.unwrap_or(u64::MAX);

        entries.is_some() && bytes.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    id: u64,
    parent: Option<u64>,
    depth: i64,
    own: Totals,
    aggregate: Totals,
}

impl DirectoryNode {
    /// The root additionally counts its own directory entry, which has no parent to be summed into.
    pub fn new(record: &DirectoryRecord) -> Self {
        let own = Totals::new(record.file_count, record.dir_sum);
        let mut aggregate = own;

        if record.is_root() && !aggregate.add_clamped(Totals::new(1, record.size)) {
            warn!(inode = record.inode, "root entry totals exceed u64, clamped");
        }

        Self {
            id: record.inode,
            parent: record.parent,
            depth: record.depth,
            own,
            aggregate,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn parent(&self) -> Option<u64> {
        self.parent
    }

    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// Immediate entries as reported by the scan
    pub fn own(&self) -> Totals {
        self.own
    }

    /// Subtree-inclusive totals, only meaningful after [`DirectoryTree::aggregate`]
    pub fn aggregate(&self) -> Totals {
        self.aggregate
    }
}

/// How to pick the root when several rows claim parent inode `0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RootSelection {
    /// Whichever candidate was loaded last
    #[default]
    Last,
    Smallest,
    /// Refuse to pick, reporting all candidates
    Strict,
}

#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: HashMap<u64, DirectoryNode>,
    roots: Vec<u64>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a directory, replacing any earlier directory with the same inode.
    pub fn insert(&mut self, record: &DirectoryRecord) {
        let node = DirectoryNode::new(record);

        if node.parent.is_none() {
            self.roots.retain(|id| *id != node.id);
            self.roots.push(node.id);
        }

        match self.nodes.entry(node.id) {
            Entry::Occupied(mut slot) => {
                warn!(inode = node.id, "duplicate directory inode, keeping the later row");
                slot.insert(node);
            }
            Entry::Vacant(slot) => {
                slot.insert(node);
            }
        }
    }

    pub fn finish(mut self, selection: RootSelection) -> Result<DirectoryTree> {
        // A replaced duplicate may have been a root candidate that no longer is one
        let nodes = &self.nodes;
        self.roots
            .retain(|id| nodes.get(id).map_or(false, |node| node.parent.is_none()));

        let root = match (self.roots.as_slice(), selection) {
            ([], _) => return Err(Error::NoRoot),
            ([root], _) => *root,
            (candidates, RootSelection::Strict) => {
                return Err(Error::MultipleRoots {
                    candidates: candidates.to_vec(),
                })
            }
            (candidates, RootSelection::Last) => {
                warn!(?candidates, "multiple root directories, using the last one");
                candidates[candidates.len() - 1]
            }
            (candidates, RootSelection::Smallest) => {
                warn!(?candidates, "multiple root directories, using the smallest inode");
                candidates.iter().copied().min().unwrap_or(candidates[0])
            }
        };

        debug!(directories = self.nodes.len(), root, "directory tree assembled");

        Ok(DirectoryTree {
            nodes: self.nodes,
            root,
        })
    }
}

/// A parent reference that points at an inode which was never loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingParent {
    pub node: u64,
    pub missing_parent: u64,
}

/// Outcome of a single aggregation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub visited: usize,
    /// Chains that ended early because an ancestor is missing. Ancestors above the gap did not receive the sums.
    pub dangling: Vec<DanglingParent>,
    /// Nodes whose ancestor chain loops back on itself
    pub cycles: Vec<u64>,
    /// Directories whose totals no longer fit into a `u64` and were clamped at `u64::MAX`
    pub saturated: Vec<u64>,
}

impl Aggregation {
    pub fn is_complete(&self) -> bool {
        self.dangling.is_empty() && self.cycles.is_empty() && self.saturated.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryTree {
    nodes: HashMap<u64, DirectoryNode>,
    root: u64,
}

impl DirectoryTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn root_node(&self) -> &DirectoryNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: u64) -> Option<&DirectoryNode> {
        self.nodes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.nodes.values()
    }

    /// Pushes every directory's own totals into all of its ancestors.
    ///
    /// The visiting order does not matter because only the immutable `own` totals are ever
    /// added. Must be called exactly once per tree: a second call adds every directory's
    /// totals to its ancestors again.
    pub fn aggregate(&mut self) -> Aggregation {
        let contributions = self
            .nodes
            .values()
            .map(|node| (node.id, node.parent, node.own))
            .collect::<Vec<_>>();

        // No chain in a proper tree can be longer than the number of directories
        let max_steps = self.nodes.len();
        let mut outcome = Aggregation::default();

        for (id, parent, own) in contributions {
            let mut current = parent;
            let mut steps = 0;

            while let Some(ancestor_id) = current {
                if steps == max_steps {
                    outcome.cycles.push(id);
                    break;
                }

                let Some(ancestor) = self.nodes.get_mut(&ancestor_id) else {
                    outcome.dangling.push(DanglingParent {
                        node: id,
                        missing_parent: ancestor_id,
                    });
                    break;
                };

                if !ancestor.aggregate.add_clamped(own) {
                    outcome.saturated.push(ancestor_id);
                }
                current = ancestor.parent;
                steps += 1;
            }

            outcome.visited += 1;
        }

        outcome.saturated.sort_unstable();
        outcome.saturated.dedup();

        debug!(
            visited = outcome.visited,
            dangling = outcome.dangling.len(),
            cycles = outcome.cycles.len(),
            saturated = outcome.saturated.len(),
            "aggregation finished"
        );

        outcome
    }
}

#[cfg(test)]
mod does {
    use super::*;

    fn dir(inode: u64, parent: u64, file_count: u64, dir_sum: u64) -> DirectoryRecord {
        DirectoryRecord {
            inode,
            parent: (parent != 0).then_some(parent),
            depth: 0,
            size: 0,
            file_count,
            dir_sum,
        }
    }

    fn root(inode: u64, file_count: u64, dir_sum: u64, size: u64) -> DirectoryRecord {
        DirectoryRecord {
            size,
            depth: -1,
            ..dir(inode, 0, file_count, dir_sum)
        }
    }

    fn build(records: &[DirectoryRecord]) -> DirectoryTree {
        let mut builder = TreeBuilder::new();
        records.iter().for_each(|record| builder.insert(record));
        builder.finish(RootSelection::Last).unwrap()
    }

    fn totals(tree: &DirectoryTree, id: u64) -> (u64, u64) {
        let aggregate = tree.get(id).unwrap().aggregate();
        (aggregate.entries, aggregate.bytes)
    }

    #[test]
    fn sum_direct_children() {
        let mut tree = build(&[root(1, 2, 500, 100), dir(2, 1, 3, 300), dir(3, 1, 1, 50)]);
        let outcome = tree.aggregate();

        assert!(outcome.is_complete());
        assert_eq!(outcome.visited, 3);
        assert_eq!(totals(&tree, 1), (7, 950));
        assert_eq!(totals(&tree, 2), (3, 300));
        assert_eq!(totals(&tree, 3), (1, 50));
    }

    #[test]
    fn sum_nested_chains() {
        let mut tree = build(&[dir(3, 2, 1, 10), root(1, 1, 10, 10), dir(2, 1, 1, 10)]);
        tree.aggregate();

        assert_eq!(totals(&tree, 3), (1, 10));
        assert_eq!(totals(&tree, 2), (2, 20));
        assert_eq!(totals(&tree, 1), (4, 40));
    }

    #[test]
    fn apply_root_correction_at_load() {
        let tree = build(&[root(1, 2, 500, 100)]);
        let node = tree.root_node();

        assert_eq!(node.own(), Totals::new(2, 500));
        assert_eq!(node.aggregate(), Totals::new(3, 600));
    }

    #[test]
    fn stop_at_dangling_parents() {
        // 5 -> 4 -> (missing 99), 2 -> 1 (root)
        let mut tree = build(&[
            root(1, 1, 10, 10),
            dir(2, 1, 2, 20),
            dir(4, 99, 3, 30),
            dir(5, 4, 4, 40),
        ]);
        let outcome = tree.aggregate();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.dangling.len(), 2);
        assert!(outcome
            .dangling
            .iter()
            .all(|dangling| dangling.missing_parent == 99));

        assert_eq!(totals(&tree, 5), (4, 40));
        assert_eq!(totals(&tree, 4), (7, 70));
        assert_eq!(totals(&tree, 1), (4, 40));
    }

    #[test]
    fn break_cycles() {
        let mut tree = build(&[root(1, 1, 1, 1), dir(2, 3, 1, 1), dir(3, 2, 1, 1)]);
        let outcome = tree.aggregate();

        let mut cycles = outcome.cycles.clone();
        cycles.sort();
        assert_eq!(cycles, vec![2, 3]);
        assert_eq!(totals(&tree, 1), (2, 2));
    }

    #[test]
    fn clamp_totals_past_u64() {
        let mut tree = build(&[root(1, 1, 1, 0), dir(2, 1, 1, u64::MAX), dir(3, 2, 1, 5)]);
        let outcome = tree.aggregate();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.saturated, vec![1, 2]);
        assert_eq!(totals(&tree, 1), (4, u64::MAX));
        assert_eq!(totals(&tree, 2), (2, u64::MAX));
        assert_eq!(totals(&tree, 3), (1, 5));
    }

    #[test]
    fn clamp_root_correction_past_u64() {
        let tree = build(&[root(1, 0, u64::MAX, 10)]);

        assert_eq!(tree.root_node().aggregate(), Totals::new(1, u64::MAX));
    }

    #[test]
    fn never_shrink_below_own_totals() {
        let mut tree = build(&[
            root(10, 0, 0, 0),
            dir(11, 10, 4, 400),
            dir(12, 11, 0, 0),
            dir(13, 12, 9, 900),
            dir(14, 10, 1, 1),
        ]);
        tree.aggregate();

        for node in tree.iter() {
            assert!(node.aggregate().entries >= node.own().entries);
            assert!(node.aggregate().bytes >= node.own().bytes);
        }
    }

    #[test]
    fn double_descendant_share_when_applied_twice() {
        let mut tree = build(&[root(1, 1, 10, 10), dir(2, 1, 1, 10), dir(3, 2, 1, 10)]);

        let initial = tree.clone();
        tree.aggregate();
        let once = tree.clone();
        tree.aggregate();

        for node in tree.iter() {
            let start = initial.get(node.id()).unwrap().aggregate();
            let first = once.get(node.id()).unwrap().aggregate();

            assert_eq!(
                node.aggregate().entries - start.entries,
                2 * (first.entries - start.entries)
            );
            assert_eq!(
                node.aggregate().bytes - start.bytes,
                2 * (first.bytes - start.bytes)
            );
        }

        assert_eq!(totals(&tree, 1), (6, 60));
        assert_eq!(totals(&tree, 2), (3, 30));
        assert_eq!(totals(&tree, 3), (1, 10));
    }

    #[test]
    fn keep_last_duplicate() {
        let tree = build(&[root(1, 0, 0, 0), dir(2, 1, 1, 1), dir(2, 1, 5, 5)]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(2).unwrap().own(), Totals::new(5, 5));
    }

    #[test]
    fn fail_without_root() {
        let mut builder = TreeBuilder::new();
        builder.insert(&dir(2, 1, 1, 1));

        assert!(matches!(
            builder.finish(RootSelection::Last),
            Err(Error::NoRoot)
        ));
    }

    #[test]
    fn select_among_multiple_roots() {
        let records = [root(7, 1, 1, 1), root(3, 1, 1, 1), root(5, 1, 1, 1)];
        let builder = || {
            let mut builder = TreeBuilder::new();
            records.iter().for_each(|record| builder.insert(record));
            builder
        };

        assert_eq!(builder().finish(RootSelection::Last).unwrap().root(), 5);
        assert_eq!(builder().finish(RootSelection::Smallest).unwrap().root(), 3);

        match builder().finish(RootSelection::Strict) {
            Err(Error::MultipleRoots { candidates }) => assert_eq!(candidates, vec![7, 3, 5]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn forget_replaced_root_candidates() {
        let tree = {
            let mut builder = TreeBuilder::new();
            builder.insert(&root(1, 0, 0, 0));
            builder.insert(&root(2, 0, 0, 0));
            builder.insert(&dir(2, 1, 0, 0));
            builder.finish(RootSelection::Strict).unwrap()
        };

        assert_eq!(tree.root(), 1);
    }
}
