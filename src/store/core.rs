/// Ordered merge store: an AVL tree of records keyed by global line index.
///
/// Every node owns its children outright (`Option<Box<Node>>`). Insert and
/// remove take a subtree by value and return its new root, so rotations are
/// plain moves and a record has exactly one owner at every point, including
/// while a two-child node is being replaced by its successor.
use std::cmp::Ordering;
use std::fmt;

use crate::protocol::Record;

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    record: Record,
    height: u32,
    left: Link,
    right: Link,
}

impl Node {
    fn leaf(record: Record) -> Box<Node> {
        Box::new(Node {
            record,
            height: 1,
            left: None,
            right: None,
        })
    }

    #[inline]
    fn key(&self) -> u64 {
        self.record.index()
    }

    #[inline]
    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Left height minus right height.
    #[inline]
    fn balance(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

#[inline]
fn height(link: &Link) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

fn rotate_right(mut y: Box<Node>) -> Box<Node> {
    let Some(mut x) = y.left.take() else {
        return y;
    };
    y.left = x.right.take();
    y.update_height();
    x.right = Some(y);
    x.update_height();
    x
}

fn rotate_left(mut x: Box<Node>) -> Box<Node> {
    let Some(mut y) = x.right.take() else {
        return x;
    };
    x.right = y.left.take();
    x.update_height();
    y.left = Some(x);
    y.update_height();
    y
}

/// Refresh the cached height and restore the balance condition at `node`.
/// LL/RR take one rotation; LR/RL first rotate the heavier child.
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    node.update_height();
    let balance = node.balance();

    if balance > 1 {
        if node.left.as_ref().is_some_and(|l| l.balance() < 0) {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if node.right.as_ref().is_some_and(|r| r.balance() > 0) {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn insert_into(link: Link, record: Record) -> (Box<Node>, Result<(), Record>) {
    let Some(mut node) = link else {
        return (Node::leaf(record), Ok(()));
    };

    let outcome = match record.index().cmp(&node.key()) {
        Ordering::Less => {
            let (child, outcome) = insert_into(node.left.take(), record);
            node.left = Some(child);
            outcome
        }
        Ordering::Greater => {
            let (child, outcome) = insert_into(node.right.take(), record);
            node.right = Some(child);
            outcome
        }
        Ordering::Equal => return (node, Err(record)),
    };

    (rebalance(node), outcome)
}

/// Detach the leftmost node of a subtree, returning the rest and its record.
fn take_min(mut node: Box<Node>) -> (Link, Record) {
    match node.left.take() {
        None => {
            let Node { record, right, .. } = *node;
            (right, record)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove_from(link: Link, index: u64) -> (Link, Option<Record>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    let removed = match index.cmp(&node.key()) {
        Ordering::Less => {
            let (child, removed) = remove_from(node.left.take(), index);
            node.left = child;
            removed
        }
        Ordering::Greater => {
            let (child, removed) = remove_from(node.right.take(), index);
            node.right = child;
            removed
        }
        Ordering::Equal => match (node.left.take(), node.right.take()) {
            (Some(left), Some(right)) => {
                // The successor's record moves into this node; the
                // successor's own node is freed inside take_min.
                let (rest, successor) = take_min(right);
                let removed = std::mem::replace(&mut node.record, successor);
                node.left = Some(left);
                node.right = rest;
                Some(removed)
            }
            (None, child) | (child, None) => {
                let Node { record, .. } = *node;
                return (child, Some(record));
            }
        },
    };

    if removed.is_none() {
        return (Some(node), None);
    }
    (Some(rebalance(node)), removed)
}

/// Rejected insert: the index was already present. Owns the new record so
/// the caller decides what to do with it.
#[derive(Debug, PartialEq, Eq)]
pub struct DuplicateIndex {
    record: Record,
}

impl DuplicateIndex {
    pub fn index(&self) -> u64 {
        self.record.index()
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

impl fmt::Display for DuplicateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate line index {}", self.record.index())
    }
}

impl std::error::Error for DuplicateIndex {}

#[derive(Debug, Default)]
pub struct MergeStore {
    root: Link,
    len: usize,
}

impl MergeStore {
    pub fn new() -> Self {
        MergeStore { root: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree (0 when empty).
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    /// Insert a record. An existing index wins; the new record comes back
    /// inside the error and the store is unchanged.
    pub fn insert(&mut self, record: Record) -> Result<(), DuplicateIndex> {
        let (root, outcome) = insert_into(self.root.take(), record);
        self.root = Some(root);
        match outcome {
            Ok(()) => {
                self.len += 1;
                Ok(())
            }
            Err(record) => Err(DuplicateIndex { record }),
        }
    }

    pub fn get(&self, index: u64) -> Option<&Record> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match index.cmp(&node.key()) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.record),
            };
        }
        None
    }

    #[inline]
    pub fn contains(&self, index: u64) -> bool {
        self.get(index).is_some()
    }

    /// Record with the smallest index.
    pub fn find_min(&self) -> Option<&Record> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.record)
    }

    /// Remove the record with `index`, rebalancing the path back to the root.
    pub fn remove(&mut self, index: u64) -> Option<Record> {
        let (root, removed) = remove_from(self.root.take(), index);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Remove and return the smallest record.
    pub fn pop_min(&mut self) -> Option<Record> {
        let index = self.find_min()?.index();
        self.remove(index)
    }

    /// Empty the store in ascending index order.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { store: self }
    }

    /// Non-destructive in-order traversal.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            stack: Vec::with_capacity(self.height() as usize),
            remaining: self.len,
        };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Walk the tree checking key order, balance, cached heights and the
    /// length counter.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        fn walk(
            link: &Link,
            lo: Option<u64>,
            hi: Option<u64>,
            count: &mut usize,
        ) -> Result<u32, String> {
            let Some(node) = link else {
                return Ok(0);
            };
            let key = node.key();
            if lo.is_some_and(|lo| key <= lo) || hi.is_some_and(|hi| key >= hi) {
                return Err(format!("key {} out of order", key));
            }
            *count += 1;
            let lh = walk(&node.left, lo, Some(key), count)?;
            let rh = walk(&node.right, Some(key), hi, count)?;
            if lh.abs_diff(rh) > 1 {
                return Err(format!("node {} unbalanced: {} vs {}", key, lh, rh));
            }
            let h = 1 + lh.max(rh);
            if h != node.height {
                return Err(format!(
                    "node {} caches height {}, actual {}",
                    key, node.height, h
                ));
            }
            Ok(h)
        }

        let mut count = 0;
        walk(&self.root, None, None, &mut count)?;
        if count != self.len {
            return Err(format!("len {} but {} nodes", self.len, count));
        }
        Ok(())
    }
}

pub struct Drain<'a> {
    store: &'a mut MergeStore,
}

impl Iterator for Drain<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.store.pop_min()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.store.len, Some(self.store.len))
    }
}

impl ExactSizeIterator for Drain<'_> {}

pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn push_left(&mut self, mut node: Option<&'a Node>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<&'a Record> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        self.remaining -= 1;
        Some(&node.record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a MergeStore {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
