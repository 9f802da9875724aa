//! Reply tree assembly for forum threads.
//!
//! Storage hands back a thread's replies as a flat list ordered by creation
//! time. [`build_tree`] turns that list into a forest kept in an arena: every
//! node lives in one `Vec` and refers to its children by index, so no node
//! owns another and malformed parent links cannot create reference cycles.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::model::{ForumReply, ReplyId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    reply: ForumReply,
    children: Vec<usize>,
}

/// Forest of replies for one thread.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadForest {
    slots: Vec<Slot>,
    roots: Vec<usize>,
    index: HashMap<ReplyId, usize>,
}

/// Builds the reply forest.
///
/// A reply becomes a child of its parent when the parent id is present in
/// `replies`; otherwise it is a root. Children keep the input order. When the
/// same id appears more than once only the first occurrence is kept.
#[must_use]
pub fn build_tree<I>(replies: I) -> ThreadForest
where
    I: IntoIterator<Item = ForumReply>,
{
    let replies = replies.into_iter();
    let mut slots = Vec::with_capacity(replies.size_hint().0);
    let mut index = HashMap::with_capacity(replies.size_hint().0);

    for reply in replies {
        if let Entry::Vacant(entry) = index.entry(reply.id) {
            entry.insert(slots.len());
            slots.push(Slot {
                reply,
                children: Vec::new(),
            });
        }
    }

    let mut roots = Vec::new();
    for pos in 0..slots.len() {
        let parent = slots[pos]
            .reply
            .parent_reply_id
            .and_then(|id| index.get(&id).copied());
        match parent {
            Some(parent) => slots[parent].children.push(pos),
            None => roots.push(pos),
        }
    }

    ThreadForest {
        slots,
        roots,
        index,
    }
}

impl ThreadForest {
    /// Number of replies held by the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Top-level replies in input order.
    pub fn roots(&self) -> impl ExactSizeIterator<Item = ReplyNode<'_>> + '_ {
        self.roots.iter().map(|&pos| ReplyNode {
            forest: self,
            pos,
        })
    }

    #[must_use]
    pub fn root_ids(&self) -> Vec<ReplyId> {
        self.roots().map(|node| node.id()).collect()
    }

    #[must_use]
    pub fn get(&self, id: ReplyId) -> Option<ReplyNode<'_>> {
        self.index.get(&id).map(|&pos| ReplyNode { forest: self, pos })
    }

    /// Pre-order walk over every reply reachable from a root.
    ///
    /// Uses an explicit stack and visits each node at most once, so cyclic
    /// parent links terminate.
    #[must_use]
    pub fn depth_first(&self) -> DepthFirst<'_> {
        let stack = self.roots.iter().rev().map(|&pos| (pos, 0)).collect();
        DepthFirst {
            forest: self,
            stack,
            visited: vec![false; self.slots.len()],
        }
    }

    /// Replies that no root leads to.
    ///
    /// Only non-empty when parent links form a cycle, e.g. a reply naming
    /// itself as its parent.
    pub fn detached(&self) -> impl Iterator<Item = ReplyNode<'_>> + '_ {
        let mut walk = self.depth_first();
        while walk.next().is_some() {}
        let reachable = walk.visited;
        (0..self.slots.len())
            .filter(move |&pos| !reachable[pos])
            .map(|pos| ReplyNode { forest: self, pos })
    }
}

/// Borrowed view of one node in a [`ThreadForest`].
#[derive(Debug, Clone, Copy)]
pub struct ReplyNode<'a> {
    forest: &'a ThreadForest,
    pos: usize,
}

impl<'a> ReplyNode<'a> {
    #[must_use]
    pub fn reply(&self) -> &'a ForumReply {
        &self.forest.slots[self.pos].reply
    }

    #[must_use]
    pub fn id(&self) -> ReplyId {
        self.reply().id
    }

    /// Direct children in input order.
    pub fn children(&self) -> impl ExactSizeIterator<Item = ReplyNode<'a>> + 'a {
        let forest = self.forest;
        forest.slots[self.pos]
            .children
            .iter()
            .map(move |&pos| ReplyNode { forest, pos })
    }

    #[must_use]
    pub fn child_ids(&self) -> Vec<ReplyId> {
        self.children().map(|child| child.id()).collect()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.forest.slots[self.pos].children.len()
    }
}

/// Iterator returned by [`ThreadForest::depth_first`]; yields `(depth, reply)`.
#[derive(Debug)]
pub struct DepthFirst<'a> {
    forest: &'a ThreadForest,
    stack: Vec<(usize, usize)>,
    visited: Vec<bool>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (usize, &'a ForumReply);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((pos, depth)) = self.stack.pop() {
            if self.visited[pos] {
                continue;
            }
            self.visited[pos] = true;

            let slot = &self.forest.slots[pos];
            for &child in slot.children.iter().rev() {
                if !self.visited[child] {
                    self.stack.push((child, depth + 1));
                }
            }
            return Some((depth, &slot.reply));
        }
        None
    }
}
