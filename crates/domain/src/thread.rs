//! Reply forest construction.
//!
//! The forest is derived from the flat, newest-first list of loaded comments
//! and rebuilt from scratch whenever that list changes. Malformed parent links
//! (a parent that is not loaded, a comment replying to itself, parent cycles)
//! never fail the build: the affected comment is promoted to a root and marked
//! with the reason its parent is unknown.

use crate::models::{CommentId, CommentRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// The parent is not among the loaded comments (yet).
    MissingParent,
    SelfReference,
    /// The comment sits on a parent cycle that no root reaches.
    Cycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum ParentLink {
    Root,
    Attached,
    Unknown(OrphanReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
    pub comment: CommentRecord,
    pub link: ParentLink,
    pub depth: usize,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    pub fn id(&self) -> CommentId {
        self.comment.id
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self.link, ParentLink::Unknown(_))
    }

    /// Number of nodes below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&ThreadNode> = self.replies.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.replies);
        }
        count
    }

    /// This node and everything below it, parents before replies and
    /// siblings in order.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

// Flattens the subtree so dropping a deep reply chain does not recurse.
impl Drop for ThreadNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a ThreadNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a ThreadNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.replies.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    roots: Vec<ThreadNode>,
}

impl Forest {
    pub fn roots(&self) -> &[ThreadNode] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<ThreadNode> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes, roots and replies.
    pub fn len(&self) -> usize {
        self.roots
            .iter()
            .map(|root| 1 + root.descendant_count())
            .sum()
    }

    /// Every node in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ThreadNode> {
        self.roots.iter().flat_map(ThreadNode::iter)
    }

    /// Every comment id in display (pre-order) order.
    pub fn ids(&self) -> Vec<CommentId> {
        self.iter().map(ThreadNode::id).collect()
    }

    pub fn find(&self, id: CommentId) -> Option<&ThreadNode> {
        self.iter().find(|node| node.id() == id)
    }
}

/// Builds the reply forest for `records`, which are expected newest first.
///
/// Roots keep input order. Replies keep input order under their parent.
/// Duplicate ids keep their first occurrence.
pub fn build_forest(records: &[CommentRecord]) -> Forest {
    let mut seen = HashSet::with_capacity(records.len());
    let unique: Vec<&CommentRecord> = records.iter().filter(|r| seen.insert(r.id)).collect();

    let position: HashMap<CommentId, usize> = unique
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.id, idx))
        .collect();

    let mut children: HashMap<CommentId, Vec<usize>> = HashMap::new();
    for (idx, record) in unique.iter().enumerate() {
        if let Some(parent) = record.parent_id {
            if parent != record.id {
                children.entry(parent).or_default().push(idx);
            }
        }
    }

    let mut anchors: Vec<(usize, ParentLink)> = unique
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match record.parent_id {
            None => Some((idx, ParentLink::Root)),
            Some(parent) if parent == record.id => {
                Some((idx, ParentLink::Unknown(OrphanReason::SelfReference)))
            }
            Some(parent) if !position.contains_key(&parent) => {
                Some((idx, ParentLink::Unknown(OrphanReason::MissingParent)))
            }
            Some(_) => None,
        })
        .collect();

    let mut placed = vec![false; unique.len()];
    for &(idx, _) in &anchors {
        mark_reachable(idx, &unique, &children, &mut placed);
    }

    // Whatever is still unplaced is on, or hangs off, a parent cycle.
    for idx in 0..unique.len() {
        if !placed[idx] {
            let anchor = cycle_anchor(idx, &unique, &position);
            anchors.push((anchor, ParentLink::Unknown(OrphanReason::Cycle)));
            mark_reachable(anchor, &unique, &children, &mut placed);
        }
    }
    anchors.sort_by_key(|&(idx, _)| idx);

    let mut builder = Builder {
        records: &unique,
        children: &children,
        path: HashSet::new(),
        emitted: HashSet::with_capacity(unique.len()),
    };
    let roots = anchors
        .into_iter()
        .filter_map(|(idx, link)| builder.node(idx, link, 0))
        .collect();

    Forest { roots }
}

/// Walks up from an unplaced comment to the cycle it descends from and returns
/// the cycle member that comes first in input order.
///
/// Every ancestor of an unplaced comment is loaded and unplaced itself, so the
/// walk always ends on a repeat.
fn cycle_anchor(
    start: usize,
    records: &[&CommentRecord],
    position: &HashMap<CommentId, usize>,
) -> usize {
    let parent_of = |idx: usize| {
        records[idx]
            .parent_id
            .and_then(|parent| position.get(&parent).copied())
    };

    let mut visited = HashSet::new();
    let mut current = start;
    while visited.insert(current) {
        match parent_of(current) {
            Some(parent) => current = parent,
            None => return start,
        }
    }

    let mut anchor = current;
    let mut member = current;
    while let Some(parent) = parent_of(member) {
        if parent == current {
            break;
        }
        anchor = anchor.min(parent);
        member = parent;
    }
    anchor
}

fn mark_reachable(
    start: usize,
    records: &[&CommentRecord],
    children: &HashMap<CommentId, Vec<usize>>,
    placed: &mut [bool],
) {
    let mut stack = vec![start];
    while let Some(idx) = stack.pop() {
        if std::mem::replace(&mut placed[idx], true) {
            continue;
        }
        if let Some(kids) = children.get(&records[idx].id) {
            stack.extend(kids.iter().copied().filter(|&kid| !placed[kid]));
        }
    }
}

struct Builder<'a> {
    records: &'a [&'a CommentRecord],
    children: &'a HashMap<CommentId, Vec<usize>>,
    /// Ids on the current root-to-node path.
    path: HashSet<CommentId>,
    emitted: HashSet<CommentId>,
}

/// A node whose replies are still being built.
struct Open {
    idx: usize,
    link: ParentLink,
    depth: usize,
    next_kid: usize,
    replies: Vec<ThreadNode>,
}

impl Builder<'_> {
    /// Builds the subtree under `idx` with an explicit stack, children in
    /// input order.
    fn node(&mut self, idx: usize, link: ParentLink, depth: usize) -> Option<ThreadNode> {
        let records = self.records;
        let children = self.children;
        let mut stack = vec![self.open(idx, link, depth)?];

        loop {
            let top = stack.last_mut()?;
            let kids = children
                .get(&records[top.idx].id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            if let Some(&kid) = kids.get(top.next_kid) {
                top.next_kid += 1;
                let depth = top.depth + 1;
                if let Some(open) = self.open(kid, ParentLink::Attached, depth) {
                    stack.push(open);
                }
                continue;
            }

            let done = stack.pop()?;
            let record = records[done.idx];
            self.path.remove(&record.id);
            let node = ThreadNode {
                comment: record.clone(),
                link: done.link,
                depth: done.depth,
                replies: done.replies,
            };
            match stack.last_mut() {
                Some(parent) => parent.replies.push(node),
                None => return Some(node),
            }
        }
    }

    fn open(&mut self, idx: usize, link: ParentLink, depth: usize) -> Option<Open> {
        let id = self.records[idx].id;
        if self.path.contains(&id) || !self.emitted.insert(id) {
            return None;
        }
        self.path.insert(id);
        Some(Open {
            idx,
            link,
            depth,
            next_kid: 0,
            replies: Vec::new(),
        })
    }
}
