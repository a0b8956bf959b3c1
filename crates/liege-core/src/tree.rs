//! Resource tree and its transitive-closure index.
//!
//! Every node keeps its full ordered ancestor chain (root first) and its full
//! descendant set, maintained incrementally on insert and recomputed for the
//! moved subtree on reparent. Reads never observe a closure stale relative to
//! a completed structural mutation: mutations rewrite the index before they
//! return, and a rejected mutation leaves the index untouched.

use std::collections::{HashMap, HashSet};

use crate::prelude::*;

#[derive(Debug, Clone)]
struct NodeEntry {
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	/// Full ancestor chain, root first
	ancestors: Vec<NodeId>,
	descendants: HashSet<NodeId>,
	resource: ResourceRef,
}

/// In-memory forest of hierarchy nodes with a closure index.
///
/// Rebuilt from persisted parent pointers at engine startup; afterwards the
/// engine keeps it in lockstep with the store.
#[derive(Debug, Default)]
pub struct HierarchyTree {
	nodes: HashMap<NodeId, NodeEntry>,
	by_resource: HashMap<ResourceRef, NodeId>,
}

impl HierarchyTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuilds the tree from persisted node rows.
	///
	/// Rows may arrive in any order; children are attached once their parent
	/// is present. Rows left over after no progress can be made point at a
	/// missing parent or form a cycle in the stored data.
	pub fn from_nodes(rows: Vec<Node>) -> LgResult<Self> {
		let mut tree = Self::new();
		let mut pending = rows;

		while !pending.is_empty() {
			let before = pending.len();
			pending.retain(|row| {
				let ready = match row.parent_id {
					Some(parent) => tree.nodes.contains_key(&parent),
					None => true,
				};
				if ready {
					// insert cannot fail here: the parent is present and the
					// node id is fresh
					let _ = tree.insert(row.node_id, row.parent_id, row.resource.clone());
				}
				!ready
			});
			if pending.len() == before {
				error!("{} hierarchy rows are orphaned or cyclic", pending.len());
				return Err(Error::Internal("inconsistent hierarchy rows".into()));
			}
		}
		Ok(tree)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, node_id: NodeId) -> bool {
		self.nodes.contains_key(&node_id)
	}

	pub fn node_of_resource(&self, resource: &ResourceRef) -> Option<NodeId> {
		self.by_resource.get(resource).copied()
	}

	pub fn resource_of(&self, node_id: NodeId) -> LgResult<&ResourceRef> {
		self.entry(node_id).map(|e| &e.resource)
	}

	pub fn parent_of(&self, node_id: NodeId) -> LgResult<Option<NodeId>> {
		self.entry(node_id).map(|e| e.parent)
	}

	pub fn children_of(&self, node_id: NodeId) -> LgResult<&[NodeId]> {
		self.entry(node_id).map(|e| e.children.as_slice())
	}

	/// Full ancestor chain of the node, root first. Never contains the node
	/// itself.
	pub fn ancestors_of(&self, node_id: NodeId) -> LgResult<&[NodeId]> {
		self.entry(node_id).map(|e| e.ancestors.as_slice())
	}

	/// All transitive descendants of the node, unordered. Never contains the
	/// node itself.
	pub fn descendants_of(&self, node_id: NodeId) -> LgResult<&HashSet<NodeId>> {
		self.entry(node_id).map(|e| &e.descendants)
	}

	pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
		self.nodes.get(&b).is_some_and(|e| e.ancestors.contains(&a))
	}

	/// The subtree rooted at the node: itself plus all descendants.
	pub fn nodes_within(&self, node_id: NodeId) -> LgResult<HashSet<NodeId>> {
		let entry = self.entry(node_id)?;
		let mut within = entry.descendants.clone();
		within.insert(node_id);
		Ok(within)
	}

	/// Inserts a node under the given parent (or as a root).
	///
	/// The new node's ancestor chain is its parent's chain plus the parent,
	/// and the node joins the descendant set of every ancestor.
	pub fn insert(
		&mut self,
		node_id: NodeId,
		parent: Option<NodeId>,
		resource: ResourceRef,
	) -> LgResult<()> {
		if self.nodes.contains_key(&node_id) {
			return Err(Error::Internal("node id already present".into()));
		}
		let ancestors = match parent {
			Some(parent_id) => {
				let parent_entry = self.entry(parent_id)?;
				let mut chain = parent_entry.ancestors.clone();
				chain.push(parent_id);
				chain
			}
			None => Vec::new(),
		};

		for ancestor in &ancestors {
			if let Some(entry) = self.nodes.get_mut(ancestor) {
				entry.descendants.insert(node_id);
			}
		}
		if let Some(parent_id) = parent {
			if let Some(entry) = self.nodes.get_mut(&parent_id) {
				entry.children.push(node_id);
			}
		}

		self.by_resource.insert(resource.clone(), node_id);
		self.nodes.insert(
			node_id,
			NodeEntry {
				parent,
				children: Vec::new(),
				ancestors,
				descendants: HashSet::new(),
				resource,
			},
		);
		Ok(())
	}

	/// Moves a node (and its subtree) under a new parent, or to the roots.
	///
	/// Rejected with `Error::Cycle` when the target is the node itself or one
	/// of its descendants; the tree is left unchanged in that case. On
	/// success the ancestor chains of the whole moved subtree are recomputed.
	pub fn reparent(&mut self, node_id: NodeId, new_parent: Option<NodeId>) -> LgResult<()> {
		let entry = self.entry(node_id)?;
		let old_parent = entry.parent;
		let moved: Vec<NodeId> = entry.descendants.iter().copied().collect();

		if let Some(target) = new_parent {
			if target == node_id || self.is_ancestor(node_id, target) {
				return Err(Error::Cycle);
			}
			// target must exist before we touch anything
			self.entry(target)?;
		}

		// Detach from the old ancestor chain
		let old_ancestors = self.entry(node_id)?.ancestors.clone();
		for ancestor in &old_ancestors {
			if let Some(e) = self.nodes.get_mut(ancestor) {
				e.descendants.remove(&node_id);
				for d in &moved {
					e.descendants.remove(d);
				}
			}
		}
		if let Some(old) = old_parent {
			if let Some(e) = self.nodes.get_mut(&old) {
				e.children.retain(|c| *c != node_id);
			}
		}

		// Attach under the new parent
		let new_ancestors = match new_parent {
			Some(parent_id) => {
				let mut chain = self.entry(parent_id)?.ancestors.clone();
				chain.push(parent_id);
				chain
			}
			None => Vec::new(),
		};
		for ancestor in &new_ancestors {
			if let Some(e) = self.nodes.get_mut(ancestor) {
				e.descendants.insert(node_id);
				for d in &moved {
					e.descendants.insert(*d);
				}
			}
		}
		if let Some(parent_id) = new_parent {
			if let Some(e) = self.nodes.get_mut(&parent_id) {
				e.children.push(node_id);
			}
		}
		if let Some(e) = self.nodes.get_mut(&node_id) {
			e.parent = new_parent;
			e.ancestors = new_ancestors;
		}

		// Ancestor chains below the moved node changed as well
		self.rebuild_chains_below(node_id);
		Ok(())
	}

	/// Removes a node. Children are spliced up to the removed node's parent
	/// so the forest stays consistent; their own removal is driven by their
	/// own resources.
	pub fn remove(&mut self, node_id: NodeId) -> LgResult<()> {
		let entry = self.entry(node_id)?;
		let parent = entry.parent;
		let children = entry.children.clone();
		let ancestors = entry.ancestors.clone();

		for ancestor in &ancestors {
			if let Some(e) = self.nodes.get_mut(ancestor) {
				e.descendants.remove(&node_id);
			}
		}
		if let Some(parent_id) = parent {
			if let Some(e) = self.nodes.get_mut(&parent_id) {
				e.children.retain(|c| *c != node_id);
			}
		}

		let Some(removed) = self.nodes.remove(&node_id) else {
			return Err(Error::NodeNotFound(node_id));
		};
		self.by_resource.remove(&removed.resource);

		for child in children {
			if let Some(e) = self.nodes.get_mut(&child) {
				e.parent = parent;
			}
			if let Some(parent_id) = parent {
				if let Some(e) = self.nodes.get_mut(&parent_id) {
					e.children.push(child);
				}
			}
			self.rebuild_chain(child);
			self.rebuild_chains_below(child);
		}
		Ok(())
	}

	fn entry(&self, node_id: NodeId) -> LgResult<&NodeEntry> {
		self.nodes.get(&node_id).ok_or(Error::NodeNotFound(node_id))
	}

	/// Recomputes one node's ancestor chain from its parent pointer
	fn rebuild_chain(&mut self, node_id: NodeId) {
		let Some(parent) = self.nodes.get(&node_id).and_then(|e| e.parent) else {
			if let Some(e) = self.nodes.get_mut(&node_id) {
				e.ancestors.clear();
			}
			return;
		};
		let chain = match self.nodes.get(&parent) {
			Some(p) => {
				let mut chain = p.ancestors.clone();
				chain.push(parent);
				chain
			}
			None => Vec::new(),
		};
		if let Some(e) = self.nodes.get_mut(&node_id) {
			e.ancestors = chain;
		}
	}

	/// Recomputes ancestor chains for every node strictly below the given one
	fn rebuild_chains_below(&mut self, node_id: NodeId) {
		let mut stack: Vec<NodeId> =
			self.nodes.get(&node_id).map(|e| e.children.clone()).unwrap_or_default();
		while let Some(current) = stack.pop() {
			self.rebuild_chain(current);
			if let Some(e) = self.nodes.get(&current) {
				stack.extend(e.children.iter().copied());
			}
		}
	}
}


// vim: ts=4
