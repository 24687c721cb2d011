//! Scene-graph nodes
//!
//! Nodes live in a per-scene arena keyed by [`NodeId`]. A node owns its
//! children (by id) and holds a non-owning back-reference to its parent and to
//! the game object it represents. World transforms are recomputed lazily:
//! changing a local transform schedules the node, and
//! [`SceneGraph::update_parents`] refreshes every scheduled subtree parent
//! first.

use std::collections::{HashMap, VecDeque};

use super::bounds::BoundingBox;
use crate::foundation::handles::{NodeId, ObjectId, SceneId};
use crate::foundation::math::{Quat, Transform, Vec3};

/// Owning handle to a node.
///
/// Not `Clone`: the single game object holding it is the node's owner.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedNode(NodeId);

impl OwnedNode {
    /// Node being owned
    pub fn id(&self) -> NodeId {
        self.0
    }
}

/// Non-owning back-reference from a node to its client object.
///
/// It never counts as a container membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRef(ObjectId);

impl ClientRef {
    /// Wrap an object handle as a back-reference
    pub fn new(object: ObjectId) -> Self {
        Self(object)
    }

    /// Referenced object (may already be reclaimed)
    pub fn object(self) -> ObjectId {
        self.0
    }
}

/// Procedural driver of a node's local transform (IPO curves, constraints)
pub trait NodeController: Send {
    /// Update `local` for simulation time `time`.
    ///
    /// Returning `true` keeps the node scheduled for the next frame.
    fn update(&mut self, time: f64, local: &mut Transform) -> bool;

    /// Clone for a replicated node; `None` drops the controller from the replica
    fn replica(&self) -> Option<Box<dyn NodeController>>;
}

/// One node of the scene graph
pub struct SceneGraphNode {
    id: NodeId,
    local: Transform,
    world: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    controllers: Vec<Box<dyn NodeController>>,
    client: Option<ClientRef>,
    scene: SceneId,
    bbox: BoundingBox,
    scheduled: bool,
}

impl SceneGraphNode {
    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Transform relative to the parent
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Cached world transform, valid after the last update pass
    pub fn world(&self) -> &Transform {
        &self.world
    }

    /// Parent node, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Game object this node belongs to
    pub fn client(&self) -> Option<ClientRef> {
        self.client
    }

    /// Scene the node currently belongs to
    pub fn scene(&self) -> SceneId {
        self.scene
    }

    /// Local bounding box
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Whether the node waits for a world-transform update
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Number of attached controllers
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }
}

/// Arena of scene-graph nodes with the scheduled-update worklists
#[derive(Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, SceneGraphNode>,
    scheduled: VecDeque<NodeId>,
    rescheduled: Vec<NodeId>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parentless node with `local` as both local and world transform.
    ///
    /// The node starts scheduled.
    pub fn create_node(&mut self, local: Transform, scene: SceneId) -> OwnedNode {
        let id = NodeId::next();
        self.nodes.insert(
            id,
            SceneGraphNode {
                id,
                world: local.clone(),
                local,
                parent: None,
                children: Vec::new(),
                controllers: Vec::new(),
                client: None,
                scene,
                bbox: BoundingBox::default(),
                scheduled: false,
            },
        );
        self.schedule(id);
        OwnedNode(id)
    }

    /// Create a detached copy of `source`'s node data (no children, no
    /// controllers, no client) under `parent`
    pub fn replicate_node(&mut self, source: NodeId, parent: Option<NodeId>) -> Option<OwnedNode> {
        let (local, world, scene, bbox) = {
            let node = self.nodes.get(&source)?;
            (node.local.clone(), node.world.clone(), node.scene, node.bbox)
        };
        let owned = self.create_node(local, scene);
        if let Some(node) = self.nodes.get_mut(&owned.id()) {
            node.world = world;
            node.bbox = bbox;
        }
        if let Some(parent) = parent {
            self.add_child(parent, owned.id());
        }
        Some(owned)
    }

    /// Replicate the node controllers of `source` onto `target`
    pub fn replicate_controllers(&mut self, source: NodeId, target: NodeId) {
        let replicas: Vec<Box<dyn NodeController>> = match self.nodes.get(&source) {
            Some(node) => node.controllers.iter().filter_map(|c| c.replica()).collect(),
            None => return,
        };
        if let Some(node) = self.nodes.get_mut(&target) {
            node.controllers = replicas;
        }
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&SceneGraphNode> {
        self.nodes.get(&id)
    }

    /// Whether the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cached world transform of a node
    pub fn world(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(&id).map(|n| &n.world)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of a node (empty for unknown nodes)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Client object of a node
    pub fn client(&self, id: NodeId) -> Option<ObjectId> {
        self.nodes.get(&id).and_then(|n| n.client).map(ClientRef::object)
    }

    /// Set the client back-reference of a node
    pub fn set_client(&mut self, id: NodeId, client: Option<ClientRef>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.client = client;
        }
    }

    /// Replace the local bounding box
    pub fn set_bbox(&mut self, id: NodeId, bbox: BoundingBox) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.bbox = bbox;
        }
    }

    /// Attach a procedural controller
    pub fn add_controller(&mut self, id: NodeId, controller: Box<dyn NodeController>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.controllers.push(controller);
        }
        self.schedule(id);
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    ///
    /// Refused when `parent` lies inside `child`'s subtree, since the graph
    /// must stay acyclic. Returns whether the node was attached.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return false;
        }
        if self.is_ancestor_or_self(child, parent) {
            log::warn!("Refusing to parent node {} under its own descendant {}", child, parent);
            return false;
        }
        self.disconnect_from_parent(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        self.schedule(child);
        true
    }

    /// Whether `ancestor` is `id` or one of its parents
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Detach a node from its parent; the node becomes a root
    pub fn disconnect_from_parent(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(&id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != id);
        }
    }

    /// Replace the whole local transform and schedule the node
    pub fn set_local(&mut self, id: NodeId, local: Transform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local = local;
            self.schedule(id);
        }
    }

    /// Set the local position and schedule the node
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local.position = position;
            self.schedule(id);
        }
    }

    /// Set the local orientation and schedule the node
    pub fn set_local_orientation(&mut self, id: NodeId, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local.rotation = rotation;
            self.schedule(id);
        }
    }

    /// Multiply the local scale per axis and schedule the node
    pub fn set_relative_scale(&mut self, id: NodeId, scale: &Vec3) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local.scale.component_mul_assign(scale);
            self.schedule(id);
        }
    }

    /// Queue a node for world-transform recomputation.
    ///
    /// Idempotent: returns `false` if the node was already scheduled or is
    /// unknown.
    pub fn schedule(&mut self, id: NodeId) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if !node.scheduled => {
                node.scheduled = true;
                self.scheduled.push_back(id);
                true
            }
            _ => false,
        }
    }

    /// Queue a node for the next update pass rather than the current one
    pub fn reschedule(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) && !self.rescheduled.contains(&id) {
            self.rescheduled.push(id);
        }
    }

    /// Number of nodes waiting for an update
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    fn has_pending_ancestor(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            match self.nodes.get(&ancestor) {
                Some(node) if node.scheduled => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    /// Recompute world transforms of every scheduled node.
    ///
    /// A node whose ancestor is still pending is re-queued behind it; when
    /// the ancestor is processed its whole subtree is refreshed, so no node
    /// is ever computed from a stale parent. Nodes rescheduled during the
    /// pass are queued for the next one. Returns the number of nodes updated.
    pub fn update_parents(&mut self, time: f64) -> usize {
        let mut updated = 0;

        while let Some(id) = self.scheduled.pop_front() {
            match self.nodes.get(&id) {
                Some(node) if node.scheduled => {}
                // Refreshed through an ancestor or removed meanwhile
                _ => continue,
            }
            if self.has_pending_ancestor(id) {
                self.scheduled.push_back(id);
                continue;
            }
            updated += self.update_world_data(id, time);
        }

        for id in std::mem::take(&mut self.rescheduled) {
            self.schedule(id);
        }

        log::trace!("Scenegraph update refreshed {} nodes", updated);
        updated
    }

    /// Recompute the world transform of `id` and its whole subtree
    pub fn update_world_data(&mut self, id: NodeId, time: f64) -> usize {
        let mut updated = 0;
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let parent_world = self
                .parent(current)
                .and_then(|p| self.nodes.get(&p))
                .map(|p| p.world.clone());

            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };

            let mut keep_active = false;
            for controller in &mut node.controllers {
                keep_active |= controller.update(time, &mut node.local);
            }

            node.world = match &parent_world {
                Some(parent) => parent.combine(&node.local),
                None => node.local.clone(),
            };
            node.scheduled = false;
            stack.extend(node.children.iter().rev().copied());
            updated += 1;

            if keep_active {
                self.reschedule(current);
            }
        }

        updated
    }

    /// Nodes of the subtree rooted at `id`, children before their parent
    pub fn subtree_post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !self.nodes.contains_key(&current) {
                continue;
            }
            stack.push((current, true));
            for child in self.children(current).iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }

    /// Remove a single node from the arena, unlinking it from its parent
    /// and dropping it from the worklists. Children are left orphaned.
    pub fn remove_node(&mut self, owned: OwnedNode) -> Option<SceneGraphNode> {
        let id = owned.id();
        self.disconnect_from_parent(id);
        let node = self.nodes.remove(&id)?;
        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = None;
            }
        }
        self.scheduled.retain(|n| *n != id);
        self.rescheduled.retain(|n| *n != id);
        Some(node)
    }

    /// Point every node at `scene`
    pub fn retarget_scene(&mut self, scene: SceneId) {
        for node in self.nodes.values_mut() {
            node.scene = scene;
        }
    }

    /// Move every node of `other` into this graph, keeping pending work
    pub fn merge(&mut self, mut other: SceneGraph) {
        self.nodes.extend(other.nodes.drain());
        self.scheduled.extend(other.scheduled.drain(..));
        self.rescheduled.append(&mut other.rescheduled);
    }
}
