//! Hierarchical position/rotation/scale nodes.
//!
//! Nodes live in a [`TransformTree`] arena and refer to each other through
//! [`TransformId`] handles, so parent and child links never own anything.
//! Every node keeps its local (parent relative) values and a cached copy of
//! its world values; mutating either side re-derives the other for the node
//! and all of its descendants and marks them dirty, so geometry caching
//! world-space data knows it has to be rebuilt on the next commit.

use super::error::{SceneError, SceneResult};
use super::{Quaternion, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformId(usize);

#[derive(Debug, Clone)]
struct TransformNode {
    local_position: Vec3,
    local_rotation: Quaternion,
    scale: Vec3,
    parent: Option<TransformId>,
    children: Vec<TransformId>,
    world_position: Vec3,
    world_rotation: Quaternion,
    dirty: bool,
}

#[derive(Debug, Default, Clone)]
pub struct TransformTree {
    nodes: Vec<TransformNode>,
}

impl TransformTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Adds a root node; local and world values coincide.
    pub fn insert(&mut self, position: Vec3, rotation: Quaternion) -> TransformId {
        let id = TransformId(self.nodes.len());
        self.nodes.push(TransformNode {
            local_position: position,
            local_rotation: rotation,
            scale: Vec3::ONE,
            parent: None,
            children: Vec::new(),
            world_position: position,
            world_rotation: rotation,
            dirty: true,
        });
        id
    }

    /// Adds a node expressed in the frame of `parent`.
    pub fn insert_child(
        &mut self,
        parent: TransformId,
        local_position: Vec3,
        local_rotation: Quaternion,
    ) -> TransformId {
        let id = self.insert(local_position, local_rotation);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        self.update_world(id);
        id
    }

    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: TransformId) -> &[TransformId] {
        &self.nodes[id.0].children
    }

    pub fn local_position(&self, id: TransformId) -> Vec3 {
        self.nodes[id.0].local_position
    }

    pub fn local_rotation(&self, id: TransformId) -> Quaternion {
        self.nodes[id.0].local_rotation
    }

    pub fn scale(&self, id: TransformId) -> Vec3 {
        self.nodes[id.0].scale
    }

    pub fn world_position(&self, id: TransformId) -> Vec3 {
        self.nodes[id.0].world_position
    }

    pub fn world_rotation(&self, id: TransformId) -> Quaternion {
        self.nodes[id.0].world_rotation
    }

    /// Maps a point given in this node's frame to world space:
    /// scale, then rotate, then translate, and repeat for every ancestor.
    pub fn local_to_world(&self, id: TransformId, point: Vec3) -> Vec3 {
        let mut current = Some(id);
        let mut point = point;
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            point = node.local_position + node.local_rotation.rotate(node.scale * point);
            current = node.parent;
        }
        point
    }

    /// Inverse of [`TransformTree::local_to_world`]. Axes with a zero scale collapse to 0.
    pub fn world_to_local(&self, id: TransformId, point: Vec3) -> Vec3 {
        let node = &self.nodes[id.0];
        let in_parent = match node.parent {
            Some(parent) => self.world_to_local(parent, point),
            None => point,
        };
        let unrotated = node
            .local_rotation
            .inverse()
            .rotate(in_parent - node.local_position);
        Vec3::new(
            safe_div(unrotated.x, node.scale.x),
            safe_div(unrotated.y, node.scale.y),
            safe_div(unrotated.z, node.scale.z),
        )
    }

    /// Largest factor by which lengths in this node's frame grow in world space:
    /// the product of every scale on the way to the root, taking the largest
    /// component of each.
    pub fn max_world_scale(&self, id: TransformId) -> f64 {
        let mut current = Some(id);
        let mut factor = 1.0;
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            factor *= node.scale.x.abs().max(node.scale.y.abs()).max(node.scale.z.abs());
            current = node.parent;
        }
        factor
    }

    /// Rotates a direction from this node's frame into world space.
    pub fn direction_to_world(&self, id: TransformId, direction: Vec3) -> Vec3 {
        self.nodes[id.0].world_rotation.rotate(direction)
    }

    pub fn set_local_position(&mut self, id: TransformId, position: Vec3) {
        self.nodes[id.0].local_position = position;
        self.update_world(id);
    }

    pub fn set_world_position(&mut self, id: TransformId, position: Vec3) {
        let local = match self.nodes[id.0].parent {
            Some(parent) => self.world_to_local(parent, position),
            None => position,
        };
        self.set_local_position(id, local);
    }

    /// Moves the node by `offset`, expressed in its parent's frame.
    pub fn translate(&mut self, id: TransformId, offset: Vec3) {
        let position = self.nodes[id.0].local_position + offset;
        self.set_local_position(id, position);
    }

    pub fn set_local_rotation(&mut self, id: TransformId, rotation: Quaternion) {
        self.nodes[id.0].local_rotation = rotation.normalize();
        self.update_world(id);
    }

    pub fn set_world_rotation(&mut self, id: TransformId, rotation: Quaternion) {
        let local = match self.nodes[id.0].parent {
            Some(parent) => self.nodes[parent.0].world_rotation.inverse() * rotation,
            None => rotation,
        };
        self.set_local_rotation(id, local);
    }

    /// Applies `rotation` after the node's current local rotation.
    pub fn rotate(&mut self, id: TransformId, rotation: Quaternion) {
        let local = rotation * self.nodes[id.0].local_rotation;
        self.set_local_rotation(id, local);
    }

    pub fn set_scale(&mut self, id: TransformId, scale: Vec3) {
        self.nodes[id.0].scale = scale;
        // the node itself doesn't move, but everything expressed in its frame does
        self.update_world(id);
    }

    /// Re-parents `child` under `parent`, keeping its world position and rotation.
    pub fn attach(&mut self, child: TransformId, parent: TransformId) -> SceneResult<()> {
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::TransformCycle { child, parent });
        }
        let world_position = self.nodes[child.0].world_position;
        let world_rotation = self.nodes[child.0].world_rotation;

        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);

        let local_position = self.world_to_local(parent, world_position);
        let local_rotation = self.nodes[parent.0].world_rotation.inverse() * world_rotation;
        let node = &mut self.nodes[child.0];
        node.local_position = local_position;
        node.local_rotation = local_rotation.normalize();
        self.update_world(child);
        Ok(())
    }

    /// Turns `child` into a root node, keeping its world position and rotation.
    pub fn detach(&mut self, child: TransformId) {
        let world_position = self.nodes[child.0].world_position;
        let world_rotation = self.nodes[child.0].world_rotation;
        self.unlink(child);
        let node = &mut self.nodes[child.0];
        node.local_position = world_position;
        node.local_rotation = world_rotation;
        self.update_world(child);
    }

    pub fn is_dirty(&self, id: TransformId) -> bool {
        self.nodes[id.0].dirty
    }

    pub fn any_dirty(&self) -> bool {
        self.nodes.iter().any(|node| node.dirty)
    }

    pub fn clear_dirty(&mut self) {
        for node in &mut self.nodes {
            node.dirty = false;
        }
    }

    fn unlink(&mut self, child: TransformId) {
        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: TransformId, id: TransformId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes[node_id.0].parent;
        }
        false
    }

    /// Recomputes the cached world values of `id` and its whole subtree.
    fn update_world(&mut self, id: TransformId) {
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let (world_position, world_rotation) = match self.nodes[node_id.0].parent {
                Some(parent) => {
                    let node = &self.nodes[node_id.0];
                    (
                        self.local_to_world(parent, node.local_position),
                        self.nodes[parent.0].world_rotation * node.local_rotation,
                    )
                }
                None => {
                    let node = &self.nodes[node_id.0];
                    (node.local_position, node.local_rotation)
                }
            };
            let node = &mut self.nodes[node_id.0];
            node.world_position = world_position;
            node.world_rotation = world_rotation.normalize();
            node.dirty = true;
            stack.extend(node.children.iter().copied());
        }
    }
}

#[inline(always)]
fn safe_div(value: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        0.0
    } else {
        value / divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_child_world_position_follows_parent() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Vec3::new(1.0, 0.0, 0.0), Quaternion::IDENTITY);
        let child = tree.insert_child(parent, Vec3::new(0.0, 2.0, 0.0), Quaternion::IDENTITY);
        assert!(tree
            .world_position(child)
            .approx_eq(Vec3::new(1.0, 2.0, 0.0), 1e-9));

        tree.set_world_position(parent, Vec3::new(-3.0, 0.0, 5.0));
        assert!(tree
            .world_position(child)
            .approx_eq(Vec3::new(-3.0, 2.0, 5.0), 1e-9));
        // local offset is untouched
        assert_eq!(tree.local_position(child), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_parent_rotation_and_scale_apply_to_children() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Vec3::new(0.0, 0.0, 10.0),
            Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2),
        );
        tree.set_scale(parent, Vec3::new(2.0, 1.0, 1.0));
        let child = tree.insert_child(parent, Vec3::x_axis(), Quaternion::IDENTITY);
        // scaled to (2, 0, 0), rotated onto +Y, then translated
        assert!(tree
            .world_position(child)
            .approx_eq(Vec3::new(0.0, 2.0, 10.0), 1e-9));
    }

    #[test]
    fn test_set_world_position_under_parent() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Vec3::new(4.0, 1.0, -2.0),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.8),
        );
        let child = tree.insert_child(parent, Vec3::zero(), Quaternion::IDENTITY);
        let target = Vec3::new(0.5, -7.0, 3.0);
        tree.set_world_position(child, target);
        assert!(tree.world_position(child).approx_eq(target, 1e-9));
    }

    #[test]
    fn test_max_world_scale_includes_ancestors() {
        let mut tree = TransformTree::new();
        let root = tree.insert(Vec3::zero(), Quaternion::IDENTITY);
        tree.set_scale(root, Vec3::new(3.0, 1.0, 1.0));
        let child = tree.insert_child(root, Vec3::x_axis(), Quaternion::IDENTITY);
        tree.set_scale(child, Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(tree.max_world_scale(root), 3.0);
        assert_eq!(tree.max_world_scale(child), 6.0);
    }

    #[test]
    fn test_world_to_local_inverts_local_to_world() {
        let mut tree = TransformTree::new();
        let root = tree.insert(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vec3::y_axis(), 1.1),
        );
        tree.set_scale(root, Vec3::new(0.5, 2.0, 3.0));
        let node = tree.insert_child(
            root,
            Vec3::new(-1.0, 0.5, 0.0),
            Quaternion::from_axis_angle(Vec3::x_axis(), 0.4),
        );
        let point = Vec3::new(0.3, -0.2, 4.0);
        let world = tree.local_to_world(node, point);
        assert!(tree.world_to_local(node, world).approx_eq(point, 1e-9));
    }

    #[test]
    fn test_attach_preserves_world_position() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Vec3::new(3.0, -1.0, 2.0),
            Quaternion::from_axis_angle(Vec3::new(0.25, 1.0, 0.5), 1.3),
        );
        tree.set_scale(parent, Vec3::new(2.0, 0.5, 1.5));
        let child = tree.insert(Vec3::zero(), Quaternion::IDENTITY);
        tree.set_world_position(child, Vec3::new(-4.0, 6.0, 1.0));
        let before = tree.world_position(child);

        tree.attach(child, parent).unwrap();

        assert_eq!(tree.parent(child), Some(parent));
        assert!(tree.world_position(child).approx_eq(before, 1e-9));
        assert!(tree
            .world_rotation(child)
            .approx_eq(&Quaternion::IDENTITY, 1e-9));
    }

    #[test]
    fn test_reattach_moves_child_between_parents() {
        let mut tree = TransformTree::new();
        let first = tree.insert(Vec3::x_axis(), Quaternion::IDENTITY);
        let second = tree.insert(Vec3::y_axis(), Quaternion::IDENTITY);
        let child = tree.insert_child(first, Vec3::z_axis(), Quaternion::IDENTITY);

        tree.attach(child, second).unwrap();

        assert!(tree.children(first).is_empty());
        assert_eq!(tree.children(second), &[child]);

        tree.detach(child);
        assert_eq!(tree.parent(child), None);
        assert!(tree
            .world_position(child)
            .approx_eq(Vec3::new(1.0, 0.0, 1.0), 1e-9));
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut tree = TransformTree::new();
        let root = tree.insert(Vec3::zero(), Quaternion::IDENTITY);
        let child = tree.insert_child(root, Vec3::x_axis(), Quaternion::IDENTITY);
        assert!(matches!(
            tree.attach(root, child),
            Err(SceneError::TransformCycle { .. })
        ));
        assert!(tree.attach(root, root).is_err());
    }

    #[test]
    fn test_world_rotation_composes_with_parent() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(
            Vec3::zero(),
            Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2),
        );
        let child = tree.insert_child(
            parent,
            Vec3::zero(),
            Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2),
        );
        let rotated = tree.direction_to_world(child, Vec3::x_axis());
        assert!(rotated.approx_eq(-Vec3::x_axis(), 1e-9));

        let target = Quaternion::from_axis_angle(Vec3::y_axis(), 0.5);
        tree.set_world_rotation(child, target);
        assert!(tree.world_rotation(child).approx_eq(&target, 1e-9));
    }

    #[test]
    fn test_mutation_marks_subtree_dirty() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(Vec3::zero(), Quaternion::IDENTITY);
        let child = tree.insert_child(parent, Vec3::x_axis(), Quaternion::IDENTITY);
        let other = tree.insert(Vec3::zero(), Quaternion::IDENTITY);
        tree.clear_dirty();
        assert!(!tree.any_dirty());

        tree.rotate(parent, Quaternion::from_axis_angle(Vec3::y_axis(), 0.1));
        assert!(tree.is_dirty(parent));
        assert!(tree.is_dirty(child));
        assert!(!tree.is_dirty(other));
    }
}
