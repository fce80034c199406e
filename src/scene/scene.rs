//! Scene Graph
//!
//! Arena-backed node hierarchy with mesh, light and camera components.

use glam::{Affine3A, Vec3};
use slotmap::{SlotMap, SparseSecondaryMap};

use super::NodeHandle;
use super::camera::Camera;
use super::light::Light;
use super::node::Node;
use crate::resources::{GeometryHandle, MaterialHandle, Texture};

/// Renderable component: a geometry drawn with a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub cast_shadows: bool,
}

impl Mesh {
    #[must_use]
    pub fn new(geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            geometry,
            material,
            cast_shadows: true,
        }
    }
}

/// Arena scene graph.
///
/// Nodes live in a slotmap and reference each other by handle; components are
/// stored in sparse maps keyed by the owning node.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    roots: Vec<NodeHandle>,

    meshes: SparseSecondaryMap<NodeHandle, Mesh>,
    lights: SparseSecondaryMap<NodeHandle, Light>,
    cameras: SparseSecondaryMap<NodeHandle, Camera>,

    pub active_camera: Option<NodeHandle>,
    /// Optional cube map drawn behind everything.
    pub skybox: Option<Texture>,
    pub ambient: Vec3,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Hierarchy ─────────────────────────────────────────────────────────

    /// Creates a root node.
    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        let handle = self.nodes.insert(Node::new(name));
        self.roots.push(handle);
        handle
    }

    /// Creates a node under `parent` (a root if `parent` is dead).
    pub fn create_child(&mut self, name: &str, parent: NodeHandle) -> NodeHandle {
        let handle = self.create_node(name);
        self.attach(handle, parent);
        handle
    }

    /// Moves `child` under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach a node to itself");
            return;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::warn!("Attach ignored: unknown node handle");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Attach ignored: would create a cycle");
            return;
        }

        self.unlink(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    /// Makes `child` a root again.
    pub fn detach(&mut self, child: NodeHandle) {
        if !self.nodes.contains_key(child) {
            return;
        }
        self.unlink(child);
        self.roots.push(child);
    }

    /// Removes `child` from its parent's children (or from the roots) and
    /// clears its parent link.
    fn unlink(&mut self, child: NodeHandle) {
        let Some(old_parent) = self.nodes.get(child).map(|n| n.parent) else {
            return;
        };
        match old_parent {
            Some(p) => {
                if let Some(parent) = self.nodes.get_mut(p) {
                    parent.children.retain(|&c| c != child);
                }
            }
            None => self.roots.retain(|&r| r != child),
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
            c.transform.mark_dirty();
        }
    }

    /// Removes `handle` and its whole subtree, components included.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }
        self.unlink(handle);

        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
            }
            self.meshes.remove(current);
            self.lights.remove(current);
            self.cameras.remove(current);
            if self.active_camera == Some(current) {
                self.active_camera = None;
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Components ────────────────────────────────────────────────────────

    pub fn set_mesh(&mut self, node: NodeHandle, mesh: Mesh) {
        if self.nodes.contains_key(node) {
            self.meshes.insert(node, mesh);
        }
    }

    pub fn set_light(&mut self, node: NodeHandle, light: Light) {
        if self.nodes.contains_key(node) {
            self.lights.insert(node, light);
        }
    }

    pub fn set_camera(&mut self, node: NodeHandle, camera: Camera) {
        if self.nodes.contains_key(node) {
            self.cameras.insert(node, camera);
            if self.active_camera.is_none() {
                self.active_camera = Some(node);
            }
        }
    }

    #[must_use]
    pub fn mesh(&self, node: NodeHandle) -> Option<&Mesh> {
        self.meshes.get(node)
    }

    pub fn mesh_mut(&mut self, node: NodeHandle) -> Option<&mut Mesh> {
        self.meshes.get_mut(node)
    }

    #[must_use]
    pub fn light(&self, node: NodeHandle) -> Option<&Light> {
        self.lights.get(node)
    }

    pub fn light_mut(&mut self, node: NodeHandle) -> Option<&mut Light> {
        self.lights.get_mut(node)
    }

    pub fn camera_mut(&mut self, node: NodeHandle) -> Option<&mut Camera> {
        self.cameras.get_mut(node)
    }

    /// The active camera and its world matrix.
    #[must_use]
    pub fn active_camera(&self) -> Option<(&Camera, &Affine3A)> {
        let handle = self.active_camera?;
        let camera = self.cameras.get(handle)?;
        let node = self.nodes.get(handle)?;
        Some((camera, node.transform.world_matrix()))
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Updates world matrices and inherited visibility of every node.
    ///
    /// Iterative depth-first walk from the roots; a subtree's world matrices
    /// are only recomputed when its root or an ancestor changed.
    pub fn update_world_matrices(&mut self) {
        // (node, parent world, parent changed, parent visible)
        let mut stack: Vec<(NodeHandle, Affine3A, bool, bool)> = Vec::with_capacity(64);
        for &root in self.roots.iter().rev() {
            stack.push((root, Affine3A::IDENTITY, false, true));
        }

        while let Some((handle, parent_world, parent_changed, parent_visible)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };

            let local_changed = node.transform.update_local_matrix();
            let changed = local_changed || parent_changed;
            if changed {
                node.transform
                    .set_world_matrix(parent_world * *node.transform.local_matrix());
            }
            node.world_visible = parent_visible && node.visible;

            let world = *node.transform.world_matrix();
            let visible = node.world_visible;
            for &child in node.children.iter().rev() {
                stack.push((child, world, changed, visible));
            }
        }
    }

    /// Visible meshes with their world matrices, in node slot order.
    pub fn visible_meshes(&self) -> impl Iterator<Item = (NodeHandle, &Mesh, &Affine3A)> {
        self.nodes.iter().filter_map(|(handle, node)| {
            let mesh = self.meshes.get(handle)?;
            node.world_visible
                .then_some((handle, mesh, node.transform.world_matrix()))
        })
    }

    /// Lights on visible nodes with their world matrices, in node slot order.
    pub fn active_lights(&self) -> impl Iterator<Item = (NodeHandle, &Light, &Affine3A)> {
        self.nodes.iter().filter_map(|(handle, node)| {
            let light = self.lights.get(handle)?;
            node.world_visible
                .then_some((handle, light, node.transform.world_matrix()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_matrices_compose_parent_transforms() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent");
        let child = scene.create_child("child", parent);

        scene.node_mut(parent).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
        scene.node_mut(child).unwrap().transform.position = Vec3::new(0.0, 2.0, 0.0);
        scene.update_world_matrices();

        let world = scene.node(child).unwrap().transform.world_matrix();
        assert_eq!(Vec3::from(world.translation), Vec3::new(1.0, 2.0, 0.0));

        scene.node_mut(parent).unwrap().transform.position = Vec3::new(5.0, 0.0, 0.0);
        scene.update_world_matrices();
        let world = scene.node(child).unwrap().transform.world_matrix();
        assert_eq!(Vec3::from(world.translation), Vec3::new(5.0, 2.0, 0.0));
    }

    #[test]
    fn hidden_parent_hides_subtree() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent");
        let child = scene.create_child("child", parent);
        scene.node_mut(parent).unwrap().visible = false;
        scene.update_world_matrices();
        assert!(!scene.node(child).unwrap().is_world_visible());
    }

    #[test]
    fn remove_node_drops_subtree_and_components() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent");
        let child = scene.create_child("child", parent);
        scene.set_light(child, Light::point(Vec3::ONE, 1.0, 10.0));

        scene.remove_node(parent);
        assert_eq!(scene.node_count(), 0);
        assert!(scene.light(child).is_none());
        assert!(scene.roots().is_empty());
    }

    #[test]
    fn attached_child_leaves_the_root_list() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent");
        let child = scene.create_child("child", parent);
        assert_eq!(scene.roots(), &[parent]);

        scene.detach(child);
        assert_eq!(scene.roots(), &[parent, child]);
        scene.detach(child);
        assert_eq!(scene.roots(), &[parent, child]);

        scene.attach(child, parent);
        assert_eq!(scene.roots(), &[parent]);
        assert_eq!(scene.node(parent).unwrap().children(), &[child]);
    }

    #[test]
    fn removing_a_child_keeps_roots_clean() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent");
        let child = scene.create_child("child", parent);
        scene.remove_node(child);
        assert_eq!(scene.roots(), &[parent]);
        assert!(scene.node(parent).unwrap().children().is_empty());
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.create_node("a");
        let b = scene.create_child("b", a);
        scene.attach(a, b);
        assert_eq!(scene.node(a).unwrap().parent(), None);
        assert_eq!(scene.node(b).unwrap().parent(), Some(a));
    }
}
