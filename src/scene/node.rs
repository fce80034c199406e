use super::NodeHandle;
use super::transform::Transform;

/// A scene node: hierarchy links, transform and visibility.
///
/// Components (mesh, light, camera) live in the scene's component maps,
/// keyed by the node handle.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub transform: Transform,
    /// Local visibility flag. A node is drawn only if it and all its
    /// ancestors are visible.
    pub visible: bool,
    pub(crate) world_visible: bool,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            world_visible: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Effective visibility after the last world update.
    #[inline]
    #[must_use]
    pub fn is_world_visible(&self) -> bool {
        self.world_visible
    }
}
