// Scene graph for the car viewer

use std::collections::HashMap;

use glam::Mat4;

use crate::color::Color;
use crate::math::Transform;

pub type NodeId = usize;
pub type SurfaceId = usize;

/// Material instance owned by a single surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: Color,
    /// Whether the base color may be reassigned at runtime.
    pub paintable: bool,
}

impl Material {
    pub fn paintable(name: Option<String>, base_color: Color) -> Self {
        Self {
            name,
            base_color,
            paintable: true,
        }
    }
}

/// A drawable piece of a node: one mesh primitive with its own material.
#[derive(Debug, Clone)]
pub struct Surface {
    pub node: NodeId,
    pub material: Material,
}

/// Represents a node within the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub surfaces: Vec<SurfaceId>,
}

impl SceneNode {
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// Tree of named nodes with their surfaces. Node names are not unique.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    surfaces: Vec<Surface>,
}

impl SceneGraph {
    /// Creates a new, empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under `parent`, or as a root when `parent` is `None`.
    pub fn add_node(
        &mut self,
        name: Option<String>,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            name,
            transform,
            parent,
            children: Vec::new(),
            surfaces: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn add_surface(&mut self, node: NodeId, material: Material) -> SurfaceId {
        let id = self.surfaces.len();
        self.surfaces.push(Surface { node, material });
        self.nodes[node].surfaces.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Gets every node carrying `name`.
    pub fn find_nodes<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.has_name(name))
            .map(|(id, _)| id)
    }

    /// World matrix of a node, composed from its ancestors.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|i| self.nodes.get(i)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Depth-first walk from the roots, parents before children.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &SceneNode),
    {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            visit(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Set the base color of one surface. Non-paintable surfaces are left alone.
    pub fn set_surface_color(&mut self, id: SurfaceId, color: Color) -> bool {
        match self.surfaces.get_mut(id) {
            Some(surface) if surface.material.paintable => {
                surface.material.base_color = surface.material.base_color.with_rgb_of(color);
                true
            }
            _ => false,
        }
    }

    /// Recolor every paintable surface of every node named `name` by walking the
    /// tree. Returns the surfaces that changed; no match is not an error.
    pub fn recolor_by_name(&mut self, name: &str, color: Color) -> Vec<SurfaceId> {
        let mut targets = Vec::new();
        self.traverse(|_, node| {
            if node.has_name(name) {
                targets.extend_from_slice(&node.surfaces);
            }
        });
        targets.retain(|&id| self.set_surface_color(id, color));
        targets
    }
}

/// Part name to surfaces, built once when a model becomes ready.
#[derive(Debug, Default, Clone)]
pub struct PartIndex {
    parts: HashMap<String, Vec<SurfaceId>>,
    names: Vec<String>,
}

impl PartIndex {
    /// Index every named node that owns at least one paintable surface.
    pub fn build(scene: &SceneGraph) -> Self {
        let mut parts: HashMap<String, Vec<SurfaceId>> = HashMap::new();
        scene.traverse(|_, node| {
            let Some(name) = node.name.as_deref() else {
                return;
            };
            let paintable = node
                .surfaces
                .iter()
                .copied()
                .filter(|&s| scene.surfaces[s].material.paintable);
            let mut paintable = paintable.peekable();
            if paintable.peek().is_some() {
                parts.entry(name.to_string()).or_default().extend(paintable);
            }
        });

        let mut names: Vec<String> = parts.keys().cloned().collect();
        names.sort();
        Self { parts, names }
    }

    /// Surfaces painted by `name`; empty when the name is unknown.
    pub fn surfaces(&self, name: &str) -> &[SurfaceId] {
        self.parts.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Part names in sorted order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn gray() -> Material {
        Material::paintable(None, Color::rgb(0.5, 0.5, 0.5))
    }

    /// car
    /// ├── body (1 surface)
    /// ├── wheels
    /// │   ├── wheel (1 surface)
    /// │   └── wheel (1 surface)
    /// └── glass (1 non-paintable surface)
    fn car() -> SceneGraph {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(Some("car".into()), Transform::identity(), None);
        let body = scene.add_node(Some("body".into()), Transform::identity(), Some(root));
        scene.add_surface(body, gray());
        let wheels = scene.add_node(Some("wheels".into()), Transform::identity(), Some(root));
        for x in [-1.0, 1.0] {
            let wheel = scene.add_node(
                Some("wheel".into()),
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                Some(wheels),
            );
            scene.add_surface(wheel, gray());
        }
        let glass = scene.add_node(Some("glass".into()), Transform::identity(), Some(root));
        scene.add_surface(
            glass,
            Material {
                name: Some("glass".into()),
                base_color: Color::WHITE,
                paintable: false,
            },
        );
        scene
    }

    fn colors(scene: &SceneGraph) -> Vec<[f32; 4]> {
        scene
            .surfaces()
            .iter()
            .map(|s| s.material.base_color.to_array())
            .collect()
    }

    #[test]
    fn recolor_without_match_changes_nothing() {
        let mut scene = car();
        let before = colors(&scene);
        let changed = scene.recolor_by_name("spoiler", Color::rgb(1.0, 0.0, 0.0));
        assert!(changed.is_empty());
        assert_eq!(colors(&scene), before);
    }

    #[test]
    fn recolor_hits_every_node_with_the_name() {
        let mut scene = car();
        let red = Color::rgb(1.0, 0.0, 0.0);
        let changed = scene.recolor_by_name("wheel", red);
        assert_eq!(changed.len(), 2);
        for id in changed {
            assert_eq!(scene.surface(id).unwrap().material.base_color, red);
        }
        let body = scene.find_nodes("body").next().unwrap();
        let body_surface = scene.node(body).unwrap().surfaces[0];
        assert_eq!(
            scene.surface(body_surface).unwrap().material.base_color,
            Color::rgb(0.5, 0.5, 0.5)
        );
    }

    #[test]
    fn non_paintable_surfaces_are_skipped() {
        let mut scene = car();
        assert!(scene.recolor_by_name("glass", Color::rgb(0.0, 0.0, 1.0)).is_empty());
    }

    #[test]
    fn index_matches_traversal() {
        let scene = car();
        let index = PartIndex::build(&scene);
        assert_eq!(index.names(), ["body", "wheel"]);
        assert_eq!(index.surfaces("wheel").len(), 2);
        assert!(index.surfaces("glass").is_empty());
        assert!(index.surfaces("car").is_empty());
        assert!(!index.contains("spoiler"));
    }

    #[test]
    fn traversal_visits_parents_first() {
        let scene = car();
        let mut order = Vec::new();
        scene.traverse(|_, node| order.push(node.name.clone().unwrap()));
        assert_eq!(order, ["car", "body", "wheels", "wheel", "wheel", "glass"]);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(None, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)), None);
        let child = scene.add_node(None, Transform::from_position(Vec3::new(2.0, 0.0, 0.0)), Some(root));
        let p = scene.world_matrix(child).transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 1.0, 0.0));
    }
}
