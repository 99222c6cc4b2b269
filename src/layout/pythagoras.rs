use std::f32::consts::PI;

use super::{LayoutSettings, NodeShape};
use crate::color::ColorTable;
use crate::primitive::{DrawPrimitive, ShaderKind};
use crate::shape::{Point, Shape};
use crate::tree::{NodeId, Tree};

/// Opacity of the selection halo.
const HALO_ALPHA: f32 = 0.4;

/// Rectangle a node occupies: base starting at `origin`, running along the
/// unit vector `dir` for `width`, extruded along the left normal.
#[derive(Clone, Copy, Debug)]
struct Frame {
    origin: Point,
    dir: Point,
    width: f32,
}

impl Frame {
    fn normal(&self) -> Point {
        [-self.dir[1], self.dir[0]]
    }

    fn corners(&self, height: f32) -> [Point; 4] {
        let [ux, uy] = self.dir;
        let [nx, ny] = self.normal();
        let [ax, ay] = self.origin;
        let w = self.width;
        [
            [ax, ay],
            [ax + w * ux, ay + w * uy],
            [ax + w * ux + height * nx, ay + w * uy + height * ny],
            [ax + height * nx, ay + height * ny],
        ]
    }

    fn center(&self, height: f32) -> Point {
        let [nx, ny] = self.normal();
        [
            self.origin[0] + 0.5 * (self.width * self.dir[0] + height * nx),
            self.origin[1] + 0.5 * (self.width * self.dir[1] + height * ny),
        ]
    }

    /// Point at angle `phi` on the semicircle spanning the top edge, going
    /// from the top-left corner (0) to the top-right corner (PI).
    fn arc_point(&self, height: f32, phi: f32) -> Point {
        let [mx, my] = self.center(height);
        let [nx, ny] = self.normal();
        let r = self.width * 0.5;
        let top = [mx + 0.5 * height * nx, my + 0.5 * height * ny];
        let (sin, cos) = phi.sin_cos();
        [
            top[0] - r * cos * self.dir[0] + r * sin * nx,
            top[1] - r * cos * self.dir[1] + r * sin * ny,
        ]
    }

    /// Frame of the child whose base is the chord from `from` to `to`.
    fn chord(from: Point, to: Point) -> Frame {
        let dx = to[0] - from[0];
        let dy = to[1] - from[1];
        let width = (dx * dx + dy * dy).sqrt();
        let dir = if width > 0.0 {
            [dx / width, dy / width]
        } else {
            [1.0, 0.0]
        };
        Frame {
            origin: from,
            dir,
            width,
        }
    }
}

/// Lay `tree` out as a generalized Pythagoras tree.
///
/// Every node becomes one structural primitive whose identifier is its
/// pre-order index. Children stand on the semicircle over their parent's
/// top edge, each taking an arc proportional to its subtree size, so
/// large subtrees get wide bases. Primitives come out in pre-order,
/// followed by decoration.
pub fn compute(tree: &Tree, settings: &LayoutSettings, colors: &ColorTable) -> Vec<DrawPrimitive> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };
    let options = &settings.options;
    let aspect = options.aspect.max(f32::EPSILON);
    let width = options.root_width;

    let mut primitives = Vec::with_capacity(tree.len() + 1);
    let mut halo = None;

    let root_frame = Frame {
        origin: [-width * 0.5, -2.0 * width],
        dir: [1.0, 0.0],
        width,
    };
    let mut stack = vec![(root, root_frame)];

    while let Some((id, frame)) = stack.pop() {
        let node = tree.node(id);
        let height = frame.width * aspect;
        let color = colors.node_color(node.depth(), node.is_selected());

        let primitive = match options.node_shape {
            NodeShape::Rectangle => DrawPrimitive::new(
                ShaderKind::Copy,
                Shape::Quad {
                    corners: frame.corners(height),
                },
                color,
            ),
            NodeShape::Circle => DrawPrimitive::new(
                ShaderKind::FillCircle,
                Shape::Circle {
                    center: frame.center(height),
                    radius: frame.width.min(height) * 0.5,
                },
                color,
            ),
        };
        primitives.push(primitive.with_identifier(id.index()));

        if options.selection_halo && node.is_selected() {
            let radius = frame.width.max(height) * 0.75;
            halo = Some(DrawPrimitive::new(
                ShaderKind::BlurCircle,
                Shape::Circle {
                    center: frame.center(height),
                    radius,
                },
                colors.node_color(node.depth(), true).with_alpha(HALO_ALPHA),
            ));
        }

        let children = node.children();
        if children.is_empty() {
            continue;
        }
        let total: u32 = children
            .iter()
            .map(|&child| tree.node(child).subtree_size())
            .sum();

        let mut phi = 0.0f32;
        let mut frames: Vec<(NodeId, Frame)> = Vec::with_capacity(children.len());
        for &child in children {
            let sweep = PI * tree.node(child).subtree_size() as f32 / total as f32;
            let from = frame.arc_point(height, phi);
            let to = frame.arc_point(height, phi + sweep);
            frames.push((child, Frame::chord(from, to)));
            phi += sweep;
        }
        // reversed so the first child is popped first and output stays pre-order
        stack.extend(frames.into_iter().rev());
    }

    primitives.extend(halo);
    log::trace!("Layout produced {} primitives", primitives.len());
    primitives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Palette};
    use crate::layout::LayoutOptions;
    use crate::settings::GradientType;
    use crate::tree::{sample_tree, NodeSpec};

    fn table(max_depth: u32) -> ColorTable {
        let palette = Palette::new(Color::BLACK, Color::WHITE, vec![Color::rgb(1.0, 0.0, 0.0)]);
        ColorTable::build(max_depth, 0, GradientType::RgbLinear, false, false, &palette)
    }

    fn close(a: Point, b: Point) -> bool {
        (a[0] - b[0]).abs() < 1e-3 && (a[1] - b[1]).abs() < 1e-3
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let out = compute(&Tree::empty(), &LayoutSettings::default(), &table(0));
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_node_yields_one_primitive() {
        let tree = Tree::from_spec(NodeSpec::new("only"));
        let out = compute(&tree, &LayoutSettings::default(), &table(0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].identifier, Some(0));
        assert_eq!(
            out[0].shape,
            Shape::Quad {
                corners: [[-50.0, -200.0], [50.0, -200.0], [50.0, -100.0], [-50.0, -100.0]]
            }
        );
    }

    #[test]
    fn test_three_nodes_three_structural_primitives() {
        let tree = Tree::from_spec(
            NodeSpec::new("root").children([NodeSpec::new("left"), NodeSpec::new("right")]),
        );
        let out = compute(&tree, &LayoutSettings::default(), &table(tree.max_depth()));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|p| p.identifier.is_some()));
        assert!(out.iter().all(|p| p.kind != ShaderKind::Grid));
        let ids: Vec<_> = out.iter().filter_map(|p| p.identifier).collect();
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn test_children_share_parent_top_edge() {
        let tree = Tree::from_spec(
            NodeSpec::new("root").children([NodeSpec::new("left"), NodeSpec::new("right")]),
        );
        let out = compute(&tree, &LayoutSettings::default(), &table(1));
        let corners = |i: usize| match &out[i].shape {
            Shape::Quad { corners } => *corners,
            other => panic!("unexpected shape {other:?}"),
        };
        let root = corners(0);
        let left = corners(1);
        let right = corners(2);
        // both children meet at the apex of the semicircle over the root
        assert!(close(left[0], root[3]));
        assert!(close(left[1], [0.0, -50.0]));
        assert!(close(right[0], [0.0, -50.0]));
        assert!(close(right[1], root[2]));
    }

    #[test]
    fn test_larger_subtree_gets_wider_base() {
        let tree = sample_tree();
        let out = compute(&tree, &LayoutSettings::default(), &table(tree.max_depth()));
        let width = |i: usize| match &out[i].shape {
            Shape::Quad { corners } => {
                let [a, b] = [corners[0], corners[1]];
                ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
            }
            _ => 0.0,
        };
        // "a" has 4 nodes, "c" has 1
        assert!(width(1) > width(8));
    }

    #[test]
    fn test_compute_is_deterministic() {
        let tree = sample_tree();
        let settings = LayoutSettings::default();
        let colors = table(tree.max_depth());
        assert_eq!(
            compute(&tree, &settings, &colors),
            compute(&tree, &settings, &colors)
        );
    }

    #[test]
    fn test_colors_follow_depth() {
        let mut tree = sample_tree();
        tree.select(NodeId::from_index(5));
        let colors = table(tree.max_depth());
        let out = compute(&tree, &LayoutSettings::default(), &colors);
        assert_eq!(out[0].color, Color::BLACK);
        assert_eq!(out[7].color, Color::WHITE);
        assert_eq!(out[5].color, Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_circle_nodes_and_halo() {
        let mut tree = sample_tree();
        tree.select(NodeId::from_index(1));
        let settings = LayoutSettings {
            options: LayoutOptions::default()
                .node_shape(NodeShape::Circle)
                .selection_halo(true),
            ..LayoutSettings::default()
        };
        let out = compute(&tree, &settings, &table(tree.max_depth()));
        assert_eq!(out.len(), tree.len() + 1);
        assert_eq!(out[0].kind, ShaderKind::FillCircle);
        assert_eq!(
            out[0].shape,
            Shape::Circle {
                center: [0.0, -150.0],
                radius: 50.0
            }
        );
        let halo = out.last().unwrap();
        assert_eq!(halo.kind, ShaderKind::BlurCircle);
        assert_eq!(halo.identifier, None);
        assert_eq!(halo.color.a, HALO_ALPHA);
    }
}
