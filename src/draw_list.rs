//! Identifier-addressed primitive buffer shared by rendering and picking.

use std::ops::Range;

use crate::color::ColorTable;
use crate::primitive::DrawPrimitive;
use crate::shape::Point;
use crate::tree::{NodeId, Tree};

/// Primitives in draw order, structural primitives at the index of their
/// identifier and decoration appended after them.
///
/// Slots with no primitive (identifiers the layout never produced) are
/// skipped when iterating.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    slots: Vec<Option<DrawPrimitive>>,
    structural: usize,
}

impl DrawList {
    /// Place every identified primitive at its identifier and append the
    /// rest, in their original relative order, from `subtree_size` on.
    pub fn arrange(primitives: Vec<DrawPrimitive>, subtree_size: usize) -> Self {
        let highest = primitives
            .iter()
            .filter_map(|p| p.identifier)
            .max()
            .map_or(0, |id| id + 1);
        if highest > subtree_size {
            log::warn!(
                "Identifier {} exceeds subtree size {}; decoration moved past it",
                highest - 1,
                subtree_size
            );
        }
        let structural = subtree_size.max(highest);

        let mut slots: Vec<Option<DrawPrimitive>> = Vec::with_capacity(primitives.len().max(structural));
        slots.resize_with(structural, || None);

        for primitive in primitives {
            match primitive.identifier {
                Some(id) => {
                    if slots[id].is_some() {
                        log::warn!("Duplicate primitive identifier {}", id);
                    }
                    slots[id] = Some(primitive);
                }
                None => slots.push(Some(primitive)),
            }
        }

        Self { slots, structural }
    }

    /// Number of slots, holes included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index decoration starts at.
    pub fn structural_len(&self) -> usize {
        self.structural
    }

    pub fn get(&self, index: usize) -> Option<&DrawPrimitive> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DrawPrimitive> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Primitives in draw order with their slot index.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &DrawPrimitive)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|p| (index, p)))
    }

    /// Refresh the colour of every structural primitive from the table,
    /// without touching geometry.
    pub fn recolor(&mut self, tree: &Tree, colors: &ColorTable) {
        for (index, slot) in self.slots.iter_mut().enumerate().take(self.structural) {
            let (Some(primitive), Some(node)) = (slot.as_mut(), tree.get(NodeId::from_index(index)))
            else {
                continue;
            };
            primitive.color = colors.node_color(node.depth(), node.is_selected());
        }
    }

    /// Bounds of the structural primitives whose identifiers fall in `range`.
    pub fn bounds_of(&self, range: Range<usize>) -> Option<(Point, Point)> {
        let end = range.end.min(self.structural);
        let start = range.start.min(end);
        self.slots[start..end]
            .iter()
            .flatten()
            .map(|p| p.shape.bounds())
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    [amin[0].min(bmin[0]), amin[1].min(bmin[1])],
                    [amax[0].max(bmax[0]), amax[1].max(bmax[1])],
                )
            })
    }
}
