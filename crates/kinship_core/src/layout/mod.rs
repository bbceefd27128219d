//! Generational layout engine.
//!
//! # Responsibility
//! - Turn a family tree into one 2-D position per person for a given
//!   orientation.
//! - Stay a pure function: identical input yields identical output.
//!
//! # Invariants
//! - Every person in the tree receives a position and a depth.
//! - Each band is centered on the band axis; depth grows along the other.
//!
//! # Known limitation
//! Ancestry cycles are walked with a visited set. The walk terminates, but
//! depths below a cycle may not be the shortest distance from a root.

mod levels;

use crate::model::person::PersonId;
use crate::model::tree::FamilyTree;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generation axis mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Generations stacked top-to-bottom.
    #[default]
    Stacked,
    /// Generations flowing left-to-right.
    Flowing,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stacked" | "vertical" => Some(Self::Stacked),
            "flowing" | "horizontal" => Some(Self::Flowing),
            _ => None,
        }
    }
}

/// Node extents and gaps shared by layout and render projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap added to `node_width` per horizontal step.
    pub horizontal_gap: f64,
    /// Gap added to `node_height` per vertical step.
    pub vertical_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 80.0,
            horizontal_gap: 50.0,
            vertical_gap: 100.0,
        }
    }
}

impl LayoutConfig {
    fn horizontal_stride(&self) -> f64 {
        self.node_width + self.horizontal_gap
    }

    fn vertical_stride(&self) -> f64 {
        self.node_height + self.vertical_gap
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Positions and generation depths for one tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeLayout {
    positions: HashMap<PersonId, Position>,
    depths: HashMap<PersonId, usize>,
    /// Ids per depth, in discovery order.
    bands: Vec<Vec<PersonId>>,
}

impl TreeLayout {
    pub fn position(&self, id: &PersonId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn depth(&self, id: &PersonId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn positions(&self) -> &HashMap<PersonId, Position> {
        &self.positions
    }

    pub fn bands(&self) -> &[Vec<PersonId>] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Computes positions for every person in `tree`.
pub fn compute_layout(
    tree: &FamilyTree,
    orientation: Orientation,
    config: &LayoutConfig,
) -> TreeLayout {
    if tree.has_ancestry_cycle() {
        warn!(
            "event=layout_cycle module=layout status=skip tree_id={} persons={}",
            tree.id(),
            tree.len()
        );
    }

    let levels::Levels { bands, depths } = levels::assign_levels(tree);
    let mut positions = HashMap::with_capacity(depths.len());

    for (depth, band) in bands.iter().enumerate() {
        let depth = depth as f64;
        let count = band.len() as f64;
        for (index, id) in band.iter().enumerate() {
            let index = index as f64;
            let position = match orientation {
                Orientation::Stacked => {
                    let stride = config.horizontal_stride();
                    Position {
                        x: -(count * stride) / 2.0 + index * stride,
                        y: depth * config.vertical_stride(),
                    }
                }
                Orientation::Flowing => {
                    let stride = config.vertical_stride();
                    Position {
                        x: depth * config.horizontal_stride(),
                        y: -(count * stride) / 2.0 + index * stride,
                    }
                }
            };
            positions.insert(id.clone(), position);
        }
    }

    debug!(
        "event=layout_computed module=layout status=ok tree_id={} persons={} bands={}",
        tree.id(),
        positions.len(),
        bands.len()
    );

    TreeLayout {
        positions,
        depths,
        bands,
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_layout, LayoutConfig, Orientation, Position};
    use crate::model::person::{PersonDraft, PersonId};
    use crate::model::tree::{FamilyTree, TreeId};

    fn id(value: &str) -> PersonId {
        PersonId::new(value)
    }

    fn couple_with_kids() -> FamilyTree {
        let mut tree = FamilyTree::new(TreeId::new("t"), "Layout", 0);
        for name in ["mom", "dad", "kid1", "kid2"] {
            tree.add_person(id(name), PersonDraft::new(name, "X"), 0)
                .unwrap();
        }
        for kid in ["kid1", "kid2"] {
            tree.add_parent_child(&id("mom"), &id(kid), 0).unwrap();
            tree.add_parent_child(&id("dad"), &id(kid), 0).unwrap();
        }
        tree
    }

    #[test]
    fn stacked_bands_are_centered_horizontally() {
        let layout = compute_layout(
            &couple_with_kids(),
            Orientation::Stacked,
            &LayoutConfig::default(),
        );

        assert_eq!(layout.position(&id("mom")), Some(Position { x: -230.0, y: 0.0 }));
        assert_eq!(layout.position(&id("dad")), Some(Position { x: 0.0, y: 0.0 }));
        assert_eq!(
            layout.position(&id("kid1")),
            Some(Position { x: -230.0, y: 180.0 })
        );
        assert_eq!(layout.depth(&id("kid2")), Some(1));
    }

    #[test]
    fn flowing_swaps_axes() {
        let layout = compute_layout(
            &couple_with_kids(),
            Orientation::Flowing,
            &LayoutConfig::default(),
        );

        assert_eq!(layout.position(&id("mom")), Some(Position { x: 0.0, y: -180.0 }));
        assert_eq!(
            layout.position(&id("kid2")),
            Some(Position { x: 230.0, y: 0.0 })
        );
    }

    #[test]
    fn empty_tree_has_empty_layout() {
        let tree = FamilyTree::new(TreeId::new("t"), "Empty", 0);
        let layout = compute_layout(&tree, Orientation::Stacked, &LayoutConfig::default());
        assert!(layout.is_empty());
        assert!(layout.bands().is_empty());
    }

    #[test]
    fn orientation_parse_accepts_aliases() {
        assert_eq!(Orientation::parse("Vertical"), Some(Orientation::Stacked));
        assert_eq!(Orientation::parse("flowing"), Some(Orientation::Flowing));
        assert_eq!(Orientation::parse("diagonal"), None);
    }
}
