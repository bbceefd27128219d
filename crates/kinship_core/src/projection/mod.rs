//! Render projection: tree + layout -> drawable node and edge descriptors.
//!
//! # Responsibility
//! - Produce renderer-agnostic nodes (display fields, position, attachment
//!   sides) and typed, de-duplicated edges.
//!
//! # Invariants
//! - Parent-child edges come only from `children` arrays, one per pair.
//! - Spouse and sibling edges are emitted once per unordered pair, from the
//!   person with the smaller id.
//! - Output order follows tree order; no counters, clocks or randomness.

use crate::layout::{compute_layout, LayoutConfig, Orientation, Position, TreeLayout};
use crate::model::person::{Gender, Person, PersonId};
use crate::model::tree::FamilyTree;
use serde::Serialize;

/// Node side an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Orientation {
    /// Side outgoing (parent -> child) edges leave from.
    pub fn source_side(self) -> Side {
        match self {
            Orientation::Stacked => Side::Bottom,
            Orientation::Flowing => Side::Right,
        }
    }

    /// Side incoming edges arrive at.
    pub fn target_side(self) -> Side {
        match self {
            Orientation::Stacked => Side::Top,
            Orientation::Flowing => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    ParentChild,
    Spouse,
    Sibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

/// Semantic styling hint; the visual encoding is up to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeStyle {
    pub line: LineStyle,
    pub directed: bool,
    pub animated: bool,
}

impl EdgeKind {
    pub fn style(self) -> EdgeStyle {
        match self {
            EdgeKind::ParentChild => EdgeStyle {
                line: LineStyle::Solid,
                directed: true,
                animated: false,
            },
            EdgeKind::Spouse => EdgeStyle {
                line: LineStyle::Dashed,
                directed: false,
                animated: true,
            },
            EdgeKind::Sibling => EdgeStyle {
                line: LineStyle::Dotted,
                directed: false,
                animated: false,
            },
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            EdgeKind::ParentChild => "parent",
            EdgeKind::Spouse => "spouse",
            EdgeKind::Sibling => "sibling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: PersonId,
    pub label: String,
    pub birth_date: Option<String>,
    pub avatar: Option<String>,
    pub gender: Gender,
    /// Matches the tree's designated root.
    pub is_root: bool,
    pub depth: usize,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub source_side: Side,
    pub target_side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    /// Stable id: `e-<kind>-<source>-<target>`.
    pub id: String,
    pub kind: EdgeKind,
    pub style: EdgeStyle,
    pub source: PersonId,
    pub target: PersonId,
    /// Attachment sides; only directed edges pin them.
    pub source_side: Option<Side>,
    pub target_side: Option<Side>,
}

impl RenderEdge {
    fn new(kind: EdgeKind, source: &PersonId, target: &PersonId, orientation: Orientation) -> Self {
        let style = kind.style();
        let (source_side, target_side) = if style.directed {
            (Some(orientation.source_side()), Some(orientation.target_side()))
        } else {
            (None, None)
        };
        Self {
            id: format!("e-{}-{}-{}", kind.id_prefix(), source, target),
            kind,
            style,
            source: source.clone(),
            target: target.clone(),
            source_side,
            target_side,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderProjection {
    pub orientation: Orientation,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderProjection {
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &RenderEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    pub fn node(&self, id: &PersonId) -> Option<&RenderNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }
}

/// Combines a tree with an already computed layout.
pub fn project(
    tree: &FamilyTree,
    layout: &TreeLayout,
    orientation: Orientation,
    config: &LayoutConfig,
) -> RenderProjection {
    let nodes = tree
        .persons()
        .iter()
        .map(|person| render_node(tree, person, layout, orientation, config))
        .collect();

    let mut edges = Vec::new();
    for person in tree.persons() {
        for child in person.children() {
            if tree.contains(child) {
                edges.push(RenderEdge::new(EdgeKind::ParentChild, &person.id, child, orientation));
            }
        }
        push_undirected(&mut edges, tree, person, person.spouses(), EdgeKind::Spouse, orientation);
        push_undirected(&mut edges, tree, person, person.siblings(), EdgeKind::Sibling, orientation);
    }

    RenderProjection {
        orientation,
        nodes,
        edges,
    }
}

/// Lays out and projects `tree` in one step.
pub fn render_tree(
    tree: &FamilyTree,
    orientation: Orientation,
    config: &LayoutConfig,
) -> RenderProjection {
    let layout = compute_layout(tree, orientation, config);
    project(tree, &layout, orientation, config)
}

fn render_node(
    tree: &FamilyTree,
    person: &Person,
    layout: &TreeLayout,
    orientation: Orientation,
    config: &LayoutConfig,
) -> RenderNode {
    RenderNode {
        id: person.id.clone(),
        label: person.full_name(),
        birth_date: person.birth_date.clone(),
        avatar: person.avatar.clone(),
        gender: person.gender,
        is_root: tree.root_id() == Some(&person.id),
        depth: layout.depth(&person.id).unwrap_or(0),
        position: layout.position(&person.id).unwrap_or_default(),
        width: config.node_width,
        height: config.node_height,
        source_side: orientation.source_side(),
        target_side: orientation.target_side(),
    }
}

fn push_undirected(
    edges: &mut Vec<RenderEdge>,
    tree: &FamilyTree,
    person: &Person,
    linked: &[PersonId],
    kind: EdgeKind,
    orientation: Orientation,
) {
    for other in linked {
        if person.id < *other && tree.contains(other) {
            edges.push(RenderEdge::new(kind, &person.id, other, orientation));
        }
    }
}
