//! Generation depth assignment.
//!
//! # Invariants
//! - A person is assigned a depth at most once (first write wins), so the
//!   walk terminates on cyclic graphs.
//! - Depths downstream of a cycle are an approximation, not a shortest
//!   distance from a root.

use crate::model::person::PersonId;
use crate::model::tree::FamilyTree;
use std::collections::{HashMap, HashSet, VecDeque};

/// Depth-ordered bands of person ids plus the per-person depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Levels {
    /// `bands[d]` holds depth-`d` persons in discovery order.
    pub bands: Vec<Vec<PersonId>>,
    pub depths: HashMap<PersonId, usize>,
}

impl Levels {
    fn assign(&mut self, id: &PersonId, depth: usize) {
        if self.bands.len() <= depth {
            self.bands.resize_with(depth + 1, Vec::new);
        }
        self.bands[depth].push(id.clone());
        self.depths.insert(id.clone(), depth);
    }
}

/// Persons no other person lists as a child, in tree order.
pub(crate) fn root_candidates(tree: &FamilyTree) -> Vec<&PersonId> {
    let listed: HashSet<&PersonId> = tree
        .persons()
        .iter()
        .flat_map(|person| person.children().iter())
        .collect();
    tree.persons()
        .iter()
        .map(|person| &person.id)
        .filter(|id| !listed.contains(id))
        .collect()
}

/// Breadth-first walk along `children` edges from every root candidate.
///
/// Persons still unassigned afterwards sit on a pure ancestry cycle; each is
/// seeded at depth 0 in tree order so every person receives a depth.
pub(crate) fn assign_levels(tree: &FamilyTree) -> Levels {
    let mut levels = Levels::default();
    let mut queue: VecDeque<(&PersonId, usize)> = VecDeque::new();

    let roots = root_candidates(tree);
    let fallback = tree.persons().iter().map(|person| &person.id);
    for seed in roots.into_iter().chain(fallback) {
        if levels.depths.contains_key(seed) {
            continue;
        }
        levels.assign(seed, 0);
        queue.push_back((seed, 0));

        while let Some((current, depth)) = queue.pop_front() {
            let Some(person) = tree.person(current) else {
                continue;
            };
            for child in person.children() {
                if levels.depths.contains_key(child) || !tree.contains(child) {
                    continue;
                }
                levels.assign(child, depth + 1);
                queue.push_back((child, depth + 1));
            }
        }
    }
    levels
}
