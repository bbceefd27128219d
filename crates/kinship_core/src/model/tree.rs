//! Family tree aggregate.
//!
//! # Responsibility
//! - Own one named collection of persons plus root/timestamp metadata.
//! - Apply every person and relationship mutation for that collection.
//!
//! # Invariants
//! - `B in A.children <=> A in B.parents`; spouses and siblings are mutual.
//! - No person references itself, and no pair repeats within one array.
//! - Every referenced id names a person in this tree.
//! - `root_id`, when set, names a person in this tree.
//! - A failed mutation leaves the tree unchanged, timestamps included.
//!
//! # See also
//! - crate::service::registry for the multi-tree facade.

use crate::model::person::{Person, PersonDraft, PersonId, PersonPatch, PersonValidationError, Slot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque, stable identifier for one family tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Relationship kinds that can be linked and unlinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Directed: first id is the parent, second the child.
    Parent,
    Spouse,
    Sibling,
}

impl RelationshipKind {
    /// Slots touched on (first, second) person.
    fn slots(self) -> (Slot, Slot) {
        match self {
            Self::Parent => (Slot::Children, Slot::Parents),
            Self::Spouse => (Slot::Spouses, Slot::Spouses),
            Self::Sibling => (Slot::Siblings, Slot::Siblings),
        }
    }
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Spouse => write!(f, "spouse"),
            Self::Sibling => write!(f, "sibling"),
        }
    }
}

/// Role a prospective relative would take relative to a given person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeRole {
    Parent,
    Child,
    Spouse,
    Sibling,
}

pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from aggregate mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Referenced person is not part of this tree.
    PersonNotFound(PersonId),
    /// Self-relationship or otherwise malformed pair.
    InvalidRelationship { a: PersonId, b: PersonId },
    /// Edge already present; tree left unchanged.
    DuplicateRelationship {
        kind: RelationshipKind,
        a: PersonId,
        b: PersonId,
    },
    /// Person display fields failed validation.
    InvalidPerson(PersonValidationError),
    /// Generated id collides with an existing person.
    DuplicatePersonId(PersonId),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::InvalidRelationship { a, b } => {
                write!(f, "invalid relationship between {a} and {b}")
            }
            Self::DuplicateRelationship { kind, a, b } => {
                write!(f, "{kind} relationship already exists between {a} and {b}")
            }
            Self::InvalidPerson(err) => write!(f, "{err}"),
            Self::DuplicatePersonId(id) => write!(f, "person id already in use: {id}"),
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPerson(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonValidationError> for TreeError {
    fn from(value: PersonValidationError) -> Self {
        Self::InvalidPerson(value)
    }
}

/// Relationship arrays of one person resolved to records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relatives<'a> {
    pub parents: Vec<&'a Person>,
    pub children: Vec<&'a Person>,
    pub siblings: Vec<&'a Person>,
    pub spouses: Vec<&'a Person>,
}

/// Counts of fixes applied by `FamilyTree::repair`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub duplicate_persons: usize,
    pub tree_ids_rewritten: usize,
    pub self_links: usize,
    pub dangling_links: usize,
    pub duplicate_links: usize,
    pub mirrored_links: usize,
    pub root_reassigned: bool,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// One family tree and its persons.
///
/// Serialized shape is the snapshot file format: `{ id, name, members,
/// rootId, createdAt, updatedAt }` with epoch-millisecond timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    id: TreeId,
    name: String,
    #[serde(rename = "members", default)]
    persons: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_id: Option<PersonId>,
    created_at: i64,
    updated_at: i64,
}

impl FamilyTree {
    /// Creates an empty tree stamped with `now_ms` for both timestamps.
    pub fn new(id: TreeId, name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id,
            name: name.into(),
            persons: Vec::new(),
            root_id: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn id(&self) -> &TreeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Persons in insertion order.
    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn root_id(&self) -> Option<&PersonId> {
        self.root_id.as_ref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.persons.iter().find(|person| &person.id == id)
    }

    /// Like `person`, but reports a missing id as `PersonNotFound`.
    pub fn get_person(&self, id: &PersonId) -> TreeResult<&Person> {
        self.person(id)
            .ok_or_else(|| TreeError::PersonNotFound(id.clone()))
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.person(id).is_some()
    }

    /// Adds a person with caller-supplied id.
    ///
    /// The first person added becomes the root.
    pub fn add_person(
        &mut self,
        id: PersonId,
        draft: PersonDraft,
        now_ms: i64,
    ) -> TreeResult<PersonId> {
        if self.contains(&id) {
            return Err(TreeError::DuplicatePersonId(id));
        }
        let person = Person::from_draft(id.clone(), self.id.clone(), draft);
        person.validate()?;

        if self.persons.is_empty() {
            self.root_id = Some(id.clone());
        }
        self.persons.push(person);
        self.touch(now_ms);
        Ok(id)
    }

    /// Merges display fields from `patch`; relationship arrays are kept.
    pub fn update_person(
        &mut self,
        id: &PersonId,
        patch: &PersonPatch,
        now_ms: i64,
    ) -> TreeResult<()> {
        let index = self.index_of(id)?;
        let next = patch.apply_to(&self.persons[index]);
        next.validate()?;
        self.persons[index] = next;
        self.touch(now_ms);
        Ok(())
    }

    /// Removes a person and every reference to it.
    ///
    /// When the removed person was the root, the first remaining person
    /// takes over; an emptied tree has no root.
    pub fn delete_person(&mut self, id: &PersonId, now_ms: i64) -> TreeResult<Person> {
        let index = self.index_of(id)?;
        let removed = self.persons.remove(index);
        for person in &mut self.persons {
            person.forget(id);
        }
        if self.root_id.as_ref() == Some(id) {
            self.root_id = self.persons.first().map(|person| person.id.clone());
        }
        self.touch(now_ms);
        Ok(removed)
    }

    pub fn add_parent_child(
        &mut self,
        parent_id: &PersonId,
        child_id: &PersonId,
        now_ms: i64,
    ) -> TreeResult<()> {
        self.link(RelationshipKind::Parent, parent_id, child_id, now_ms)
    }

    pub fn add_spouse(&mut self, a: &PersonId, b: &PersonId, now_ms: i64) -> TreeResult<()> {
        self.link(RelationshipKind::Spouse, a, b, now_ms)
    }

    pub fn add_sibling(&mut self, a: &PersonId, b: &PersonId, now_ms: i64) -> TreeResult<()> {
        self.link(RelationshipKind::Sibling, a, b, now_ms)
    }

    /// Links `other` to `person` in the given role.
    ///
    /// `RelativeRole::Parent` makes `other` a parent of `person`.
    pub fn link_relative(
        &mut self,
        person: &PersonId,
        role: RelativeRole,
        other: &PersonId,
        now_ms: i64,
    ) -> TreeResult<()> {
        match role {
            RelativeRole::Parent => self.add_parent_child(other, person, now_ms),
            RelativeRole::Child => self.add_parent_child(person, other, now_ms),
            RelativeRole::Spouse => self.add_spouse(person, other, now_ms),
            RelativeRole::Sibling => self.add_sibling(person, other, now_ms),
        }
    }

    /// Removes one relationship. For `Parent`, `a` is the parent.
    ///
    /// Returns `false` when the relationship was not present; that case is a
    /// no-op and does not bump `updated_at`.
    pub fn remove_relationship(
        &mut self,
        a: &PersonId,
        b: &PersonId,
        kind: RelationshipKind,
        now_ms: i64,
    ) -> TreeResult<bool> {
        let (ia, ib) = self.pair_indices(a, b)?;
        let (slot_a, slot_b) = kind.slots();

        let before_a = self.persons[ia].slot(slot_a).len();
        let before_b = self.persons[ib].slot(slot_b).len();
        self.persons[ia].slot_mut(slot_a).retain(|id| id != b);
        self.persons[ib].slot_mut(slot_b).retain(|id| id != a);

        let changed = self.persons[ia].slot(slot_a).len() != before_a
            || self.persons[ib].slot(slot_b).len() != before_b;
        if changed {
            self.touch(now_ms);
        }
        Ok(changed)
    }

    /// Resolves the relationship arrays of `id` to person records.
    pub fn relatives(&self, id: &PersonId) -> TreeResult<Relatives<'_>> {
        let person = self.get_person(id)?;
        let resolve = |ids: &[PersonId]| -> Vec<&Person> {
            ids.iter().filter_map(|linked| self.person(linked)).collect()
        };
        Ok(Relatives {
            parents: resolve(person.parents()),
            children: resolve(person.children()),
            siblings: resolve(person.siblings()),
            spouses: resolve(person.spouses()),
        })
    }

    /// Persons that may be offered as a new relative of `id` in `role`.
    ///
    /// Never offers `id` itself or someone already linked in that role.
    /// Spouse candidates also exclude parents, children and siblings.
    pub fn relationship_candidates(
        &self,
        id: &PersonId,
        role: RelativeRole,
    ) -> TreeResult<Vec<&Person>> {
        let person = self.get_person(id)?;
        let excluded: Vec<&[PersonId]> = match role {
            RelativeRole::Parent => vec![person.parents()],
            RelativeRole::Child => vec![person.children()],
            RelativeRole::Sibling => vec![person.siblings()],
            RelativeRole::Spouse => vec![
                person.spouses(),
                person.parents(),
                person.children(),
                person.siblings(),
            ],
        };

        Ok(self
            .persons
            .iter()
            .filter(|candidate| candidate.id != *id)
            .filter(|candidate| !excluded.iter().any(|ids| ids.contains(&candidate.id)))
            .collect())
    }

    /// Returns whether following `children` edges can lead back to a start.
    ///
    /// Cycles are tolerated by every mutation; this is a diagnostic only.
    pub fn has_ancestry_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            OnPath,
            Finished,
        }

        let index = self.index_map();
        let mut marks = vec![Mark::Unvisited; self.persons.len()];

        for start in 0..self.persons.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::OnPath;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(top) = stack.len().checked_sub(1) {
                let (node, cursor) = stack[top];
                match self.persons[node].children().get(cursor) {
                    Some(child) => {
                        stack[top].1 += 1;
                        let Some(&child_index) = index.get(child) else {
                            continue;
                        };
                        match marks[child_index] {
                            Mark::OnPath => return true,
                            Mark::Unvisited => {
                                marks[child_index] = Mark::OnPath;
                                stack.push((child_index, 0));
                            }
                            Mark::Finished => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Finished;
                        stack.pop();
                    }
                }
            }
        }
        false
    }

    /// Restores every aggregate invariant on data of unknown provenance.
    ///
    /// Drops later duplicates of a person id, self and dangling references
    /// and repeated entries, then adds any missing mirror entry. Timestamps
    /// are left as found.
    pub fn repair(&mut self) -> RepairReport {
        let mut report = RepairReport::default();

        let mut seen = HashSet::new();
        let before = self.persons.len();
        self.persons.retain(|person| seen.insert(person.id.clone()));
        report.duplicate_persons = before - self.persons.len();

        for person in &mut self.persons {
            if person.tree_id != self.id {
                person.tree_id = self.id.clone();
                report.tree_ids_rewritten += 1;
            }
        }

        let known: HashSet<PersonId> = self.persons.iter().map(|p| p.id.clone()).collect();
        for person in &mut self.persons {
            let own_id = person.id.clone();
            for slot in Slot::ALL {
                let mut kept = HashSet::new();
                person.slot_mut(slot).retain(|linked| {
                    if *linked == own_id {
                        report.self_links += 1;
                        false
                    } else if !known.contains(linked) {
                        report.dangling_links += 1;
                        false
                    } else if !kept.insert(linked.clone()) {
                        report.duplicate_links += 1;
                        false
                    } else {
                        true
                    }
                });
            }
        }

        let index = self.index_map();
        let mut missing: Vec<(usize, Slot, PersonId)> = Vec::new();
        for person in &self.persons {
            for slot in Slot::ALL {
                for linked in person.slot(slot) {
                    let Some(&target) = index.get(linked) else {
                        continue;
                    };
                    if !self.persons[target].slot(slot.mirror()).contains(&person.id) {
                        missing.push((target, slot.mirror(), person.id.clone()));
                    }
                }
            }
        }
        for (target, slot, source) in missing {
            let entries = self.persons[target].slot_mut(slot);
            if !entries.contains(&source) {
                entries.push(source);
                report.mirrored_links += 1;
            }
        }

        if let Some(root) = &self.root_id {
            if !known.contains(root) {
                self.root_id = self.persons.first().map(|person| person.id.clone());
                report.root_reassigned = true;
            }
        }

        report
    }

    /// Advances `updated_at` strictly, even when the clock stalls or runs
    /// backwards.
    pub(crate) fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
    }

    fn link(
        &mut self,
        kind: RelationshipKind,
        a: &PersonId,
        b: &PersonId,
        now_ms: i64,
    ) -> TreeResult<()> {
        let (ia, ib) = self.pair_indices(a, b)?;
        let (slot_a, slot_b) = kind.slots();

        let forward = self.persons[ia].slot(slot_a).contains(b);
        let backward = self.persons[ib].slot(slot_b).contains(a);
        if forward && backward {
            return Err(TreeError::DuplicateRelationship {
                kind,
                a: a.clone(),
                b: b.clone(),
            });
        }

        if !forward {
            self.persons[ia].slot_mut(slot_a).push(b.clone());
        }
        if !backward {
            self.persons[ib].slot_mut(slot_b).push(a.clone());
        }
        self.touch(now_ms);
        Ok(())
    }

    fn pair_indices(&self, a: &PersonId, b: &PersonId) -> TreeResult<(usize, usize)> {
        if a == b {
            return Err(TreeError::InvalidRelationship {
                a: a.clone(),
                b: b.clone(),
            });
        }
        Ok((self.index_of(a)?, self.index_of(b)?))
    }

    fn index_of(&self, id: &PersonId) -> TreeResult<usize> {
        self.persons
            .iter()
            .position(|person| &person.id == id)
            .ok_or_else(|| TreeError::PersonNotFound(id.clone()))
    }

    fn index_map(&self) -> HashMap<&PersonId, usize> {
        self.persons
            .iter()
            .enumerate()
            .map(|(index, person)| (&person.id, index))
            .collect()
    }
}
