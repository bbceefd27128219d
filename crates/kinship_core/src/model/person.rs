//! Person domain model.
//!
//! # Responsibility
//! - Define the genealogical record stored inside one family tree.
//! - Provide draft/patch shapes for create and partial-update flows.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - Relationship arrays are crate-private: only `FamilyTree` mutates them,
//!   so symmetry can be enforced in one place.
//! - `given_name` and `family_name` are never blank.

use crate::model::tree::TreeId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque, stable identifier for one person.
///
/// The core never inspects the format; ordering is only used to pick one
/// canonical direction for symmetric edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Gender tag shown on diagram nodes.
///
/// Unrecognized values in imported data map to `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Validation failures for person display fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonValidationError {
    /// Given name is empty after trim.
    BlankGivenName,
    /// Family name is empty after trim.
    BlankFamilyName,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankGivenName => write!(f, "given name must not be blank"),
            Self::BlankFamilyName => write!(f, "family name must not be blank"),
        }
    }
}

impl Error for PersonValidationError {}

/// One genealogical record.
///
/// Serialized field names follow the snapshot file format (`firstName`,
/// `lastName`, `treeId`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    /// Owning tree. Rewritten on import when it disagrees with the file.
    pub tree_id: TreeId,
    #[serde(rename = "firstName")]
    pub given_name: String,
    #[serde(rename = "lastName")]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maiden_name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_place: Option<String>,
    /// Opaque avatar reference (URL or data URI); never decoded by core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub(crate) parents: Vec<PersonId>,
    #[serde(default)]
    pub(crate) children: Vec<PersonId>,
    #[serde(default)]
    pub(crate) siblings: Vec<PersonId>,
    #[serde(default)]
    pub(crate) spouses: Vec<PersonId>,
}

/// Internal handle for one of the four relationship arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Parents,
    Children,
    Siblings,
    Spouses,
}

impl Slot {
    pub(crate) const ALL: [Slot; 4] = [Slot::Parents, Slot::Children, Slot::Siblings, Slot::Spouses];

    /// Slot on the other person that must hold the reverse entry.
    pub(crate) fn mirror(self) -> Slot {
        match self {
            Slot::Parents => Slot::Children,
            Slot::Children => Slot::Parents,
            Slot::Siblings => Slot::Siblings,
            Slot::Spouses => Slot::Spouses,
        }
    }
}

impl Person {
    pub(crate) fn from_draft(id: PersonId, tree_id: TreeId, draft: PersonDraft) -> Self {
        Self {
            id,
            tree_id,
            given_name: draft.given_name.trim().to_string(),
            family_name: draft.family_name.trim().to_string(),
            maiden_name: draft.maiden_name,
            gender: draft.gender,
            birth_date: draft.birth_date,
            birth_place: draft.birth_place,
            death_date: draft.death_date,
            death_place: draft.death_place,
            avatar: draft.avatar,
            notes: draft.notes,
            parents: Vec::new(),
            children: Vec::new(),
            siblings: Vec::new(),
            spouses: Vec::new(),
        }
    }

    /// Checks display-field invariants.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.given_name.trim().is_empty() {
            return Err(PersonValidationError::BlankGivenName);
        }
        if self.family_name.trim().is_empty() {
            return Err(PersonValidationError::BlankFamilyName);
        }
        Ok(())
    }

    /// "Given Family" label used by diagram nodes.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }

    pub fn parents(&self) -> &[PersonId] {
        &self.parents
    }

    pub fn children(&self) -> &[PersonId] {
        &self.children
    }

    pub fn siblings(&self) -> &[PersonId] {
        &self.siblings
    }

    pub fn spouses(&self) -> &[PersonId] {
        &self.spouses
    }

    /// Returns whether `other` appears in any relationship array.
    pub fn is_related_to(&self, other: &PersonId) -> bool {
        Slot::ALL
            .iter()
            .any(|slot| self.slot(*slot).contains(other))
    }

    pub(crate) fn slot(&self, slot: Slot) -> &Vec<PersonId> {
        match slot {
            Slot::Parents => &self.parents,
            Slot::Children => &self.children,
            Slot::Siblings => &self.siblings,
            Slot::Spouses => &self.spouses,
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: Slot) -> &mut Vec<PersonId> {
        match slot {
            Slot::Parents => &mut self.parents,
            Slot::Children => &mut self.children,
            Slot::Siblings => &mut self.siblings,
            Slot::Spouses => &mut self.spouses,
        }
    }

    /// Removes every reference to `id` from all four arrays.
    pub(crate) fn forget(&mut self, id: &PersonId) {
        for slot in Slot::ALL {
            self.slot_mut(slot).retain(|linked| linked != id);
        }
    }
}

/// Caller input for creating a person.
///
/// Carries no relationship arrays: links are only created through the
/// relationship operations on `FamilyTree`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonDraft {
    pub given_name: String,
    pub family_name: String,
    pub maiden_name: Option<String>,
    pub gender: Gender,
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
    pub death_date: Option<String>,
    pub death_place: Option<String>,
    pub avatar: Option<String>,
    pub notes: Option<String>,
}

impl PersonDraft {
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
            ..Self::default()
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_birth_date(mut self, birth_date: impl Into<String>) -> Self {
        self.birth_date = Some(birth_date.into());
        self
    }
}

/// Partial update for person display fields.
///
/// `None` keeps the current value. For optional fields `Some(None)` clears
/// the value. Relationship arrays are not patchable and always survive an
/// update untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub maiden_name: Option<Option<String>>,
    pub gender: Option<Gender>,
    pub birth_date: Option<Option<String>>,
    pub birth_place: Option<Option<String>>,
    pub death_date: Option<Option<String>>,
    pub death_place: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl PersonPatch {
    /// Returns a patched copy, leaving `person` untouched.
    pub(crate) fn apply_to(&self, person: &Person) -> Person {
        let mut next = person.clone();
        if let Some(value) = &self.given_name {
            next.given_name = value.trim().to_string();
        }
        if let Some(value) = &self.family_name {
            next.family_name = value.trim().to_string();
        }
        if let Some(gender) = self.gender {
            next.gender = gender;
        }
        merge_optional(&mut next.maiden_name, &self.maiden_name);
        merge_optional(&mut next.birth_date, &self.birth_date);
        merge_optional(&mut next.birth_place, &self.birth_place);
        merge_optional(&mut next.death_date, &self.death_date);
        merge_optional(&mut next.death_place, &self.death_place);
        merge_optional(&mut next.avatar, &self.avatar);
        merge_optional(&mut next.notes, &self.notes);
        next
    }
}

fn merge_optional(target: &mut Option<String>, update: &Option<Option<String>>) {
    if let Some(value) = update {
        *target = value.clone();
    }
}
