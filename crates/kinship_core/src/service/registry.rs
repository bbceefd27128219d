//! Family registry use-case service.
//!
//! # Responsibility
//! - Own every loaded family tree and the "active" tree selection.
//! - Route person and relationship operations to the target aggregate.
//! - Bridge snapshot import/export and store load/save.
//!
//! # Invariants
//! - Mutations are applied synchronously and completely before returning.
//! - The store is only touched by `load_from`/`save_to`, never by a
//!   mutation.
//! - A failed operation leaves every tree unchanged.

use crate::ids::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
use crate::layout::{compute_layout, LayoutConfig, Orientation, TreeLayout};
use crate::model::person::{Person, PersonDraft, PersonId, PersonPatch};
use crate::model::tree::{
    FamilyTree, RelationshipKind, RelativeRole, Relatives, TreeError, TreeId, TreeResult,
};
use crate::projection::{project, RenderProjection};
use crate::repo::tree_store::{StoreError, TreeStore};
use crate::snapshot::{export_tree, import_tree, sanitize_tree, snapshot_file_name, SnapshotError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from registry operations.
#[derive(Debug)]
pub enum RegistryError {
    /// Target tree does not exist.
    TreeNotFound(TreeId),
    /// Operation needs an active tree but none is selected.
    NoActiveTree,
    /// Tree name is blank after trim.
    InvalidTreeName,
    /// Incoming person id already belongs to another tree.
    PersonInOtherTree { person: PersonId, tree: TreeId },
    /// Aggregate-level failure.
    Tree(TreeError),
    /// Snapshot import/export failure.
    Snapshot(SnapshotError),
    /// Persistence failure.
    Store(StoreError),
}

impl RegistryError {
    /// Whether the caller may ignore this error without losing data.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Tree(TreeError::DuplicateRelationship { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TreeNotFound(_) | Self::Tree(TreeError::PersonNotFound(_))
        )
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TreeNotFound(id) => write!(f, "family tree not found: {id}"),
            Self::NoActiveTree => write!(f, "no family tree is active"),
            Self::InvalidTreeName => write!(f, "tree name must not be blank"),
            Self::PersonInOtherTree { person, tree } => {
                write!(f, "person {person} already belongs to family tree {tree}")
            }
            Self::Tree(err) => write!(f, "{err}"),
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for RegistryError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<SnapshotError> for RegistryError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Registry facade over all family trees.
///
/// Person operations target the active tree; use `tree_mut` to address a
/// specific tree directly.
pub struct FamilyRegistry<I: IdGenerator = UuidIdGenerator, C: Clock = SystemClock> {
    trees: Vec<FamilyTree>,
    active: Option<TreeId>,
    ids: I,
    clock: C,
}

impl FamilyRegistry {
    /// Creates an empty registry with UUID ids and the system clock.
    pub fn new() -> Self {
        Self::with_collaborators(UuidIdGenerator, SystemClock)
    }
}

impl Default for FamilyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: IdGenerator, C: Clock> FamilyRegistry<I, C> {
    pub fn with_collaborators(ids: I, clock: C) -> Self {
        Self {
            trees: Vec::new(),
            active: None,
            ids,
            clock,
        }
    }

    /// Builds a registry from whatever `store` holds. No tree is active.
    ///
    /// Stored trees are validated and repaired like imported snapshots, and
    /// a person id held by two trees fails the whole load.
    pub fn load_from(store: &impl TreeStore, ids: I, clock: C) -> RegistryResult<Self> {
        let mut registry = Self::with_collaborators(ids, clock);
        let mut repaired = 0usize;
        for stored in store.load()? {
            let imported = sanitize_tree(stored).map_err(|err| {
                error!("event=registry_load module=registry status=error error={err}");
                RegistryError::from(err)
            })?;
            if registry.tree(imported.tree.id()).is_some() {
                return Err(StoreError::InvalidData(format!(
                    "tree `{}` is stored twice",
                    imported.tree.id()
                ))
                .into());
            }
            if !imported.repairs.is_clean() {
                repaired += 1;
            }
            registry.ensure_persons_unclaimed(&imported.tree)?;
            registry.trees.push(imported.tree);
        }
        info!(
            "event=registry_load module=registry status=ok trees={} repaired={}",
            registry.trees.len(),
            repaired
        );
        Ok(registry)
    }

    /// Writes every tree to `store`.
    pub fn save_to(&self, store: &impl TreeStore) -> RegistryResult<()> {
        store.save(&self.trees)?;
        info!(
            "event=registry_save module=registry status=ok trees={}",
            self.trees.len()
        );
        Ok(())
    }

    pub fn trees(&self) -> &[FamilyTree] {
        &self.trees
    }

    pub fn tree(&self, id: &TreeId) -> Option<&FamilyTree> {
        self.trees.iter().find(|tree| tree.id() == id)
    }

    pub fn tree_mut(&mut self, id: &TreeId) -> RegistryResult<&mut FamilyTree> {
        self.trees
            .iter_mut()
            .find(|tree| tree.id() == id)
            .ok_or_else(|| RegistryError::TreeNotFound(id.clone()))
    }

    pub fn active_tree_id(&self) -> Option<&TreeId> {
        self.active.as_ref()
    }

    pub fn active_tree(&self) -> Option<&FamilyTree> {
        self.active.as_ref().and_then(|id| self.tree(id))
    }

    /// Creates an empty tree and makes it active.
    pub fn create_tree(&mut self, name: impl Into<String>) -> RegistryResult<TreeId> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::InvalidTreeName);
        }

        let id = self.ids.next_tree_id();
        let tree = FamilyTree::new(id.clone(), trimmed, self.clock.now_ms());
        self.trees.push(tree);
        self.active = Some(id.clone());
        info!("event=tree_create module=registry status=ok tree_id={id}");
        Ok(id)
    }

    pub fn activate_tree(&mut self, id: &TreeId) -> RegistryResult<()> {
        if self.tree(id).is_none() {
            return Err(RegistryError::TreeNotFound(id.clone()));
        }
        self.active = Some(id.clone());
        Ok(())
    }

    /// Removes a tree with all its persons; clears the selection if it was
    /// active.
    pub fn delete_tree(&mut self, id: &TreeId) -> RegistryResult<FamilyTree> {
        let index = self
            .trees
            .iter()
            .position(|tree| tree.id() == id)
            .ok_or_else(|| RegistryError::TreeNotFound(id.clone()))?;
        let removed = self.trees.remove(index);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        info!(
            "event=tree_delete module=registry status=ok tree_id={} persons={}",
            id,
            removed.len()
        );
        Ok(removed)
    }

    pub fn add_person(&mut self, draft: PersonDraft) -> RegistryResult<PersonId> {
        let now = self.clock.now_ms();
        let id = self.ids.next_person_id();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record("person_add", &tree_id, tree.add_person(id, draft, now))
    }

    pub fn update_person(&mut self, id: &PersonId, patch: &PersonPatch) -> RegistryResult<()> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record("person_update", &tree_id, tree.update_person(id, patch, now))
    }

    /// Deletes a person and strips every reference to it.
    pub fn delete_person(&mut self, id: &PersonId) -> RegistryResult<Person> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record("person_delete", &tree_id, tree.delete_person(id, now))
    }

    pub fn get_person(&self, id: &PersonId) -> RegistryResult<&Person> {
        let tree = self.active_tree_ref()?;
        Ok(tree.get_person(id)?)
    }

    pub fn relatives(&self, id: &PersonId) -> RegistryResult<Relatives<'_>> {
        let tree = self.active_tree_ref()?;
        Ok(tree.relatives(id)?)
    }

    pub fn relationship_candidates(
        &self,
        id: &PersonId,
        role: RelativeRole,
    ) -> RegistryResult<Vec<&Person>> {
        let tree = self.active_tree_ref()?;
        Ok(tree.relationship_candidates(id, role)?)
    }

    pub fn add_parent_child(
        &mut self,
        parent_id: &PersonId,
        child_id: &PersonId,
    ) -> RegistryResult<()> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record(
            "relationship_add",
            &tree_id,
            tree.add_parent_child(parent_id, child_id, now),
        )
    }

    pub fn add_spouse(&mut self, a: &PersonId, b: &PersonId) -> RegistryResult<()> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record("relationship_add", &tree_id, tree.add_spouse(a, b, now))
    }

    pub fn add_sibling(&mut self, a: &PersonId, b: &PersonId) -> RegistryResult<()> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record("relationship_add", &tree_id, tree.add_sibling(a, b, now))
    }

    pub fn link_relative(
        &mut self,
        person: &PersonId,
        role: RelativeRole,
        other: &PersonId,
    ) -> RegistryResult<()> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record(
            "relationship_add",
            &tree_id,
            tree.link_relative(person, role, other, now),
        )
    }

    /// Returns `false` when nothing was linked; that case is a no-op.
    pub fn remove_relationship(
        &mut self,
        a: &PersonId,
        b: &PersonId,
        kind: RelationshipKind,
    ) -> RegistryResult<bool> {
        let now = self.clock.now_ms();
        let tree = self.active_tree_mut()?;
        let tree_id = tree.id().clone();
        record(
            "relationship_remove",
            &tree_id,
            tree.remove_relationship(a, b, kind, now),
        )
    }

    /// Imports snapshot JSON, replacing a tree with the same id or adding
    /// it, and activates it. Registry is untouched on error.
    pub fn import_snapshot(&mut self, json: &str) -> RegistryResult<TreeId> {
        let imported = match import_tree(json) {
            Ok(imported) => imported,
            Err(err) => {
                warn!("event=tree_import module=registry status=error error={err}");
                return Err(err.into());
            }
        };

        let tree = imported.tree;
        if let Err(err) = self.ensure_persons_unclaimed(&tree) {
            warn!("event=tree_import module=registry status=error error={err}");
            return Err(err);
        }
        let id = tree.id().clone();
        match self.trees.iter_mut().find(|existing| existing.id() == &id) {
            Some(existing) => *existing = tree,
            None => self.trees.push(tree),
        }
        self.active = Some(id.clone());
        info!("event=tree_import module=registry status=ok tree_id={id}");
        Ok(id)
    }

    /// Returns `(file_name, json)` for the active tree.
    pub fn export_active_snapshot(&self) -> RegistryResult<(String, String)> {
        let tree = self.active_tree_ref()?;
        let json = export_tree(tree)?;
        Ok((snapshot_file_name(tree), json))
    }

    pub fn layout_active(
        &self,
        orientation: Orientation,
        config: &LayoutConfig,
    ) -> RegistryResult<TreeLayout> {
        let tree = self.active_tree_ref()?;
        Ok(compute_layout(tree, orientation, config))
    }

    pub fn render_active(
        &self,
        orientation: Orientation,
        config: &LayoutConfig,
    ) -> RegistryResult<RenderProjection> {
        let tree = self.active_tree_ref()?;
        let layout = compute_layout(tree, orientation, config);
        Ok(project(tree, &layout, orientation, config))
    }

    /// Fails when a person of `incoming` lives in any other registered tree.
    /// A tree with the same id is the one `incoming` replaces, so it is
    /// skipped.
    fn ensure_persons_unclaimed(&self, incoming: &FamilyTree) -> RegistryResult<()> {
        for other in self.trees.iter().filter(|tree| tree.id() != incoming.id()) {
            if let Some(person) = incoming
                .persons()
                .iter()
                .find(|person| other.contains(&person.id))
            {
                return Err(RegistryError::PersonInOtherTree {
                    person: person.id.clone(),
                    tree: other.id().clone(),
                });
            }
        }
        Ok(())
    }

    fn active_tree_ref(&self) -> RegistryResult<&FamilyTree> {
        let id = self.active.as_ref().ok_or(RegistryError::NoActiveTree)?;
        self.tree(id)
            .ok_or_else(|| RegistryError::TreeNotFound(id.clone()))
    }

    fn active_tree_mut(&mut self) -> RegistryResult<&mut FamilyTree> {
        let id = self.active.clone().ok_or(RegistryError::NoActiveTree)?;
        self.tree_mut(&id)
    }
}

fn record<T>(event: &str, tree_id: &TreeId, result: TreeResult<T>) -> RegistryResult<T> {
    match &result {
        Ok(_) => info!("event={event} module=registry status=ok tree_id={tree_id}"),
        Err(TreeError::DuplicateRelationship { .. }) => {
            info!("event={event} module=registry status=skip tree_id={tree_id} reason=duplicate")
        }
        Err(err) => {
            warn!("event={event} module=registry status=error tree_id={tree_id} error={err}")
        }
    }
    result.map_err(Into::into)
}
