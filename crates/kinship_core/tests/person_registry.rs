use kinship_core::{
    FamilyRegistry, FamilyTree, FixedClock, Gender, PersonDraft, PersonId, PersonPatch,
    RegistryError, RelationshipKind, RelativeRole, SequentialIdGenerator, TreeError,
};

type TestRegistry = FamilyRegistry<SequentialIdGenerator, FixedClock>;

fn setup() -> TestRegistry {
    let mut registry =
        FamilyRegistry::with_collaborators(SequentialIdGenerator::default(), FixedClock(1_000));
    registry.create_tree("Test Family").unwrap();
    registry
}

fn add(registry: &mut TestRegistry, given: &str) -> PersonId {
    registry
        .add_person(PersonDraft::new(given, "Doe"))
        .unwrap()
}

fn assert_symmetric(tree: &FamilyTree) {
    for a in tree.persons() {
        for child in a.children() {
            let b = tree.person(child).expect("child must exist");
            assert!(b.parents().contains(&a.id), "{} missing parent {}", b.id, a.id);
        }
        for parent in a.parents() {
            let b = tree.person(parent).expect("parent must exist");
            assert!(b.children().contains(&a.id), "{} missing child {}", b.id, a.id);
        }
        for spouse in a.spouses() {
            let b = tree.person(spouse).expect("spouse must exist");
            assert!(b.spouses().contains(&a.id));
        }
        for sibling in a.siblings() {
            let b = tree.person(sibling).expect("sibling must exist");
            assert!(b.siblings().contains(&a.id));
        }
        assert!(!a.is_related_to(&a.id), "{} links to itself", a.id);
    }
}

#[test]
fn scenario_parent_child_and_spouse() {
    let mut registry = setup();
    let a = add(&mut registry, "A");
    assert_eq!(registry.active_tree().unwrap().root_id(), Some(&a));

    let b = add(&mut registry, "B");
    registry.add_parent_child(&a, &b).unwrap();
    assert_eq!(registry.get_person(&a).unwrap().children(), &[b.clone()]);
    assert_eq!(registry.get_person(&b).unwrap().parents(), &[a.clone()]);

    let s = add(&mut registry, "S");
    registry.add_spouse(&a, &s).unwrap();
    assert_eq!(registry.get_person(&a).unwrap().spouses(), &[s.clone()]);
    assert_eq!(registry.get_person(&s).unwrap().spouses(), &[a.clone()]);

    assert_eq!(registry.active_tree().unwrap().root_id(), Some(&a));
    assert_symmetric(registry.active_tree().unwrap());
}

#[test]
fn adding_parent_child_twice_keeps_single_entries() {
    let mut registry = setup();
    let parent = add(&mut registry, "P");
    let child = add(&mut registry, "C");

    registry.add_parent_child(&parent, &child).unwrap();
    let err = registry.add_parent_child(&parent, &child).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        RegistryError::Tree(TreeError::DuplicateRelationship {
            kind: RelationshipKind::Parent,
            ..
        })
    ));

    assert_eq!(registry.get_person(&parent).unwrap().children(), &[child.clone()]);
    assert_eq!(registry.get_person(&child).unwrap().parents(), &[parent.clone()]);
}

#[test]
fn spouse_added_from_either_side_is_duplicate() {
    let mut registry = setup();
    let a = add(&mut registry, "A");
    let b = add(&mut registry, "B");

    registry.add_spouse(&a, &b).unwrap();
    let err = registry.add_spouse(&b, &a).unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(registry.get_person(&a).unwrap().spouses().len(), 1);
    assert_eq!(registry.get_person(&b).unwrap().spouses().len(), 1);
}

#[test]
fn self_relationship_is_invalid_and_leaves_state_unchanged() {
    let mut registry = setup();
    let a = add(&mut registry, "A");
    let before = registry.active_tree().unwrap().clone();

    for kind in [RelativeRole::Parent, RelativeRole::Spouse, RelativeRole::Sibling] {
        let err = registry.link_relative(&a, kind, &a).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Tree(TreeError::InvalidRelationship { .. })
        ));
    }
    assert_eq!(registry.active_tree().unwrap(), &before);
}

#[test]
fn unknown_ids_are_not_found() {
    let mut registry = setup();
    let a = add(&mut registry, "A");
    let ghost = PersonId::new("ghost");

    let err = registry.add_parent_child(&a, &ghost).unwrap_err();
    assert!(err.is_not_found());
    assert!(registry.get_person(&a).unwrap().children().is_empty());

    assert!(registry.get_person(&ghost).unwrap_err().is_not_found());
    assert!(registry.delete_person(&ghost).unwrap_err().is_not_found());
    assert!(registry
        .update_person(&ghost, &PersonPatch::default())
        .unwrap_err()
        .is_not_found());
}

#[test]
fn delete_person_strips_every_reference() {
    let mut registry = setup();
    let grandpa = add(&mut registry, "Grandpa");
    let dad = add(&mut registry, "Dad");
    let mom = add(&mut registry, "Mom");
    let kid = add(&mut registry, "Kid");
    let aunt = add(&mut registry, "Aunt");

    registry.add_parent_child(&grandpa, &dad).unwrap();
    registry.add_parent_child(&grandpa, &aunt).unwrap();
    registry.add_sibling(&dad, &aunt).unwrap();
    registry.add_spouse(&dad, &mom).unwrap();
    registry.add_parent_child(&dad, &kid).unwrap();
    registry.add_parent_child(&mom, &kid).unwrap();

    let removed = registry.delete_person(&dad).unwrap();
    assert_eq!(removed.id, dad);

    let tree = registry.active_tree().unwrap();
    assert!(tree.person(&dad).is_none());
    for person in tree.persons() {
        assert!(!person.is_related_to(&dad), "{} still links to deleted", person.id);
    }
    assert_eq!(tree.person(&kid).unwrap().parents(), &[mom.clone()]);
    assert_symmetric(tree);
}

#[test]
fn deleting_root_reassigns_and_emptied_tree_clears_root() {
    let mut registry = setup();
    let first = add(&mut registry, "First");
    let second = add(&mut registry, "Second");

    registry.delete_person(&first).unwrap();
    assert_eq!(registry.active_tree().unwrap().root_id(), Some(&second));

    registry.delete_person(&second).unwrap();
    assert_eq!(registry.active_tree().unwrap().root_id(), None);
    assert!(registry.active_tree().unwrap().is_empty());
}

#[test]
fn update_person_merges_fields_and_keeps_relationships() {
    let mut registry = setup();
    let a = add(&mut registry, "Anna");
    let b = add(&mut registry, "Ben");
    registry.add_spouse(&a, &b).unwrap();

    let patch = PersonPatch {
        family_name: Some("Smith".to_string()),
        maiden_name: Some(Some("Doe".to_string())),
        gender: Some(Gender::Female),
        ..PersonPatch::default()
    };
    registry.update_person(&a, &patch).unwrap();

    let anna = registry.get_person(&a).unwrap();
    assert_eq!(anna.full_name(), "Anna Smith");
    assert_eq!(anna.maiden_name.as_deref(), Some("Doe"));
    assert_eq!(anna.gender, Gender::Female);
    assert_eq!(anna.spouses(), &[b.clone()]);
}

#[test]
fn blank_names_are_rejected_on_add_and_update() {
    let mut registry = setup();
    let err = registry.add_person(PersonDraft::new("  ", "Doe")).unwrap_err();
    assert!(matches!(err, RegistryError::Tree(TreeError::InvalidPerson(_))));
    assert!(registry.active_tree().unwrap().is_empty());

    let a = add(&mut registry, "A");
    let patch = PersonPatch {
        given_name: Some(String::new()),
        ..PersonPatch::default()
    };
    assert!(registry.update_person(&a, &patch).is_err());
    assert_eq!(registry.get_person(&a).unwrap().given_name, "A");
}

#[test]
fn remove_relationship_handles_parent_direction_and_noops() {
    let mut registry = setup();
    let parent = add(&mut registry, "P");
    let child = add(&mut registry, "C");
    registry.add_parent_child(&parent, &child).unwrap();

    // Wrong direction removes nothing.
    assert!(!registry
        .remove_relationship(&child, &parent, RelationshipKind::Parent)
        .unwrap());
    assert!(registry
        .remove_relationship(&parent, &child, RelationshipKind::Parent)
        .unwrap());
    assert!(registry.get_person(&parent).unwrap().children().is_empty());
    assert!(registry.get_person(&child).unwrap().parents().is_empty());

    assert!(!registry
        .remove_relationship(&parent, &child, RelationshipKind::Spouse)
        .unwrap());
}

#[test]
fn symmetry_holds_after_mixed_operations() {
    let mut registry = setup();
    let ids: Vec<PersonId> = ["A", "B", "C", "D", "E", "F"]
        .iter()
        .map(|name| add(&mut registry, name))
        .collect();

    let _ = registry.add_parent_child(&ids[0], &ids[1]);
    let _ = registry.add_parent_child(&ids[0], &ids[2]);
    let _ = registry.add_sibling(&ids[1], &ids[2]);
    let _ = registry.add_spouse(&ids[0], &ids[3]);
    let _ = registry.add_parent_child(&ids[3], &ids[1]);
    let _ = registry.add_parent_child(&ids[2], &ids[4]);
    let _ = registry.add_spouse(&ids[4], &ids[5]);
    let _ = registry.add_parent_child(&ids[0], &ids[1]);
    let _ = registry.remove_relationship(&ids[0], &ids[3], RelationshipKind::Spouse);
    let _ = registry.remove_relationship(&ids[1], &ids[2], RelationshipKind::Sibling);
    let _ = registry.delete_person(&ids[2]);
    let _ = registry.add_sibling(&ids[1], &ids[5]);

    assert_symmetric(registry.active_tree().unwrap());
}

#[test]
fn updated_at_advances_on_structural_mutation_only() {
    let mut registry =
        FamilyRegistry::with_collaborators(SequentialIdGenerator::default(), FixedClock(10));
    let tree_id = registry.create_tree("Clocked").unwrap();
    let a = registry.add_person(PersonDraft::new("A", "Z")).unwrap();
    let b = registry.add_person(PersonDraft::new("B", "Z")).unwrap();

    let tree = registry.tree_mut(&tree_id).unwrap();
    // Both adds landed in the same millisecond as the tree itself.
    assert_eq!(tree.updated_at(), 12);
    tree.add_spouse(&a, &b, 20).unwrap();
    assert_eq!(tree.updated_at(), 20);
    tree.add_spouse(&a, &b, 30).unwrap_err();
    assert_eq!(tree.updated_at(), 20);
    tree.remove_relationship(&a, &b, RelationshipKind::Sibling, 40)
        .unwrap();
    assert_eq!(tree.updated_at(), 20);
    tree.delete_person(&b, 50).unwrap();
    assert_eq!(tree.updated_at(), 50);
    assert_eq!(tree.created_at(), 10);
}

#[test]
fn tree_lifecycle_tracks_active_selection() {
    let mut registry =
        FamilyRegistry::with_collaborators(SequentialIdGenerator::default(), FixedClock(1));
    assert!(matches!(
        registry.add_person(PersonDraft::new("A", "B")).unwrap_err(),
        RegistryError::NoActiveTree
    ));
    assert!(matches!(
        registry.create_tree("   ").unwrap_err(),
        RegistryError::InvalidTreeName
    ));

    let first = registry.create_tree(" First ").unwrap();
    let second = registry.create_tree("Second").unwrap();
    assert_eq!(registry.active_tree_id(), Some(&second));
    assert_eq!(registry.tree(&first).unwrap().name(), "First");

    registry.activate_tree(&first).unwrap();
    let person = registry.add_person(PersonDraft::new("Only", "First")).unwrap();
    assert_eq!(registry.tree(&first).unwrap().len(), 1);
    assert!(registry.tree(&second).unwrap().is_empty());
    assert_eq!(registry.get_person(&person).unwrap().tree_id, first);

    registry.delete_tree(&first).unwrap();
    assert_eq!(registry.active_tree_id(), None);
    assert_eq!(registry.trees().len(), 1);
    assert!(registry.activate_tree(&first).unwrap_err().is_not_found());
}

#[test]
fn relatives_and_candidates_resolve_through_registry() {
    let mut registry = setup();
    let mom = add(&mut registry, "Mom");
    let kid = add(&mut registry, "Kid");
    let other = add(&mut registry, "Other");
    registry
        .link_relative(&kid, RelativeRole::Parent, &mom)
        .unwrap();

    let relatives = registry.relatives(&kid).unwrap();
    assert_eq!(relatives.parents.len(), 1);
    assert_eq!(relatives.parents[0].id, mom);

    let candidates: Vec<PersonId> = registry
        .relationship_candidates(&kid, RelativeRole::Spouse)
        .unwrap()
        .into_iter()
        .map(|person| person.id.clone())
        .collect();
    assert_eq!(candidates, vec![other]);
}
