use kinship_core::{
    compute_layout, project, render_tree, EdgeKind, FamilyRegistry, FamilyTree, FixedClock,
    LayoutConfig, LineStyle, Orientation, PersonDraft, PersonId, SequentialIdGenerator, Side,
    TreeId,
};

fn id(value: &str) -> PersonId {
    PersonId::new(value)
}

#[test]
fn scenario_emits_one_spouse_and_one_parent_edge() {
    let mut registry =
        FamilyRegistry::with_collaborators(SequentialIdGenerator::default(), FixedClock(1));
    registry.create_tree("Scenario").unwrap();
    let a = registry.add_person(PersonDraft::new("A", "Doe")).unwrap();
    let b = registry.add_person(PersonDraft::new("B", "Doe")).unwrap();
    let s = registry.add_person(PersonDraft::new("S", "Doe")).unwrap();
    registry.add_parent_child(&a, &b).unwrap();
    registry.add_spouse(&a, &s).unwrap();

    let projection = registry
        .render_active(Orientation::Stacked, &LayoutConfig::default())
        .unwrap();
    assert_eq!(projection.nodes.len(), 3);
    assert_eq!(projection.edges.len(), 2);

    let parent_edges: Vec<_> = projection.edges_of_kind(EdgeKind::ParentChild).collect();
    assert_eq!(parent_edges.len(), 1);
    assert_eq!(parent_edges[0].source, a);
    assert_eq!(parent_edges[0].target, b);
    assert_eq!(parent_edges[0].source_side, Some(Side::Bottom));
    assert_eq!(parent_edges[0].target_side, Some(Side::Top));
    assert!(parent_edges[0].style.directed);

    let spouse_edges: Vec<_> = projection.edges_of_kind(EdgeKind::Spouse).collect();
    assert_eq!(spouse_edges.len(), 1);
    let (low, high) = if a < s { (&a, &s) } else { (&s, &a) };
    assert_eq!(&spouse_edges[0].source, low);
    assert_eq!(&spouse_edges[0].target, high);
    assert_eq!(spouse_edges[0].style.line, LineStyle::Dashed);
    assert!(spouse_edges[0].style.animated);
}

#[test]
fn spouse_edge_is_single_regardless_of_insertion_order() {
    for (first, second) in [("m", "n"), ("n", "m")] {
        let mut tree = FamilyTree::new(TreeId::new("t"), "Order", 0);
        tree.add_person(id(first), PersonDraft::new(first, "X"), 0).unwrap();
        tree.add_person(id(second), PersonDraft::new(second, "X"), 0).unwrap();
        tree.add_spouse(&id(second), &id(first), 1).unwrap();

        let projection = render_tree(&tree, Orientation::Stacked, &LayoutConfig::default());
        let spouses: Vec<_> = projection.edges_of_kind(EdgeKind::Spouse).collect();
        assert_eq!(spouses.len(), 1);
        assert_eq!(spouses[0].id, "e-spouse-m-n");
    }
}

#[test]
fn parent_edges_are_not_doubled_by_parents_arrays() {
    let mut tree = FamilyTree::new(TreeId::new("t"), "Family", 0);
    for name in ["mom", "dad", "kid"] {
        tree.add_person(id(name), PersonDraft::new(name, "X"), 0).unwrap();
    }
    tree.add_parent_child(&id("mom"), &id("kid"), 1).unwrap();
    tree.add_parent_child(&id("dad"), &id("kid"), 1).unwrap();
    tree.add_spouse(&id("mom"), &id("dad"), 1).unwrap();

    let projection = render_tree(&tree, Orientation::Flowing, &LayoutConfig::default());
    let ids: Vec<&str> = projection.edges.iter().map(|edge| edge.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["e-parent-mom-kid", "e-parent-dad-kid", "e-spouse-dad-mom"]
    );
}

#[test]
fn nodes_carry_display_fields_and_root_flag() {
    let mut tree = FamilyTree::new(TreeId::new("t"), "Nodes", 0);
    tree.add_person(
        id("r"),
        PersonDraft::new("Rosa", "Parks").with_birth_date("1913-02-04"),
        0,
    )
    .unwrap();
    tree.add_person(id("o"), PersonDraft::new("Other", "Person"), 0).unwrap();

    let config = LayoutConfig::default();
    let layout = compute_layout(&tree, Orientation::Stacked, &config);
    let projection = project(&tree, &layout, Orientation::Stacked, &config);

    let root = projection.node(&id("r")).unwrap();
    assert_eq!(root.label, "Rosa Parks");
    assert_eq!(root.birth_date.as_deref(), Some("1913-02-04"));
    assert!(root.is_root);
    assert_eq!(root.width, 180.0);
    assert_eq!(root.height, 80.0);
    assert_eq!(Some(root.position), layout.position(&id("r")));
    assert!(!projection.node(&id("o")).unwrap().is_root);
}

#[test]
fn projection_serializes_identically_on_repeat() {
    let mut tree = FamilyTree::new(TreeId::new("t"), "Repeat", 0);
    for name in ["a", "b", "c", "d", "e"] {
        tree.add_person(id(name), PersonDraft::new(name, "Z"), 0).unwrap();
    }
    tree.add_parent_child(&id("a"), &id("c"), 1).unwrap();
    tree.add_parent_child(&id("b"), &id("c"), 1).unwrap();
    tree.add_spouse(&id("a"), &id("b"), 1).unwrap();
    tree.add_sibling(&id("c"), &id("d"), 1).unwrap();
    tree.add_parent_child(&id("d"), &id("e"), 1).unwrap();

    let config = LayoutConfig::default();
    let first = serde_json::to_string(&render_tree(&tree, Orientation::Stacked, &config)).unwrap();
    let second = serde_json::to_string(&render_tree(&tree, Orientation::Stacked, &config)).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("\"kind\":\"parent_child\""));
}
