//! Integration tests for fact base properties across modules

use std::collections::BTreeSet;
use std::sync::Arc;

use progdb_core::analyzer::{Analyzer, ProjectPackages};
use progdb_core::cha::{CancellationToken, ChaWorklist, HierarchyEnv, NoProgress};
use progdb_core::config::AnalysisConfig;
use progdb_core::convert::NullConverter;
use progdb_core::database::{ChaStatus, ProgramDatabase};
use progdb_core::ingest::UnitFacts;
use progdb_core::modifiers::Modifiers;
use progdb_core::path::{Path, RelationEdge};
use progdb_core::{Category, ElementKey, ElementRef, ElementRegistry, FactError, ProgramFacts, Relation};

fn class(id: &str) -> ElementKey {
    ElementKey::new(Category::Class, id)
}

fn method(id: &str) -> ElementKey {
    ElementKey::new(Category::Method, id)
}

/// I1 and I2 declare `m()`, I3 extends both, C implements I3 and declares `m()`.
fn diamond() -> UnitFacts {
    let abstract_method = Modifiers::PUBLIC
        .with(Modifiers::ABSTRACT)
        .with(Modifiers::ABSTRACT_INFERRED);
    let interface = Modifiers::PUBLIC.with(Modifiers::INTERFACE).with(Modifiers::ABSTRACT);

    UnitFacts::new("src/com/acme/Diamond.java")
        .with_package("com.acme")
        .with_element(Category::Class, "com.acme.I1", interface)
        .with_element(Category::Class, "com.acme.I2", interface)
        .with_element(Category::Class, "com.acme.I3", interface)
        .with_element(Category::Class, "com.acme.C", Modifiers::PUBLIC)
        .with_element(Category::Method, "com.acme.I1.m()", abstract_method)
        .with_element(Category::Method, "com.acme.I2.m()", abstract_method)
        .with_element(Category::Method, "com.acme.C.m()", Modifiers::PUBLIC)
        .with_relation(class("com.acme.I3"), Relation::ExtendsInterfaces, class("com.acme.I1"))
        .with_relation(class("com.acme.I3"), Relation::ExtendsInterfaces, class("com.acme.I2"))
        .with_relation(class("com.acme.C"), Relation::ImplementsInterface, class("com.acme.I3"))
        .with_relation(class("com.acme.I1"), Relation::DeclaresMethod, method("com.acme.I1.m()"))
        .with_relation(class("com.acme.I2"), Relation::DeclaresMethod, method("com.acme.I2.m()"))
        .with_relation(class("com.acme.C"), Relation::DeclaresMethod, method("com.acme.C.m()"))
}

#[test]
fn test_registry_returns_shared_instances() {
    let registry = ElementRegistry::new();
    for (category, id) in [
        (Category::Class, "com.acme.Shape"),
        (Category::Method, "com.acme.Shape.area()"),
        (Category::Field, "com.acme.Shape.sides"),
    ] {
        let first = registry.get(category, id).unwrap();
        let second = registry.get(category, id).unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }
}

#[test]
fn test_registries_are_independent_sessions() {
    let one = ElementRegistry::new();
    let two = ElementRegistry::new();
    let a = one.get(Category::Class, "com.acme.Shape").unwrap();
    let b = two.get(Category::Class, "com.acme.Shape").unwrap();
    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_transpose_symmetry_for_every_forward_relation() {
    let registry = ElementRegistry::new();
    let mut db = ProgramDatabase::new();

    for relation in Relation::ALL.into_iter().filter(|r| !r.is_transpose() && !r.requires_cha()) {
        let domain = sample(&registry, relation.domain_category(), "d");
        let range = sample(&registry, relation.range_category(), "r");
        let transpose = relation.transpose().unwrap();

        db.add_relation_and_transpose(&domain, relation, &range);

        assert!(db.get_range(&domain, relation).unwrap().contains(&range));
        assert!(db.get_range(&range, transpose).unwrap().contains(&domain));
    }
}

fn sample(registry: &ElementRegistry, category: Category, tag: &str) -> ElementRef {
    let id = match category {
        Category::Class => format!("p.{}", tag.to_uppercase()),
        Category::Method => format!("p.{}.run()", tag.to_uppercase()),
        Category::Field => format!("p.{}.value", tag.to_uppercase()),
    };
    registry.get(category, &id).unwrap()
}

#[test]
fn test_repeated_insertion_is_idempotent() {
    let registry = ElementRegistry::new();
    let mut db = ProgramDatabase::new();
    let caller = registry.get(Category::Method, "p.A.run()").unwrap();
    let callee = registry.get(Category::Method, "p.B.go()").unwrap();

    db.add_relation(&caller, Relation::Calls, &callee);
    let once = db.get_range(&caller, Relation::Calls).unwrap();
    for _ in 0..3 {
        db.add_relation(&caller, Relation::Calls, &callee);
    }
    assert_eq!(db.get_range(&caller, Relation::Calls).unwrap(), once);
}

#[test]
fn test_path_connectivity() {
    let registry = ElementRegistry::new();
    let a = registry.get(Category::Class, "p.A").unwrap();
    let b = registry.get(Category::Class, "p.B").unwrap();
    let c = registry.get(Category::Class, "p.C").unwrap();

    let mut path = Path::new();
    path.push(RelationEdge::new(b.clone(), Relation::ExtendsClass, c.clone())).unwrap();
    path.push(RelationEdge::new(a.clone(), Relation::ExtendsClass, b.clone())).unwrap();

    // Endpoints read the edges in push order; the top is the latest source.
    assert_eq!(path.first_node().unwrap(), &b);
    assert_eq!(path.last_node().unwrap(), &b);
    assert_eq!(path.top_node().unwrap(), &a);
    assert_eq!(path.nodes().len(), 3);

    let err = path
        .push(RelationEdge::new(c.clone(), Relation::ExtendsClass, b.clone()))
        .unwrap_err();
    assert!(matches!(err, FactError::DisconnectedEdge { .. }));
    assert_eq!(path.len(), 2);
}

#[test]
fn test_cha_terminates_on_diamond_hierarchy() {
    let facts = ProgramFacts::build(AnalysisConfig::default(), NullConverter, vec![Ok(diamond())], &mut NoProgress)
        .unwrap();

    let c_m = facts.element(Category::Method, "com.acme.C.m()").unwrap();
    let expected: BTreeSet<ElementRef> = ["com.acme.I1.m()", "com.acme.I2.m()"]
        .into_iter()
        .map(|id| facts.element(Category::Method, id).unwrap())
        .collect();

    assert_eq!(facts.get_range(&c_m, Relation::Overrides).unwrap(), expected);
    assert_eq!(facts.overridden_methods(&c_m).unwrap(), expected);
    assert_eq!(facts.cha_status(), ChaStatus::Complete);
}

#[test]
fn test_abstract_methods_are_ranges_but_never_domains() {
    let facts = ProgramFacts::build(AnalysisConfig::default(), NullConverter, vec![Ok(diamond())], &mut NoProgress)
        .unwrap();

    let i1_m = facts.element(Category::Method, "com.acme.I1.m()").unwrap();
    let c_m = facts.element(Category::Method, "com.acme.C.m()").unwrap();

    assert!(facts.is_abstract_method(&i1_m));
    assert!(facts.get_range(&i1_m, Relation::Overrides).unwrap().is_empty());
    assert!(facts.get_range(&i1_m, Relation::TOverrides).unwrap().contains(&c_m));
    assert!(facts.overridden_methods(&i1_m).unwrap().is_empty());
}

#[test]
fn test_override_queries_are_gated_until_cha_runs() {
    let registry = ElementRegistry::new();
    let mut db = ProgramDatabase::new();
    let project: ProjectPackages = ["com.acme"].into_iter().collect();
    let run = registry.get(Category::Method, "com.acme.A.run()").unwrap();
    db.add_element(&run, Modifiers::PUBLIC);

    assert!(matches!(
        db.get_range(&run, Relation::Overrides),
        Err(FactError::ChaNotEnabled { .. })
    ));

    let env = HierarchyEnv::new(&project, &NullConverter, &registry);
    ChaWorklist::seed(&db)
        .run(&mut db, &env, &mut NoProgress, &CancellationToken::new())
        .unwrap();

    assert!(db.get_range(&run, Relation::Overrides).unwrap().is_empty());
}

#[test]
fn test_project_filter_is_a_subset() {
    let facts = ProgramFacts::build(
        AnalysisConfig::default(),
        NullConverter,
        vec![Ok(UnitFacts::new("src/com/acme/Shape.java")
            .with_package("com.acme")
            .with_element(Category::Class, "com.acme.Shape", Modifiers::PUBLIC)
            .with_relation(class("com.acme.Shape"), Relation::ExtendsClass, class("com.acme.Base"))
            .with_relation(class("com.acme.Shape"), Relation::ImplementsInterface, class("java.io.Serializable"))
            .with_relation(class("com.acme.Shape"), Relation::ImplementsInterface, class("com.acme.Drawable")))],
        &mut NoProgress,
    )
    .unwrap();

    let shape = facts.element(Category::Class, "com.acme.Shape").unwrap();
    for relation in [Relation::ExtendsClass, Relation::ImplementsInterface] {
        let all = facts.get_range(&shape, relation).unwrap();
        let in_project = facts.get_range_in_project(&shape, relation).unwrap();
        assert!(in_project.is_subset(&all));
        assert!(in_project.iter().all(|e| facts.project().contains_package(e.package_name())));
    }

    let analyzer = Analyzer::new(facts.database(), facts.project());
    let interfaces = analyzer.get_range_in_project(&shape, Relation::ImplementsInterface).unwrap();
    assert_eq!(interfaces.len(), 1);
}

#[test]
fn test_frozen_facts_serve_concurrent_readers() {
    let facts = Arc::new(
        ProgramFacts::build(AnalysisConfig::default(), NullConverter, vec![Ok(diamond())], &mut NoProgress)
            .unwrap(),
    );

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let facts = Arc::clone(&facts);
            std::thread::spawn(move || {
                let c_m = facts.element(Category::Method, "com.acme.C.m()").unwrap();
                facts.get_range(&c_m, Relation::Overrides).unwrap().len()
            })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 2);
    }
}
