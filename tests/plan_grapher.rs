// tests/plan_grapher.rs

use std::path::Path;

use bakeplan::plan::PlanGrapher;
use bakeplan_test_utils::builders::{ProductBuilder, product};
use bakeplan_test_utils::{init_tracing, n};

#[test]
fn edges_follow_glob_overlap_through_updates() {
    init_tracing();
    let grapher = PlanGrapher::new();
    grapher.update(product("foo", &["*.a"], &["*.b"]));
    grapher.update(product("bar", &["*.b"], &["*.c"]));
    grapher.update(product("baz", &["*.c"], &["*.d"]));
    grapher.update(product("boo", &["*.c"], &["*.e"]));
    grapher.update(product("far", &["*.b", "*.d", "*.e"], &["*.f"]));

    let pg = grapher.snapshot();
    assert_eq!(pg.describe_nodes(), "[bar, baz, boo, far, foo]");
    assert_eq!(
        pg.describe_edges(),
        "{bar=[foo], baz=[bar], boo=[bar], far=[baz, boo, foo]}"
    );

    grapher.update(product("baz", &["*.b"], &["*.e"]));
    grapher.update(product("faz", &["*.a"], &["*.d"]));

    let pg = grapher.snapshot();
    assert_eq!(pg.describe_nodes(), "[bar, baz, boo, far, faz, foo]");
    assert_eq!(
        pg.describe_edges(),
        "{bar=[foo], baz=[foo], boo=[bar], far=[baz, boo, faz, foo]}"
    );
}

#[test]
fn updating_a_consumer_drops_its_edges() {
    let grapher = PlanGrapher::new();
    grapher.update(product("foo", &["*.a"], &["*.b"]));
    grapher.update(product("bar", &["*.b"], &["*.c"]));
    assert_eq!(grapher.snapshot().describe_nodes(), "[bar, foo]");
    assert_eq!(grapher.snapshot().describe_edges(), "{bar=[foo]}");

    grapher.update(product("bar", &["*.a"], &["*.c"]));
    assert_eq!(grapher.snapshot().describe_nodes(), "[bar, foo]");
    assert_eq!(grapher.snapshot().describe_edges(), "{}");
}

#[test]
fn earlier_snapshots_are_unaffected_by_later_writes() {
    let grapher = PlanGrapher::new();
    grapher.update(product("foo", &["*.a"], &["*.b"]));
    grapher.update(product("bar", &["*.b"], &["*.c"]));
    let before = grapher.snapshot();

    assert!(grapher.remove(&n("foo")));
    assert!(!grapher.remove(&n("foo")));

    assert_eq!(before.describe_nodes(), "[bar, foo]");
    assert_eq!(before.describe_edges(), "{bar=[foo]}");

    let after = grapher.snapshot();
    assert_eq!(after.describe_nodes(), "[bar]");
    assert_eq!(after.describe_edges(), "{}");
}

#[test]
fn a_product_never_depends_on_itself() {
    let grapher = PlanGrapher::new();
    grapher.update(product("fmt", &["src/**.rs"], &["src/**.rs"]));
    let pg = grapher.snapshot();
    assert_eq!(pg.describe_nodes(), "[fmt]");
    assert_eq!(pg.describe_edges(), "{}");
}

#[test]
fn several_producers_yield_several_edges() {
    let grapher = PlanGrapher::new();
    grapher.update(product("gen", &["idl/*.idl"], &["src/*.c"]));
    grapher.update(product("copy", &["vendor/*.c"], &["src/*.c"]));
    grapher.update(product("lib", &["src/*.c"], &["out/lib.a"]));
    assert_eq!(grapher.snapshot().describe_edges(), "{lib=[copy, gen]}");
}

#[test]
fn abstract_products_stay_out_of_edges() {
    let grapher = PlanGrapher::new();
    grapher.update(product("obj", &["src/*.c"], &["obj/*(arch)/*.o"]));
    grapher.update(product("lib", &["obj/x86/*.o"], &["lib/x86.a"]));

    let pg = grapher.snapshot();
    assert_eq!(pg.describe_nodes(), "[lib]");
    assert_eq!(pg.describe_edges(), "{}");
    assert_eq!(pg.template("obj").map(|t| t.name.clone()), Some(n("obj")));

    // Declaring it concrete later replaces the template with a node.
    grapher.update(product("obj", &["src/*.c"], &["obj/x86/*.o"]));
    let pg = grapher.snapshot();
    assert!(pg.template("obj").is_none());
    assert_eq!(pg.describe_edges(), "{lib=[obj]}");
}

#[test]
fn replace_source_retires_undeclared_products() {
    let grapher = PlanGrapher::new();
    let one = Path::new("one.toml");
    let two = Path::new("two.toml");

    let update = grapher.replace_source(
        one,
        vec![
            ProductBuilder::new("foo").inputs(&["*.a"]).outputs(&["*.b"]).source("one.toml").build(),
            ProductBuilder::new("bar").inputs(&["*.b"]).outputs(&["*.c"]).source("one.toml").build(),
        ],
    );
    assert_eq!(update.declared, 2);
    assert!(update.retired.is_empty());

    grapher.replace_source(
        two,
        vec![ProductBuilder::new("baz").inputs(&["*.c"]).outputs(&["*.d"]).source("two.toml").build()],
    );
    assert_eq!(grapher.snapshot().describe_edges(), "{bar=[foo], baz=[bar]}");

    // one.toml now only declares foo; bar goes, baz loses its producer.
    let update = grapher.replace_source(
        one,
        vec![ProductBuilder::new("foo").inputs(&["*.a"]).outputs(&["*.b"]).source("one.toml").build()],
    );
    assert_eq!(update.retired, vec![n("bar")]);

    let pg = grapher.snapshot();
    assert_eq!(pg.describe_nodes(), "[baz, foo]");
    assert_eq!(pg.describe_edges(), "{}");
}

#[test]
fn redeclaring_with_same_globs_keeps_edges_and_new_definition() {
    let grapher = PlanGrapher::new();
    grapher.update(product("foo", &["*.a"], &["*.b"]));
    grapher.update(product("bar", &["*.b"], &["*.c"]));

    grapher.update(
        ProductBuilder::new("foo")
            .inputs(&["*.a"])
            .outputs(&["*.b"])
            .tool("cc")
            .help("rebuilt")
            .build(),
    );

    let pg = grapher.snapshot();
    assert_eq!(pg.describe_edges(), "{bar=[foo]}");
    let foo = pg.product(&n("foo")).unwrap();
    assert_eq!(foo.help.as_deref(), Some("rebuilt"));
    assert_eq!(foo.actions[0].tool, "cc");
}
