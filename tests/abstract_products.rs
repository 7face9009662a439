// tests/abstract_products.rs

use std::sync::{Arc, Mutex};

use bakeplan::errors::BakeError;
use bakeplan::plan::{Chef, Ingredient, PlanGraph, PlanGrapher, WhenDone};
use bakeplan::product::Product;
use bakeplan_test_utils::builders::ProductBuilder;
use bakeplan_test_utils::{init_tracing, n};

/// Logs each ingredient with its prerequisites and dependents.
#[derive(Default)]
struct DescribingChef {
    log: Mutex<Vec<String>>,
}

impl Chef for DescribingChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        let mut log = self.log.lock().unwrap();
        log.push(format!("Ingredient : {}", ingredient.product));
        for pre in &ingredient.prerequisites {
            log.push(format!("  Requires : {pre}"));
        }
        for post in &ingredient.postrequisites {
            log.push(format!("  Enables  : {post}"));
        }
        drop(log);
        when_done.call(true);
    }

    fn done(&self, all_succeeded: bool) {
        self.log
            .lock()
            .unwrap()
            .push(if all_succeeded { "SUCCESS" } else { "FAILURE" }.to_string());
    }
}

fn graph(products: Vec<Product>) -> Arc<PlanGraph> {
    let grapher = PlanGrapher::new();
    for p in products {
        grapher.update(p);
    }
    grapher.snapshot()
}

fn describe(graph: &PlanGraph, target: &str) -> Vec<String> {
    let chef = Arc::new(DescribingChef::default());
    graph.make_recipe(&[n(target)]).unwrap().cook(chef.clone());
    let log = chef.log.lock().unwrap().clone();
    log
}

fn obj_template() -> ProductBuilder {
    ProductBuilder::new("prereq")
        .inputs(&["src/**.c", "src/**.h"])
        .outputs(&["obj/*(arch)/**.o"])
        .param("arch", &[], None)
        .tool("gcc")
}

fn lib(name: &str, arch_inputs: &[&str]) -> Product {
    let outputs: Vec<String> = arch_inputs
        .iter()
        .map(|i| format!("lib/{}.lib", i.split('/').nth(1).unwrap()))
        .collect();
    let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
    ProductBuilder::new(name)
        .inputs(arch_inputs)
        .outputs(&outputs)
        .tool("gcc")
        .build()
}

#[test]
fn bound_target_gets_concrete_prerequisites() {
    init_tracing();
    let g = graph(vec![
        ProductBuilder::new("p")
            .inputs(&["src/**.c", "gen/**.c", "headers/*(arch)/arch.h"])
            .outputs(&["lib/*(arch)/**.o"])
            .param("arch", &[], None)
            .tool("gcc")
            .build(),
        ProductBuilder::new("prereq")
            .inputs(&["src/**.spork"])
            .outputs(&["gen/**.c"])
            .tool("sporkc")
            .build(),
    ]);

    assert_eq!(
        describe(&g, r#"p["arch":"x86"]"#),
        vec![
            "Ingredient : prereq",
            r#"  Enables  : p["arch":"x86"]"#,
            r#"Ingredient : p["arch":"x86"]"#,
            "  Requires : prereq",
            "SUCCESS",
        ]
    );
}

#[test]
fn abstract_prerequisite_is_bound_from_consumer_inputs() {
    let g = graph(vec![lib("p", &["obj/x86/**.o"]), obj_template().build()]);

    assert_eq!(
        describe(&g, "p"),
        vec![
            r#"Ingredient : prereq["arch":"x86"]"#,
            "  Enables  : p",
            "Ingredient : p",
            r#"  Requires : prereq["arch":"x86"]"#,
            "SUCCESS",
        ]
    );

    // The derived product builds exactly the directory the consumer reads.
    let recipe = g.make_recipe(&[n("p")]).unwrap();
    let derived = recipe.ingredients()[0].definition.as_ref().unwrap();
    assert_eq!(derived.outputs().to_string(), "[obj/x86/**.o]");
    assert_eq!(derived.actions[0].outputs.to_string(), "[obj/x86/**.o]");
}

#[test]
fn underivable_parameter_is_reported() {
    let g = graph(vec![
        lib("p", &["obj/x86/**.o"]),
        ProductBuilder::new("prereq")
            .inputs(&["src/**.c"])
            .outputs(&["obj/*(arch)/**.o", "foo/*(bar)/**.baz"])
            .param("arch", &[], None)
            .param("bar", &[], None)
            .build(),
    ]);

    let err = g.make_recipe(&[n("p")]).unwrap_err();
    assert!(matches!(err, BakeError::MissingProducts(_)));
    assert_eq!(
        err.to_string(),
        "Can't derive parameter [bar] for concrete version of prereq to satisfy p.  Got {arch=x86}."
    );
}

#[test]
fn default_fills_underivable_parameter() {
    let g = graph(vec![
        lib("p", &["obj/x86/**.o"]),
        ProductBuilder::new("prereq")
            .inputs(&["src/**.c"])
            .outputs(&["obj/*(arch)/**.o", "foo/*(bar)/**.baz"])
            .param("arch", &[], None)
            .param("bar", &[], Some("BAR"))
            .build(),
    ]);

    assert_eq!(
        describe(&g, "p"),
        vec![
            r#"Ingredient : prereq["arch":"x86","bar":"BAR"]"#,
            "  Enables  : p",
            "Ingredient : p",
            r#"  Requires : prereq["arch":"x86","bar":"BAR"]"#,
            "SUCCESS",
        ]
    );
}

#[test]
fn conflicting_bindings_are_rejected() {
    let g = graph(vec![
        lib("p", &["obj/x86/**.o", "obj/arm/**.o"]),
        obj_template().build(),
    ]);

    let err = g.make_recipe(&[n("p")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Can't derive concrete version of prereq to satisfy p since obj/x86/**.o matching \
         obj/x86/**.o and obj/*(arch)/**.o clashes with bindings {arch=arm}"
    );
}

fn wildcard_consumer() -> Product {
    ProductBuilder::new("p")
        .inputs(&["obj/**.o"])
        .outputs(&["bin/p"])
        .tool("ld")
        .build()
}

#[test]
fn wildcard_input_binds_no_parameter() {
    let g = graph(vec![
        wildcard_consumer(),
        ProductBuilder::new("prereq")
            .inputs(&["src/*.c"])
            .outputs(&["obj/*(arch)/lib.o"])
            .param("arch", &[], None)
            .build(),
    ]);

    let err = g.make_recipe(&[n("p")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Can't derive parameter [arch] for concrete version of prereq to satisfy p.  Got {}."
    );
}

#[test]
fn wildcard_input_falls_back_to_default() {
    let g = graph(vec![
        wildcard_consumer(),
        ProductBuilder::new("prereq")
            .inputs(&["src/*.c"])
            .outputs(&["obj/*(arch)/lib.o"])
            .param("arch", &[], Some("x86"))
            .build(),
    ]);

    assert_eq!(
        describe(&g, "p"),
        vec![
            r#"Ingredient : prereq["arch":"x86"]"#,
            "  Enables  : p",
            "Ingredient : p",
            r#"  Requires : prereq["arch":"x86"]"#,
            "SUCCESS",
        ]
    );
}

#[test]
fn declared_specialisation_wins_over_derivation() {
    let g = graph(vec![
        lib("p1", &["obj/arm/**.o"]),
        lib("p2", &["obj/x86/**.o"]),
        obj_template().build(),
        ProductBuilder::new(r#"prereq["arch":"arm"]"#)
            .inputs(&["src/**.c", "src/**.h"])
            .outputs(&["obj/arm/**.o"])
            .tool("armcc")
            .build(),
    ]);

    assert_eq!(
        describe(&g, "p1"),
        vec![
            r#"Ingredient : prereq["arch":"arm"]"#,
            "  Enables  : p1",
            "Ingredient : p1",
            r#"  Requires : prereq["arch":"arm"]"#,
            "SUCCESS",
        ]
    );
    let r1 = g.make_recipe(&[n("p1")]).unwrap();
    let arm = r1.ingredients()[0].definition.as_ref().unwrap();
    assert_eq!(arm.actions[0].tool, "armcc");

    assert_eq!(
        describe(&g, "p2"),
        vec![
            r#"Ingredient : prereq["arch":"x86"]"#,
            "  Enables  : p2",
            "Ingredient : p2",
            r#"  Requires : prereq["arch":"x86"]"#,
            "SUCCESS",
        ]
    );
}

#[test]
fn closed_template_expands_to_every_instance() {
    let g = graph(vec![
        ProductBuilder::new("obj")
            .inputs(&["src/*.c"])
            .outputs(&["obj/*(arch)/*.o"])
            .param("arch", &["x86", "arm"], None)
            .build(),
    ]);

    let recipe = g.make_recipe(&[n("obj")]).unwrap();
    let targets: Vec<&str> = recipe.targets().iter().map(|t| t.as_str()).collect();
    assert_eq!(targets, vec![r#"obj["arch":"arm"]"#, r#"obj["arch":"x86"]"#]);
}

#[test]
fn open_template_target_needs_bindings() {
    let g = graph(vec![obj_template().build()]);
    let err = g.make_recipe(&[n("prereq")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Product prereq is abstract; request it with values for [arch]"
    );
}

#[test]
fn disallowed_value_is_invalid() {
    let g = graph(vec![
        ProductBuilder::new("obj")
            .inputs(&["src/*.c"])
            .outputs(&["obj/*(arch)/*.o"])
            .param("arch", &["x86", "arm"], None)
            .build(),
    ]);
    let err = g.make_recipe(&[n(r#"obj["arch":"mips"]"#)]).unwrap_err();
    assert!(matches!(err, BakeError::InvalidParameters(_)), "{err}");
}
