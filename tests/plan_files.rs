// tests/plan_files.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};

use bakeplan::bakery::Bakery;
use bakeplan::config::{ConfigSection, load_and_validate};
use bakeplan::errors::BakeError;
use bakeplan::exec::ChefSettings;
use bakeplan_test_utils::builders::PlanFileBuilder;
use bakeplan_test_utils::{n, names};

const CHAIN: &str = r#"
[config]
jobs = 2
action_timeout = "10s"

[tool.cc]
cmd = "cc -c $BAKE_INPUTS"

[product.objects]
intermediate = true

[[product.objects.action]]
tool = "cc"
inputs = ["src/*.{c,h}"]
outputs = ["obj/*.o"]
options = { flags = "-O2" }

[[product.lib.action]]
tool = "ar"
inputs = ["obj/*.o"]
outputs = ["lib/libdemo.a"]

[[product.app.action]]
tool = "ld"
inputs = ["lib/*.a", "main.o"]
outputs = ["bin/app"]
"#;

fn write_plan(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn plan_file_loads_into_products() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{CHAIN}").unwrap();

    let plan = load_and_validate(file.path()).unwrap();
    assert_eq!(plan.settings.jobs, Some(2));
    assert_eq!(plan.settings.action_timeout, Some(Duration::from_secs(10)));
    assert_eq!(plan.products.len(), 3);

    let objects = plan.products.iter().find(|p| p.name == n("objects")).unwrap();
    assert!(objects.intermediate);
    assert_eq!(objects.inputs().to_string(), "[src/*.c, src/*.h]");
    assert_eq!(objects.source.file, file.path());
    assert_eq!(objects.actions[0].options["flags"].as_str(), Some("-O2"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[product.app\ninputs = ").unwrap();
    match load_and_validate(file.path()) {
        Err(BakeError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {other:?}"),
    }
}

#[test]
fn missing_plan_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    match load_and_validate(dir.path().join("Bakefile.toml")) {
        Err(BakeError::IoError(_)) => {}
        other => panic!("Expected IoError, got: {other:?}"),
    }
}

#[test]
fn bad_glob_names_the_product() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[product.app]\ninputs = [\"src/***\"]\n").unwrap();
    match load_and_validate(file.path()) {
        Err(BakeError::ConfigError(msg)) => assert!(msg.contains("product 'app'"), "{msg}"),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn bakery_graphs_and_plans_from_files() {
    let dir = TempDir::new().unwrap();
    let path = write_plan(&dir, "Bakefile.toml", CHAIN);

    let mut bakery = Bakery::new(vec![path]);
    bakery.load_plans().unwrap();

    assert_eq!(
        bakery.graph_text(&[], false),
        "nodes: [app, lib, objects]\nedges: {app=[lib], lib=[objects]}\n"
    );
    assert_eq!(bakery.plan(&names(&["app"])).unwrap(), names(&["objects", "lib", "app"]));
    assert_eq!(bakery.settings().jobs, 2);
    assert_eq!(bakery.settings().command_for("cc"), "cc -c $BAKE_INPUTS");
    assert_eq!(bakery.settings().command_for("ar"), "ar");

    let dot = bakery.graph_text(&names(&["lib"]), true);
    assert!(dot.starts_with("digraph {"), "{dot}");
    assert!(dot.contains("objects"));
    assert!(!dot.contains("app"), "{dot}");
}

#[test]
fn reloading_retires_products_removed_from_a_file() {
    let dir = TempDir::new().unwrap();
    let path = write_plan(&dir, "Bakefile.toml", CHAIN);
    let mut bakery = Bakery::new(vec![path.clone()]);
    bakery.load_plans().unwrap();

    std::fs::write(
        &path,
        r#"
[[product.lib.action]]
tool = "ar"
inputs = ["obj/*.o"]
outputs = ["lib/libdemo.a"]
"#,
    )
    .unwrap();
    let updates = bakery.load_plans().unwrap();
    assert_eq!(updates[0].retired, names(&["app", "objects"]));
    assert_eq!(bakery.snapshot().describe_nodes(), "[lib]");

    // Settings fall back to defaults once the file stops declaring them.
    assert_eq!(bakery.settings().action_timeout, None);
    assert_eq!(bakery.settings().jobs, ChefSettings::default().jobs);
}

#[test]
fn later_plan_files_override_settings_and_link_across_files() {
    let dir = TempDir::new().unwrap();
    let first = write_plan(
        &dir,
        "base.toml",
        "[config]\njobs = 8\nshell = \"bash\"\n\n[[product.gen.action]]\ntool = \"protoc\"\ninputs = [\"proto/*.proto\"]\noutputs = [\"gen/*.rs\"]\n",
    );
    let second = write_plan(
        &dir,
        "app.toml",
        "[config]\njobs = 3\n\n[[product.app.action]]\ntool = \"rustc\"\ninputs = [\"gen/*.rs\"]\noutputs = [\"bin/app\"]\n",
    );

    let mut bakery = Bakery::new(vec![first, second]);
    bakery.load_plans().unwrap();
    assert_eq!(bakery.settings().jobs, 3);
    assert_eq!(bakery.settings().shell, "bash");
    assert_eq!(bakery.snapshot().describe_edges(), "{app=[gen]}");
}

#[test]
fn check_reports_cycles_and_templates() {
    let dir = TempDir::new().unwrap();
    let path = write_plan(
        &dir,
        "Bakefile.toml",
        r#"
[[product.a.action]]
tool = "t"
inputs = ["*.x"]
outputs = ["*.y"]

[[product.b.action]]
tool = "t"
inputs = ["*.y"]
outputs = ["*.x"]

[[product.obj.action]]
tool = "cc"
inputs = ["src/*.c"]
outputs = ["obj/*(arch)/*.o"]
"#,
    );
    let mut bakery = Bakery::new(vec![path]);
    bakery.load_plans().unwrap();

    let report = bakery.check();
    assert!(!report.is_acyclic());
    assert_eq!(report.cycles, vec![names(&["a", "b"])]);
    assert_eq!(report.templates, vec![(n("obj"), vec!["arch".to_string()])]);

    let err = bakery.plan(&names(&["a"])).unwrap_err();
    assert!(matches!(err, BakeError::DependencyCycle { .. }));
}

#[test]
fn builder_plan_matches_loaded_plan() {
    let plan = PlanFileBuilder::new("Bakefile.toml")
        .config(ConfigSection {
            jobs: Some(4),
            ..ConfigSection::default()
        })
        .tool("cc", "cc -c")
        .product("obj", "cc", &["src/*.c"], &["obj/*(arch)/*.o"])
        .param("obj", "arch", &["arm", "x86"], Some("x86"))
        .build();

    assert_eq!(plan.settings.jobs, Some(4));
    let obj = &plan.products[0];
    assert!(!obj.is_concrete());
    let x86 = obj.with_parameter_values(&Default::default()).unwrap();
    assert_eq!(x86.name.as_str(), r#"obj["arch":"x86"]"#);
    assert_eq!(x86.outputs().to_string(), "[obj/x86/*.o]");
}
