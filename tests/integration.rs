/// Integration suite: builds small JavaScript/TypeScript fixture trees in temporary
/// directories and checks the pipeline end to end, both through the library entry point
/// and through the compiled `cntxt` binary.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use cntxt::BuildOutput;
use cntxt::config::CntxtConfig;
use cntxt::graph::edge::EdgeKind;
use cntxt::graph::node::NodeKind;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cntxt"))
}

/// Create a fixture tree from `(relative path, content)` pairs.
fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    dir
}

fn build(root: &Path) -> BuildOutput {
    cntxt::build_graph(root, &CntxtConfig::load(root), false).expect("build failed")
}

fn has_edge(out: &BuildOutput, source: &str, target: &str, kind: EdgeKind) -> bool {
    out.graph
        .edges_of_kind(kind)
        .any(|e| e.source.id == source && e.target.id == target)
}

/// `nodes` and `edges` of the rendered document, i.e. everything but the metadata.
fn graph_body(out: &BuildOutput) -> (serde_json::Value, serde_json::Value) {
    let json = cntxt::export::to_json(&out.graph, &out.metadata).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    (value["nodes"].take(), value["edges"].take())
}

/// Run the binary and assert it exits successfully. Returns stdout.
fn run_success(cwd: &Path, args: &[&str]) -> String {
    let out = Command::new(binary())
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("failed to invoke cntxt binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run the binary and assert it exits with a non-zero status. Returns stderr.
fn run_failure(cwd: &Path, args: &[&str]) -> String {
    let out = Command::new(binary())
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("failed to invoke cntxt binary");
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstderr: {}",
        args,
        stderr
    );
    stderr
}

fn mixed_project() -> TempDir {
    fixture(&[
        (
            "src/utils.ts",
            "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
        ),
        (
            "src/main.ts",
            "import { add } from './utils';\nimport _ from 'lodash';\n\nexport const total = add(1, 2);\n",
        ),
        (
            "src/App.tsx",
            "import { useState } from 'react';\nimport { Base } from './base';\n\nexport default function App() {\n  const [n, setN] = useState(0);\n  return <div onClick={() => setN(n + 1)}>{n}</div>;\n}\n\nexport class Panel extends Base {}\n",
        ),
        ("src/base.ts", "export class Base {\n  render() {}\n}\n"),
        ("lib/legacy.js", "const fs = require('fs');\nmodule.exports = fs;\n"),
        ("node_modules/lodash/index.js", "module.exports = {};\n"),
        (
            "package.json",
            "{ \"dependencies\": { \"lodash\": \"^4.17.21\", \"react\": \"^18.0.0\" } }",
        ),
    ])
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_relative_import_links_files() {
    let dir = fixture(&[
        ("utils.ts", "export function add(a, b) {\n  return a + b;\n}\n"),
        ("main.ts", "import { add } from './utils';\nconsole.log(add(1, 2));\n"),
    ]);
    let out = build(dir.path());

    assert!(out.graph.node("file:utils.ts").is_some());
    assert!(out.graph.node("file:main.ts").is_some());
    let add = out.graph.node("function:utils.ts#add").expect("add missing");
    assert_eq!(add.kind, NodeKind::Function);
    assert_eq!(add.file.as_deref(), Some("utils.ts"));
    assert!(has_edge(&out, "file:main.ts", "file:utils.ts", EdgeKind::Imports));
    assert!(has_edge(&out, "file:utils.ts", "function:utils.ts#add", EdgeKind::Contains));
}

#[test]
fn test_bare_specifier_becomes_package() {
    let dir = fixture(&[("main.js", "import _ from 'lodash';\n_.noop();\n")]);
    let out = build(dir.path());

    let pkg = out.graph.node("package:lodash").expect("package node missing");
    assert_eq!(pkg.kind, NodeKind::Package);
    assert_eq!(pkg.name, "lodash");
    assert!(has_edge(&out, "file:main.js", "package:lodash", EdgeKind::DependsOnPackage));
    assert!(
        out.graph
            .edges_of_kind(EdgeKind::Imports)
            .all(|e| e.target.kind != NodeKind::File),
        "a package import must not produce a file-to-file edge"
    );
}

#[test]
fn test_component_records_hook_usage() {
    let dir = fixture(&[(
        "Counter.jsx",
        "function Counter() {\n  const [count, setCount] = useState(0);\n  return <span>{count}</span>;\n}\n",
    )]);
    let out = build(dir.path());

    let component = out
        .graph
        .node("component:Counter.jsx#Counter")
        .expect("Counter should be a component");
    assert_eq!(component.kind, NodeKind::Component);

    let hooks: Vec<_> = out
        .graph
        .outgoing(&component.id)
        .filter(|e| e.kind == EdgeKind::UsesHook)
        .collect();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].target.kind, NodeKind::Hook);
    assert_eq!(hooks[0].target.name, "useState");
}

#[test]
fn test_malformed_class_keeps_following_function() {
    let dir = fixture(&[(
        "broken.ts",
        "class Broken {\n  method( {\n    return 1;\n}\n\nfunction ok(a) {\n  return a;\n}\n",
    )]);
    let out = build(dir.path());

    assert!(out.graph.node("function:broken.ts#ok").is_some());
    assert!(out.metadata.anomalies >= 1);
}

// ---------------------------------------------------------------------------
// Graph properties
// ---------------------------------------------------------------------------

#[test]
fn test_one_file_node_per_source_file() {
    let dir = mixed_project();
    let out = build(dir.path());

    let files: Vec<&str> = out
        .graph
        .nodes_of_kind(NodeKind::File)
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(files.len(), 5, "node_modules is skipped: {files:?}");
    assert_eq!(out.files_scanned, 5);
    assert!(out.graph.node_count() >= out.files_scanned);
}

#[test]
fn test_no_dangling_or_duplicate_edges() {
    let dir = mixed_project();
    let out = build(dir.path());

    let ids: HashSet<&str> = out.graph.nodes().map(|n| n.id.as_str()).collect();
    let mut triples = HashSet::new();
    for edge in out.graph.edges() {
        assert!(ids.contains(edge.source.id.as_str()));
        assert!(ids.contains(edge.target.id.as_str()));
        assert!(
            triples.insert((edge.source.id.clone(), edge.target.id.clone(), edge.kind)),
            "duplicate edge {} -> {} {:?}",
            edge.source.id,
            edge.target.id,
            edge.kind
        );
    }
}

#[test]
fn test_cross_file_extends_and_package_versions() {
    let dir = mixed_project();
    let out = build(dir.path());

    assert!(has_edge(
        &out,
        "class:src/App.tsx#Panel",
        "class:src/base.ts#Base",
        EdgeKind::Extends
    ));
    let json = cntxt::export::to_json(&out.graph, &out.metadata).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let lodash = value["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "package:lodash")
        .expect("lodash package missing");
    assert_eq!(lodash["attributes"]["version"], "^4.17.21");
    assert_eq!(lodash["attributes"]["declared"], true);

    let fs = out.graph.node("package:fs").expect("builtin package missing");
    assert_eq!(fs.kind, NodeKind::Package);
}

#[test]
fn test_unresolved_relative_import_is_marked() {
    let dir = fixture(&[("main.ts", "import { gone } from './missing';\n")]);
    let out = build(dir.path());

    assert_eq!(out.metadata.unresolved_imports, 1);
    assert_eq!(out.graph.nodes_of_kind(NodeKind::Package).count(), 0);
    assert_eq!(out.graph.edges_of_kind(EdgeKind::Imports).count(), 0);
}

#[test]
fn test_rerun_is_deterministic() {
    let dir = mixed_project();
    let first = graph_body(&build(dir.path()));
    let second = graph_body(&build(dir.path()));
    assert_eq!(first, second);
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = mixed_project();
    let config = CntxtConfig::load(dir.path());
    let sequential = cntxt::build_graph(dir.path(), &config, false).unwrap();
    let parallel = cntxt::build_graph(dir.path(), &config, true).unwrap();
    assert_eq!(graph_body(&sequential), graph_body(&parallel));
}

#[test]
fn test_config_exclude_and_aliases() {
    let dir = fixture(&[
        (
            "cntxt.toml",
            "exclude = [\"*.test.ts\"]\n\n[aliases]\n\"#lib/\" = \"lib/\"\n",
        ),
        ("lib/math.ts", "export const double = (x) => x * 2;\n"),
        ("app.ts", "import { double } from '#lib/math';\n"),
        ("app.test.ts", "import { double } from './lib/math';\n"),
    ]);
    let out = build(dir.path());

    assert!(out.graph.node("file:app.test.ts").is_none());
    assert!(has_edge(&out, "file:app.ts", "file:lib/math.ts", EdgeKind::Imports));
}

#[test]
fn test_default_aliases_resolve_to_root_directories() {
    let dir = fixture(&[
        ("components/Button.tsx", "export const Button = () => <button />;\n"),
        ("hooks/useToggle.ts", "export function useToggle() { return useState(false); }\n"),
        (
            "app.tsx",
            "import { Button } from '@components/Button';\nimport { useToggle } from '@hooks/useToggle';\nimport type { Node } from '@types/node';\n",
        ),
    ]);
    let out = build(dir.path());

    assert!(has_edge(&out, "file:app.tsx", "file:components/Button.tsx", EdgeKind::Imports));
    assert!(has_edge(&out, "file:app.tsx", "file:hooks/useToggle.ts", EdgeKind::Imports));
    assert!(has_edge(&out, "file:app.tsx", "package:@types/node", EdgeKind::DependsOnPackage));
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_skipped_with_warning() {
    let dir = fixture(&[
        ("a.ts", "export function a() {}\n"),
        ("b.ts", "import { a } from './a';\n"),
    ]);
    std::os::unix::fs::symlink(dir.path().join("gone.ts"), dir.path().join("broken.ts")).unwrap();

    let out = cntxt::build_graph(dir.path(), &CntxtConfig::default(), false)
        .expect("an unreadable entry must not abort the run");

    assert_eq!(out.metadata.warnings, 1);
    assert_eq!(out.files_scanned, 2);
    assert!(out.graph.node("file:a.ts").is_some());
    assert!(out.graph.node("file:b.ts").is_some());
    assert!(out.graph.node("file:broken.ts").is_none());
    assert!(has_edge(&out, "file:b.ts", "file:a.ts", EdgeKind::Imports));
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let result = cntxt::build_graph(&missing, &CntxtConfig::default(), false);
    assert!(matches!(
        result,
        Err(cntxt::error::CntxtError::RootUnreadable { .. })
    ));
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

#[test]
fn test_binary_writes_default_output_in_working_directory() {
    let project = mixed_project();
    let cwd = tempfile::tempdir().unwrap();

    let stdout = run_success(cwd.path(), &[project.path().to_str().unwrap()]);
    assert!(stdout.contains("Scanned 5 files"), "stdout: {stdout}");

    let written = std::fs::read_to_string(cwd.path().join("code_knowledge_graph.json"))
        .expect("default output file missing");
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert!(value["metadata"]["generated_at"].is_string());
    assert!(value["nodes"].as_array().unwrap().len() >= 5);
    assert!(value["edges"].is_array());
}

#[test]
fn test_binary_json_summary_and_output_flag() {
    let project = mixed_project();
    let out_dir = tempfile::tempdir().unwrap();
    let target = out_dir.path().join("graph.json");

    let stdout = run_success(
        out_dir.path(),
        &[
            project.path().to_str().unwrap(),
            "-o",
            target.to_str().unwrap(),
            "--json",
            "--parallel",
        ],
    );
    let summary: serde_json::Value =
        serde_json::from_str(&stdout).expect("--json summary is not valid JSON");
    assert_eq!(summary["file_count"], 5);
    assert!(target.exists());
}

#[test]
fn test_binary_fails_on_missing_root() {
    let cwd = tempfile::tempdir().unwrap();
    let missing = cwd.path().join("does-not-exist");
    let stderr = run_failure(cwd.path(), &[missing.to_str().unwrap()]);
    assert!(stderr.contains("failed to scan"), "stderr: {stderr}");
    assert!(!cwd.path().join("code_knowledge_graph.json").exists());
}
