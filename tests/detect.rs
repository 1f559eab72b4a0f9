//! End-to-end usage detection over on-disk projects.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use pua::analysis::{detect_usage, UsageDetector};
use pua::config::Config;
use pua::report::{render_to_string, AnalyzeOutput, OutputFormat, ProjectEntry, Report};
use pua::workspace::resolve_projects;
use tempfile::TempDir;

const AXIOS_ESLINT: &str = r#"{
    "name": "app",
    "dependencies": {"axios": "^1.0.0"},
    "devDependencies": {"eslint": "^8.0.0"}
}"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn set(names: &[String]) -> HashSet<&str> {
    names.iter().map(String::as_str).collect()
}

#[test]
fn used_import_is_reported_as_used() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", AXIOS_ESLINT);
    write(dir.path(), "src/index.js", "import axios from \"axios\";\naxios.get('/');\n");

    let result = detect_usage(dir.path()).unwrap();
    assert_eq!(result.used, vec!["axios"]);
    assert!(result.unused.is_empty());
    assert_eq!(result.dev_unused, vec!["eslint"]);
}

#[test]
fn unreferenced_dependency_is_unused() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", AXIOS_ESLINT);
    write(dir.path(), "src/index.js", "console.log('hello');\n");

    let result = detect_usage(dir.path()).unwrap();
    assert!(result.used.is_empty());
    assert_eq!(result.unused, vec!["axios"]);
    assert_eq!(result.dev_unused, vec!["eslint"]);
}

#[test]
fn import_and_subpath_require_count_once() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"dependencies": {"lodash": "^4.17.21", "@scope/pkg": "^1.0.0"}}"#,
    );
    write(dir.path(), "a.js", "import _ from \"lodash\";\n");
    write(dir.path(), "b.js", "const fp = require(\"lodash/fp\");\n");
    write(
        dir.path(),
        "c.ts",
        "import { thing } from \"@scope/pkg/sub/path\";\nimport local from \"./local-module\";\n",
    );

    let result = detect_usage(dir.path()).unwrap();
    assert_eq!(result.used, vec!["lodash", "@scope/pkg"]);
    assert!(result.unused.is_empty());
}

#[test]
fn zero_dependencies_never_report_unused() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{"name": "bare"}"#);
    write(
        dir.path(),
        "index.js",
        "import React from 'react';\nconst fs = require('fs');\n",
    );

    let result = detect_usage(dir.path()).unwrap();
    assert!(result.unused.is_empty());
    assert!(result.dev_unused.is_empty());
    assert!(result.used.is_empty());
    assert!(result.declared.is_empty());
}

#[test]
fn unusual_manifest_fields_do_not_block_detection() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{
            "name": "app",
            "version": 1,
            "workspaces": "packages/*",
            "dependencies": {"axios": "^1.0.0", "shared": {"path": "../shared"}}
        }"#,
    );
    write(dir.path(), "src/index.js", "import axios from 'axios';
");

    let result = detect_usage(dir.path()).unwrap();
    assert_eq!(result.used, vec!["axios"]);
    assert_eq!(result.unused, vec!["shared"]);
}

#[test]
fn syntax_error_does_not_hide_other_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", AXIOS_ESLINT);
    write(dir.path(), "broken.js", "import axios from 'axios';\nfunction ( {\n");
    write(dir.path(), "lint.js", "const { ESLint } = require('eslint');\n");

    let result = detect_usage(dir.path()).unwrap();
    assert_eq!(result.used, vec!["eslint"]);
    assert_eq!(result.unused, vec!["axios"]);
    assert!(result.dev_unused.is_empty());
    assert_eq!(result.diagnostics.files_scanned, 2);
    assert_eq!(result.diagnostics.files_parsed, 1);
    assert!(result.diagnostics.failures[0].path.ends_with("broken.js"));
}

#[test]
fn excluded_directories_are_ignored() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", AXIOS_ESLINT);
    write(dir.path(), "node_modules/x/index.js", "require('axios');");
    write(dir.path(), "dist/bundle.js", "require('axios');");
    write(dir.path(), "build/out.js", "require('axios');");
    write(dir.path(), "coverage/report.js", "require('eslint');");

    let result = detect_usage(dir.path()).unwrap();
    assert_eq!(result.unused, vec!["axios"]);
    assert!(result.used.contains(&"eslint".to_string()));

    let config = Config::new().with_ignored_dirs(vec!["coverage".to_string()]);
    let result = config.usage_detector().unwrap().detect(dir.path()).unwrap();
    assert!(result.used.is_empty());
}

#[test]
fn detection_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{
            "dependencies": {"react": "^18.0.0", "axios": "^1.0.0", "left-pad": "^1.0.0"},
            "devDependencies": {"jest": "^29.0.0", "typescript": "^5.0.0"}
        }"#,
    );
    write(dir.path(), "src/App.tsx", "import React from 'react';\nexport const App = () => <div />;\n");
    write(dir.path(), "src/api.ts", "import axios from 'axios';\n");
    write(dir.path(), "test/app.test.js", "const { render } = require('jest');\n");

    let mut detector = UsageDetector::new().unwrap();
    let first = detector.detect(dir.path()).unwrap();
    let second = detector.detect(dir.path()).unwrap();

    assert_eq!(set(&first.used), set(&second.used));
    assert_eq!(set(&first.unused), set(&second.unused));
    assert_eq!(set(&first.dev_unused), set(&second.dev_unused));
    assert_eq!(set(&first.unused), HashSet::from(["left-pad"]));
    assert_eq!(set(&first.dev_unused), HashSet::from(["typescript"]));
}

#[test]
fn monorepo_projects_are_isolated() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "package.json",
        r#"{"name": "root", "private": true, "workspaces": ["packages/*"], "devDependencies": {"prettier": "^3.0.0"}}"#,
    );
    write(
        root,
        "packages/api/package.json",
        r#"{"dependencies": {"express": "^4.0.0", "cors": "^2.0.0"}}"#,
    );
    write(root, "packages/api/server.js", "const express = require('express');\n");
    write(root, "packages/web/package.json", "{ not json");
    write(root, "packages/web/index.js", "import React from 'react';\n");

    let projects = resolve_projects(root).unwrap();
    assert_eq!(
        projects,
        vec![
            root.to_path_buf(),
            root.join("packages/api"),
            root.join("packages/web"),
        ]
    );

    let mut detector = UsageDetector::new().unwrap();
    let mut report = Report::new();
    for project in &projects {
        match detector.detect(project) {
            Ok(usage) => report.push(ProjectEntry::ok(project, AnalyzeOutput::new(usage, false))),
            Err(e) => report.push(ProjectEntry::failed(project, e)),
        }
    }

    assert_eq!(report.len(), 3);
    assert_eq!(report.failures(), 1);

    let api = report.entries[1].outcome.as_ref().unwrap();
    assert_eq!(api.usage.used, vec!["express"]);
    assert_eq!(api.usage.unused, vec!["cors"]);

    // The root scan covers workspace sources too.
    let root_entry = report.entries[0].outcome.as_ref().unwrap();
    assert_eq!(root_entry.usage.dev_unused, vec!["prettier"]);

    let json = render_to_string(OutputFormat::Json, false, &report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["results"].as_array().unwrap().len(), 3);
    assert!(value["results"][2]["error"].is_string());
    assert_eq!(value["results"][1]["unused"], serde_json::json!(["cors"]));
}

#[test]
fn missing_manifest_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "index.js", "import x from 'x';");

    let err = detect_usage(dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("package.json not found in"));
}
