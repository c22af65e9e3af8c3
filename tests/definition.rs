mod common;

use common::{TestProject, create_test_backend, definition_at, open};
use mpl_lsp::Backend;
use mpl_lsp::definition::lookup;
use mpl_lsp::occurrence::Strategy;
use mpl_lsp::project;
use mpl_lsp::settings::SettingsScope;
use std::sync::Arc;
use tower_lsp::lsp_types::*;

const CONFIG: &str = r#"{ "entryPoint": "src/main.mpl", "output": "build/main", "metaInfo": true }"#;

const MAIN: &str = "import util\n\nfn main() {\n    helper(1)\n}\n";

/// A project with `src/main.mpl`, `src/util.mpl` and metadata at
/// `build/main.meta.json` describing `helper`, `main` and `ghost`.
fn project_with_meta() -> TestProject {
    let project = TestProject::new(CONFIG);
    project.write("src/main.mpl", MAIN);
    project.write("src/util.mpl", "fn helper(x: i32) {}\n");
    project.write(
        "build/main.meta.json",
        r#"{
            "globals": {
                "helper": [{ "file": "./src/util.mpl", "line": 1, "column": 4 }],
                "main": [{ "file": "src/main.mpl", "line": 3, "column": 4 }],
                "ghost": [
                    { "file": "src/gone.mpl", "line": 9, "column": 1 },
                    { "file": "src/util.mpl", "line": 2, "column": 2 }
                ],
                "vanished": [{ "file": "nowhere/gone.mpl", "line": 1, "column": 1 }]
            }
        }"#,
    );
    project
}

fn backend_for(project: &TestProject) -> Backend {
    Backend::new_test_with_workspace(vec![project.root().to_path_buf()])
}

#[tokio::test]
async fn test_definition_resolves_symbol_under_cursor() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, MAIN).await;

    // Cursor inside `helper` on line 3 (zero-based).
    let locations = definition_at(&backend, &uri, 3, 6)
        .await
        .expect("helper should resolve");
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri, project.uri("src/util.mpl"));
    assert_eq!(
        locations[0].range.start,
        Position {
            line: 0,
            character: 3
        }
    );
}

#[tokio::test]
async fn test_definition_drops_unresolved_occurrences() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, "ghost\n").await;

    let locations = definition_at(&backend, &uri, 0, 2)
        .await
        .expect("one ghost occurrence resolves");
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri, project.uri("src/util.mpl"));
    assert_eq!(
        locations[0].range.start,
        Position {
            line: 1,
            character: 1
        }
    );
}

#[tokio::test]
async fn test_definition_none_when_no_occurrence_resolves() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, "vanished\n").await;

    assert!(definition_at(&backend, &uri, 0, 0).await.is_none());
}

#[tokio::test]
async fn test_definition_none_for_unknown_symbol() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, "unknown_name\n").await;

    assert!(definition_at(&backend, &uri, 0, 3).await.is_none());
}

#[tokio::test]
async fn test_definition_none_on_whitespace() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, MAIN).await;

    assert!(definition_at(&backend, &uri, 1, 0).await.is_none());
}

#[tokio::test]
async fn test_definition_reads_unopened_file_from_disk() {
    let project = project_with_meta();
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");

    let locations = definition_at(&backend, &uri, 2, 4)
        .await
        .expect("main should resolve");
    assert_eq!(locations[0].uri, uri);
    assert_eq!(locations[0].range.start.line, 2);
}

#[tokio::test]
async fn test_definition_without_metadata() {
    let project = TestProject::new(CONFIG);
    project.write("src/main.mpl", MAIN);
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, MAIN).await;

    assert!(definition_at(&backend, &uri, 3, 6).await.is_none());
}

#[tokio::test]
async fn test_definition_with_malformed_metadata() {
    let project = TestProject::new(CONFIG);
    project.write("src/main.mpl", MAIN);
    project.write("build/main.meta.json", "{ \"globals\": [[[");
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, MAIN).await;

    assert!(definition_at(&backend, &uri, 3, 6).await.is_none());
}

#[tokio::test]
async fn test_definition_outside_any_project() {
    let dir = TestProject::without_config();
    dir.write("lonely.mpl", "helper\n");
    let backend = create_test_backend();
    let uri = dir.uri("lonely.mpl");
    open(&backend, &uri, "helper\n").await;

    assert!(definition_at(&backend, &uri, 0, 1).await.is_none());
}

#[tokio::test]
async fn test_definition_ignores_non_mpl_documents() {
    let project = project_with_meta();
    project.write("notes.txt", "helper\n");
    let backend = backend_for(&project);
    let uri = project.uri("notes.txt");
    open(&backend, &uri, "helper\n").await;

    assert!(definition_at(&backend, &uri, 0, 1).await.is_none());
}

#[tokio::test]
async fn test_definition_with_blank_output_uses_entry_name() {
    let project = TestProject::new(r#"{ "entryPoint": "app.mpl", "output": "" }"#);
    project.write("app.mpl", "start\n");
    project.write(
        "app.meta.json",
        r#"{ "globals": { "start": [{ "file": "app.mpl", "line": 1, "column": 1 }] } }"#,
    );
    let backend = backend_for(&project);
    let uri = project.uri("app.mpl");

    let locations = definition_at(&backend, &uri, 0, 0)
        .await
        .expect("start should resolve");
    assert_eq!(locations[0].uri, uri);
}

#[tokio::test]
async fn test_definition_from_nested_source_directory() {
    let project = project_with_meta();
    project.write("src/deep/er/still.mpl", "helper\n");
    let backend = backend_for(&project);
    let uri = project.uri("src/deep/er/still.mpl");

    let locations = definition_at(&backend, &uri, 0, 0)
        .await
        .expect("project found three levels up");
    assert_eq!(locations[0].uri, project.uri("src/util.mpl"));
}

#[tokio::test]
async fn test_lookup_reports_strategy() {
    let project = project_with_meta();
    let ctx = project::locate(
        &project.path("src/main.mpl"),
        Arc::new(SettingsScope::empty()),
    )
    .await
    .unwrap();

    let found = lookup(&ctx, &[project.root().to_path_buf()], "helper").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].strategy, Strategy::ProjectRoot);
    assert_eq!(found[0].path, project.path("src/util.mpl"));

    assert!(lookup(&ctx, &[], "not_there").await.is_empty());
}

#[tokio::test]
async fn test_definition_survives_broken_entries_of_other_symbols() {
    let project = TestProject::new(CONFIG);
    project.write("src/main.mpl", MAIN);
    project.write("src/util.mpl", "fn helper(x: i32) {}\n");
    project.write(
        "build/main.meta.json",
        r#"{
            "globals": {
                "helper": [{ "file": "src/util.mpl", "line": 1, "column": 4 }],
                "main": [{ "file": null, "line": 3 }],
                "junk": 42
            }
        }"#,
    );
    let backend = backend_for(&project);
    let uri = project.uri("src/main.mpl");
    open(&backend, &uri, MAIN).await;

    let locations = definition_at(&backend, &uri, 3, 6)
        .await
        .expect("helper still resolves");
    assert_eq!(locations[0].uri, project.uri("src/util.mpl"));

    // `main` has no usable file, so nothing comes back for it.
    assert!(definition_at(&backend, &uri, 2, 4).await.is_none());
}
