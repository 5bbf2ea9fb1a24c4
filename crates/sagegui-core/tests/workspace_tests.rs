mod common;

use std::fs;
use tempfile::tempdir;

use common::diann_workspace;
use sagegui_core::compiler::DiannCompiler;
use sagegui_core::config::SchedulerConfig;
use sagegui_core::store::LocalStore;
use sagegui_core::submit::LocalJobSubmitter;
use sagegui_core::{EntityKind, Error, ResourceKind, WorkspaceManager};

#[test]
fn test_create_project_lists_once_and_rejects_duplicate() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());

    ws.create_project("p1").unwrap();
    ws.create_project("p2").unwrap();
    let projects = ws.list_projects().unwrap();
    assert_eq!(projects.iter().filter(|p| *p == "p1").count(), 1);
    assert_eq!(projects, vec!["p1", "p2"]);

    let err = ws.create_project("p1").unwrap_err();
    assert!(
        matches!(err, Error::AlreadyExists { kind: EntityKind::Project, ref name } if name == "p1"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_project_gets_three_collections() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    let project_dir = tmp.path().join("projects").join("p1");
    let mut subdirs: Vec<String> = fs::read_dir(&project_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    subdirs.sort();
    assert_eq!(subdirs, vec!["data", "search", "spec_lib"]);
}

#[test]
fn test_remove_project() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());

    let err = ws.remove_project("ghost").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Project, .. }));

    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.remove_project("p1").unwrap();

    assert!(ws.list_projects().unwrap().is_empty());
    assert!(!tmp.path().join("projects/p1").exists());
    assert!(ws.list_resources("p1", ResourceKind::Input).unwrap_err().is_not_found());
    assert!(ws.list_searches("p1").unwrap_err().is_not_found());
}

#[test]
fn test_resource_round_trip_is_byte_exact() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    ws.add_resource("p1", ResourceKind::Input, "x.txt", &bytes).unwrap();
    assert_eq!(
        ws.fetch_resource("p1", ResourceKind::Input, "x.txt").unwrap(),
        bytes
    );
    assert!(tmp.path().join("projects/p1/data/x.txt").is_file());
}

#[test]
fn test_re_adding_resource_overwrites() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    ws.add_resource("p1", ResourceKind::Library, "lib.speclib", b"v1").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib.speclib", b"version two").unwrap();
    assert_eq!(
        ws.fetch_resource("p1", ResourceKind::Library, "lib.speclib").unwrap(),
        b"version two"
    );
    assert_eq!(
        ws.list_resources("p1", ResourceKind::Library).unwrap(),
        vec!["lib.speclib"]
    );
}

#[test]
fn test_resource_operations_need_project_and_file() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());

    let err = ws.add_resource("ghost", ResourceKind::Input, "a.raw", b"").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Project, .. }));

    ws.create_project("p1").unwrap();
    let err = ws.remove_resource("p1", ResourceKind::Input, "a.raw").unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound { kind: EntityKind::Resource, ref name } if name == "p1/data/a.raw"
    ));

    fs::remove_dir(tmp.path().join("projects/p1/spec_lib")).unwrap();
    let err = ws.list_resources("p1", ResourceKind::Library).unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Collection, .. }));
}

#[test]
fn test_remove_and_list_resources() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    for name in ["run2.raw", "run1.raw", "run3.raw"] {
        ws.add_resource("p1", ResourceKind::Input, name, b"data").unwrap();
    }
    assert_eq!(
        ws.list_resources("p1", ResourceKind::Input).unwrap(),
        vec!["run1.raw", "run2.raw", "run3.raw"]
    );

    ws.remove_resource("p1", ResourceKind::Input, "run2.raw").unwrap();
    assert_eq!(
        ws.list_resources("p1", ResourceKind::Input).unwrap(),
        vec!["run1.raw", "run3.raw"]
    );
}

#[test]
fn test_relative_root_is_rejected_on_open() {
    for root in ["./ws", "relative/ws", ""] {
        let result = WorkspaceManager::open(
            Box::new(LocalStore::new()),
            Box::new(LocalJobSubmitter::new("sh")),
            DiannCompiler::new("/opt/DiaNN.sif", SchedulerConfig::default()),
            root,
        );
        match result {
            Err(Error::Validation(msg)) => assert!(msg.contains("not an absolute path")),
            Err(other) => panic!("unexpected error for '{}': {}", root, other),
            Ok(_) => panic!("relative root '{}' was accepted", root),
        }
    }
    assert!(!std::path::Path::new("relative").exists());
}

#[test]
fn test_path_like_names_never_touch_the_store() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());

    for bad in ["", "..", "a/b"] {
        assert!(matches!(ws.create_project(bad), Err(Error::Validation(_))));
    }
    assert!(ws.list_projects().unwrap().is_empty());

    ws.create_project("p1").unwrap();
    let err = ws.add_resource("p1", ResourceKind::Input, "../escape.raw", b"").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!tmp.path().join("projects/p1/escape.raw").exists());
}
