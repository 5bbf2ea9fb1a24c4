mod common;

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use tempfile::tempdir;

use common::{diann_workspace, open_with, root_str, sage_workspace};
use sagegui_core::compiler::sage::Tolerance;
use sagegui_core::compiler::{DiannCompiler, DiannParameters, SageParameters};
use sagegui_core::config::SchedulerConfig;
use sagegui_core::{EntityKind, Error, ResourceKind};

fn diann_params() -> DiannParameters {
    DiannParameters {
        inputs: vec!["run1.raw".to_string()],
        library: "lib1.speclib".to_string(),
        ..DiannParameters::default()
    }
}

fn seeded_diann(root: &std::path::Path) -> sagegui_core::WorkspaceManager<DiannCompiler> {
    let (ws, _) = diann_workspace(root);
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib1.speclib", b"lib").unwrap();
    ws
}

#[test]
fn test_create_search_writes_script_with_absolute_paths() {
    let tmp = tempdir().unwrap();
    let (ws, calls) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib1.speclib", b"lib").unwrap();

    let created = ws.create_search("p1", "s1", &diann_params()).unwrap();
    let root = root_str(tmp.path());
    let project_dir = format!("{}/projects/p1", root);

    assert_eq!(
        created.script_path,
        format!("{}/search/s1/search_command.sh", project_dir)
    );
    let command = &created.compiled.command;
    assert_eq!(command.count("--f"), 1);
    assert_eq!(command.count("--lib"), 1);
    assert_eq!(
        command.values_of("--f"),
        vec![format!("{}/data/run1.raw", project_dir).as_str()]
    );
    assert_eq!(
        command.values_of("--lib"),
        vec![format!("{}/spec_lib/lib1.speclib", project_dir).as_str()]
    );
    assert_eq!(
        command.values_of("--out"),
        vec![format!("{}/search/s1/report.tsv", project_dir).as_str()]
    );

    let script = fs::read_to_string(&created.script_path).unwrap();
    assert!(script.starts_with("#!/bin/sh\n#SBATCH --nodes=1\n"));
    assert!(script.contains(&format!("cd {}\n", project_dir)));
    assert!(script.contains(&format!("--f {}/data/run1.raw", project_dir)));
    assert_eq!(script, created.compiled.script);

    // Creating a search never submits it.
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(ws.list_searches("p1").unwrap(), vec!["s1"]);
}

#[test]
fn test_recreating_a_search_is_byte_identical() {
    let tmp = tempdir().unwrap();
    let ws = seeded_diann(tmp.path());
    let params = DiannParameters {
        mass_accuracy: 10.0,
        mbr: true,
        ..diann_params()
    };

    let first = ws.create_search("p1", "s1", &params).unwrap();
    let first_bytes = fs::read(&first.script_path).unwrap();
    ws.remove_search("p1", "s1").unwrap();
    let second = ws.create_search("p1", "s1", &params).unwrap();

    assert_eq!(fs::read(&second.script_path).unwrap(), first_bytes);
    assert_eq!(second.compiled.command.values_of("--mass-acc"), vec!["10"]);
    assert_eq!(second.compiled.command.count("--reanalyse"), 1);
}

#[test]
fn test_duplicate_search_leaves_first_script_untouched() {
    let tmp = tempdir().unwrap();
    let ws = seeded_diann(tmp.path());

    let first = ws.create_search("p1", "s1", &diann_params()).unwrap();
    let before = fs::read(&first.script_path).unwrap();

    let changed = DiannParameters {
        precursor_fdr: 5.0,
        ..diann_params()
    };
    let err = ws.create_search("p1", "s1", &changed).unwrap_err();
    assert!(
        matches!(
            err,
            Error::AlreadyExists { kind: EntityKind::Search, ref name } if name == "p1/s1"
        ),
        "unexpected error: {}",
        err
    );
    assert_eq!(fs::read(&first.script_path).unwrap(), before);
}

#[test]
fn test_missing_reference_creates_nothing() {
    let tmp = tempdir().unwrap();
    let ws = seeded_diann(tmp.path());
    let params = DiannParameters {
        inputs: vec!["run1.raw".to_string(), "run2.raw".to_string()],
        ..diann_params()
    };

    let err = ws.create_search("p1", "s1", &params).unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound { kind: EntityKind::Resource, ref name } if name == "p1/data/run2.raw"
    ));
    assert!(!tmp.path().join("projects/p1/search/s1").exists());
}

#[test]
fn test_invalid_parameters_create_nothing() {
    let tmp = tempdir().unwrap();
    let ws = seeded_diann(tmp.path());

    let empty = DiannParameters {
        inputs: Vec::new(),
        ..diann_params()
    };
    assert!(matches!(
        ws.create_search("p1", "s1", &empty),
        Err(Error::Validation(_))
    ));
    let bad_fdr = DiannParameters {
        precursor_fdr: 0.0,
        ..diann_params()
    };
    assert!(matches!(
        ws.create_search("p1", "s1", &bad_fdr),
        Err(Error::Validation(_))
    ));
    assert!(ws.list_searches("p1").unwrap().is_empty());
}

#[test]
fn test_additional_options_line_endings_are_normalized() {
    let tmp = tempdir().unwrap();
    let ws = seeded_diann(tmp.path());
    let params = DiannParameters {
        additional_options: "--smart-profiling\r\n--met-excision\r".to_string(),
        ..diann_params()
    };

    let created = ws.create_search("p1", "s1", &params).unwrap();
    let script = fs::read_to_string(&created.script_path).unwrap();
    assert!(!script.contains('\r'));
    assert!(script.contains("--smart-profiling\n--met-excision"));
}

#[test]
fn test_sage_rejects_bad_modification_key() {
    let tmp = tempdir().unwrap();
    let (ws, _) = sage_workspace(tmp.path());
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "a.mzML", b"mz").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "human.fasta", b">sp").unwrap();

    let mut params = SageParameters {
        inputs: vec!["a.mzML".to_string()],
        fasta: "human.fasta".to_string(),
        ..SageParameters::default()
    };
    params.database.variable_mods =
        BTreeMap::from([("X".to_string(), vec![15.9949])]);

    let err = ws.create_search("p1", "s1", &params).unwrap_err();
    assert!(matches!(err, Error::Validation(ref msg) if msg.contains("'X'")));
    assert!(!tmp.path().join("projects/p1/search/s1").exists());
}

#[test]
fn test_sage_rejects_nan_tolerance_before_writing_config() {
    let tmp = tempdir().unwrap();
    let (ws, _) = sage_workspace(tmp.path());
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "a.mzML", b"mz").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "human.fasta", b">sp").unwrap();

    let params = SageParameters {
        inputs: vec!["a.mzML".to_string()],
        fasta: "human.fasta".to_string(),
        precursor_tol: Tolerance::Ppm(f64::NAN, 10.0),
        ..SageParameters::default()
    };
    let err = ws.create_search("p1", "s1", &params).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "unexpected error: {}", err);
    assert!(!tmp.path().join("projects/p1/search/s1").exists());
}

#[test]
fn test_sage_writes_config_next_to_script() {
    let tmp = tempdir().unwrap();
    let (ws, _) = sage_workspace(tmp.path());
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "a.mzML", b"mz").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "human.fasta", b">sp").unwrap();

    let params = SageParameters {
        inputs: vec!["a.mzML".to_string()],
        fasta: "human.fasta".to_string(),
        ..SageParameters::default()
    };
    let created = ws.create_search("p1", "s1", &params).unwrap();

    let project_dir = format!("{}/projects/p1", root_str(tmp.path()));
    let config_path = tmp.path().join("projects/p1/search/s1/config.json");
    let config: serde_json::Value =
        serde_json::from_slice(&fs::read(config_path).unwrap()).unwrap();
    assert_eq!(
        config["database"]["fasta"],
        format!("{}/fasta/human.fasta", project_dir)
    );
    assert_eq!(
        config["mzml_paths"][0],
        format!("{}/data/a.mzML", project_dir)
    );
    assert_eq!(
        config["output_directory"],
        format!("{}/search/s1", project_dir)
    );

    let script = fs::read_to_string(&created.script_path).unwrap();
    assert!(script.ends_with(&format!("sage {}/search/s1/config.json\n", project_dir)));
}

#[test]
fn test_submit_search_hands_script_to_scheduler() {
    let tmp = tempdir().unwrap();
    let (ws, calls) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib1.speclib", b"lib").unwrap();
    let created = ws.create_search("p1", "s1", &diann_params()).unwrap();

    let receipt = ws.submit_search("p1", "s1").unwrap();
    assert_eq!(receipt.job_id(), Some("1001"));
    assert_eq!(*calls.lock().unwrap(), vec![created.script_path]);

    let err = ws.submit_search("p1", "nope").unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: EntityKind::Search, .. }));
}

#[test]
fn test_submit_search_surfaces_scheduler_failure() {
    let tmp = tempdir().unwrap();
    let (ws, _) = open_with(
        tmp.path(),
        DiannCompiler::new("/opt/DiaNN.sif", SchedulerConfig::default()),
        Some(1),
        "sbatch: error: invalid partition specified: highmem\n",
    );
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib1.speclib", b"lib").unwrap();
    ws.create_search("p1", "s1", &diann_params()).unwrap();

    match ws.submit_search("p1", "s1") {
        Err(Error::Submission { status, stderr, .. }) => {
            assert_eq!(status, 1);
            assert!(stderr.contains("invalid partition"));
        }
        other => panic!("expected submission error, got {:?}", other),
    }
}

#[test]
fn test_scheduler_warnings_do_not_fail_submission() {
    let tmp = tempdir().unwrap();
    let (ws, _) = open_with(
        tmp.path(),
        DiannCompiler::new("/opt/DiaNN.sif", SchedulerConfig::default()),
        Some(0),
        "sbatch: warning: memory limit rounded\n",
    );
    ws.create_project("p1").unwrap();
    ws.add_resource("p1", ResourceKind::Input, "run1.raw", b"raw").unwrap();
    ws.add_resource("p1", ResourceKind::Library, "lib1.speclib", b"lib").unwrap();
    ws.create_search("p1", "s1", &diann_params()).unwrap();

    let receipt = ws.submit_search("p1", "s1").unwrap();
    assert!(receipt.succeeded());
    assert!(receipt.stderr.contains("warning"));
}

#[test]
fn test_results_archive_holds_flat_files() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    let search_dir = tmp.path().join("projects/p1/search/s1");
    fs::create_dir_all(search_dir.join("nested")).unwrap();
    fs::write(search_dir.join("a.tsv"), b"x\ty\n1\t2\n").unwrap();
    fs::write(search_dir.join("b.tsv"), b"z\n3\n").unwrap();
    fs::write(search_dir.join("nested/c.tsv"), b"ignored").unwrap();

    let archive = ws.fetch_results_archive("p1", "s1").unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    assert_eq!(zip.len(), 2);

    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["a.tsv", "b.tsv"]);

    let mut contents = String::new();
    zip.by_name("a.tsv")
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "x\ty\n1\t2\n");
}

#[test]
fn test_fetch_result_file_parses_report() {
    let tmp = tempdir().unwrap();
    let (ws, _) = diann_workspace(tmp.path());
    ws.create_project("p1").unwrap();

    let search_dir = tmp.path().join("projects/p1/search/s1");
    fs::create_dir_all(&search_dir).unwrap();
    fs::write(
        search_dir.join("report.tsv"),
        "Run\tProtein.Group\tQ.Value\nrun1\tP12345\t0.001\nrun1\tQ99999\t0.004\n",
    )
    .unwrap();

    assert_eq!(ws.list_result_files("p1", "s1").unwrap(), vec!["report.tsv"]);
    let table = ws.fetch_result_file("p1", "s1", "report.tsv").unwrap();
    assert_eq!(table.columns, vec!["Run", "Protein.Group", "Q.Value"]);
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.column("Protein.Group").unwrap(),
        vec![Some("P12345"), Some("Q99999")]
    );

    let err = ws.fetch_result_file("p1", "s1", "missing.tsv").unwrap_err();
    assert!(err.is_not_found());
}
