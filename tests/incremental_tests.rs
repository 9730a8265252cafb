mod common;

use common::{Call, FakeEngine, flag_value, identity};
use distro_build::catalog::Catalog;
use distro_build::config::ProjectLayout;
use distro_build::incremental::IncrementalBuildDriver;
use std::path::PathBuf;
use tempfile::TempDir;

/// Engine whose configure step leaves the build system's marker behind
fn configuring_engine() -> FakeEngine {
    FakeEngine::new().on_execute(|args| {
        let Some(position) = args.iter().position(|arg| arg == "cmake") else {
            return;
        };
        let build_dir = PathBuf::from(flag_value(args, "-w").unwrap());
        let marker = match args[position + 2].as_str() {
            "Ninja" => "build.ninja",
            _ => "Makefile",
        };
        std::fs::write(build_dir.join(marker), "").unwrap();
    })
}

fn configure_count(engine: &FakeEngine) -> usize {
    engine
        .executed()
        .iter()
        .filter(|args| args.iter().any(|arg| arg == "cmake"))
        .count()
}

#[tokio::test]
async fn test_configure_runs_once_until_build_dir_is_removed() {
    let project = TempDir::new().unwrap();
    let catalog = Catalog::builtin().unwrap();
    let centos7 = catalog.get("centos7").unwrap();
    let engine = configuring_engine();
    let layout = ProjectLayout::new(project.path());
    let driver = IncrementalBuildDriver::new(&engine, &layout).with_identity(identity());
    let args = vec!["-DCMAKE_BUILD_TYPE=Debug".to_string(), "-j4".to_string()];

    assert_eq!(driver.run(&[centos7], &args).await.unwrap(), 0);
    assert_eq!(driver.run(&[centos7], &args).await.unwrap(), 0);
    assert_eq!(configure_count(&engine), 1);

    let build_dir = project.path().join("build-centos7");
    assert!(build_dir.join("Makefile").is_file());
    std::fs::remove_dir_all(&build_dir).unwrap();

    assert_eq!(driver.run(&[centos7], &args).await.unwrap(), 0);
    assert_eq!(configure_count(&engine), 2);
    assert!(build_dir.is_dir());
}

#[tokio::test]
async fn test_single_environment_replaces_process_for_build() {
    let project = TempDir::new().unwrap();
    let catalog = Catalog::builtin().unwrap();
    let fc25 = catalog.get("fc25").unwrap();
    let engine = configuring_engine();
    let layout = ProjectLayout::new(project.path());
    let driver = IncrementalBuildDriver::new(&engine, &layout).with_identity(identity());

    driver
        .run(&[fc25], &["CC=clang".to_string(), "all".to_string()])
        .await
        .unwrap();

    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    let Call::Execute(configure) = &calls[0] else {
        panic!("configure should be supervised: {:?}", calls[0]);
    };
    assert!(configure.contains(&"CC=clang".to_string()));
    assert!(configure.ends_with(&[
        "cmake".to_string(),
        "-G".to_string(),
        "Ninja".to_string(),
        project.path().display().to_string(),
    ]));

    let Call::Replace(build) = &calls[1] else {
        panic!("build should replace the process: {:?}", calls[1]);
    };
    assert!(!build.contains(&"CC=clang".to_string()));
    assert!(build.ends_with(&["ninja".to_string(), "all".to_string()]));
    assert_eq!(flag_value(build, "-u"), Some("1000:1000"));
    assert!(build.contains(&"--read-only".to_string()));
}

#[tokio::test]
async fn test_multiple_environments_are_supervised_in_order() {
    let project = TempDir::new().unwrap();
    let catalog = Catalog::builtin().unwrap();
    let descriptors = catalog.resolve_all(["fc25", "centos7"]).unwrap();
    let engine = configuring_engine();
    let layout = ProjectLayout::new(project.path());
    let driver = IncrementalBuildDriver::new(&engine, &layout).with_identity(identity());

    assert_eq!(driver.run(&descriptors, &[]).await.unwrap(), 0);

    let calls = engine.calls();
    assert!(calls.iter().all(|call| matches!(call, Call::Execute(_))));
    let hosts: Vec<&str> = calls
        .iter()
        .filter_map(|call| flag_value(call.args(), "--hostname"))
        .collect();
    assert_eq!(hosts, vec!["centos7", "centos7", "fc25", "fc25"]);
}

#[tokio::test]
async fn test_run_shell_skips_configure() {
    let project = TempDir::new().unwrap();
    let catalog = Catalog::builtin().unwrap();
    let centos7 = catalog.get("centos7").unwrap();
    let engine = configuring_engine();
    let layout = ProjectLayout::new(project.path());
    let driver = IncrementalBuildDriver::new(&engine, &layout)
        .with_identity(identity())
        .with_run_shell(true);

    driver.run(&[centos7], &[]).await.unwrap();

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let Call::Replace(shell) = &calls[0] else {
        panic!("shell should replace the process");
    };
    assert!(shell.contains(&"-t".to_string()));
    assert_eq!(shell.last().map(String::as_str), Some("bash"));
    assert!(project.path().join("build-centos7").is_dir());
}
