mod common;

use common::{FakeEngine, flag_value, has_git, identity, init_repo, mount_source};
use distro_build::catalog::{BuildSystem, Catalog, EnvironmentDescriptor, PackageFamily};
use distro_build::config::ProjectLayout;
use distro_build::error::{BuildError, ManifestError, PackagingError};
use distro_build::pipeline::{PackageBuildPipeline, PackageOutcome};
use std::path::Path;
use tempfile::TempDir;

const SPEC_1_2: &str = "\
Name:    project
Version: 1.2
Release: 1
Source0: %{name}-%{version}.tar.gz
";

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_version_mismatch_starts_no_container() {
    let project = TempDir::new().unwrap();
    write(project.path(), "VERSION", "1.3\n");
    write(project.path(), "packaging/rpm/project.spec", SPEC_1_2);

    let catalog = Catalog::builtin().unwrap();
    let engine = FakeEngine::new().with_image("sha256:centos");
    let layout = ProjectLayout::new(project.path());
    let pipeline = PackageBuildPipeline::new(&engine, &layout).with_identity(identity());

    let err = pipeline
        .package(catalog.get("centos7").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Packaging(PackagingError::VersionMismatch {
            ref spec_version,
            ref project_version,
        }) if spec_version == "1.2" && project_version == "1.3"
    ));
    assert!(engine.calls().is_empty());
    assert!(!layout.output_dir.exists());
}

#[tokio::test]
async fn test_unsupported_environment_is_skipped() {
    let project = TempDir::new().unwrap();
    let bare = EnvironmentDescriptor::builder(
        "bare",
        "debian:stretch",
        PackageFamily::Apt,
        BuildSystem::Make,
    )
    .build();

    let engine = FakeEngine::new();
    let layout = ProjectLayout::new(project.path());
    let reports = PackageBuildPipeline::new(&engine, &layout)
        .package_all(&[&bare])
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].environment, "bare");
    assert!(matches!(reports[0].outcome, PackageOutcome::Skipped(_)));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_missing_ci_manifest_is_reported_before_container_work() {
    let project = TempDir::new().unwrap();
    let catalog = Catalog::builtin().unwrap();
    let engine = FakeEngine::new();
    let layout = ProjectLayout::new(project.path());

    let err = PackageBuildPipeline::new(&engine, &layout)
        .package(catalog.get("travis").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Manifest(ManifestError::Missing { .. })
    ));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_rpm_build_collects_packages_and_removes_workspace() {
    if !has_git() {
        eprintln!("git not available, skipping");
        return;
    }

    let project = TempDir::new().unwrap();
    init_repo(
        project.path(),
        &[
            ("VERSION", "1.2\n"),
            ("packaging/rpm/project.spec", SPEC_1_2),
            ("src/main.c", "int main(void) { return 0; }\n"),
        ],
    );

    let catalog = Catalog::builtin().unwrap();
    let engine = FakeEngine::new()
        .with_image("sha256:centos")
        .on_execute(|args| {
            let workspace = mount_source(args, "/build").unwrap();
            let sources = workspace.join("rpmbuild/SOURCES/project-1.2.tar.gz");
            assert!(sources.is_file(), "source archive missing");
            assert!(workspace.join("rpmbuild/SPECS/project.spec").is_file());
            let entry = std::fs::read_to_string(workspace.join("entrypoint.sh")).unwrap();
            assert!(entry.contains("runuser -u dev -g dev"));

            let rpms = workspace.join("rpmbuild/RPMS/x86_64");
            std::fs::create_dir_all(&rpms).unwrap();
            std::fs::write(rpms.join("project-1.2-1.x86_64.rpm"), "rpm").unwrap();
            std::fs::write(
                workspace.join("rpmbuild/SRPMS/project-1.2-1.src.rpm"),
                "srpm",
            )
            .unwrap();
        });
    let layout = ProjectLayout::new(project.path());
    let artifacts = PackageBuildPipeline::new(&engine, &layout)
        .with_identity(identity())
        .package(catalog.get("centos7").unwrap())
        .await
        .unwrap();

    let out = layout.output_dir.join("centos7");
    assert_eq!(
        artifacts,
        vec![
            out.join("project-1.2-1.x86_64.rpm"),
            out.join("project-1.2-1.src.rpm"),
        ]
    );
    assert!(out.join("project-1.2-1.x86_64.rpm").is_file());

    let executed = engine.executed();
    assert_eq!(executed.len(), 1);
    let run = &executed[0];
    assert_eq!(flag_value(run, "--hostname"), Some("centos7"));
    assert_eq!(flag_value(run, "-w"), Some("/build"));
    assert!(run.contains(&"sha256:centos".to_string()));
    assert_eq!(&run[run.len() - 2..], ["sh", "/build/entrypoint.sh"]);

    let workspace = mount_source(run, "/build").unwrap();
    assert!(!workspace.exists(), "workspace was not removed");
}

#[tokio::test]
async fn test_ci_script_runs_as_invoking_user() {
    if !has_git() {
        eprintln!("git not available, skipping");
        return;
    }

    let project = TempDir::new().unwrap();
    init_repo(
        project.path(),
        &[(
            ".travis.yml",
            "addons:\n  apt:\n    sources: []\n    packages: []\nscript:\n  - ./configure\n  - make check\n",
        )],
    );

    let catalog = Catalog::builtin().unwrap();
    let engine = FakeEngine::new()
        .with_image("sha256:trusty")
        .on_execute(|args| {
            let workspace = mount_source(args, "/build").unwrap();
            let script = std::fs::read_to_string(workspace.join("ci-script.sh")).unwrap();
            assert_eq!(script, "#!/bin/bash\nset -e\n./configure\nmake check\n");
            assert!(workspace.join("src/.travis.yml").is_file());
        });
    let layout = ProjectLayout::new(project.path());
    let reports = PackageBuildPipeline::new(&engine, &layout)
        .with_identity(identity())
        .package_all(&[catalog.get("travis").unwrap()])
        .await
        .unwrap();

    assert_eq!(reports[0].outcome, PackageOutcome::Built(Vec::new()));
    let run = &engine.executed()[0];
    assert_eq!(flag_value(run, "-u"), Some("1000:1000"));
    assert!(run.contains(&"HOME=/build".to_string()));
    assert_eq!(&run[run.len() - 2..], ["bash", "/build/ci-script.sh"]);
}

#[tokio::test]
async fn test_deb_build_drops_privileges_for_build_phase_only() {
    if !has_git() {
        eprintln!("git not available, skipping");
        return;
    }

    let project = TempDir::new().unwrap();
    init_repo(
        project.path(),
        &[
            ("packaging/debian/rules", "#!/usr/bin/make -f\n%:\n\tdh $@\n"),
            ("packaging/debian/control", "Source: project\n"),
            ("src/main.c", "int main(void) { return 0; }\n"),
        ],
    );
    // Uncommitted edits stay out of the checkout
    write(project.path(), "src/main.c", "broken\n");

    let catalog = Catalog::builtin().unwrap();
    let engine = FakeEngine::new()
        .with_image("sha256:stretch")
        .on_execute(|args| {
            let workspace = mount_source(args, "/build").unwrap();
            let checkout = workspace.join("src/project");
            assert!(checkout.join("debian/rules").is_file());
            assert!(checkout.join("debian/control").is_file());
            assert_eq!(
                std::fs::read_to_string(checkout.join("src/main.c")).unwrap(),
                "int main(void) { return 0; }\n"
            );

            let entry = std::fs::read_to_string(workspace.join("entrypoint.sh")).unwrap();
            let phases: Vec<&str> = entry.lines().rev().take(2).collect();
            assert_eq!(
                phases,
                [
                    "debian/rules binary",
                    "runuser -u dev -g dev -- env HOME=/build debian/rules build",
                ]
            );

            std::fs::write(workspace.join("src/project_1.0_amd64.deb"), "deb").unwrap();
            std::fs::write(workspace.join("src/project-dbg_1.0_amd64.deb"), "dbg").unwrap();
        });
    let layout = ProjectLayout::new(project.path());
    let artifacts = PackageBuildPipeline::new(&engine, &layout)
        .with_identity(identity())
        .package(catalog.get("debian9").unwrap())
        .await
        .unwrap();

    let out = layout.output_dir.join("debian9");
    assert_eq!(
        artifacts,
        vec![
            out.join("project-dbg_1.0_amd64.deb"),
            out.join("project_1.0_amd64.deb"),
        ]
    );
    assert!(out.join("project_1.0_amd64.deb").is_file());

    let executed = engine.executed();
    assert_eq!(executed.len(), 1);
    let run = &executed[0];
    assert_eq!(flag_value(run, "--hostname"), Some("debian9"));
    assert_eq!(flag_value(run, "-w"), Some("/build/src/project"));
    assert!(run.contains(&"sha256:stretch".to_string()));
    assert_eq!(&run[run.len() - 2..], ["sh", "/build/entrypoint.sh"]);

    let workspace = mount_source(run, "/build").unwrap();
    assert!(!workspace.exists(), "workspace was not removed");
}
