//! Built-in distribution descriptors.

use super::descriptor::{BuildSystem, DescriptorBuilder, EnvironmentDescriptor, PackageFamily};
use crate::dockerfile::Instruction;

const RPM_SPEC: &str = "packaging/rpm/project.spec";
const DEBIAN_DIR: &str = "packaging/debian";

const BASE_PACKAGES: &[&str] = &["cmake", "gcc", "git", "make"];

const RPM_PACKAGES: &[&str] = &["gcc-c++", "openssl-devel", "rpm-build", "which"];

const DEB_PACKAGES: &[&str] = &[
    "build-essential",
    "debhelper",
    "devscripts",
    "fakeroot",
    "libssl-dev",
    "pkg-config",
];

const ZYPPER_PACKAGES: &[&str] = &["gcc-c++", "libopenssl-devel", "rpm-build"];

fn yum_like(name: &str, image: &str, tool: &str, build: BuildSystem) -> DescriptorBuilder {
    let builder = EnvironmentDescriptor::builder(
        name,
        image,
        PackageFamily::Yum {
            tool: tool.to_string(),
        },
        build,
    )
    .packages(BASE_PACKAGES.iter().copied())
    .packages(RPM_PACKAGES.iter().copied());
    match build {
        BuildSystem::Ninja => builder.packages(["ninja-build"]),
        BuildSystem::Make => builder,
    }
}

fn apt_like(name: &str, image: &str, build: BuildSystem) -> DescriptorBuilder {
    let builder = EnvironmentDescriptor::builder(name, image, PackageFamily::Apt, build)
        .prepend(Instruction::env("DEBIAN_FRONTEND", "noninteractive"))
        .packages(BASE_PACKAGES.iter().copied())
        .packages(DEB_PACKAGES.iter().copied());
    match build {
        BuildSystem::Ninja => builder.packages(["ninja-build"]),
        BuildSystem::Make => builder,
    }
}

fn zypper_like(name: &str, image: &str, build: BuildSystem) -> DescriptorBuilder {
    EnvironmentDescriptor::builder(name, image, PackageFamily::Zypper, build)
        .packages(BASE_PACKAGES.iter().copied())
        .packages(ZYPPER_PACKAGES.iter().copied())
}

fn ci_manifest(name: &str, image: &str) -> DescriptorBuilder {
    EnvironmentDescriptor::builder(name, image, PackageFamily::CiManifest, BuildSystem::Make)
        .prepend(Instruction::env("DEBIAN_FRONTEND", "noninteractive"))
        .prepend(Instruction::run(
            "apt-get update && apt-get install -y software-properties-common",
        ))
}

fn ninja_symlink() -> Instruction {
    Instruction::run("test -e /usr/bin/ninja || ln -s /usr/bin/ninja-build /usr/bin/ninja")
}

/// Every environment shipped with the tool
pub fn builtin() -> Vec<EnvironmentDescriptor> {
    vec![
        yum_like("centos7", "centos:7", "yum", BuildSystem::Make)
            .packaging(RPM_SPEC)
            .proxy()
            .build(),
        yum_like("fc25", "fedora:25", "dnf", BuildSystem::Ninja)
            .packaging(RPM_SPEC)
            .proxy()
            .append(ninja_symlink())
            .build(),
        yum_like("fc26", "fedora:26", "dnf", BuildSystem::Ninja)
            .aliases(["fedora"])
            .packaging(RPM_SPEC)
            .proxy()
            .append(ninja_symlink())
            .build(),
        apt_like("debian9", "debian:stretch", BuildSystem::Ninja)
            .aliases(["stretch", "debian"])
            .packaging(DEBIAN_DIR)
            .proxy()
            .build(),
        apt_like("ubuntu1604", "ubuntu:16.04", BuildSystem::Make)
            .aliases(["xenial", "ubuntu"])
            .packaging(DEBIAN_DIR)
            .proxy()
            .build(),
        zypper_like("opensuse423", "opensuse:42.3", BuildSystem::Make)
            .aliases(["leap", "suse"])
            .packaging(RPM_SPEC)
            .append(Instruction::run(
                "test -e /usr/bin/cc || ln -s /usr/bin/gcc /usr/bin/cc",
            ))
            .build(),
        ci_manifest("travis", "ubuntu:trusty")
            .aliases(["ci"])
            .build(),
    ]
}
