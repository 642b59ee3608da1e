
use std::fs;
use std::sync::{Arc, Mutex};
use test_utils::{FakeRemote, FakeVcs, TestFetcher};
use yuki::{
    add_dependency, install_dependencies, parse_package_arg, verify_installed, DependencyKind,
    DependencySpec, Error, LockedPackage, Lockfile, Manifest, ProgressCallback,
};

fn manifest(deps: &[(&str, DependencySpec)]) -> Manifest {
    let mut manifest = Manifest::default();
    manifest.package.name = "demo".to_string();
    manifest.package.version = "0.1.0".to_string();
    for (name, spec) in deps {
        manifest.dependencies.insert(name.to_string(), spec.clone());
    }
    manifest
}

fn fixture() -> TestFetcher {
    let remote = FakeRemote::new().with_tags(&["v0.9.0", "v0.9.2", "v1.0.0"]);
    let vcs = FakeVcs::new()
        .with_ref("v0.9.2")
        .with_ref("v1.0.0")
        .with_ref("develop");
    TestFetcher::new(remote, vcs)
}

#[test]
fn test_install_records_every_dependency() {
    let mut t = fixture();
    let manifest = manifest(&[
        ("zap", DependencySpec::new("zigzap/zap").with_version("^0.9.0")),
        ("clap", DependencySpec::new("Hejsil/zig-clap").with_branch("develop")),
    ]);
    let mut lockfile = Lockfile::new();

    let installed = install_dependencies(&manifest, &mut t.fetcher, &mut lockfile, None).unwrap();

    let names: Vec<_> = installed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["clap", "zap"]);

    let zap = lockfile.get_package("zap").unwrap();
    assert_eq!(zap.version, "0.9.2");
    assert_eq!(zap.source, "zigzap/zap");
    assert_eq!(zap.checksum, installed[1].result.checksum);

    assert_eq!(lockfile.get_package("clap").unwrap().version, "develop");
}

#[test]
fn test_install_prunes_removed_dependencies() {
    let mut t = fixture();
    let manifest = manifest(&[("zap", DependencySpec::new("zigzap/zap").with_tag("v1.0.0"))]);

    let mut lockfile = Lockfile::new();
    lockfile.upsert_package(LockedPackage {
        name: "gone".to_string(),
        version: "1.0.0".to_string(),
        source: "acme/gone".to_string(),
        checksum: "0".repeat(64),
    });

    install_dependencies(&manifest, &mut t.fetcher, &mut lockfile, None).unwrap();

    assert!(lockfile.get_package("gone").is_none());
    assert_eq!(
        lockfile.names().into_iter().collect::<Vec<_>>(),
        vec!["zap".to_string()]
    );
}

#[test]
fn test_install_reports_progress_in_order() {
    let mut t = fixture();
    let manifest = manifest(&[
        ("b", DependencySpec::new("acme/b").with_tag("v1.0.0")),
        ("a", DependencySpec::new("acme/a").with_branch("develop")),
    ]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressCallback = Arc::new(move |name: &str, current: usize, total: usize| {
        sink.lock().unwrap().push(format!("{} {}/{}", name, current, total));
    });

    install_dependencies(&manifest, &mut t.fetcher, &mut Lockfile::new(), Some(progress)).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["a 1/2", "b 2/2"]);
}

#[test]
fn test_install_stops_at_first_failure() {
    let mut t = fixture();
    let manifest = manifest(&[
        ("a", DependencySpec::new("acme/a").with_tag("v1.0.0")),
        ("b", DependencySpec::new("acme/b").with_version("^5.0.0")),
        ("c", DependencySpec::new("acme/c").with_branch("develop")),
    ]);
    let mut lockfile = Lockfile::new();

    let err = install_dependencies(&manifest, &mut t.fetcher, &mut lockfile, None).unwrap_err();
    match err {
        Error::Dependency { name, source } => {
            assert_eq!(name, "b");
            assert!(matches!(*source, Error::NoMatchingVersion { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(lockfile.get_package("a").is_some());
    assert!(lockfile.get_package("c").is_none());
}

#[test]
fn test_verify_detects_tampering() {
    let mut t = fixture();
    let manifest = manifest(&[
        ("zap", DependencySpec::new("zigzap/zap").with_tag("v1.0.0")),
        ("clap", DependencySpec::new("Hejsil/zig-clap").with_branch("develop")),
    ]);
    let mut lockfile = Lockfile::new();
    let installed = install_dependencies(&manifest, &mut t.fetcher, &mut lockfile, None).unwrap();

    let report = verify_installed(&manifest, &lockfile, &mut t.fetcher);
    assert_eq!(report.len(), 2);
    assert!(report.iter().all(|v| v.outcome.is_ok()));

    let zap_path = &installed.iter().find(|d| d.name == "zap").unwrap().result.path;
    fs::write(zap_path.join("build.zig"), "// modified\n").unwrap();

    let report = verify_installed(&manifest, &lockfile, &mut t.fetcher);
    let zap = report.iter().find(|v| v.name == "zap").unwrap();
    assert!(matches!(zap.outcome, Err(Error::ChecksumMismatch { .. })));
    let clap = report.iter().find(|v| v.name == "clap").unwrap();
    assert!(clap.outcome.is_ok());
}

#[test]
fn test_verify_skips_packages_missing_from_manifest() {
    let mut t = fixture();
    let manifest = manifest(&[]);
    let mut lockfile = Lockfile::new();
    lockfile.upsert_package(LockedPackage {
        name: "orphan".to_string(),
        version: "1.0.0".to_string(),
        source: "acme/orphan".to_string(),
        checksum: "0".repeat(64),
    });

    assert!(verify_installed(&manifest, &lockfile, &mut t.fetcher).is_empty());
}

#[test]
fn test_parse_package_arg() {
    let (name, spec) = parse_package_arg("zigzap/zap@^0.9.0").unwrap();
    assert_eq!(name, "zap");
    assert_eq!(spec.git, "zigzap/zap");
    assert_eq!(spec.version.as_deref(), Some("^0.9.0"));

    let (name, spec) = parse_package_arg("https://github.com/Hejsil/zig-clap.git").unwrap();
    assert_eq!(name, "zig-clap");
    assert_eq!(spec.version, None);

    let (name, spec) = parse_package_arg("git@github.com:acme/lib.git@1.2.0").unwrap();
    assert_eq!(name, "lib");
    assert_eq!(spec.git, "git@github.com:acme/lib.git");
    assert_eq!(spec.version.as_deref(), Some("1.2.0"));

    let (_, spec) = parse_package_arg("git@github.com:acme/lib").unwrap();
    assert_eq!(spec.version, None);
}

#[test]
fn test_parse_package_arg_rejects_malformed() {
    for text in ["zap", "zigzap/zap@", "a/b@1@2", "@1.0.0"] {
        assert!(parse_package_arg(text).is_err(), "{} should be rejected", text);
    }
}

#[test]
fn test_add_declares_dependency_after_fetch() {
    let mut t = fixture();
    let mut manifest = manifest(&[]);

    let added = add_dependency(
        &mut manifest,
        &mut t.fetcher,
        DependencyKind::Dev,
        "zap",
        DependencySpec::new("zigzap/zap").with_version("^0.9.0"),
    )
    .unwrap();

    assert_eq!(added.result.version, "0.9.2");
    assert!(added.replaced.is_none());
    assert!(manifest.dependencies.is_empty());
    assert_eq!(manifest.dependency_kind("zap"), Some(DependencyKind::Dev));
    assert!(t.is_cached(&manifest.dev_dependencies["zap"]));
}

#[test]
fn test_add_replaces_existing_declaration() {
    let mut t = fixture();
    let mut manifest = manifest(&[("zap", DependencySpec::new("zigzap/zap").with_tag("v0.9.2"))]);

    let added = add_dependency(
        &mut manifest,
        &mut t.fetcher,
        DependencyKind::Runtime,
        "zap",
        DependencySpec::new("zigzap/zap").with_tag("v1.0.0"),
    )
    .unwrap();

    assert_eq!(added.replaced.unwrap().tag.as_deref(), Some("v0.9.2"));
    assert_eq!(manifest.dependencies["zap"].tag.as_deref(), Some("v1.0.0"));
}

#[test]
fn test_add_failure_leaves_manifest_untouched() {
    let mut t = fixture();
    let mut manifest = manifest(&[]);

    let err = add_dependency(
        &mut manifest,
        &mut t.fetcher,
        DependencyKind::Runtime,
        "zap",
        DependencySpec::new("zigzap/zap").with_version("^5.0.0"),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Dependency { ref name, .. } if name == "zap"));
    assert!(manifest.all_dependencies().is_empty());
}
