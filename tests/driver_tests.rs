//! Build sequencing tests.
//!
//! Drives `run_triples` with a fake builder so staging, cleanup and
//! failure isolation can be checked without root or a package manager.

mod helpers;

use helpers::{Failure, FakeBuilder, TestEnv, BUNDLES_INI};

use client_tarball::commands::build::{plan, run_triples, select_bundles, SelectError, Triple};
use client_tarball::target::{BaseArch, Dver, ParamSet};

fn el6_x86_64() -> ParamSet {
    ParamSet::new(Dver::El6, BaseArch::X86_64)
}

fn el6_i386() -> ParamSet {
    ParamSet::new(Dver::El6, BaseArch::I386)
}

fn all_triples(env: &TestEnv) -> Vec<Triple> {
    let cfg = env.bundles(BUNDLES_INI);
    let names = select_bundles(&cfg, &[], Some("3.4")).unwrap();
    let bundles: Vec<_> = names.iter().map(|n| cfg.bundle(n).unwrap()).collect();
    plan(&bundles, true, None).unwrap()
}

#[test]
fn test_all_builds_declared_targets_in_order() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    let stage2: Vec<_> = builder
        .calls
        .iter()
        .filter(|c| c.starts_with("stage2"))
        .cloned()
        .collect();
    assert_eq!(
        stage2,
        [
            "stage2 wn el6,x86_64",
            "stage2 wn el6,i386",
            "stage2 afs el5,x86_64"
        ]
    );
    assert_eq!(report.written.len(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_stage_root_is_named_after_dirname() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output);

    run_triples(&mut builder, &triples, true, &env.staging);

    let root = &builder.roots[0];
    assert!(root.ends_with("osg-wn-client"));
    let parent = root.parent().unwrap();
    assert_eq!(parent.parent().unwrap(), env.staging);
    let parent_name = parent.file_name().unwrap().to_string_lossy();
    assert!(parent_name.starts_with("stagedir-el6-x86_64-"), "{}", parent_name);
}

#[test]
fn test_stage1_failure_is_isolated() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output).fail("wn", el6_x86_64(), Failure::Stage1);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    assert!(!builder.calls.contains(&"stage2 wn el6,x86_64".to_string()));
    assert!(builder.calls.contains(&"stage2 wn el6,i386".to_string()));
    assert!(builder.calls.contains(&"stage2 afs el5,x86_64".to_string()));

    assert_eq!(report.failed.len(), 1);
    let failed = &report.failed[0];
    assert_eq!(failed.bundle, "wn");
    assert_eq!((failed.dver, failed.basearch), (Dver::El6, BaseArch::X86_64));

    // The failed tree stays for inspection, stage 1 output included.
    let kept = failed.stage_dir.as_ref().unwrap();
    assert!(kept.join("osg-wn-client/stage1-marker").exists());
    assert_eq!(env.staging_entries(), [kept.clone()]);

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_stage2_failure_keeps_staging_tree() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let afs = ParamSet::new(Dver::El5, BaseArch::X86_64);
    let mut builder = FakeBuilder::new(&env.output).fail("afs", afs, Failure::Stage2);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].bundle, "afs");
    assert_eq!(report.failed[0].reason, "stage 2 failed");
    assert_eq!(env.staging_entries().len(), 1);
}

#[test]
fn test_setup_error_is_recorded_and_run_continues() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output).fail("wn", el6_i386(), Failure::Open);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    assert!(!builder.calls.contains(&"stage1 wn el6,i386".to_string()));
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.contains("repo file not found"));
    assert_eq!(report.written.len(), 2);
}

#[test]
fn test_keep_retains_every_staging_tree() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output).fail("wn", el6_i386(), Failure::Stage1);

    run_triples(&mut builder, &triples, true, &env.staging);

    assert_eq!(env.staging_entries().len(), 3);
    for root in &builder.roots {
        assert!(root.exists(), "{} removed", root.display());
    }
}

#[test]
fn test_without_keep_only_successful_trees_are_removed() {
    let env = TestEnv::new();
    let triples = all_triples(&env);
    let mut builder = FakeBuilder::new(&env.output).fail("wn", el6_i386(), Failure::Stage1);

    run_triples(&mut builder, &triples, false, &env.staging);

    let remaining: Vec<_> = builder.roots.iter().filter(|r| r.exists()).collect();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0], &builder.roots[1]);
}

#[test]
fn test_written_tarballs_are_inspected() {
    let env = TestEnv::new();
    let cfg = env.bundles(BUNDLES_INI);
    let triples = plan(&[cfg.bundle("afs").unwrap()], true, None).unwrap();
    let mut builder = FakeBuilder::new(&env.output);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    let written = &report.written[0];
    assert_eq!(written.tarball.path, env.output.join("afs-el5-x86_64.tar.gz"));
    assert_eq!(written.tarball.size, "not really gzip".len() as u64);
    assert_eq!(written.tarball.sha256.len(), 64);
}

#[test]
fn test_single_target_for_every_bundle() {
    let env = TestEnv::new();
    let cfg = env.bundles(BUNDLES_INI);
    let names = select_bundles(&cfg, &["afs".to_string(), "wn".to_string()], None).unwrap();
    let bundles: Vec<_> = names.iter().map(|n| cfg.bundle(n).unwrap()).collect();
    let triples = plan(&bundles, false, Some(el6_i386())).unwrap();
    let mut builder = FakeBuilder::new(&env.output);

    let report = run_triples(&mut builder, &triples, false, &env.staging);

    assert_eq!(
        builder.calls,
        [
            "open afs el6,i386",
            "stage1 afs el6,i386",
            "stage2 afs el6,i386",
            "open wn el6,i386",
            "stage1 wn el6,i386",
            "stage2 wn el6,i386",
        ]
    );
    assert_eq!(report.exit_code(), 0);
    assert!(env.staging_entries().is_empty());
}

#[test]
fn test_release_without_default_bundles() {
    let env = TestEnv::new();
    let cfg = env.bundles(BUNDLES_INI);

    let err = select_bundles(&cfg, &[], Some("3.5")).unwrap_err();
    assert_eq!(err, SelectError::NoDefault("3.5".to_string()));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_all_requires_declared_paramsets() {
    let env = TestEnv::new();
    let cfg = env.bundles(
        "[plain]\ndirname = plain\npackages = p\nrepofile = r\nstage1file = s\ntarballname = t\n",
    );
    let bundle = cfg.bundle("plain").unwrap();

    assert!(plan(&[bundle.clone()], true, None).is_err());
    assert_eq!(plan(&[bundle], false, Some(el6_x86_64())).unwrap().len(), 1);
}
