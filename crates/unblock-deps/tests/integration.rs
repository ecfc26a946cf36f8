//! Integration tests for unblock-deps
//!
//! These run the whole pipeline against a project on disk: load, analyze
//! with a fake registry, plan, update with a scripted package manager and
//! restore the backup.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use unblock_config::UpdateSettings;
use unblock_deps::testing::ScriptedRunner;
use unblock_deps::{
    preview_update, Analyzer, Category, PhaseKind, PlanOptions, ProjectSnapshot, UpdateOptions,
    Updater,
};
use unblock_fs::{FileSystem, NativeFileSystem};
use unblock_registry::testing::StaticVersionSource;
use unblock_registry::{ResolverConfig, RetryPolicy, VersionCache, VersionResolver};

const MANIFEST: &str = r#"{
  "name": "shop",
  "version": "1.0.0",
  "dependencies": {
    "react": "^17.0.0",
    "lodash": "^4.17.0",
    "express": "^4.18.0"
  },
  "devDependencies": {
    "vitest": "^1.0.0"
  }
}
"#;

const LOCKFILE: &str = r#"{
  "name": "shop",
  "lockfileVersion": 3,
  "requires": true,
  "packages": {
    "": {
      "name": "shop",
      "dependencies": { "react": "^17.0.0", "lodash": "^4.17.0", "express": "^4.18.0" },
      "devDependencies": { "vitest": "^1.0.0" }
    },
    "node_modules/react": { "version": "17.0.2" },
    "node_modules/lodash": { "version": "4.17.20" },
    "node_modules/express": { "version": "4.18.2" },
    "node_modules/vitest": { "version": "1.0.0", "dev": true },
    "node_modules/old-ui-kit": {
      "version": "2.1.0",
      "dependencies": { "react": "^17.0.0" }
    },
    "node_modules/old-ui-kit/node_modules/react": { "version": "17.0.1" }
  }
}
"#;

fn setup() -> (TempDir, Arc<NativeFileSystem>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("package.json"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("package-lock.json"), LOCKFILE).unwrap();
    let fs = Arc::new(NativeFileSystem::new(dir.path()).unwrap());
    (dir, fs)
}

fn registry() -> Arc<StaticVersionSource> {
    Arc::new(
        StaticVersionSource::new()
            .with_version("react", "18.3.1")
            .with_version("lodash", "4.17.21")
            .with_version("express", "5.0.1")
            .with_version("vitest", "1.6.0")
            .with_version("old-ui-kit", "2.4.0"),
    )
}

fn analyzer(source: Arc<StaticVersionSource>) -> Analyzer<Arc<StaticVersionSource>> {
    let config = ResolverConfig {
        retry: RetryPolicy::none(),
        ..ResolverConfig::default()
    };
    Analyzer::new(VersionResolver::with_config(
        source,
        VersionCache::default(),
        config,
    ))
}

#[tokio::test]
async fn test_analyze_plan_update_restore() {
    let (dir, fs) = setup();
    let source = registry();

    // analyze
    let snapshot = ProjectSnapshot::load(fs.as_ref()).await.unwrap();
    assert_eq!(snapshot.manifest.name.as_deref(), Some("shop"));
    let analysis = analyzer(source.clone()).analyze(&snapshot, None).await.unwrap();

    assert_eq!(
        analysis.category_of("react"),
        Some(&Category::Blocked {
            blocker_name: "old-ui-kit".into(),
            blocker_range: "^17.0.0".into(),
            blocker_count: 1,
        })
    );
    assert_eq!(analysis.category_of("lodash"), Some(&Category::Safe));
    assert_eq!(analysis.category_of("express"), Some(&Category::MajorJump));
    assert_eq!(analysis.category_of("vitest"), Some(&Category::Safe));
    assert_eq!(source.calls_for("old-ui-kit"), 1);

    // plan
    let plan = preview_update(&analysis, &PlanOptions::default());
    let kinds: Vec<PhaseKind> = plan.phases.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, [PhaseKind::Safe, PhaseKind::Major, PhaseKind::Blocked]);
    assert_eq!(plan.len(), 4);

    // update
    let runner = Arc::new(ScriptedRunner::new().with_failure("express@", "npm ERR! ERESOLVE"));
    let updater = Updater::new(fs.clone(), runner.clone(), &UpdateSettings::default());
    let result = updater
        .update(&analysis, &[], &UpdateOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.blocked, ["react"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].name, "express");
    let updated: Vec<&str> = result.updated.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(updated, ["lodash", "vitest"]);
    assert_eq!(
        runner.calls_matching("npm install"),
        [
            "npm install lodash@4.17.21",
            "npm install vitest@1.6.0 --save-dev",
            "npm install express@5.0.1",
        ]
    );

    // restore
    let backup = result.backup_path.expect("backup was created");
    assert!(backup.starts_with(fs.project_root().join(".unblock/backups")));
    std::fs::write(dir.path().join("package.json"), "{\"broken\": true}").unwrap();
    std::fs::remove_file(dir.path().join("package-lock.json")).unwrap();

    updater.backups().restore(&backup).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("package.json")).unwrap(),
        MANIFEST
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("package-lock.json")).unwrap(),
        LOCKFILE
    );
}

#[tokio::test]
async fn test_dry_run_leaves_project_untouched() {
    let (dir, fs) = setup();
    let snapshot = ProjectSnapshot::load(fs.as_ref()).await.unwrap();
    let analysis = analyzer(registry()).analyze(&snapshot, None).await.unwrap();

    let runner = Arc::new(ScriptedRunner::new());
    let options = UpdateOptions {
        dry_run: true,
        backup: false,
        ..UpdateOptions::default()
    };
    let result = Updater::new(fs, runner.clone(), &UpdateSettings::default())
        .update(&analysis, &[], &options)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.plan.len(), 4);
    assert!(runner.calls_matching("npm").is_empty());
    assert!(!dir.path().join(".unblock").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("package.json")).unwrap(),
        MANIFEST
    );
}

#[tokio::test]
async fn test_missing_lockfile_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("package.json"), MANIFEST).unwrap();
    let fs = NativeFileSystem::new(dir.path()).unwrap();

    let err = ProjectSnapshot::load(&fs).await.unwrap_err();
    assert_eq!(err.kind(), unblock_deps::ErrorKind::FileAccess);
    assert!(err.to_string().contains("package-lock.json"));
    assert!(!Path::new(&dir.path().join(".unblock")).exists());
}
