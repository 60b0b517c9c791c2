// tests/orchestrator_build.rs
mod common;
use crate::common::{Harness, RegistrationBuilder, ScriptDir, init_tracing, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use cmdrunner::artifacts::ArtifactCollector;
use cmdrunner::fs::FileSystem;
use cmdrunner::fs::mock::MockFileSystem;
use cmdrunner::orchestrator::CallOptions;
use cmdrunner::registry::HistoryDetails;

#[tokio::test]
async fn build_without_output_directory_copies_nothing() {
    init_tracing();

    let dir = ScriptDir::new();
    dir.file("out.jar", "jar bytes");
    let harness = Harness::new(vec![
        RegistrationBuilder::build_step("app", "echo built")
            .working_directory(dir.path())
            .artifact("out.jar")
            .build(),
    ]);

    let result = with_timeout(harness.orchestrator.build(&CallOptions::new("app")))
        .await
        .unwrap();

    assert!(result.success());
    assert!(result.output_directory.is_none());
    assert!(result.artifacts.copied.is_empty());
    assert!(result.artifacts.build_directory.is_none());
}

#[tokio::test]
async fn successful_build_copies_artifacts_into_a_build_directory() {
    init_tracing();

    let dir = ScriptDir::new();
    let work = dir.path().join("work");
    let dist = dir.path().join("dist");
    let command = dir.script(
        "build.sh",
        "mkdir -p target\necho binary > target/app\necho Finished release\n",
    );

    let harness = Harness::new(vec![
        RegistrationBuilder::build_step("app", &command)
            .working_directory(&work)
            .success("Finished.*")
            .artifact("target/app")
            .artifact("target/missing.bin")
            .artifact_output_directory(&dist)
            .build(),
    ]);
    std::fs::create_dir_all(&work).unwrap();

    let result = with_timeout(harness.orchestrator.build(&CallOptions::new("app")))
        .await
        .unwrap();

    assert!(result.success(), "unexpected failure: {:?}", result.error());
    let build_dir = dist.join(result.run_id.to_string());
    assert_eq!(result.artifacts.build_directory.as_deref(), Some(build_dir.as_path()));
    assert_eq!(result.artifacts.copied.len(), 1);
    assert_eq!(result.artifacts.missing, vec!["target/missing.bin".to_string()]);

    let copied = &result.artifacts.copied[0];
    assert_eq!(copied.target, build_dir.join("app"));
    assert_eq!(std::fs::read_to_string(&copied.target).unwrap(), "binary\n");
    let expected = blake3::hash(b"binary\n").to_hex().to_string();
    assert_eq!(copied.digest.as_deref(), Some(expected.as_str()));

    match harness.history.find(result.run_id).unwrap().details {
        HistoryDetails::Build {
            build_directory,
            artifacts,
        } => {
            assert_eq!(build_directory, Some(build_dir));
            assert_eq!(artifacts.len(), 1);
        }
        other => panic!("unexpected details {other:?}"),
    }
}

#[tokio::test]
async fn glob_artifacts_copy_every_match() {
    init_tracing();

    let dir = ScriptDir::new();
    dir.file("work/target/a.jar", "a");
    dir.file("work/target/b.jar", "b");
    dir.file("work/target/notes.txt", "skip");
    let dist = dir.path().join("dist");

    let harness = Harness::new(vec![
        RegistrationBuilder::build_step("app", "echo ok")
            .working_directory(dir.path().join("work"))
            .artifact("target/*.jar")
            .artifact_output_directory(&dist)
            .build(),
    ]);

    let result = with_timeout(harness.orchestrator.build(&CallOptions::new("app")))
        .await
        .unwrap();

    assert!(result.success());
    let mut names: Vec<String> = result
        .artifacts
        .copied
        .iter()
        .filter_map(|a| a.target.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.jar".to_string(), "b.jar".to_string()]);
}

#[tokio::test]
async fn failed_build_collects_nothing() {
    init_tracing();

    let dir = ScriptDir::new();
    dir.file("work/out.jar", "stale");
    let command = dir.script("broken.sh", "echo error: cannot find value\nexit 101\n");
    let dist = dir.path().join("dist");

    let harness = Harness::new(vec![
        RegistrationBuilder::build_step("app", &command)
            .working_directory(dir.path().join("work"))
            .failure("error:.*")
            .artifact("out.jar")
            .artifact_output_directory(&dist)
            .build(),
    ]);

    let result = with_timeout(harness.orchestrator.build(&CallOptions::new("app")))
        .await
        .unwrap();

    assert!(!result.success());
    assert_eq!(result.error(), Some("Failure pattern found in input"));
    assert!(result.artifacts.copied.is_empty());
    assert!(!dist.exists());
}

#[tokio::test]
async fn artifacts_go_through_the_configured_filesystem() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/src/target/app.jar", "jar");
    let harness = Harness::new(vec![
        RegistrationBuilder::build_step("app", "echo ok")
            .artifact("/src/target/app.jar")
            .artifact_output_directory("/dist")
            .build(),
    ]);
    let orchestrator = harness
        .orchestrator
        .clone()
        .with_artifact_collector(ArtifactCollector::new(Arc::new(fs.clone())));

    let result = with_timeout(orchestrator.build(&CallOptions::new("app")))
        .await
        .unwrap();

    assert!(result.success(), "unexpected failure: {:?}", result.error());
    let target = PathBuf::from("/dist")
        .join(result.run_id.to_string())
        .join("app.jar");
    assert_eq!(result.artifacts.copied[0].target, target);
    assert_eq!(fs.read_to_string(&target).unwrap(), "jar");
}
