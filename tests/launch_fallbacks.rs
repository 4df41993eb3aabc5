// tests/launch_fallbacks.rs
mod common;
use crate::common::builders::{ENGINE_TEMPLATE, LauncherConfigBuilder};
use crate::common::fake_engine::{FakeOutcome, ScriptedEngine};
use crate::common::init_tracing;

use std::path::{Path, PathBuf};

use evalrun::config::LauncherConfig;
use evalrun::fs::FileSystem;
use evalrun::fs::mock::MockFileSystem;
use evalrun::launch::{LaunchRequest, launch};
use evalrun::types::RunStatus;

const ROOT: &str = "/srv/evalrun";

fn setup() -> (MockFileSystem, LauncherConfig) {
    init_tracing();
    let cfg = LauncherConfigBuilder::new(Path::new(ROOT)).build();
    let fs = MockFileSystem::new();
    fs.add_file(&cfg.paths.config_template, ENGINE_TEMPLATE);
    fs.add_file(
        cfg.paths.content_template.as_ref().unwrap(),
        "# Investment Committee instructions\n",
    );
    (fs, cfg)
}

fn request(run_id: &str) -> LaunchRequest {
    LaunchRequest {
        run_id: Some(run_id.to_string()),
        ..LaunchRequest::default()
    }
}

fn workspace(run_id: &str) -> PathBuf {
    Path::new(ROOT).join("database").join(run_id).join("workspace_dir")
}

#[tokio::test]
async fn priority_report_is_selected_and_exit_code_passed_through() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(
        fs.clone(),
        FakeOutcome::Exit {
            code: 2,
            stdout: "working\n".to_string(),
            stderr: "minor warning\n".to_string(),
        },
    )
    .producing("a.md", "# a")
    .producing("notes.md", "# notes")
    .producing("IC_report.md", "# IC Report\n\nBuy.");

    let outcome = launch(&fs, &cfg, &mut engine, &request("r1")).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.exit_code, 2);
    assert_eq!(outcome.stdout, "working\n");
    assert_eq!(outcome.stderr, "minor warning\n");
    assert_eq!(outcome.display_path, Some(workspace("r1").join("IC_report.md")));
    assert_eq!(outcome.display_content, "# IC Report\n\nBuy.");
    assert!(!outcome.timed_out);

    let ctx = outcome.context.expect("context must be reported");
    assert_eq!(ctx.run_id, "r1");
    assert_eq!(ctx.workspace_dir, workspace("r1"));
}

#[tokio::test]
async fn configured_priority_overrides_default_list() {
    let (fs, _) = setup();
    let cfg = LauncherConfigBuilder::new(Path::new(ROOT))
        .with_priority(&["final_memo.md"])
        .build();
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::success(""))
        .producing("IC_report.md", "# default favourite")
        .producing("final_memo.md", "# memo");

    let outcome = launch(&fs, &cfg, &mut engine, &request("r1b")).await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.display_path, Some(workspace("r1b").join("final_memo.md")));
    assert_eq!(outcome.display_content, "# memo");
}

#[tokio::test]
async fn engine_sees_materialized_config_with_run_paths() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::success(""))
        .producing("report.md", "# r");
    let invocations = engine.invocations();

    let mut req = request("r2");
    req.user_query = Some("What is the \"cap rate\" for\n12 Main St?".to_string());
    launch(&fs, &cfg, &mut engine, &req).await;

    let calls = invocations.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].config_path,
        Path::new(ROOT).join("database/r2/configs/config_evaluate_property.toml")
    );
    assert_eq!(calls[0].timeout, cfg.timeout());

    let table: toml::Table = toml::from_str(&calls[0].config_text).unwrap();
    let io = &table["io"];
    assert_eq!(io["input_dir"].as_str(), Some("/srv/evalrun/database/r2/input"));
    assert_eq!(io["output_dir"].as_str(), Some("/srv/evalrun/database/r2/workspace_dir"));
    assert_eq!(io["workspace_root"].as_str(), Some("/srv/evalrun/database/r2/workspace_dir"));
    assert_eq!(
        table["runflow"]["user_query"].as_str(),
        Some("What is the \"cap rate\" for\n12 Main St?")
    );
    assert!(table["sandbox"].get("user_query").is_none());

    assert!(fs.is_file(Path::new("/srv/evalrun/database/r2/input/IC_instruction.md")));
}

#[tokio::test]
async fn empty_workspace_yields_no_output_report() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(
        fs.clone(),
        FakeOutcome::Exit {
            code: 0,
            stdout: "nothing to do\n".to_string(),
            stderr: String::new(),
        },
    );

    let outcome = launch(&fs, &cfg, &mut engine, &request("r3")).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, RunStatus::NoOutput);
    let path = workspace("r3").join("no_output_report.md");
    assert_eq!(outcome.display_path.as_deref(), Some(path.as_path()));
    assert!(outcome.display_content.starts_with("# Workflow Finished Without Output"));
    assert!(outcome.display_content.contains("nothing to do"));
    assert_eq!(fs.read_to_string(&path).unwrap(), outcome.display_content);
}

#[tokio::test]
async fn non_markdown_outputs_yield_critical_error_report() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(
        fs.clone(),
        FakeOutcome::Exit {
            code: 7,
            stdout: String::new(),
            stderr: "boom\n".to_string(),
        },
    )
    .producing("data.csv", "a,b")
    .producing("charts/plot.png", "png");

    let outcome = launch(&fs, &cfg, &mut engine, &request("r4")).await;

    assert_eq!(outcome.exit_code, 0, "synthesized reports force exit code 0");
    assert_eq!(outcome.status, RunStatus::NoDisplayableOutput);
    assert!(outcome.status.is_degraded());
    assert_eq!(
        outcome.display_path,
        Some(workspace("r4").join("critical_error_report.md"))
    );
    assert!(outcome.display_content.starts_with("# Workflow Critical Error"));
    assert!(outcome.display_content.contains("boom"));
}

#[tokio::test]
async fn missing_engine_dependency_yields_script_error_report() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::MissingDependency);

    let outcome = launch(&fs, &cfg, &mut engine, &request("r5")).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, RunStatus::ScriptError);
    assert_eq!(outcome.stdout, "");
    assert!(outcome.stderr.contains("Missing dependency"));
    assert_eq!(
        outcome.display_path,
        Some(workspace("r5").join("script_error_report.md"))
    );
    assert!(outcome.display_content.starts_with("# Workflow Script Error Report"));
}

#[tokio::test]
async fn missing_config_template_yields_script_error_report() {
    init_tracing();
    let cfg = LauncherConfigBuilder::new(Path::new(ROOT)).build();
    let fs = MockFileSystem::new();
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::success(""));
    let invocations = engine.invocations();

    let outcome = launch(&fs, &cfg, &mut engine, &request("r6")).await;

    assert!(invocations.lock().unwrap().is_empty(), "engine must not run");
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, RunStatus::ScriptError);
    assert!(fs.is_file(&workspace("r6").join("script_error_report.md")));
}

#[tokio::test]
async fn missing_input_file_yields_script_error_report() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::success(""));

    let mut req = request("r7");
    req.inputs = vec![PathBuf::from("/uploads/nope.pdf")];
    let outcome = launch(&fs, &cfg, &mut engine, &req).await;

    assert_eq!(outcome.status, RunStatus::ScriptError);
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test]
async fn timeout_keeps_partial_output_and_still_selects() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(
        fs.clone(),
        FakeOutcome::Timeout {
            stdout: "step 1 done\n".to_string(),
            stderr: String::new(),
        },
    )
    .producing("summary.md", "# partial summary");

    let outcome = launch(&fs, &cfg, &mut engine, &request("r8")).await;

    assert!(outcome.timed_out);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.stdout, "step 1 done\n");
    assert!(outcome.stderr.contains("Process timed out after 30 seconds"));
    assert_eq!(outcome.display_content, "# partial summary");
}

#[tokio::test]
async fn spawn_failure_is_reported_through_stderr() {
    let (fs, cfg) = setup();
    let mut engine = ScriptedEngine::new(
        fs.clone(),
        FakeOutcome::SpawnFailure("permission denied".to_string()),
    );

    let outcome = launch(&fs, &cfg, &mut engine, &request("r9")).await;

    assert_eq!(outcome.status, RunStatus::NoOutput);
    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.stderr.contains("permission denied"));
    assert!(outcome.display_content.contains("permission denied"));
}

#[tokio::test]
async fn unwritable_fallback_report_surfaces_exit_code_one() {
    let (fs, cfg) = setup();
    // A directory squatting on the report's file name makes the write fail.
    fs.add_dir(workspace("r10").join("critical_error_report.md"));
    let mut engine = ScriptedEngine::new(fs.clone(), FakeOutcome::success(""));

    let outcome = launch(&fs, &cfg, &mut engine, &request("r10")).await;

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.status, RunStatus::Unrecoverable);
    assert_eq!(outcome.display_path, None);
    assert_eq!(
        outcome.display_content,
        "No display file found, and fallback report failed."
    );
}

#[tokio::test]
async fn missing_run_id_gets_fallback_directory() {
    let (fs, cfg) = setup();
    let mut engine =
        ScriptedEngine::new(fs.clone(), FakeOutcome::success("")).producing("output.md", "# out");

    let outcome = launch(&fs, &cfg, &mut engine, &LaunchRequest::default()).await;

    let ctx = outcome.context.unwrap();
    assert!(ctx.fallback_id);
    assert!(!ctx.run_id.is_empty());
    assert_eq!(outcome.display_path, Some(ctx.workspace_dir.join("output.md")));
}

#[test]
fn query_is_taken_from_env_unless_given() {
    let cfg = LauncherConfigBuilder::new(Path::new(ROOT)).build();
    // SAFETY: this is the only test touching this variable.
    unsafe { std::env::set_var(&cfg.engine.query_env, "from env") };

    let from_env = LaunchRequest::default().with_query_from_env(&cfg);
    assert_eq!(from_env.user_query.as_deref(), Some("from env"));

    let explicit = LaunchRequest {
        user_query: Some("explicit".to_string()),
        ..LaunchRequest::default()
    }
    .with_query_from_env(&cfg);
    assert_eq!(explicit.user_query.as_deref(), Some("explicit"));
}
