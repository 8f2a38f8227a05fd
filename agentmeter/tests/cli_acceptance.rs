use rusqlite::{params, Connection};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("opencode/opencode.db")
    }

    fn db_arg(&self) -> String {
        self.db_path().to_string_lossy().into_owned()
    }
}

/// Seed an OpenCode database with a root session, one subagent session and
/// a few messages created in the last hour.
fn seed_opencode_db(env: &CliTestEnv) {
    let path = env.db_path();
    fs::create_dir_all(path.parent().expect("missing db parent"))
        .expect("failed to create db directory");

    let conn = Connection::open(&path).expect("failed to create db");
    conn.execute_batch(
        r#"
        CREATE TABLE session (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            parent_id TEXT,
            slug TEXT NOT NULL,
            directory TEXT NOT NULL,
            title TEXT NOT NULL,
            version TEXT NOT NULL,
            summary_additions INTEGER,
            summary_deletions INTEGER,
            summary_files INTEGER,
            time_created INTEGER NOT NULL,
            time_updated INTEGER NOT NULL
        );
        CREATE TABLE message (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            time_created INTEGER NOT NULL,
            data TEXT NOT NULL
        );
        "#,
    )
    .expect("failed to create schema");

    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO session VALUES ('ses_alpha01', 'prj', NULL, 'alpha', '/work/app', 'Refactor parser', '1.2.0', 10, 2, 3, ?1, ?2)",
        params![now - 3_600_000, now - 120_000],
    )
    .expect("failed to insert root session");
    conn.execute(
        "INSERT INTO session VALUES ('ses_beta02', 'prj', 'ses_alpha01', 'beta', '/work/app', 'Search callers', '1.2.0', NULL, NULL, NULL, ?1, ?2)",
        params![now - 1_800_000, now - 60_000],
    )
    .expect("failed to insert child session");

    let messages = [
        ("msg_1", "ses_alpha01", r#"{"role":"user"}"#.to_string()),
        ("msg_2", "ses_alpha01", assistant("build", "anthropic", "1.0", now - 600_000)),
        ("msg_3", "ses_alpha01", assistant("build", "anthropic", "0.5", now - 300_000)),
        ("msg_4", "ses_beta02", assistant("explore", "copilot", "0", now - 90_000)),
    ];
    for (id, session_id, data) in messages {
        conn.execute(
            "INSERT INTO message VALUES (?1, ?2, ?3, ?4)",
            params![id, session_id, now - 600_000, data],
        )
        .expect("failed to insert message");
    }
}

fn assistant(agent: &str, provider: &str, cost: &str, created: i64) -> String {
    format!(
        r#"{{"role":"assistant","agent":"{agent}","providerID":"{provider}","modelID":"some-model","cost":{cost},
            "time":{{"created":{created},"completed":{completed}}},
            "tokens":{{"input":1000,"output":200,"reasoning":0,"cache":{{"read":0,"write":0}}}}}}"#,
        completed = created + 1_500
    )
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("agentmeter"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("CODEX_HOME", env.home.join(".codex"))
        .env_remove("OPENCODE_DB_PATH")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute agentmeter: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "agentmeter {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn dashboard_json_reports_totals_and_session_tree() {
    let env = CliTestEnv::new();
    seed_opencode_db(&env);

    let db = env.db_arg();
    let args = ["--no-usage", "--db", db.as_str(), "dashboard", "--json"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let data: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("dashboard output should be JSON");

    assert_eq!(data["totals"]["messages"], 3);
    assert_eq!(data["totals"]["billingCost"], 1.5);
    assert_eq!(data["totals"]["subscriptionCost"], 0.0);
    assert_eq!(data["totals"]["sessions"], 2);
    assert!(data.get("codexUsage").is_none());

    let sessions = data["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], "ses_alpha01");
    assert_eq!(sessions[0]["messageCount"], 3);
    assert_eq!(sessions[0]["children"][0]["id"], "ses_beta02");

    let agents: Vec<&str> = data["agents"]
        .as_array()
        .expect("agents array")
        .iter()
        .filter_map(|a| a["agent"].as_str())
        .collect();
    assert_eq!(agents, vec!["build", "explore"]);
}

#[test]
fn dashboard_text_lists_agents_and_sessions() {
    let env = CliTestEnv::new();
    seed_opencode_db(&env);

    let db = env.db_arg();
    let args = ["--no-usage", "--db", db.as_str()];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Agents"), "got:\n{stdout}");
    assert!(stdout.contains("Explorer"), "got:\n{stdout}");
    assert!(stdout.contains("Refactor parser"), "got:\n{stdout}");
    assert!(stdout.contains("(+1 sub)"), "got:\n{stdout}");
}

#[test]
fn session_prefix_resolves_and_includes_subagents() {
    let env = CliTestEnv::new();
    seed_opencode_db(&env);

    let db = env.db_arg();
    let args = ["--no-usage", "--db", db.as_str(), "session", "ses_alp", "--json"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let detail: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("session output should be JSON");
    assert_eq!(detail["id"], "ses_alpha01");
    assert_eq!(detail["messageCount"], 3);
    assert_eq!(detail["billingCost"], 1.5);
    assert_eq!(detail["providers"].as_array().map(Vec::len), Some(2));
}

#[test]
fn unknown_session_fails() {
    let env = CliTestEnv::new();
    seed_opencode_db(&env);

    let db = env.db_arg();
    let output = run_bin(&env, &["--no-usage", "--db", db.as_str(), "session", "ses_zzz"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no session matching"), "got:\n{stderr}");
}

#[test]
fn timeline_prints_one_row_per_day() {
    let env = CliTestEnv::new();
    seed_opencode_db(&env);

    let db = env.db_arg();
    let args = ["--db", db.as_str(), "timeline", "--days", "3"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 4, "got:\n{stdout}");
}

#[test]
fn missing_database_yields_empty_dashboard() {
    let env = CliTestEnv::new();

    let db = env.db_arg();
    let args = ["--no-usage", "--db", db.as_str(), "dashboard", "--json"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let data: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("dashboard output should be JSON");
    assert_eq!(data["totals"]["messages"], 0);
    assert_eq!(data["sessions"].as_array().map(Vec::len), Some(0));
}

#[test]
fn usage_without_token_prints_notice() {
    let env = CliTestEnv::new();

    let args = ["usage"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Codex usage unavailable"), "got:\n{stdout}");
}
