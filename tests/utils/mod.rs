use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built binary against the test environment's config file.
///
/// The API key variable is cleared unless `api_key` is given, so results
/// never depend on the developer's shell.
pub fn run_reel_command(
    env: &TestEnvironment,
    args: &[&str],
    api_key: Option<&str>,
) -> Result<CommandOutput> {
    let config = env.config_path();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scriptreel"));
    cmd.arg("--config")
        .arg(&config)
        .arg("--no-color")
        .args(args)
        .current_dir(env.path())
        .env("XDG_CACHE_HOME", env.path().join("cache"))
        .env("XDG_CONFIG_HOME", env.path().join("xdg"))
        .env_remove("PEXELS_API_KEY");
    if let Some(key) = api_key {
        cmd.env("PEXELS_API_KEY", key);
    }

    let output = cmd.output()?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Parse the JSON event lines printed with `--output json`
pub fn json_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

pub fn event_with_code<'a>(
    events: &'a [serde_json::Value],
    code: &str,
) -> Option<&'a serde_json::Value> {
    events.iter().find(|event| event["code"] == code)
}
