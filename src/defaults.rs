use std::time::Duration;

// Runner directory layout
pub const RUNNER_MARKER_FILE: &str = "run.sh";
pub const RUNNER_WORK_DIR: &str = "_work";
pub const RUNNER_CONFIG_SCRIPT: &str = "config.sh";
pub const RUNNER_ENTRYPOINT_ARGS: [&str; 1] = ["--once"];

/// Time a runner gets to finish its current job after the interrupt signal before being killed.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

// Paths
pub const DEFAULT_ROOT_DIR: &str = "~/.github-runners";
pub const ROOT_DIR_ENV_VAR: &str = "ROOT_RUNNERS_DIR";
pub const DEFAULT_DOWNLOAD_DIR: &str = "~/Downloads";

// Configuration
pub const CONFIG_ENV_VAR_PREFIX: &str = "GHRUNNER";
pub const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";

// GitHub
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_URL: &str = "https://github.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const GITHUB_TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

// Services
pub const LAUNCH_AGENT_LABEL: &str = "com.github.actions.runner";
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const SYSTEMD_SERVICE_PREFIX: &str = "ghrunner";
pub const SERVICE_LOG_DIR_NAME: &str = "ghrunner";

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        pub const LOGIN_SHELL: &str = "/bin/zsh";
        pub const LOGIN_SHELL_ARGS: [&str; 1] = ["-lic"];
    } else {
        pub const LOGIN_SHELL: &str = "/bin/bash";
        pub const LOGIN_SHELL_ARGS: [&str; 1] = ["-lc"];
    }
}
