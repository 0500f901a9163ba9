use crate::defaults::{LOGIN_SHELL, LOGIN_SHELL_ARGS, RUNNER_ENTRYPOINT_ARGS, RUNNER_MARKER_FILE};
use crate::locator::RunnerDir;
use std::path::{self, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableData {
    pub bin: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ExecutableData {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        ExecutableData {
            bin: bin.into(),
            args: Vec::default(),
            working_dir: None,
        }
    }

    pub fn with_args(self, args: Vec<String>) -> Self {
        Self { args, ..self }
    }

    pub fn with_working_dir(self, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
            ..self
        }
    }

    /// Builds the single-shot entrypoint invocation for a runner directory.
    ///
    /// With `login_shell` the entrypoint runs through the platform login shell so the runner sees
    /// the same environment as an interactive session of the user.
    pub fn runner_entrypoint(dir: &RunnerDir, login_shell: bool) -> Self {
        // Relative dirs would otherwise be resolved a second time from inside the runner dir.
        let dir = path::absolute(dir.path()).unwrap_or_else(|_| dir.path().to_path_buf());
        let entrypoint_args = RUNNER_ENTRYPOINT_ARGS.iter().map(|a| a.to_string());

        if login_shell {
            let script = format!(
                "cd {} && ./{} {}",
                shell_quote(&dir.display().to_string()),
                RUNNER_MARKER_FILE,
                RUNNER_ENTRYPOINT_ARGS.join(" ")
            );
            let args = LOGIN_SHELL_ARGS
                .iter()
                .map(|a| a.to_string())
                .chain(std::iter::once(script))
                .collect();
            return Self::new(LOGIN_SHELL).with_args(args).with_working_dir(dir);
        }

        Self::new(dir.join(RUNNER_MARKER_FILE))
            .with_args(entrypoint_args.collect())
            .with_working_dir(dir)
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn login_shell_entrypoint() {
        let dir = RunnerDir::from(PathBuf::from("/runners/acme/host-1"));

        let data = ExecutableData::runner_entrypoint(&dir, true);

        assert_eq!(data.bin, PathBuf::from(LOGIN_SHELL));
        let mut expected: Vec<String> = LOGIN_SHELL_ARGS.iter().map(|a| a.to_string()).collect();
        expected.push("cd '/runners/acme/host-1' && ./run.sh --once".to_string());
        assert_eq!(data.args, expected);
        assert_eq!(data.working_dir, Some(PathBuf::from("/runners/acme/host-1")));
    }

    #[test]
    fn direct_entrypoint() {
        let dir = RunnerDir::from(PathBuf::from("/runners/acme/host-1"));

        let data = ExecutableData::runner_entrypoint(&dir, false);

        assert_eq!(data.bin, PathBuf::from("/runners/acme/host-1/run.sh"));
        assert_eq!(data.args, vec!["--once".to_string()]);
        assert_eq!(data.working_dir, Some(PathBuf::from("/runners/acme/host-1")));
    }

    #[test]
    fn login_shell_entrypoint_of_relative_dir_is_absolute() {
        let dir = RunnerDir::from(PathBuf::from("relative/host-1"));
        let absolute = std::env::current_dir().unwrap().join("relative/host-1");

        let data = ExecutableData::runner_entrypoint(&dir, true);

        assert_eq!(
            data.args.last(),
            Some(&format!("cd '{}' && ./run.sh --once", absolute.display()))
        );
        assert_eq!(data.working_dir, Some(absolute));
    }

    #[test]
    fn direct_entrypoint_is_absolute() {
        let dir = RunnerDir::from(PathBuf::from("relative/host-1"));

        let data = ExecutableData::runner_entrypoint(&dir, false);

        assert!(data.bin.is_absolute());
        assert!(data.bin.ends_with("relative/host-1/run.sh"));
    }

    #[rstest]
    #[case::plain("/a/b", "'/a/b'")]
    #[case::spaces("/a b/c", "'/a b/c'")]
    #[case::single_quote("/it's", r"'/it'\''s'")]
    fn quotes_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(shell_quote(input), expected);
    }
}
