//! Installs and registers runners below the root directory, one directory per runner.
pub mod extract;
pub mod platform;

use crate::command::ExecutableData;
use crate::defaults::{GITHUB_URL, RUNNER_CONFIG_SCRIPT};
use crate::github::{GithubClient, GithubError};
use crate::host::HostOps;
use extract::{extract_tar_gz, ExtractError};
use platform::Platform;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("no organizations specified")]
    NoOrgs,
    #[error("unsupported OS: {0}")]
    UnsupportedOs(String),
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),
    #[error("no runner download found for {os}/{architecture}")]
    NoMatchingDownload { os: String, architecture: String },
    #[error("invalid download url `{0}`")]
    InvalidDownloadUrl(String),
    #[error("failed to get hostname: {0}")]
    Hostname(#[source] std::io::Error),
    #[error(transparent)]
    Github(#[from] GithubError),
    #[error("failed to extract runner to `{dir}`: {source}")]
    Extract {
        dir: PathBuf,
        #[source]
        source: ExtractError,
    },
    #[error("`{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to configure runner {runner}: {reason}")]
    Configure { runner: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupOptions {
    pub orgs: Vec<String>,
    pub runners_per_org: u32,
    pub root_dir: PathBuf,
    pub download_dir: PathBuf,
    pub additional_labels: Vec<String>,
}

pub struct Provisioner<H: HostOps> {
    github: GithubClient,
    host: H,
    platform: Platform,
}

impl<H: HostOps> Provisioner<H> {
    pub fn try_new(github: GithubClient, host: H) -> Result<Self, SetupError> {
        Ok(Self {
            github,
            host,
            platform: Platform::current()?,
        })
    }

    pub fn with_platform(self, platform: Platform) -> Self {
        Self { platform, ..self }
    }

    /// Downloads the runner application once and installs `runners_per_org` freshly registered
    /// runners for every organization. Existing runners with the same name are replaced.
    pub fn setup(&self, options: &SetupOptions) -> Result<(), SetupError> {
        let first_org = options.orgs.first().ok_or(SetupError::NoOrgs)?;
        let hostname = self.host.hostname().map_err(SetupError::Hostname)?;

        let archive = self.download_runner(first_org, &options.download_dir)?;
        info!("Runner downloaded to: {}", archive.display());

        for org in &options.orgs {
            info!("Setting up runners for org: {org}");
            let token = self.github.registration_token(org)?;

            let org_dir = options.root_dir.join(org);
            fs::create_dir_all(&org_dir).map_err(io_error(&org_dir))?;

            for i in 1..=options.runners_per_org {
                let runner_name = format!("{hostname}-{i}");
                let runner_dir = org_dir.join(&runner_name);
                info!("Setting up runner: {runner_name}");

                remove_existing_runner(&runner_dir)?;
                extract_tar_gz(&archive, &runner_dir).map_err(|source| SetupError::Extract {
                    dir: runner_dir.clone(),
                    source,
                })?;
                self.configure_runner(
                    &runner_dir,
                    &runner_name,
                    org,
                    &token,
                    &options.additional_labels,
                )?;

                info!("Runner {runner_name} configured successfully");
            }
        }

        info!("Setup complete");
        Ok(())
    }

    fn download_runner(&self, org: &str, download_dir: &Path) -> Result<PathBuf, SetupError> {
        let Platform { os, architecture } = self.platform;
        let download = self
            .github
            .runner_downloads(org)?
            .into_iter()
            .find(|d| d.os == os && d.architecture == architecture)
            .ok_or_else(|| SetupError::NoMatchingDownload {
                os: os.to_string(),
                architecture: architecture.to_string(),
            })?;

        let file_name = download
            .download_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SetupError::InvalidDownloadUrl(download.download_url.clone()))?;

        fs::create_dir_all(download_dir).map_err(io_error(download_dir))?;
        let destination = download_dir.join(file_name);

        if destination.exists() {
            info!("Runner already downloaded: {}", destination.display());
            return Ok(destination);
        }

        info!("Downloading runner from: {}", download.download_url);
        self.github.download(&download.download_url, &destination)?;
        Ok(destination)
    }

    fn configure_runner(
        &self,
        runner_dir: &Path,
        runner_name: &str,
        org: &str,
        token: &str,
        labels: &[String],
    ) -> Result<(), SetupError> {
        let command = ExecutableData::new(runner_dir.join(RUNNER_CONFIG_SCRIPT))
            .with_args(config_args(org, token, runner_name, labels))
            .with_working_dir(runner_dir);

        let status = self.host.run(&command).map_err(|e| SetupError::Configure {
            runner: runner_name.to_string(),
            reason: e.to_string(),
        })?;

        if !status.success() {
            return Err(SetupError::Configure {
                runner: runner_name.to_string(),
                reason: format!("{RUNNER_CONFIG_SCRIPT} exited with {status}"),
            });
        }
        Ok(())
    }
}

/// Arguments for an unattended registration replacing any runner with the same name.
pub fn config_args(org: &str, token: &str, runner_name: &str, labels: &[String]) -> Vec<String> {
    let mut args = vec![
        "--url".to_string(),
        format!("{GITHUB_URL}/{org}"),
        "--token".to_string(),
        token.to_string(),
        "--name".to_string(),
        runner_name.to_string(),
        "--unattended".to_string(),
        "--replace".to_string(),
    ];
    if !labels.is_empty() {
        args.push("--labels".to_string());
        args.push(labels.join(","));
    }
    args
}

fn remove_existing_runner(runner_dir: &Path) -> Result<(), SetupError> {
    if !runner_dir.exists() {
        return Ok(());
    }
    info!("Cleaning up existing runner at {}", runner_dir.display());
    fs::remove_dir_all(runner_dir).map_err(io_error(runner_dir))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SetupError {
    let path = path.to_path_buf();
    move |source| SetupError::Io { path, source }
}

#[cfg(target_family = "unix")]
#[cfg(test)]
mod tests {
    use super::extract::tests::runner_archive;
    use super::*;
    use crate::host::MockHostOps;
    use assert_matches::assert_matches;
    use httpmock::prelude::*;
    use mockall::predicate;
    use serde_json::json;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use tempfile::tempdir;

    const LINUX_X64: Platform = Platform {
        os: "linux",
        architecture: "x64",
    };

    #[test]
    fn config_args_without_labels() {
        assert_eq!(
            config_args("acme", "T0K", "host-1", &[]),
            vec![
                "--url",
                "https://github.com/acme",
                "--token",
                "T0K",
                "--name",
                "host-1",
                "--unattended",
                "--replace"
            ]
        );
    }

    #[test]
    fn config_args_with_labels() {
        let args = config_args(
            "acme",
            "T0K",
            "host-1",
            &["gpu".to_string(), "large".to_string()],
        );

        assert_eq!(&args[args.len() - 2..], ["--labels", "gpu,large"]);
    }

    fn github_server(archive: &Path) -> MockServer {
        let server = MockServer::start();
        let archive_bytes = fs::read(archive).unwrap();
        let download_url = server.url("/assets/actions-runner-linux-x64-2.320.0.tar.gz");
        server.mock(|when, then| {
            when.method(GET).path("/orgs/acme/actions/runners/downloads");
            then.status(200).json_body(json!([
                {
                    "os": "osx",
                    "architecture": "x64",
                    "download_url": "https://example.com/osx.tar.gz",
                    "filename": "osx.tar.gz"
                },
                {
                    "os": "linux",
                    "architecture": "x64",
                    "download_url": download_url,
                    "filename": "actions-runner-linux-x64-2.320.0.tar.gz"
                }
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/assets/actions-runner-linux-x64-2.320.0.tar.gz");
            then.status(200).body(archive_bytes);
        });
        for org in ["acme", "other"] {
            server.mock(|when, then| {
                when.method(POST)
                    .path(format!("/orgs/{org}/actions/runners/registration-token"));
                then.status(201)
                    .json_body(json!({"token": format!("{org}-token")}));
            });
        }
        server
    }

    #[test]
    fn installs_and_registers_every_runner() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("source.tar.gz");
        runner_archive(
            &archive,
            &[("run.sh", 0o755, "#!/bin/sh\n"), ("config.sh", 0o755, "#!/bin/sh\n")],
        );
        let server = github_server(&archive);
        let root = tmp.path().join("runners");
        let stale = root.join("acme/host-1/stale");
        fs::create_dir_all(&stale).unwrap();

        let mut host = MockHostOps::new();
        host.expect_hostname()
            .once()
            .returning(|| Ok("host".to_string()));
        host.expect_run()
            .times(4)
            .with(predicate::function(|cmd: &ExecutableData| {
                cmd.bin.ends_with("config.sh")
                    && cmd.args.contains(&"--unattended".to_string())
                    && cmd.working_dir.as_ref().is_some_and(|d| cmd.bin.starts_with(d))
            }))
            .returning(|_| Ok(ExitStatus::from_raw(0)));

        let github = GithubClient::try_new(&server.base_url(), "ghp_test").unwrap();
        let provisioner = Provisioner::try_new(github, host)
            .unwrap()
            .with_platform(LINUX_X64);
        let options = SetupOptions {
            orgs: vec!["acme".to_string(), "other".to_string()],
            runners_per_org: 2,
            root_dir: root.clone(),
            download_dir: tmp.path().join("downloads"),
            additional_labels: vec![],
        };

        provisioner.setup(&options).unwrap();

        for runner in ["acme/host-1", "acme/host-2", "other/host-1", "other/host-2"] {
            assert!(root.join(runner).join("run.sh").is_file(), "{runner}");
        }
        assert!(!stale.exists());
        assert!(tmp
            .path()
            .join("downloads/actions-runner-linux-x64-2.320.0.tar.gz")
            .is_file());
    }

    #[test]
    fn failing_configuration_stops_setup() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("source.tar.gz");
        runner_archive(&archive, &[("config.sh", 0o755, "#!/bin/sh\n")]);
        let server = github_server(&archive);

        let mut host = MockHostOps::new();
        host.expect_hostname()
            .returning(|| Ok("host".to_string()));
        host.expect_run()
            .once()
            .returning(|_| Ok(ExitStatus::from_raw(1 << 8)));

        let github = GithubClient::try_new(&server.base_url(), "ghp_test").unwrap();
        let provisioner = Provisioner::try_new(github, host)
            .unwrap()
            .with_platform(LINUX_X64);
        let options = SetupOptions {
            orgs: vec!["acme".to_string()],
            runners_per_org: 3,
            root_dir: tmp.path().join("runners"),
            download_dir: tmp.path().join("downloads"),
            additional_labels: vec!["gpu".to_string()],
        };

        assert_matches!(
            provisioner.setup(&options),
            Err(SetupError::Configure { runner, .. }) => assert_eq!(runner, "host-1")
        );
    }

    #[test]
    fn unavailable_platform_is_reported() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("source.tar.gz");
        runner_archive(&archive, &[("config.sh", 0o755, "")]);
        let server = github_server(&archive);

        let mut host = MockHostOps::new();
        host.expect_hostname()
            .returning(|| Ok("host".to_string()));
        host.expect_run().never();

        let github = GithubClient::try_new(&server.base_url(), "ghp_test").unwrap();
        let provisioner = Provisioner::try_new(github, host)
            .unwrap()
            .with_platform(Platform {
                os: "win",
                architecture: "arm64",
            });
        let options = SetupOptions {
            orgs: vec!["acme".to_string()],
            runners_per_org: 1,
            root_dir: tmp.path().join("runners"),
            download_dir: tmp.path().join("downloads"),
            additional_labels: vec![],
        };

        assert_matches!(
            provisioner.setup(&options),
            Err(SetupError::NoMatchingDownload { os, architecture }) => {
                assert_eq!(os, "win");
                assert_eq!(architecture, "arm64");
            }
        );
    }

    #[test]
    fn no_orgs_is_an_error() {
        let github = GithubClient::try_new("http://127.0.0.1:9", "ghp_test").unwrap();
        let provisioner = Provisioner::try_new(github, MockHostOps::new())
            .unwrap()
            .with_platform(LINUX_X64);
        let options = SetupOptions {
            orgs: vec![],
            runners_per_org: 1,
            root_dir: PathBuf::from("/nonexistent"),
            download_dir: PathBuf::from("/nonexistent"),
            additional_labels: vec![],
        };

        assert_matches!(provisioner.setup(&options), Err(SetupError::NoOrgs));
    }
}
