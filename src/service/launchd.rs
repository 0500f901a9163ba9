use super::{run_checked, ServiceError};
use crate::command::ExecutableData;
use crate::defaults::LAUNCH_AGENT_LABEL;
use crate::host::HostOps;
use crate::locator::search_runner_dirs;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

const LAUNCHCTL: &str = "launchctl";

/// Per-user agent starting the supervisor over the whole root directory at login.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchAgent {
    pub label: String,
    pub exe_path: PathBuf,
    pub root_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Display for LaunchAgent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
        <string>start</string>
        <string>--root-dir={root_dir}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{log_dir}/ghrunner.log</string>
    <key>StandardErrorPath</key>
    <string>{log_dir}/ghrunner.error.log</string>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
            exe = xml_escape(&self.exe_path.display().to_string()),
            root_dir = xml_escape(&self.root_dir.display().to_string()),
            log_dir = xml_escape(&self.log_dir.display().to_string()),
        )
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub struct LaunchAgentService<H: HostOps> {
    host: H,
    root_dir: PathBuf,
    launch_agents_dir: PathBuf,
    log_dir: PathBuf,
    exe_path: PathBuf,
}

impl<H: HostOps> LaunchAgentService<H> {
    pub fn new(
        host: H,
        root_dir: PathBuf,
        launch_agents_dir: PathBuf,
        log_dir: PathBuf,
        exe_path: PathBuf,
    ) -> Self {
        Self {
            host,
            root_dir,
            launch_agents_dir,
            log_dir,
            exe_path,
        }
    }

    pub fn plist_path(&self) -> PathBuf {
        self.launch_agents_dir
            .join(format!("{LAUNCH_AGENT_LABEL}.plist"))
    }

    fn launchctl_unload(&self) -> ExecutableData {
        ExecutableData::new(LAUNCHCTL).with_args(vec![
            "unload".to_string(),
            self.plist_path().display().to_string(),
        ])
    }

    pub fn enable(&self) -> Result<PathBuf, ServiceError> {
        if search_runner_dirs(&self.root_dir)?.is_empty() {
            return Err(ServiceError::NoRunners(self.root_dir.clone()));
        }

        for dir in [&self.launch_agents_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|source| ServiceError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        let agent = LaunchAgent {
            label: LAUNCH_AGENT_LABEL.to_string(),
            exe_path: self.exe_path.clone(),
            root_dir: self.root_dir.clone(),
            log_dir: self.log_dir.clone(),
        };
        let plist_path = self.plist_path();
        fs::write(&plist_path, agent.to_string()).map_err(|source| ServiceError::Io {
            path: plist_path.clone(),
            source,
        })?;

        info!("Created LaunchAgent: {}", plist_path.display());
        info!("Executable: {}", self.exe_path.display());
        info!("Log files will be at: {}", self.log_dir.display());
        info!("To start: launchctl load {}", plist_path.display());
        info!("To stop:  launchctl unload {}", plist_path.display());
        Ok(plist_path)
    }

    /// Unloads and removes the agent. Returns whether there was anything to remove.
    pub fn disable(&self) -> Result<bool, ServiceError> {
        // not loaded is fine
        let _ = self.host.run(&self.launchctl_unload());

        let plist_path = self.plist_path();
        match fs::remove_file(&plist_path) {
            Ok(()) => {
                info!("Removed LaunchAgent: {}", plist_path.display());
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("LaunchAgent not found, nothing to disable");
                Ok(false)
            }
            Err(source) => Err(ServiceError::Io {
                path: plist_path,
                source,
            }),
        }
    }

    /// Unloads the agent, returning whether it was running.
    pub fn stop(&self) -> Result<bool, ServiceError> {
        if !self.plist_path().exists() {
            info!("LaunchAgent not found. Run 'ghrunner enable' first.");
            return Ok(false);
        }

        if run_checked(&self.host, &self.launchctl_unload()).is_err() {
            info!("LaunchAgent was not running");
            return Ok(false);
        }

        info!("Stopped ghrunner service");
        Ok(true)
    }
}
