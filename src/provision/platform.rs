use super::SetupError;
use std::env::consts::{ARCH, OS};

/// Host platform in the vocabulary of the runner downloads list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub architecture: &'static str,
}

impl Platform {
    pub fn current() -> Result<Self, SetupError> {
        Self::from_rust_target(OS, ARCH)
    }

    pub fn from_rust_target(os: &str, arch: &str) -> Result<Self, SetupError> {
        let os = match os {
            "macos" => "osx",
            "linux" => "linux",
            "windows" => "win",
            other => return Err(SetupError::UnsupportedOs(other.to_string())),
        };
        let architecture = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => return Err(SetupError::UnsupportedArchitecture(other.to_string())),
        };
        Ok(Self { os, architecture })
    }
}
