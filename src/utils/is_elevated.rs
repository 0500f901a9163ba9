#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct IsElevatedError(String);

#[cfg(target_family = "unix")]
pub fn is_elevated() -> Result<bool, IsElevatedError> {
    Ok(nix::unistd::Uid::effective().is_root())
}

#[cfg(not(target_family = "unix"))]
pub fn is_elevated() -> Result<bool, IsElevatedError> {
    Err(IsElevatedError(
        "checking user privileges is only supported on unix".to_string(),
    ))
}
