use super::error::CliError;
use super::RootDirArgs;
use crate::defaults::{DEFAULT_DOWNLOAD_DIR, GITHUB_API_URL, GITHUB_TOKEN_ENV_VAR};
use crate::github::GithubClient;
use crate::host::LocalHost;
use crate::provision::{Provisioner, SetupOptions};
use crate::utils::path::expand_home;
use std::fmt::{self, Debug, Formatter};

#[derive(clap::Args)]
pub struct Args {
    /// Token allowed to register self-hosted runners in the organizations
    #[arg(long, env = GITHUB_TOKEN_ENV_VAR, hide_env_values = true)]
    github_token: String,

    #[command(flatten)]
    root: RootDirArgs,

    /// Organizations to deploy runners to
    #[arg(long, value_delimiter = ',', required = true)]
    orgs: Vec<String>,

    /// Number of runners per organization
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    runners_per_org: u32,

    /// Where the runner archive is downloaded to
    #[arg(long, default_value = DEFAULT_DOWNLOAD_DIR)]
    download_dir: String,

    /// Additional labels to add to the runners
    #[arg(long, value_delimiter = ',')]
    additional_labels: Vec<String>,

    #[arg(long, default_value = GITHUB_API_URL, hide = true)]
    github_api_url: String,
}

impl Debug for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("github_token", &"<redacted>")
            .field("root", &self.root)
            .field("orgs", &self.orgs)
            .field("runners_per_org", &self.runners_per_org)
            .field("download_dir", &self.download_dir)
            .field("additional_labels", &self.additional_labels)
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

impl Args {
    pub(crate) fn options(&self) -> SetupOptions {
        SetupOptions {
            orgs: self.orgs.clone(),
            runners_per_org: self.runners_per_org,
            root_dir: self.root.root_dir(),
            download_dir: expand_home(&self.download_dir),
            additional_labels: self.additional_labels.clone(),
        }
    }
}

/// Downloads, installs and registers the runners of every requested organization.
pub fn run(args: Args) -> Result<(), CliError> {
    let github = GithubClient::try_new(&args.github_api_url, &args.github_token)
        .map_err(|err| CliError::Precondition(err.to_string()))?;
    let provisioner = Provisioner::try_new(github, LocalHost)
        .map_err(|err| CliError::Precondition(err.to_string()))?;

    provisioner
        .setup(&args.options())
        .map_err(|err| CliError::Command(err.to_string()))
}
