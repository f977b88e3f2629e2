use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::install::error::VcsError;
use crate::install::resolver::{Revision, TagReference};

/// Version control operations the installer needs.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clones `url` into `dest`, which must not exist yet.
    async fn clone_repo(&self, url: &str, dest: &Path, token: Option<&str>) -> Result<(), VcsError>;

    /// Tags in the provider's iteration order, each pointing at a commit.
    async fn list_tags(&self, repo: &Path) -> Result<Vec<TagReference>, VcsError>;

    async fn checkout(&self, repo: &Path, revision: &Revision) -> Result<(), VcsError>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self { program: PathBuf::from("git") }
    }
}

// refname, object, peeled object (empty for lightweight tags)
const TAG_FORMAT: &str = "--format=%(refname:short)%09%(objectname)%09%(*objectname)";

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    async fn run<I, S>(
        &self,
        dir: Option<&Path>,
        args: I,
        display: &str,
    ) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        log::debug!("Running {}", display);
        let output = command.output().await.map_err(|source| VcsError::Spawn {
            command: display.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: display.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
    ) -> Result<(), VcsError> {
        let authenticated = with_token(url, token);
        let display = format!("git clone {} {}", url, dest.display());
        let args: [&OsStr; 4] = [
            OsStr::new("clone"),
            OsStr::new("--quiet"),
            OsStr::new(&authenticated),
            dest.as_os_str(),
        ];
        self.run(None, args, &display).await?;
        Ok(())
    }

    async fn list_tags(&self, repo: &Path) -> Result<Vec<TagReference>, VcsError> {
        let display = "git for-each-ref refs/tags";
        let stdout =
            self.run(Some(repo), ["for-each-ref", TAG_FORMAT, "refs/tags"], display).await?;
        parse_tag_listing(&stdout).map_err(|message| VcsError::InvalidOutput {
            command: display.to_string(),
            message,
        })
    }

    async fn checkout(&self, repo: &Path, revision: &Revision) -> Result<(), VcsError> {
        let display = format!("git checkout {}", revision);
        self.run(
            Some(repo),
            ["-c", "advice.detachedHead=false", "checkout", "--quiet", revision.as_str()],
            &display,
        )
        .await?;
        Ok(())
    }
}

/// Parses `for-each-ref` output produced with [`TAG_FORMAT`]. Annotated tags
/// resolve to the commit they peel to.
pub fn parse_tag_listing(stdout: &str) -> Result<Vec<TagReference>, String> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next().unwrap_or_default().trim();
            let object = fields.next().unwrap_or_default().trim();
            let peeled = fields.next().unwrap_or_default().trim();
            if name.is_empty() || object.is_empty() {
                return Err(format!("malformed tag line '{}'", line));
            }
            let target = if peeled.is_empty() { object } else { peeled };
            Ok(TagReference::new(name, Revision::new(target)))
        })
        .collect()
}

/// Embeds `token` into an https url as basic-auth credentials. Other urls
/// are returned unchanged.
pub fn with_token(url: &str, token: Option<&str>) -> String {
    match (token.filter(|t| !t.is_empty()), url.strip_prefix("https://")) {
        (Some(token), Some(rest)) => format!("https://x-access-token:{}@{}", token, rest),
        _ => url.to_string(),
    }
}
