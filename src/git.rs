use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// The two git operations the grabber needs. The rest of the program never
/// sees git's command-line syntax, only these semantics.
pub trait GitClient {
    /// Fetch `refspec` from `remote`, creating or updating the local ref
    /// named on the destination side.
    fn fetch(&self, remote: &str, refspec: &str) -> Result<(), GitError>;

    /// Export the last `count` commits of `branch` as patch files in
    /// `out_dir`, named by git's own conventions.
    fn format_patch(&self, branch: &str, count: u32, out_dir: &Path) -> Result<(), GitError>;
}

/// Git client that shells out to the git binary inside a fixed repository.
#[derive(Debug)]
pub struct SystemGitClient {
    repo: PathBuf,
}

impl SystemGitClient {
    pub fn new(repo: PathBuf) -> Self {
        Self { repo }
    }

    fn run(&self, args: &[&str]) -> Result<(), GitError> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, repo = %self.repo.display(), "running git");

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(())
    }
}

impl GitClient for SystemGitClient {
    fn fetch(&self, remote: &str, refspec: &str) -> Result<(), GitError> {
        self.run(&["fetch", remote, refspec])
    }

    fn format_patch(&self, branch: &str, count: u32, out_dir: &Path) -> Result<(), GitError> {
        let count_arg = format!("-{count}");
        let out_arg = out_dir.display().to_string();
        self.run(&["format-patch", &count_arg, "-o", &out_arg, branch])
    }
}
