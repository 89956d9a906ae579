use std::path::Path;
use tracing::{debug, instrument};

use crate::gerrit::Change;
use crate::git::{GitClient, GitError};

/// Remote the change refs are fetched from. Assumed to already be configured
/// in the target repository.
pub const GERRIT_REMOTE: &str = "gerrit";

/// Each review branch holds exactly one commit worth exporting.
const PATCHES_PER_CHANGE: u32 = 1;

/// Fetch one change into its review branch and export it as a patch file.
///
/// Failures from either git operation propagate to the caller; there is no
/// per-change recovery.
#[instrument(skip(git, change), fields(number = change.number))]
pub fn materialize(git: &dyn GitClient, change: &Change, out_dir: &Path) -> Result<(), GitError> {
    let branch = change.branch_name();
    println!("Grabbing {} into {}", change.number, branch);

    let refspec = format!("{}:{}", change.fetch_ref, branch);
    debug!(%refspec, revision = %change.revision, "fetching change ref");
    git.fetch(GERRIT_REMOTE, &refspec)?;
    git.format_patch(&branch, PATCHES_PER_CHANGE, out_dir)?;
    Ok(())
}
