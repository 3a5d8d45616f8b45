//! Unified diff text for one repository using git2.

use git2::{Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};

/// Maximum bytes of diff text per repository before truncation.
pub const MAX_DIFF_LENGTH: usize = 100_000;

/// Marker appended when the diff was cut at [`MAX_DIFF_LENGTH`].
pub const TRUNCATION_MARKER: &str = "\n[diff truncated]\n";

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
pub(crate) fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, git2::Error> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    Ok(Some(head_ref.peel_to_tree()?))
}

/// Diff text for either the index (`staged = true`) or the working tree.
///
/// The working-tree side includes untracked files so newly created files show
/// up with their full content.
pub fn repository_diff(repo: &Repository, staged: bool) -> Result<String, git2::Error> {
    let diff = if staged {
        let head_tree = resolve_head_tree(repo)?;
        repo.diff_tree_to_index(head_tree.as_ref(), None, None)?
    } else {
        let mut opts = DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);
        repo.diff_index_to_workdir(None, Some(&mut opts))?
    };

    patch_text(&diff)
}

/// Render a diff as patch text, stopping at [`MAX_DIFF_LENGTH`].
fn patch_text(diff: &Diff<'_>) -> Result<String, git2::Error> {
    let mut text = String::new();
    let mut truncated = false;

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if truncated {
            return true;
        }

        let content = String::from_utf8_lossy(line.content());
        let origin = line.origin();
        let prefix_len = usize::from(matches!(origin, '+' | '-' | ' '));

        if text.len() + prefix_len + content.len() > MAX_DIFF_LENGTH {
            truncated = true;
            return true;
        }

        if prefix_len == 1 {
            text.push(origin);
        }
        text.push_str(&content);

        true
    })?;

    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }

    Ok(text)
}
