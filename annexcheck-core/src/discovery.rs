//! Repository discovery
//!
//! Walks a repository store and opens every directory that is a git
//! repository. `.git` metadata directories are never entered; directories
//! that are not repositories are skipped silently.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::forks::ForkFilter;
use crate::repository::Repository;
use crate::scanner::GIT_DIR_NAME;

/// Find all repositories under `store`, in walk order.
///
/// Annex-enabled repositories are checked against `filter`. The store root
/// itself being inaccessible is an error; anything unreadable below it is
/// logged and skipped.
pub fn discover(store: &Path, filter: &dyn ForkFilter) -> Result<Vec<Repository>> {
    fs::read_dir(store).map_err(|source| Error::StoreUnavailable {
        path: store.to_path_buf(),
        source,
    })?;

    let walker = WalkDir::new(store)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != GIT_DIR_NAME);

    let mut repos = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(mut repo) = Repository::open(entry.path()) else {
            continue;
        };
        if repo.has_annex_branch() {
            repo.set_fork(filter.is_fork(repo.path()));
        }
        debug!(
            repo = %repo.path().display(),
            annex = repo.has_annex_branch(),
            fork = repo.is_fork(),
            "Found repository"
        );
        repos.push(repo);
    }

    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forks::NoForkFilter;
    use git2::Repository as GitRepository;
    use tempfile::TempDir;

    #[test]
    fn test_inaccessible_store_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            discover(&missing, &NoForkFilter),
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_finds_bare_and_working_tree_repositories() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path();
        GitRepository::init_bare(store.join("alice/one.git")).unwrap();
        GitRepository::init(store.join("bob/two")).unwrap();
        fs::create_dir_all(store.join("carol/plain/dir")).unwrap();
        fs::write(store.join("carol/file.txt"), "x").unwrap();

        let repos = discover(store, &NoForkFilter).unwrap();
        let paths: Vec<_> = repos
            .iter()
            .map(|r| r.path().strip_prefix(store).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            paths,
            vec![Path::new("alice/one.git").to_path_buf(), Path::new("bob/two").to_path_buf()]
        );
        assert!(repos.iter().all(|r| !r.has_annex_branch()));
    }
}
