// src/repository.rs
//! Repository selectors → local checkouts.
//!
//! A selector is either a directory on disk or a git URL. URLs are cloned
//! into the work directory once; an existing clone is reused as is.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::AppError;
use crate::types::ValidationError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where a curriculum repository comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySelector {
    Local(PathBuf),
    Remote { url: String, name: String },
}

impl RepositorySelector {
    pub fn parse(selector: &str) -> Result<Self, ValidationError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(ValidationError::EmptyField("repository"));
        }
        if !is_git_url(selector) {
            return Ok(Self::Local(PathBuf::from(selector)));
        }

        let name = selector
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()
            .map(|tail| tail.trim_end_matches(".git"))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::InvalidRepository {
                selector: selector.to_string(),
                reason: "no repository name in URL".to_string(),
            })?;

        Ok(Self::Remote {
            url: selector.to_string(),
            name: name.to_string(),
        })
    }

    /// How the selector reads in logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote { url, .. } => url.clone(),
        }
    }
}

fn is_git_url(selector: &str) -> bool {
    selector.contains("://") || selector.starts_with("git@")
}

/// Turns a selector into a checkout directory, cloning when needed.
pub fn resolve_repository(selector: &RepositorySelector, work_dir: &Path) -> Result<PathBuf, AppError> {
    match selector {
        RepositorySelector::Local(path) => {
            if !path.is_dir() {
                return Err(AppError::UnresolvableRepository {
                    selector: selector.display_name(),
                    reason: "not a directory".to_string(),
                });
            }
            path.canonicalize().map_err(|e| AppError::UnresolvableRepository {
                selector: selector.display_name(),
                reason: e.to_string(),
            })
        }
        RepositorySelector::Remote { url, name } => {
            let target = work_dir.join(name);
            if target.is_dir() {
                log::info!("Reusing checkout {}", target.display());
                return Ok(target);
            }
            std::fs::create_dir_all(work_dir).map_err(|e| AppError::UnresolvableRepository {
                selector: url.clone(),
                reason: format!("cannot create {}: {}", work_dir.display(), e),
            })?;
            clone_repository(url, &target)?;
            Ok(target)
        }
    }
}

fn clone_repository(url: &str, target: &Path) -> Result<(), AppError> {
    log::info!("Cloning {} into {}", url, target.display());
    let output = Command::new("git")
        .args(["clone", "--depth", "1", url])
        .arg(target)
        .output()
        .map_err(|e| AppError::UnresolvableRepository {
            selector: url.to_string(),
            reason: format!("failed to run git: {}", e),
        })?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(AppError::UnresolvableRepository {
        selector: url.to_string(),
        reason: stderr.trim().chars().take(ERROR_BODY_PREVIEW_LENGTH).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selectors() {
        assert_eq!(
            RepositorySelector::parse("https://github.com/Laboratoria/curricula-js.git").unwrap(),
            RepositorySelector::Remote {
                url: "https://github.com/Laboratoria/curricula-js.git".to_string(),
                name: "curricula-js".to_string(),
            }
        );
        assert_eq!(
            RepositorySelector::parse("git@github.com:Laboratoria/bootcamp.git").unwrap(),
            RepositorySelector::Remote {
                url: "git@github.com:Laboratoria/bootcamp.git".to_string(),
                name: "bootcamp".to_string(),
            }
        );
        assert_eq!(
            RepositorySelector::parse("./curricula-js").unwrap(),
            RepositorySelector::Local(PathBuf::from("./curricula-js"))
        );
        assert!(RepositorySelector::parse("  ").is_err());
    }

    #[test]
    fn test_local_directory_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let selector = RepositorySelector::Local(dir.path().to_path_buf());
        let resolved = resolve_repository(&selector, dir.path()).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_local_directory_is_unresolvable() {
        let dir = tempfile::tempdir().unwrap();
        let selector = RepositorySelector::Local(dir.path().join("missing"));
        assert!(matches!(
            resolve_repository(&selector, dir.path()),
            Err(AppError::UnresolvableRepository { .. })
        ));
    }

    #[test]
    fn test_existing_clone_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("curricula-js")).unwrap();
        let selector =
            RepositorySelector::parse("https://github.com/Laboratoria/curricula-js.git").unwrap();
        assert_eq!(
            resolve_repository(&selector, dir.path()).unwrap(),
            dir.path().join("curricula-js")
        );
    }
}
