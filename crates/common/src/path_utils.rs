//! Path normalization utilities for transfer plans and embedded references.

use std::path::{Component, Path, PathBuf};

use crate::constants::REFERENCE_SEPARATOR;
use crate::error::PathError;

/// Convert a path to absolute without resolving symlinks.
///
/// # Arguments
/// * `path` - Path to convert (relative or absolute)
///
/// # Returns
/// Absolute path, joining with current directory if relative.
///
/// # Errors
/// Returns error if current directory cannot be determined.
pub fn to_absolute(path: &Path) -> Result<PathBuf, PathError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd: PathBuf| cwd.join(path))
            .map_err(|e: std::io::Error| PathError::from_io(path.display().to_string(), e))
    }
}

/// Lexical path normalization without filesystem access.
///
/// Removes `.` components and resolves `..` components lexically.
/// Does not access the filesystem or resolve symlinks.
///
/// # Arguments
/// * `path` - Path to normalize
///
/// # Returns
/// Normalized path with `.` and `..` resolved lexically.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => { /* skip . */ }
            Component::ParentDir => {
                if !components.is_empty()
                    && !matches!(
                        components.last(),
                        Some(Component::ParentDir) | Some(Component::RootDir)
                    )
                {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Express `path` relative to `root` as a `/`-separated name.
///
/// Both paths are made absolute and lexically normalized first, so the
/// result never depends on the host separator.
///
/// # Arguments
/// * `path` - Path of a file inside the transfer root
/// * `root` - Transfer root directory
///
/// # Errors
/// Returns error if path is outside the root directory.
pub fn relative_to_root(path: &Path, root: &Path) -> Result<String, PathError> {
    let normalized: PathBuf = lexical_normalize(&to_absolute(path)?);
    let normalized_root: PathBuf = lexical_normalize(&to_absolute(root)?);

    let relative: &Path = normalized
        .strip_prefix(&normalized_root)
        .map_err(|_| PathError::PathOutsideRoot {
            path: normalized.display().to_string(),
            root: normalized_root.display().to_string(),
        })?;

    Ok(to_posix_path(relative))
}

/// Convert a path to POSIX-style string (forward slashes).
///
/// # Arguments
/// * `path` - Path to convert
///
/// # Returns
/// String with forward slashes as separators.
pub fn to_posix_path(path: &Path) -> String {
    path.components()
        .map(|c: Component| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert a `/`-separated blob name to a host path under `destination_root`.
///
/// # Arguments
/// * `relative_name` - POSIX-style relative name
/// * `destination_root` - Local destination root directory
///
/// # Returns
/// PathBuf with OS-native separators.
pub fn from_posix_path(relative_name: &str, destination_root: &Path) -> PathBuf {
    let mut result: PathBuf = destination_root.to_path_buf();

    for component in relative_name.split(REFERENCE_SEPARATOR) {
        if !component.is_empty() {
            result.push(component);
        }
    }

    result
}

/// Check if a path is within a root directory (security validation).
///
/// Uses lexical comparison, does not access filesystem.
///
/// # Arguments
/// * `path` - Path to check
/// * `root` - Root directory that should contain the path
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    let norm_path: PathBuf = lexical_normalize(path);
    let norm_root: PathBuf = lexical_normalize(root);
    norm_path.starts_with(&norm_root)
}

/// Normalize a path as stored in a reference table or scene document.
///
/// Backslashes become `/` and trailing separators are dropped. A bare root
/// (`/`) is kept as is.
///
/// # Arguments
/// * `path` - Raw reference path, local or cloud style
pub fn normalize_reference_path(path: &str) -> String {
    let posix: String = path.replace('\\', "/");
    let trimmed: &str = posix.trim_end_matches(REFERENCE_SEPARATOR);

    if trimmed.is_empty() && !posix.is_empty() {
        return REFERENCE_SEPARATOR.to_string();
    }
    trimmed.to_string()
}

/// Split a normalized reference path at its last separator.
///
/// # Returns
/// `(directory, file_name)`; the directory is empty when there is no separator.
pub fn split_reference_path(path: &str) -> (&str, &str) {
    match path.rsplit_once(REFERENCE_SEPARATOR) {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    }
}

/// Join a directory and a relative remainder with a single `/`.
pub fn join_reference_path(dir: &str, rest: &str) -> String {
    let dir: &str = dir.trim_end_matches(REFERENCE_SEPARATOR);
    let rest: &str = rest.trim_start_matches(REFERENCE_SEPARATOR);

    if dir.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        dir.to_string()
    } else {
        format!("{}{}{}", dir, REFERENCE_SEPARATOR, rest)
    }
}
