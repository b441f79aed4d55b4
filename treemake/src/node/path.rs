//! Path arithmetic relative to a node directory and the project root.
//!
//! Everything here is lexical: no filesystem access, no symlink resolution.

use std::path::{Component, Path, PathBuf};

/// Character in a target mask replaced by the node's basename.
pub const MASK_WILDCARD: char = '?';

/// Default prefix for [`PathResolver::www_root_path`].
pub const DEFAULT_WWW_ROOT: &str = "/";

/// Resolves paths for one node.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    dir: PathBuf,
}

impl PathResolver {
    /// Resolver for the node at `node_path` (relative to `root`).
    pub fn new(root: &Path, node_path: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            dir: root.join(node_path),
        }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Node directory, always `root` joined with the node path
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `filename` inside this node's directory.
    #[must_use]
    pub fn resolve_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Path of `filename` inside another node's directory.
    #[must_use]
    pub fn resolve_node_path(&self, node_path: &str, filename: &str) -> PathBuf {
        self.root.join(node_path).join(filename)
    }

    /// [`unmask_node_target_name`], except that the root node (empty
    /// `node_path`) takes its name from the project directory.
    #[must_use]
    pub fn unmask_node_target_name(&self, node_path: &str, mask: &str) -> String {
        if basename(node_path).is_some() {
            return unmask_node_target_name(node_path, mask);
        }
        let project = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        mask.replace(MASK_WILDCARD, &project)
    }

    /// `file_path` relative to the node directory, with forward slashes.
    ///
    /// Paths inside the node get a `./` prefix; paths that climb out of it
    /// keep their natural `../` form.
    #[must_use]
    pub fn relative_path(&self, file_path: &Path) -> String {
        let relative = to_slash(&diff_paths(file_path, &self.dir));
        if relative.is_empty() {
            ".".to_string()
        } else if relative == ".." || relative.starts_with("../") {
            relative
        } else {
            format!("./{relative}")
        }
    }

    /// `file_path` relative to the project root, prefixed with `www_root`
    /// (defaults to `/`).
    #[must_use]
    pub fn www_root_path(&self, file_path: &Path, www_root: Option<&str>) -> String {
        let www_root = www_root.unwrap_or(DEFAULT_WWW_ROOT);
        let relative = to_slash(&diff_paths(file_path, &self.root));
        if www_root.ends_with('/') || www_root.ends_with('\\') {
            format!("{www_root}{relative}")
        } else {
            format!("{www_root}/{relative}")
        }
    }
}

/// Replace every wildcard in `mask` with the last segment of `node_path`.
#[must_use]
pub fn unmask_node_target_name(node_path: &str, mask: &str) -> String {
    if !mask.contains(MASK_WILDCARD) {
        return mask.to_string();
    }
    mask.replace(MASK_WILDCARD, basename(node_path).unwrap_or_default())
}

fn basename(node_path: &str) -> Option<&str> {
    node_path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .last()
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replace('\\', "/")
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.last(), Some(Component::Normal(_))) => {
                let _ = out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Lexical `path` relative to `base`. Both must be rooted the same way.
fn diff_paths(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for component in &path[common..] {
        result.push(component.as_os_str());
    }
    result
}
