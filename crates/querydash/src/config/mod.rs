use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

pub const DEFAULT_SOURCES_DIR: &str = "sources";
pub const DEFAULT_SOURCES_FILE: &str = "sources.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub cwd: PathBuf,
    /// Directory holding one sub-directory per source (`<id>/queries`, `<id>/reports`).
    pub sources_root: PathBuf,
    /// Optional definitions file; absence means built-in sources only.
    pub sources_file: PathBuf,
}

pub fn resolve_runtime_paths(
    cwd: &Path,
    home_dir: Option<&Path>,
    sources_root_override: Option<&Path>,
    sources_file_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let cwd = normalize_lexical(cwd);
    let sources_root = match sources_root_override {
        Some(path) => resolve_user_path(path, home_dir, &cwd)?,
        None => cwd.join(DEFAULT_SOURCES_DIR),
    };
    let sources_file = match sources_file_override {
        Some(path) => resolve_user_path(path, home_dir, &cwd)?,
        None => sources_root.join(DEFAULT_SOURCES_FILE),
    };

    Ok(RuntimePaths {
        cwd,
        sources_root: normalize_lexical(&sources_root),
        sources_file: normalize_lexical(&sources_file),
    })
}

fn resolve_user_path(path: &Path, home_dir: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: Option<&Path>) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let Some(home_dir) = home_dir else {
                bail!("HOME is not set; cannot expand {}", path.display());
            };
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
