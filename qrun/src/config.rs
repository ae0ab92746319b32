//! Settings taken from the process environment.

use std::path::PathBuf;

/// Module APIs this program can load, as (major, minor), oldest first.
pub const MODULE_APIS: &[(u32, u32)] = &[(0, 5), (0, 6), (1, 0), (1, 1)];

const DEFAULT_CHARSET: &str = "UTF-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// System module directory (`QRUN_MODULE_DIR`).
    pub module_dir: PathBuf,
    /// Version-independent module directory (`QRUN_USER_MODULE_DIR`).
    pub user_module_dir: PathBuf,
    /// Extra module directories searched first (`QRUN_MODULE_PATH`).
    pub module_path: Vec<PathBuf>,
    /// Default encoding when `--charset` is not given (`QRUN_CHARSET`).
    pub charset: String,
    /// Default time zone when `--time-zone` is not given (`TZ`).
    pub time_zone: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the environment from an arbitrary variable lookup. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let module_dir = get("QRUN_MODULE_DIR").map_or_else(
            || {
                PathBuf::from(format!(
                    "/usr/lib/qrun/modules/{}",
                    env!("CARGO_PKG_VERSION")
                ))
            },
            PathBuf::from,
        );
        let user_module_dir = get("QRUN_USER_MODULE_DIR")
            .map_or_else(|| PathBuf::from("/usr/lib/qrun/user-modules"), PathBuf::from);
        let module_path = get("QRUN_MODULE_PATH")
            .map(|p| {
                std::env::split_paths(&p)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Environment {
            module_dir,
            user_module_dir,
            module_path,
            charset: get("QRUN_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            time_zone: get("TZ"),
        }
    }

    /// Directories searched for modules, in search order.
    pub fn search_path(&self) -> Vec<PathBuf> {
        let mut path = self.module_path.clone();
        for dir in [&self.user_module_dir, &self.module_dir] {
            if !path.contains(dir) {
                path.push(dir.clone());
            }
        }
        path
    }
}

pub fn latest_module_api() -> (u32, u32) {
    MODULE_APIS[MODULE_APIS.len() - 1]
}
