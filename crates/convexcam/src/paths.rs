use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use camconfig::CONFIG_FILE_NAME;
use directories_next::{ProjectDirs, UserDirs};

pub const ENV_CONFIG_DIR: &str = "CONVEXCAM_CONFIG_DIR";
pub const ENV_DOWNLOAD_DIR: &str = "CONVEXCAM_DOWNLOAD_DIR";
pub const ENV_CACHE_DIR: &str = "CONVEXCAM_CACHE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "ConvexCam";
const APPLICATION: &str = "convexcam";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    cache_dir: PathBuf,
    download_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        let config_dir = resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir());
        let cache_dir = resolve_dir(ENV_CACHE_DIR, project_dirs.cache_dir());
        let download_dir = match env_override(ENV_DOWNLOAD_DIR) {
            Some(dir) => dir,
            None => default_download_dir(&project_dirs),
        };

        Ok(Self {
            config_dir,
            cache_dir,
            download_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Files handed to the share command; kept after it exits.
    pub fn share_dir(&self) -> PathBuf {
        self.cache_dir.join("share")
    }

    /// Where captures land unless the config names another directory.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, cache_dir: PathBuf, download_dir: PathBuf) -> Self {
        Self {
            config_dir,
            cache_dir,
            download_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> PathBuf {
    env_override(env_var).unwrap_or_else(|| default.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

fn default_download_dir(project_dirs: &ProjectDirs) -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| project_dirs.data_dir().join("captures"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _lock = env_lock().lock().unwrap();
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config");
        let downloads = temp.path().join("shots");
        let cache = temp.path().join("cache");
        let _config = EnvGuard::set(ENV_CONFIG_DIR, &config);
        let _cache = EnvGuard::set(ENV_CACHE_DIR, &cache);
        let _downloads = EnvGuard::set(ENV_DOWNLOAD_DIR, &downloads);

        let paths = AppPaths::discover().unwrap();
        assert_eq!(paths.config_dir(), config.as_path());
        assert_eq!(paths.config_file(), config.join("convexcam.toml"));
        assert_eq!(paths.download_dir(), downloads.as_path());
        assert_eq!(paths.share_dir(), cache.join("share"));
    }

    #[test]
    fn defaults_used_without_overrides() {
        let _lock = env_lock().lock().unwrap();
        let _config = EnvGuard::clear(ENV_CONFIG_DIR);
        let _downloads = EnvGuard::clear(ENV_DOWNLOAD_DIR);

        let paths = AppPaths::discover().unwrap();
        assert!(paths.config_file().ends_with(CONFIG_FILE_NAME));
        assert!(!paths.download_dir().as_os_str().is_empty());
    }

    #[test]
    fn empty_override_is_ignored() {
        let _lock = env_lock().lock().unwrap();
        let _config = EnvGuard::set(ENV_CONFIG_DIR, Path::new(""));

        let paths = AppPaths::discover().unwrap();
        assert!(!paths.config_dir().as_os_str().is_empty());
    }
}
