use anyhow::anyhow;
use parley_domain::paths;
use std::path::PathBuf;

pub(crate) fn optional_trimmed_path_from_env(name: &str) -> anyhow::Result<Option<PathBuf>> {
    let value = match std::env::var_os(name) {
        Some(value) => value,
        None => return Ok(None),
    };

    let value = value.to_string_lossy();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{name} is set but empty"));
    }

    Ok(Some(PathBuf::from(trimmed)))
}

/// `PARLEY_ROOT` when set, otherwise `$HOME/.parley`.
pub fn resolve_parley_root() -> anyhow::Result<PathBuf> {
    if let Some(root) = optional_trimmed_path_from_env(paths::PARLEY_ROOT_ENV)? {
        return Ok(root);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(home).join(".parley"))
}

#[cfg(test)]
pub(crate) fn lock_env_for_tests() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EnvVarGuard;

    const TEST_ENV: &str = "PARLEY_TEST_TRIMMED_PATH_ENV";

    #[test]
    fn optional_trimmed_path_from_env_returns_none_when_unset() {
        let _lock = lock_env_for_tests();
        let _guard = EnvVarGuard::remove(TEST_ENV);

        let loaded = optional_trimmed_path_from_env(TEST_ENV).expect("unset env should not error");
        assert!(loaded.is_none());
    }

    #[test]
    fn optional_trimmed_path_from_env_errors_on_empty() {
        let _lock = lock_env_for_tests();
        let _guard = EnvVarGuard::set(TEST_ENV, "   ");

        let err = optional_trimmed_path_from_env(TEST_ENV).expect_err("empty env should error");
        assert!(
            err.to_string()
                .contains("PARLEY_TEST_TRIMMED_PATH_ENV is set but empty"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn resolve_parley_root_prefers_env_then_home() {
        let _lock = lock_env_for_tests();

        let _root = EnvVarGuard::set(paths::PARLEY_ROOT_ENV, " /tmp/parley-root ");
        assert_eq!(
            resolve_parley_root().unwrap(),
            PathBuf::from("/tmp/parley-root")
        );
        drop(_root);

        let _root = EnvVarGuard::remove(paths::PARLEY_ROOT_ENV);
        let _home = EnvVarGuard::set("HOME", "/home/someone");
        assert_eq!(
            resolve_parley_root().unwrap(),
            PathBuf::from("/home/someone").join(".parley")
        );
    }
}
