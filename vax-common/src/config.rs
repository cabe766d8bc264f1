//! Data directory and database resolution
//!
//! Priority order for the database location:
//! 1. Explicit argument (tests, CLI)
//! 2. `VAX_DB_PATH` environment variable
//! 3. Compiled default (`./vax_data/vax.db`)

use std::path::PathBuf;

/// Environment variable naming the SQLite database file
pub const DB_PATH_ENV: &str = "VAX_DB_PATH";

/// Default database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "./vax_data/vax.db";

/// Resolve the database path following the priority order above.
pub fn resolve_database_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    PathBuf::from(DEFAULT_DB_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn explicit_path_beats_environment() {
        std::env::set_var(DB_PATH_ENV, "/tmp/from-env.db");
        let path = resolve_database_path(Some("/tmp/explicit.db"));
        std::env::remove_var(DB_PATH_ENV);
        assert_eq!(path, PathBuf::from("/tmp/explicit.db"));
    }

    #[test]
    #[serial]
    fn environment_beats_default() {
        std::env::set_var(DB_PATH_ENV, "/tmp/from-env.db");
        let path = resolve_database_path(None);
        std::env::remove_var(DB_PATH_ENV);
        assert_eq!(path, PathBuf::from("/tmp/from-env.db"));
    }

    #[test]
    #[serial]
    fn falls_back_to_compiled_default() {
        std::env::remove_var(DB_PATH_ENV);
        assert_eq!(resolve_database_path(None), PathBuf::from(DEFAULT_DB_PATH));
    }
}
