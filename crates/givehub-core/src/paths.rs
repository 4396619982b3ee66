// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use crate::ENV_GIVEHUB_DB_PATH;

#[must_use]
pub fn resolve_db_path() -> PathBuf {
    resolve_db_path_with(|name| std::env::var(name).ok())
}

/// Resolution order: `GIVEHUB_DB_PATH`, `$XDG_DATA_HOME/givehub`,
/// `$HOME/.local/share/givehub`, then `.givehub` in the working directory.
#[must_use]
pub fn resolve_db_path_with(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    let non_empty = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(explicit) = non_empty(ENV_GIVEHUB_DB_PATH) {
        return PathBuf::from(explicit);
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("givehub").join("givehub.sqlite");
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("givehub")
            .join("givehub.sqlite");
    }
    PathBuf::from(".givehub").join("givehub.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn explicit_path_wins_over_xdg_and_home() {
        let path = resolve_db_path_with(env(&[
            (ENV_GIVEHUB_DB_PATH, "/srv/givehub.db"),
            ("XDG_DATA_HOME", "/xdg"),
            ("HOME", "/home/u"),
        ]));
        assert_eq!(path, PathBuf::from("/srv/givehub.db"));
    }

    #[test]
    fn blank_values_fall_through_to_next_source() {
        let path = resolve_db_path_with(env(&[
            (ENV_GIVEHUB_DB_PATH, "  "),
            ("HOME", "/home/u"),
        ]));
        assert_eq!(
            path,
            PathBuf::from("/home/u/.local/share/givehub/givehub.sqlite")
        );
    }

    #[test]
    fn workspace_fallback_when_nothing_is_set() {
        let path = resolve_db_path_with(env(&[]));
        assert_eq!(path, PathBuf::from(".givehub/givehub.sqlite"));
    }
}
