//! Template file sets.

use crate::error::DbResult;
use std::path::{Path, PathBuf};

/// Templates shipped with the crate, registered on every new connection
/// before any user source.
pub(crate) const BUILTIN: &[(&str, &str)] = &[
    ("builtin/insert.sql", include_str!("../../templates/builtin/insert.sql")),
    ("builtin/update.sql", include_str!("../../templates/builtin/update.sql")),
    ("builtin/delete.sql", include_str!("../../templates/builtin/delete.sql")),
    ("builtin/select.sql", include_str!("../../templates/builtin/select.sql")),
    ("builtin/count.sql", include_str!("../../templates/builtin/count.sql")),
];

/// A directory plus glob patterns relative to it.
///
/// Template names keep the relative path with `/` separators, so
/// `dir/user/find_by_name.sql` registers as `user/find_by_name.sql`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSource {
    dir: PathBuf,
    patterns: Vec<String>,
}

impl TemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            patterns: Vec::new(),
        }
    }

    /// Add a glob pattern such as `**/*.sql`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every matching file as `(name, source)` in pattern order.
    pub fn read(&self) -> DbResult<Vec<(String, String)>> {
        let mut out = Vec::new();
        let patterns: Vec<&str> = if self.patterns.is_empty() {
            vec!["**/*.sql"]
        } else {
            self.patterns.iter().map(String::as_str).collect()
        };

        for pattern in patterns {
            let full = self.dir.join(pattern);
            let mut matches: Vec<PathBuf> = glob::glob(&full.to_string_lossy())?
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .collect();
            matches.sort();
            for path in matches {
                let name = path
                    .strip_prefix(&self.dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let source = std::fs::read_to_string(&path)?;
                tracing::info!(template = %name, path = %path.display(), "parse sql template");
                out.push((name, source));
            }
        }
        Ok(out)
    }
}
