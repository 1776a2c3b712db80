//! Codemod discovery: `<root>/<semver>/<name>.<kind>.<ext>`.

use crate::error::{DomainError, DomainResult};
use crate::version::Range;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::{glob, Pattern};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use upgrader_types::{Codemod, CodemodKind, VersionedCollection};

/// Query for [`CodemodRepository::find`].
///
/// When `uids` is set the range is ignored: running codemods by identity is
/// an explicit escape hatch from range filtering.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub range: Option<Range>,
    pub uids: Option<Vec<String>>,
}

impl FindQuery {
    pub fn in_range(range: Range) -> Self {
        Self {
            range: Some(range),
            uids: None,
        }
    }

    pub fn by_uids<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            range: None,
            uids: Some(uids.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodemodRepository {
    root: Utf8PathBuf,
    groups: BTreeMap<Version, Vec<Codemod>>,
}

impl CodemodRepository {
    /// Create an empty repository; call [`refresh`](Self::refresh) to scan.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Create and scan in one step.
    pub fn open(root: impl Into<Utf8PathBuf>) -> DomainResult<Self> {
        let mut repo = Self::new(root);
        repo.refresh()?;
        Ok(repo)
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Rebuild every codemod from disk.
    pub fn refresh(&mut self) -> DomainResult<()> {
        self.groups.clear();

        if !self.root.is_dir() {
            return Err(self.invalid("directory does not exist"));
        }

        let entries = fs::read_dir(&self.root).map_err(|e| self.invalid(&e.to_string()))?;

        let mut versions: Vec<(Version, Utf8PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.invalid(&e.to_string()))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match Version::parse(&name) {
                Ok(version) => versions.push((version, self.root.join(&name))),
                Err(_) => debug!(dir = %name, "skipping non-version directory"),
            }
        }

        if versions.is_empty() {
            return Err(self.invalid("no valid version directories found"));
        }

        versions.sort_by(|a, b| a.0.cmp(&b.0));

        for (version, dir) in versions {
            let codemods = scan_version_dir(&version, &dir)?;
            debug!(version = %version, count = codemods.len(), "loaded codemods");
            self.groups.insert(version, codemods);
        }

        Ok(())
    }

    /// Versions with a codemod directory, ascending.
    pub fn versions(&self) -> Vec<Version> {
        self.groups.keys().cloned().collect()
    }

    /// Exact lookup. Unknown versions yield an empty list.
    pub fn find_by_version(&self, version: &Version) -> Vec<Codemod> {
        self.groups.get(version).cloned().unwrap_or_default()
    }

    pub fn find_by_uid(&self, uid: &str) -> Option<Codemod> {
        self.groups
            .values()
            .flatten()
            .find(|c| c.uid() == uid)
            .cloned()
    }

    /// Collections matching the query, ascending by version.
    pub fn find(&self, query: &FindQuery) -> Vec<VersionedCollection> {
        if let Some(uids) = &query.uids {
            let wanted: BTreeSet<&str> = uids.iter().map(String::as_str).collect();
            return self
                .groups
                .values()
                .flatten()
                .filter(|c| wanted.contains(c.uid().as_str()))
                .map(|c| VersionedCollection::new(c.version.clone(), vec![c.clone()]))
                .collect();
        }

        self.groups
            .iter()
            .filter(|(version, _)| {
                query
                    .range
                    .as_ref()
                    .is_none_or(|range| range.contains(version))
            })
            .map(|(version, codemods)| VersionedCollection::new(version.clone(), codemods.clone()))
            .collect()
    }

    pub fn count(&self, version: &Version) -> usize {
        self.groups.get(version).map_or(0, Vec::len)
    }

    pub fn count_range(&self, range: &Range) -> usize {
        self.find(&FindQuery::in_range(range.clone()))
            .iter()
            .map(VersionedCollection::len)
            .sum()
    }

    fn invalid(&self, message: &str) -> DomainError {
        DomainError::InvalidRepository {
            root: self.root.clone(),
            message: message.to_string(),
        }
    }
}

fn scan_version_dir(version: &Version, dir: &Utf8Path) -> DomainResult<Vec<Codemod>> {
    let invalid = |message: String| DomainError::InvalidRepository {
        root: dir.to_path_buf(),
        message,
    };

    let pattern = format!("{}/*.*.*", Pattern::escape(dir.as_str()));
    let entries = glob(&pattern).map_err(|e| invalid(format!("glob {pattern}: {e}")))?;

    let mut codemods = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| invalid(format!("glob error: {e}")))?;
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match CodemodKind::split_filename(filename) {
            Some((_, kind, _)) => {
                codemods.push(Codemod::new(kind, version.clone(), dir, filename));
            }
            None => debug!(file = %filename, "skipping file without codemod suffix"),
        }
    }

    codemods.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(codemods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn write_layout(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        for rel in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
            std::fs::write(&path, "[]").expect("write");
        }
        (temp, root)
    }

    #[test]
    fn refresh_groups_by_version_ascending() {
        let (_t, root) = write_layout(&[
            "5.0.0/b.code.ts",
            "5.0.0/a.document.json",
            "4.16.0/x.code.js",
            "notes/readme.code.ts",
        ]);
        let repo = CodemodRepository::open(&root).unwrap();

        assert_eq!(repo.versions(), vec![v("4.16.0"), v("5.0.0")]);
        let names: Vec<String> = repo
            .find_by_version(&v("5.0.0"))
            .iter()
            .map(|c| c.filename.clone())
            .collect();
        assert_eq!(names, vec!["a.document.json", "b.code.ts"]);
    }

    #[test]
    fn refresh_ignores_files_without_kind_suffix() {
        let (_t, root) = write_layout(&["1.0.0/a.code.ts", "1.0.0/README.md", "1.0.0/b.json.ts"]);
        let repo = CodemodRepository::open(&root).unwrap();
        assert_eq!(repo.count(&v("1.0.0")), 1);
    }

    #[test]
    fn missing_root_is_invalid() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("nope")).unwrap();
        let err = CodemodRepository::open(&root).unwrap_err();
        assert!(matches!(err, DomainError::InvalidRepository { .. }));
    }

    #[test]
    fn root_without_version_dirs_is_invalid() {
        let (_t, root) = write_layout(&["latest/a.code.ts", "4.x/b.code.ts"]);
        let err = CodemodRepository::open(&root).unwrap_err();
        assert!(err.to_string().contains("no valid version directories"));
    }

    #[test]
    fn find_by_version_unknown_is_empty() {
        let (_t, root) = write_layout(&["1.0.0/a.code.ts"]);
        let repo = CodemodRepository::open(&root).unwrap();
        assert!(repo.find_by_version(&v("9.9.9")).is_empty());
        assert_eq!(repo.count(&v("9.9.9")), 0);
    }

    #[test]
    fn find_by_uids_ignores_range() {
        let (_t, root) = write_layout(&["1.0.0/a.code.ts", "2.0.0/b.document.json"]);
        let repo = CodemodRepository::open(&root).unwrap();

        let query = FindQuery {
            range: Some(Range::exact(v("2.0.0"))),
            uids: Some(vec!["1.0.0-a-code".to_string(), "unknown".to_string()]),
        };
        let found = repo.find(&query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, v("1.0.0"));
        assert_eq!(found[0].codemods[0].uid(), "1.0.0-a-code");
    }

    #[test]
    fn refresh_picks_up_new_files() {
        let (_t, root) = write_layout(&["1.0.0/a.code.ts"]);
        let mut repo = CodemodRepository::open(&root).unwrap();
        assert_eq!(repo.count(&v("1.0.0")), 1);

        std::fs::write(root.join("1.0.0/b.code.ts"), "").unwrap();
        repo.refresh().unwrap();
        assert_eq!(repo.count(&v("1.0.0")), 2);
        assert!(repo.find_by_uid("1.0.0-b-code").is_some());
    }
}
