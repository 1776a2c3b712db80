use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pretty_assertions::assert_eq;
use semver::Version;
use tempfile::TempDir;
use upgrader_domain::version::range_from_target;
use upgrader_domain::{CodemodRepository, DomainError, FindQuery, Range, Target};
use upgrader_types::CodemodKind;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn touch(path: &Utf8Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

fn sample_repo() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    touch(&root.join("1.0.0/init.code.ts"));
    touch(&root.join("1.1.0/rename-entry.code.ts"));
    touch(&root.join("1.1.1/b-second.code.ts"));
    touch(&root.join("1.1.1/a-first.document.json"));
    touch(&root.join("1.1.1/README.md"));
    touch(&root.join("1.1.2/bump.document.yaml"));
    touch(&root.join("2.0.0/major.code.ts"));
    touch(&root.join("not-a-version/ignored.code.ts"));
    (temp, root)
}

#[test]
fn scan_groups_by_version_and_ignores_noise() {
    let (_temp, root) = sample_repo();
    let repo = CodemodRepository::open(&root).unwrap();

    assert_eq!(
        repo.versions(),
        vec![v("1.0.0"), v("1.1.0"), v("1.1.1"), v("1.1.2"), v("2.0.0")]
    );

    let names: Vec<String> = repo
        .find_by_version(&v("1.1.1"))
        .iter()
        .map(|c| c.filename.clone())
        .collect();
    assert_eq!(names, vec!["a-first.document.json", "b-second.code.ts"]);
    assert_eq!(repo.count(&v("1.1.1")), 2);
    assert!(repo.find_by_version(&v("9.9.9")).is_empty());
}

#[test]
fn exact_target_selects_versions_after_current() {
    let (_temp, root) = sample_repo();
    let repo = CodemodRepository::open(&root).unwrap();

    let range = range_from_target(&v("1.1.0"), &Target::Exact(v("1.1.2"))).unwrap();
    let found = repo.find(&FindQuery::in_range(range));

    let versions: Vec<Version> = found.iter().map(|c| c.version.clone()).collect();
    assert_eq!(versions, vec![v("1.1.1"), v("1.1.2")]);
    assert_eq!(found[1].codemods[0].kind, CodemodKind::Document);
}

#[test]
fn uid_lookup_bypasses_the_range() {
    let (_temp, root) = sample_repo();
    let repo = CodemodRepository::open(&root).unwrap();

    let query = FindQuery {
        range: Some(Range::exact(v("2.0.0"))),
        uids: Some(vec!["1.0.0-init-code".to_string(), "unknown".to_string()]),
    };
    let found = repo.find(&query);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].codemods[0].uid(), "1.0.0-init-code");

    assert!(repo.find_by_uid("1.1.2-bump-document").is_some());
    assert!(repo.find_by_uid("1.1.2-bump-code").is_none());
}

#[test]
fn refresh_picks_up_new_codemods() {
    let (_temp, root) = sample_repo();
    let mut repo = CodemodRepository::open(&root).unwrap();
    assert_eq!(repo.count(&v("2.0.0")), 1);

    touch(&root.join("2.0.0/another.code.js"));
    repo.refresh().unwrap();
    assert_eq!(repo.count(&v("2.0.0")), 2);
}

#[test]
fn missing_or_empty_root_is_invalid() {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();

    let err = CodemodRepository::open(root.join("nope")).unwrap_err();
    assert!(matches!(err, DomainError::InvalidRepository { .. }));

    touch(&root.join("latest/x.code.ts"));
    let err = CodemodRepository::open(&root).unwrap_err();
    assert!(err.to_string().contains("no valid version directories"));
}
