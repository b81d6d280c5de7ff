// tests/ingest.rs

//! Package ingestion tests: directory loads, idempotent adds, tool failures,
//! ELF indexing and source package indexing.

mod common;

use common::{
    FIXTURE_FLAGS, FixtureInspector, PayloadFile, binary, count_rows, setup_test_db, source,
    write_package_file,
};
use rq::db::models::{
    BuildRequirement, DependencyEntry, DependencyKind, FileEntry, HardeningFlags, Package,
    SourceEntry, SourceKind,
};
use rq::{AddOutcome, Error, PackageIngestor, PackageKind, SilentProgress, Tag};

const BASH: &str = "bash-5.0-1.fc32.x86_64.rpm";

fn bash_fixture() -> common::FixturePackage {
    let mut pkg = binary(
        "bash",
        "5.0",
        "1.fc32",
        "x86_64",
        &["/bin/bash", "/usr/bin/bashbug", "/usr/share/doc/bash/README"],
    );
    pkg.payload = vec![
        PayloadFile::elf("bin/bash", &["printf", "__cxa_throw", "my_custom_func", "bash_main"]),
        PayloadFile::text("usr/bin/bashbug", "#!/bin/sh\necho report\n", 0o755),
    ];
    pkg
}

#[test]
fn test_add_directory_loads_binary_package() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    write_package_file(repo.path(), BASH);

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let tag = Tag::create(
        &conn,
        PackageKind::Binary,
        "fedora32",
        repo.path().to_str().unwrap(),
        None,
    )
    .unwrap();

    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);
    let summary = ingestor
        .add_directory(&mut conn, &tag, repo.path(), &SilentProgress::new())
        .unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.failed, 0);

    let packages = Package::find_by_tag(&conn, tag.id).unwrap();
    assert_eq!(packages.len(), 1);
    let bash = &packages[0];
    assert_eq!(bash.fullname, BASH);
    assert_eq!(bash.release, "1.fc32");
    assert!(!bash.is_update);
    let id = bash.id.unwrap();

    // README is an administrative file and never listed
    assert_eq!(FileEntry::count_for_package(&conn, id).unwrap(), 2);
    assert!(FileEntry::find_id_by_path(&conn, id, "/usr/share/doc/bash/README").unwrap().is_none());

    let bash_file = FileEntry::find_id_by_path(&conn, id, "/bin/bash").unwrap().unwrap();
    assert_eq!(HardeningFlags::find_by_file(&conn, bash_file).unwrap(), Some(FIXTURE_FLAGS));
    let script = FileEntry::find_id_by_path(&conn, id, "/usr/bin/bashbug").unwrap().unwrap();
    assert_eq!(HardeningFlags::find_by_file(&conn, script).unwrap(), None);

    let provides = DependencyEntry::names_for_package(&conn, DependencyKind::Provides, id).unwrap();
    assert_eq!(provides, vec!["bash"]);
    let requires = DependencyEntry::names_for_package(&conn, DependencyKind::Requires, id).unwrap();
    assert_eq!(requires, vec!["libc.so.6()(64bit)"]);
}

#[test]
fn test_failed_record_is_dropped_and_package_still_added() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let path = write_package_file(repo.path(), BASH);
    conn.execute_batch(
        "CREATE TRIGGER reject_bashbug BEFORE INSERT ON files
         WHEN NEW.path = '/usr/bin/bashbug'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);

    let added = match ingestor.add_package(&mut conn, &tag, &path, false).unwrap() {
        AddOutcome::Added(added) => added,
        other => panic!("expected Added, got {:?}", other),
    };
    assert_eq!(added.records.files, 1);
    assert_eq!(added.records.dropped, 1);
    assert_eq!(added.records.symbols, 2);

    let id = added.package.id;
    assert_eq!(FileEntry::count_for_package(&conn, id).unwrap(), 1);
    let bash_file = FileEntry::find_id_by_path(&conn, id, "/bin/bash").unwrap().unwrap();
    assert_eq!(HardeningFlags::find_by_file(&conn, bash_file).unwrap(), Some(FIXTURE_FLAGS));
    assert!(FileEntry::find_id_by_path(&conn, id, "/usr/bin/bashbug").unwrap().is_none());
    let requires = DependencyEntry::names_for_package(&conn, DependencyKind::Requires, id).unwrap();
    assert_eq!(requires, vec!["libc.so.6()(64bit)"]);
}

#[test]
fn test_symbol_exclusion_filter() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let path = write_package_file(repo.path(), BASH);

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);
    ingestor.add_package(&mut conn, &tag, &path, false).unwrap();

    let mut stmt = conn
        .prepare("SELECT name FROM symbols WHERE tag_id = ?1 ORDER BY name")
        .unwrap();
    let symbols: Vec<String> = stmt
        .query_map([tag.id], |row| row.get(0))
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(symbols, vec!["bash_main", "my_custom_func"]);
}

#[test]
fn test_add_is_idempotent() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let path = write_package_file(repo.path(), BASH);

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);

    let first = ingestor.add_package(&mut conn, &tag, &path, false).unwrap();
    assert!(first.is_added());
    let second = ingestor.add_package(&mut conn, &tag, &path, false).unwrap();
    assert!(matches!(second, AddOutcome::Skipped { .. }));

    assert_eq!(tag.package_count(&conn).unwrap(), 1);
    assert_eq!(count_rows(&conn, "files", tag.id), 2);
}

#[test]
fn test_same_package_in_two_tags() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let path = write_package_file(repo.path(), BASH);

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let f32 = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let f33 = Tag::create(&conn, PackageKind::Binary, "f33", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);

    assert!(ingestor.add_package(&mut conn, &f32, &path, false).unwrap().is_added());
    assert!(ingestor.add_package(&mut conn, &f33, &path, false).unwrap().is_added());
    assert_eq!(count_rows(&conn, "files", f32.id), 2);
    assert_eq!(count_rows(&conn, "files", f33.id), 2);
}

#[test]
fn test_unreadable_header_fails_without_storing() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let path = write_package_file(repo.path(), "broken-1.0-1.x86_64.rpm");

    let inspector = FixtureInspector::new();
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);

    match ingestor.add_package(&mut conn, &tag, &path, false).unwrap() {
        AddOutcome::Failed { reason } => assert!(reason.contains("not an rpm package")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(tag.package_count(&conn).unwrap(), 0);
    assert_eq!(count_rows(&conn, "files", tag.id), 0);
}

#[test]
fn test_wrong_kind_is_a_validation_error() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let srpm = write_package_file(repo.path(), "bash-5.0-1.fc32.src.rpm");

    let inspector = FixtureInspector::new();
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);
    let result = ingestor.add_package(&mut conn, &tag, &srpm, false);
    assert!(matches!(result, Err(Error::ValidationError(_))));

    let source_tag = Tag::create(&conn, PackageKind::Source, "f32", "/repo", None).unwrap();
    let result = ingestor.add_package(&mut conn, &source_tag, &srpm, false);
    assert!(matches!(result, Err(Error::ValidationError(_))));
}

#[test]
fn test_add_directory_tallies_failures() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    write_package_file(repo.path(), BASH);
    write_package_file(repo.path(), "corrupt-1.0-1.x86_64.rpm");
    std::fs::write(repo.path().join("fake-1.0-1.x86_64.rpm"), b"not a package at all").unwrap();

    let inspector = FixtureInspector::new().with(BASH, bash_fixture());
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);
    let summary = ingestor
        .add_directory(&mut conn, &tag, repo.path(), &SilentProgress::new())
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.failed, 2);
    let failed: Vec<&str> = summary.failures.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(failed, vec!["corrupt-1.0-1.x86_64.rpm", "fake-1.0-1.x86_64.rpm"]);
}

#[test]
fn test_reference_cache_shared_across_packages() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let zsh = "zsh-5.8-1.fc32.x86_64.rpm";
    write_package_file(repo.path(), BASH);
    write_package_file(repo.path(), zsh);

    let inspector = FixtureInspector::new()
        .with(BASH, bash_fixture())
        .with(zsh, binary("zsh", "5.8", "1.fc32", "x86_64", &["/bin/zsh"]));
    let tag = Tag::create(&conn, PackageKind::Binary, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Binary);
    ingestor
        .add_directory(&mut conn, &tag, repo.path(), &SilentProgress::new())
        .unwrap();

    // root user, root group, two provides and one shared requires
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
    let capabilities: i64 = conn
        .query_row("SELECT COUNT(*) FROM capabilities", [], |r| r.get(0))
        .unwrap();
    assert_eq!(users, 1);
    assert_eq!(capabilities, 3);
    assert_eq!(ingestor.cache().len(), 5);
    assert_eq!(ingestor.cache().store_lookups(), 5);
}

#[test]
fn test_source_package_indexing() {
    let (_db_dir, mut conn) = setup_test_db();
    let repo = tempfile::tempdir().unwrap();
    let srpm = "bash-5.0-1.fc32.src.rpm";
    let path = write_package_file(repo.path(), srpm);

    let inspector = FixtureInspector::new().with(srpm, source("bash", "5.0", "1.fc32"));
    let tag = Tag::create(&conn, PackageKind::Source, "f32", "/repo", None).unwrap();
    let mut ingestor = PackageIngestor::new(&inspector, PackageKind::Source);

    let added = match ingestor.add_package(&mut conn, &tag, &path, false).unwrap() {
        AddOutcome::Added(added) => added,
        other => panic!("expected Added, got {:?}", other),
    };
    assert_eq!(added.records.sources, 2);
    // two tarball members (README excluded) and one patch target
    assert_eq!(added.records.source_files, 3);
    assert_eq!(added.records.ctags, 2);
    assert_eq!(added.records.buildreqs, 3);
    assert_eq!(added.records.dropped, 0);

    let package = Package::find_by_fullname(&conn, tag.id, srpm).unwrap().unwrap();
    assert_eq!(package.arch, "src");
    let id = package.id.unwrap();

    let sources = SourceEntry::find_by_package(&conn, id).unwrap();
    let mut names: Vec<(SourceKind, &str)> =
        sources.iter().map(|s| (s.kind, s.filename.as_str())).collect();
    names.sort_by_key(|(_, f)| *f);
    assert_eq!(
        names,
        vec![
            (SourceKind::Tarball, "bash-5.0.tar.gz"),
            (SourceKind::Patch, "bash-fix.patch"),
        ]
    );

    let reqs = BuildRequirement::names_for_package(&conn, id).unwrap();
    assert!(reqs.contains(&"ncurses-devel >= 5.9".to_string()));
    assert!(reqs.contains(&"gcc".to_string()));

    // source tags carry no binary records
    assert_eq!(count_rows(&conn, "files", tag.id), 0);
    assert_eq!(count_rows(&conn, "ctags", tag.id), 2);
}
