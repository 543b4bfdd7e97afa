use std::fs::{self, File};
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vcode_project::project::view::render_list;
use vcode_project::project::{visible_items, FileIndex, ProjectTree};
use vcode_project::{load_project, FilesParser, ProjectError, SettingsParser};

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap();
}

fn parse(root: &Path, xml: &str) -> Result<ProjectTree, ProjectError> {
    let settings = root.join("project.files.xml");
    fs::write(&settings, xml).unwrap();
    load_project(&settings)
}

fn expanded_list(tree: &ProjectTree) -> Vec<String> {
    render_list(tree, &visible_items(tree, |_| true, |_| true))
}

#[test]
fn duplicate_titles_abort_the_parse() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.txt");
    let err = parse(
        dir.path(),
        r#"<files><group title="G"><file path="a.txt" title="A"/><file path="a.txt" title="A"/></group></files>"#,
    )
    .unwrap_err();
    match err {
        ProjectError::DuplicateName { title, group } => {
            assert_eq!(title, "A");
            assert_eq!(group, "G");
        }
        other => panic!("expected DuplicateName, got {other}"),
    }
}

#[test]
fn dir_exclude_keeps_only_matching_files() {
    let dir = TempDir::new().unwrap();
    let scanned = dir.path().join("scanned");
    touch(&scanned, "keep.txt");
    touch(&scanned, "ignore.log");
    fs::write(
        scanned.join("project.files.xml"),
        r#"<files name="P"><dir path="." title="Root"><exclude><shellpatterns>*.log *.xml</shellpatterns></exclude></dir></files>"#,
    )
    .unwrap();

    let tree = load_project(&scanned.join("project.files.xml")).unwrap();
    let root_group = tree.find_by_title_path(["Root"]).unwrap();
    let children: Vec<&str> = tree
        .children(root_group)
        .map(|id| tree[id].title())
        .collect();
    assert_eq!(children, vec!["keep.txt"]);
}

#[test]
fn excluded_directory_is_never_entered() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "code/keep.c");
    touch(dir.path(), "code/build/out.o");
    touch(dir.path(), "code/build/deep/more.o");
    let tree = parse(
        dir.path(),
        r#"<files name="P"><dir path="code"><exclude><shellpatterns>*/build</shellpatterns></exclude></dir></files>"#,
    )
    .unwrap();
    assert_eq!(expanded_list(&tree), vec!["|~P/", "| |~code/", "| | |-keep.c"]);
}

#[test]
fn settings_document_shape_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "README.txt");
    touch(root, "src/main.c");
    touch(root, "src/main.o");
    touch(root, "src/cache.pyc");
    touch(root, "src/old.bak");
    touch(root, "src/lib/util.c");
    touch(root, "tools/build.sh");
    touch(root, "tools/deploy.sh");
    touch(root, "tools/notes.txt");

    let tree = parse(
        root,
        r#"<files name="ProjectName">
  <exclude inherit="yes">
    <shellpatterns>*.o *.pyc</shellpatterns>
    <pyregex>.*\.bak$</pyregex>
  </exclude>
  <group title="Sources">
    <dir path="src" title="src"/>
    <file path="README.txt" title="Readme"/>
  </group>
  <filesearch pattern="tools/*.sh"/>
</files>"#,
    )
    .unwrap();

    assert_eq!(
        expanded_list(&tree),
        vec![
            "|~ProjectName/",
            "| |~Sources/",
            "| | |~src/",
            "| | | |~lib/",
            "| | | | |-util.c",
            "| | | |-main.c",
            "| | |-Readme",
            "| |-build.sh",
            "| |-deploy.sh",
        ]
    );

    let index = FileIndex::build(&tree);
    assert_eq!(index.len(), 9);
    for (id, item) in index.iter() {
        match item.parent() {
            Some(parent) => assert_eq!(item.depth(), tree[parent].depth() + 1),
            None => {
                assert_eq!(id, tree.root());
                assert_eq!(item.depth(), 0);
            }
        }
    }

    let util = tree
        .find_by_title_path(["Sources", "src", "lib", "util.c"])
        .unwrap();
    let util = tree[util].as_file().unwrap();
    assert_eq!(util.declared_path, "src/lib/util.c");
    assert!(util.absolute_path.is_file());
}

#[test]
fn failed_parse_reports_offending_path() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "present.txt");
    let err = parse(
        dir.path(),
        r#"<files><file path="present.txt"/><dir path="missing"/></files>"#,
    )
    .unwrap_err();
    match err {
        ProjectError::PathResolution { path, .. } => assert!(path.ends_with("missing")),
        other => panic!("expected PathResolution, got {other}"),
    }
}

#[test]
fn file_outside_a_group_container_is_rejected() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "src/a.c");
    let err = parse(
        dir.path(),
        r#"<files><filesearch pattern="src/*.c"><file path="src/a.c"/></filesearch></files>"#,
    )
    .unwrap_err();
    assert!(matches!(err, ProjectError::Structure { ref tag, .. } if tag == "file"));
}

#[test]
fn project_directory_merges_fragments_in_name_order() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "docs/guide.md");
    touch(root, "src/a.rs");
    let project = root.join("sample.vcode");
    fs::create_dir(&project).unwrap();
    fs::write(
        project.join("b.files.xml"),
        r#"<files><group title="Docs"><dir path="docs"/></group></files>"#,
    )
    .unwrap();
    fs::write(
        project.join("a.files.xml"),
        r#"<files><group title="Code"><filesearch pattern="src/*.rs"/></group></files>"#,
    )
    .unwrap();

    let settings = SettingsParser::open(&project).unwrap();
    assert_eq!(settings.project_name(), "sample");
    assert_eq!(settings.root_dir(), fs::canonicalize(root).unwrap());

    let tree = settings.parse().unwrap();
    assert_eq!(
        expanded_list(&tree),
        vec![
            "|~sample/",
            "| |~Code/",
            "| | |-a.rs",
            "| |~Docs/",
            "| | |~docs/",
            "| | | |-guide.md",
        ]
    );
}

#[test]
fn reparse_builds_an_independent_tree() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "one.txt");
    let mut parser = FilesParser::new(dir.path(), Some("P".into()));
    parser.add_document("x.files.xml", r#"<files><dir path="." title="All"/></files>"#);
    let first = parser.parse().unwrap();

    touch(dir.path(), "two.txt");
    let second = parser.parse().unwrap();

    let all = |tree: &ProjectTree| {
        let group = tree.find_by_title_path(["All"]).unwrap();
        tree.children(group).count()
    };
    assert_eq!(all(&first), 1);
    assert_eq!(all(&second), 2);
}
