//! End-to-end properties of a full site build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use docweave_core::index::build_index;
use docweave_core::loader::Loader;
use docweave_core::pipeline::{SilentProgress, build_site, parse_source};
use docweave_shared::{AppConfig, Block, BuildConfig, DocId, DocweaveError, Document, Toc};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<h[1-6] id="[^"]*">(.*?)</h[1-6]>"#).expect("heading regex"));

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn config_for(input: &Path, output: &Path) -> BuildConfig {
    BuildConfig::new(&AppConfig::default(), input.to_path_buf(), output.to_path_buf())
}

/// Every file under `root`, keyed by relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn load_documents(input: &Path) -> Vec<Document> {
    let loader = Loader::new(input, &Default::default()).unwrap();
    loader
        .documents()
        .unwrap()
        .map(|s| parse_source(s.unwrap()).0)
        .collect()
}

fn lesson_tree(root: &Path) {
    write(
        root,
        "objects.md",
        "---\ntitle: Objects\n---\nObjects map keys to values.\n\n# Objects & <Maps>\n## `keys()` and *values*\nSee [arrays](arrays.md).\n## Keys\n## Keys\n",
    );
    write(
        root,
        "arrays.md",
        "# Arrays\n\n```js\nconst a = [1, 2];\n```\n## Methods\n1. push\n2. pop\n",
    );
    write(root, "functions/scope.md", "# Scope\n## Block \"scope\"\n> Hoisting applies.\n");
    write(root, "functions/arrows.md", "# Arrow functions\n### It's terse\n");
}

#[tokio::test]
async fn rebuilding_unchanged_input_is_byte_identical() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    lesson_tree(input.path());
    let config = config_for(input.path(), output.path());

    build_site(&config, &SilentProgress).await.unwrap();
    let first = snapshot(output.path());
    build_site(&config, &SilentProgress).await.unwrap();
    let second = snapshot(output.path());

    assert!(first.contains_key(Path::new("functions/scope.html")));
    assert!(first.contains_key(Path::new("manifest.json")));
    assert_eq!(first, second);
}

#[tokio::test]
async fn rendered_heading_titles_match_index() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    lesson_tree(input.path());

    build_site(&config_for(input.path(), output.path()), &SilentProgress)
        .await
        .unwrap();
    let index = build_index(&load_documents(input.path()));

    for entry in index.entries() {
        let html = std::fs::read_to_string(output.path().join(&entry.href)).unwrap();
        let rendered: Vec<String> = HEADING_RE
            .captures_iter(&html)
            .map(|c| unescape(&c[1]))
            .collect();
        let expected: Vec<String> = index
            .titles(&entry.doc_id)
            .unwrap()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(rendered, expected, "headings of {}", entry.doc_id);
    }

    assert_eq!(
        index.titles(&DocId::from("objects")),
        Some(vec!["Objects & <Maps>", "keys() and values", "Keys", "Keys"])
    );
}

#[tokio::test]
async fn empty_document_builds_without_sections() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "empty.md", "");

    let report = build_site(&config_for(input.path(), output.path()), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.document_count, 1);
    assert_eq!(report.section_count, 0);

    let html = std::fs::read_to_string(output.path().join("empty.html")).unwrap();
    assert_eq!(HEADING_RE.captures_iter(&html).count(), 0);

    let toc: Toc =
        serde_json::from_str(&std::fs::read_to_string(output.path().join("toc.json")).unwrap())
            .unwrap();
    assert_eq!(toc.sections.len(), 1);
    assert_eq!(toc.sections[0].title, "Empty");
    assert!(toc.sections[0].children.is_empty());
}

#[tokio::test]
async fn empty_input_directory_still_builds_index() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let report = build_site(&config_for(input.path(), output.path()), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.document_count, 0);
    assert!(output.path().join("index.html").is_file());
}

#[tokio::test]
async fn missing_input_root_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("site");
    let config = config_for(&tmp.path().join("lessons"), &output);

    let err = build_site(&config, &SilentProgress).await.unwrap_err();
    assert!(matches!(err, DocweaveError::NotFound { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn unwritable_output_is_write_error() {
    let input = tempfile::tempdir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    write(input.path(), "json.md", "# JSON\n");
    let blocker = tmp.path().join("site");
    std::fs::write(&blocker, "a file where the output dir should be").unwrap();

    let err = build_site(&config_for(input.path(), &blocker), &SilentProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DocweaveError::Write { .. }));
}

#[tokio::test]
async fn output_order_does_not_depend_on_parse_concurrency() {
    let input = tempfile::tempdir().unwrap();
    for i in 0..40 {
        let body = "lorem ipsum dolor sit amet\n".repeat(40 - i);
        write(
            input.path(),
            &format!("lesson-{i:02}.md"),
            &format!("# Lesson {i}\n{body}\n## Part A\n## Part B\n"),
        );
    }

    let serial = tempfile::tempdir().unwrap();
    let mut config = config_for(input.path(), serial.path());
    config.render.parse_concurrency = 1;
    build_site(&config, &SilentProgress).await.unwrap();

    let parallel = tempfile::tempdir().unwrap();
    let mut config = config_for(input.path(), parallel.path());
    config.render.parse_concurrency = 8;
    build_site(&config, &SilentProgress).await.unwrap();

    assert_eq!(snapshot(serial.path()), snapshot(parallel.path()));

    let toc: Toc = serde_json::from_str(
        &std::fs::read_to_string(parallel.path().join("toc.json")).unwrap(),
    )
    .unwrap();
    let titles: Vec<String> = toc.sections.iter().map(|s| s.title.clone()).collect();
    let expected: Vec<String> = (0..40).map(|i| format!("Lesson {i}")).collect();
    assert_eq!(titles, expected);
}

#[test]
fn prose_and_code_stay_with_their_sections() {
    let input = tempfile::tempdir().unwrap();
    write(
        input.path(),
        "title.md",
        "# Title\n\nSome text\n\n## Sub\n\n```js\nconsole.log(1)\n```\n",
    );

    let docs = load_documents(input.path());
    assert_eq!(docs[0].sections.len(), 1);

    let title = &docs[0].sections[0];
    assert_eq!(title.title, "Title");
    assert_eq!(title.children.len(), 1);
    assert_eq!(title.children[0].title, "Sub");
    assert_eq!(title.blocks, vec![Block::prose("Some text")]);
    assert_eq!(
        title.blocks_in_order(),
        vec![
            &Block::prose("Some text"),
            &Block::code(Some("js"), "console.log(1)")
        ]
    );
}

#[tokio::test]
async fn cross_document_links_point_at_rendered_pages() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    lesson_tree(input.path());

    build_site(&config_for(input.path(), output.path()), &SilentProgress)
        .await
        .unwrap();

    let objects = std::fs::read_to_string(output.path().join("objects.html")).unwrap();
    assert!(objects.contains("<a href=\"arrays.html\">arrays</a>"));
    assert!(output.path().join("arrays.html").is_file());
}

#[tokio::test]
async fn spaced_file_names_get_encoded_links() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(input.path(), "my lesson.md", "# Mine\n");

    build_site(&config_for(input.path(), output.path()), &SilentProgress)
        .await
        .unwrap();

    assert!(output.path().join("my lesson.html").is_file());
    let index = std::fs::read_to_string(output.path().join("index.html")).unwrap();
    assert!(index.contains("href=\"my%20lesson.html\""));
    assert!(!index.contains("href=\"my lesson.html\""));
}
