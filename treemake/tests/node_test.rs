//! Node file lifecycle: cleaning, temp files and publishing

use convenient_cache::{Cache, FileCache};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use treemake::{CancelToken, Logger, Node, PlatformRoot, TechError};

struct TestRoot(PathBuf);

impl PlatformRoot for TestRoot {
    fn dir(&self) -> &Path {
        &self.0
    }
}

#[derive(Default)]
struct RecordingLogger {
    cleaned: Mutex<Vec<String>>,
}

impl Logger for RecordingLogger {
    fn log_clean(&self, filename: &str) {
        self.cleaned.lock().unwrap().push(filename.to_string());
    }
}

fn setup() -> (TempDir, Node, Arc<RecordingLogger>) {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("pages/index")).unwrap();
    let cache: Arc<dyn Cache> =
        Arc::new(FileCache::open(tmp.path(), tmp.path().join("cache.json")).unwrap());
    let logger = Arc::new(RecordingLogger::default());

    let mut node = Node::new(
        "pages/index",
        Arc::new(TestRoot(tmp.path().to_path_buf())),
        cache,
    );
    node.set_logger(logger.clone());
    (tmp, node, logger)
}

#[test]
fn test_clean_target_file_removes_and_logs() {
    let (tmp, node, logger) = setup();
    let file = tmp.path().join("pages/index/index.js");
    std::fs::write(&file, "x").unwrap();

    assert!(node.clean_target_file("index.js").unwrap());
    assert!(!file.exists());
    assert_eq!(*logger.cleaned.lock().unwrap(), vec!["index.js".to_string()]);
}

#[test]
fn test_clean_missing_target_is_silent() {
    let (_tmp, node, logger) = setup();

    assert!(!node.clean_target_file("index.js").unwrap());
    assert!(!node.clean_target_file("index.js").unwrap());
    assert!(logger.cleaned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_tmp_file_for_target() {
    let (tmp, node, _) = setup();

    let path = node.create_tmp_file_for_target("test_target.js").await.unwrap();
    assert!(path.exists());
    assert_eq!(path.parent().unwrap(), tmp.path().join("pages/index"));

    let name = path.file_name().unwrap().to_str().unwrap();
    let re = regex::Regex::new(r"^_tmp_\d{13,14}\w{6,7}_test_target\.js$").unwrap();
    assert!(re.is_match(name), "{name}");
}

#[tokio::test]
async fn test_concurrent_tmp_files_are_distinct() {
    let (_tmp, node, _) = setup();
    let node = Arc::new(node);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let node = Arc::clone(&node);
        handles.push(tokio::spawn(async move {
            node.create_tmp_file_for_target("a.js").await.unwrap()
        }));
    }

    let mut paths = Vec::new();
    for handle in handles {
        paths.push(handle.await.unwrap());
    }
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 16);
}

#[tokio::test]
async fn test_write_target_file_publishes() {
    let (tmp, node, _) = setup();

    let path = node
        .write_target_file("index.js", b"built", &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(path, tmp.path().join("pages/index/index.js"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "built");
    assert_eq!(node.clean_tmp_files().unwrap(), 0);
}

#[tokio::test]
async fn test_publish_refused_after_cancel() {
    let (tmp, node, _) = setup();
    let target = tmp.path().join("pages/index/index.js");
    std::fs::write(&target, "previous").unwrap();

    let cancel = CancelToken::new();
    let tmp_path = node.create_tmp_file_for_target("index.js").await.unwrap();
    std::fs::write(&tmp_path, "partial").unwrap();
    cancel.cancel();

    let result = node.publish_tmp_file(&tmp_path, "index.js", &cancel).await;
    assert!(matches!(result, Err(TechError::Cancelled)));
    assert!(!tmp_path.exists());
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "previous");
}

#[tokio::test]
async fn test_clean_tmp_files_sweeps_leftovers() {
    let (tmp, node, logger) = setup();
    let dir = tmp.path().join("pages/index");
    std::fs::write(dir.join("index.js"), "keep").unwrap();
    let _ = node.create_tmp_file_for_target("index.js").await.unwrap();
    let _ = node.create_tmp_file_for_target("index.css").await.unwrap();

    assert_eq!(node.clean_tmp_files().unwrap(), 2);
    assert!(dir.join("index.js").exists());
    assert_eq!(logger.cleaned.lock().unwrap().len(), 2);
}

#[test]
fn test_path_helpers() {
    let (tmp, node, _) = setup();

    assert_eq!(node.path(), "pages/index");
    assert_eq!(node.dir(), tmp.path().join("pages/index"));
    assert_eq!(
        node.resolve_node_path("blocks/button", "button.js"),
        tmp.path().join("blocks/button/button.js")
    );
    assert_eq!(node.unmask_node_target_name("pages/index", "?.js"), "index.js");
    assert_eq!(
        node.relative_path(&tmp.path().join("blocks/button/button.js")),
        "../../blocks/button/button.js"
    );
    assert_eq!(
        node.www_root_path(&tmp.path().join("pages/index/index.js"), Some("/static")),
        "/static/pages/index/index.js"
    );
}

#[tokio::test]
async fn test_write_target_creates_missing_node_dir() {
    let tmp = TempDir::new().unwrap();
    let cache: Arc<dyn Cache> =
        Arc::new(FileCache::open(tmp.path(), tmp.path().join("cache.json")).unwrap());
    let node = Node::new(
        "generated/bundle",
        Arc::new(TestRoot(tmp.path().to_path_buf())),
        cache,
    );

    let path = node
        .write_target_file("bundle.js", b"bundle", &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(path, tmp.path().join("generated/bundle/bundle.js"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "bundle");
}
