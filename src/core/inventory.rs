use crate::config::exclusion::ExclusionRules;
use crate::domain::model::{FileRecord, InventoryReport, Manifests};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const FLAT_MANIFEST_FILE: &str = "file_mapping.json";
pub const DETAILED_MANIFEST_FILE: &str = "detailed_file_mapping.json";
pub const DEFAULT_PREVIEW: usize = 10;

#[derive(Debug, Clone)]
pub struct InventoryOptions {
    pub root: PathBuf,
    pub rules: ExclusionRules,
    pub preview: usize,
    /// 本次寫出的輸出檔 (相對於 root 的鍵)，不列入清單
    pub output_keys: BTreeSet<String>,
}

impl InventoryOptions {
    pub fn new(root: impl Into<PathBuf>, rules: ExclusionRules) -> Self {
        Self {
            root: root.into(),
            rules,
            preview: DEFAULT_PREVIEW,
            output_keys: BTreeSet::new(),
        }
    }

    pub fn with_preview(mut self, preview: usize) -> Self {
        self.preview = preview;
        self
    }

    /// 輸出目錄位於 root 之下時，排除實際寫出的兩個檔案，
    /// 重複執行時清單的鍵保持一致。其他同名檔案照常列出。
    pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
        let root = resolve(&self.root);
        let output_dir = resolve(output_dir.as_ref());
        self.output_keys = [FLAT_MANIFEST_FILE, DETAILED_MANIFEST_FILE]
            .iter()
            .filter_map(|name| relative_key(&root, &output_dir.join(name)))
            .collect();
        self
    }
}

/// 盡量轉成正規化的絕對路徑，讓 `.` 與絕對路徑可以互相比較。
/// 尚未建立的輸出目錄改用其父目錄正規化。
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => resolve(parent).join(name),
        _ => absolute,
    }
}

/// 走訪根目錄，產生平面清單與附中繼資料的詳細清單
pub struct FileInventory<S: Storage> {
    storage: S,
    options: InventoryOptions,
}

impl<S: Storage> FileInventory<S> {
    pub fn new(storage: S, options: InventoryOptions) -> Self {
        Self { storage, options }
    }
}

/// 以 `/` 串接的相對路徑，不受平台分隔符影響
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn is_pruned_directory(entry: &DirEntry, rules: &ExclusionRules) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| rules.is_excluded_directory(name))
}

fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// 收集根目錄下所有未被排除的檔案，依路徑排序。
/// `skip` 為要略過的相對路徑鍵。走訪錯誤 (例如權限不足) 直接回傳。
pub fn collect_paths(
    root: &Path,
    rules: &ExclusionRules,
    skip: &BTreeSet<String>,
) -> Result<Vec<String>> {
    let mut paths = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned_directory(entry, rules));

    for entry in walker {
        let entry = entry?;
        if !is_regular_file(&entry) {
            continue;
        }
        let Some(key) = relative_key(root, entry.path()) else {
            continue;
        };
        if skip.contains(&key) || rules.is_excluded(Path::new(&key)) {
            tracing::debug!("Excluded {}", key);
            continue;
        }
        paths.push(key);
    }

    paths.sort();
    Ok(paths)
}

/// 重新 stat 每個路徑；期間消失的檔案略過並計數
pub fn build_manifests(root: &Path, paths: Vec<String>) -> Result<Manifests> {
    let mut manifests = Manifests::default();

    for path in paths {
        match std::fs::metadata(root.join(&path)) {
            Ok(meta) => {
                let modified: DateTime<Local> = meta.modified()?.into();
                manifests.detailed.insert(
                    path.clone(),
                    FileRecord {
                        path: path.clone(),
                        size: meta.len(),
                        modified: modified.to_rfc3339(),
                        is_file: meta.is_file(),
                        is_directory: meta.is_dir(),
                    },
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} vanished before stat, skipping", path);
                manifests.vanished += 1;
            }
            Err(e) => return Err(e.into()),
        }
        manifests.flat.insert(path.clone(), path);
    }

    Ok(manifests)
}

/// 印出摘要與排序後的前幾筆
pub fn print_summary(report: &InventoryReport) {
    println!("📊 Mapped {} files", report.files);
    if report.vanished > 0 {
        println!("⚠️  {} files vanished before they could be inspected", report.vanished);
    }
    if !report.preview.is_empty() {
        println!("First {} entries:", report.preview.len());
        for path in &report.preview {
            println!("  {}", path);
        }
    }
    println!("📁 Flat manifest: {}", report.flat_path);
    println!("📁 Detailed manifest: {}", report.detailed_path);
}

#[async_trait]
impl<S: Storage> Pipeline for FileInventory<S> {
    type Extracted = Vec<String>;
    type Transformed = Manifests;
    type Report = InventoryReport;

    fn name(&self) -> &str {
        "file inventory"
    }

    async fn extract(&mut self) -> Result<Vec<String>> {
        tracing::debug!("Walking {}", self.options.root.display());
        let paths = collect_paths(
            &self.options.root,
            &self.options.rules,
            &self.options.output_keys,
        )?;
        println!("Found {} files", paths.len());
        Ok(paths)
    }

    async fn transform(&self, data: Vec<String>) -> Result<Manifests> {
        build_manifests(&self.options.root, data)
    }

    async fn load(&mut self, manifests: Manifests) -> Result<InventoryReport> {
        let flat_json = serde_json::to_string_pretty(&manifests.flat)?;
        self.storage
            .write_file(FLAT_MANIFEST_FILE, flat_json.as_bytes())
            .await?;

        let detailed_json = serde_json::to_string_pretty(&manifests.detailed)?;
        self.storage
            .write_file(DETAILED_MANIFEST_FILE, detailed_json.as_bytes())
            .await?;

        Ok(InventoryReport {
            files: manifests.flat.len(),
            detailed: manifests.detailed.len(),
            vanished: manifests.vanished,
            flat_path: self.storage.location(FLAT_MANIFEST_FILE),
            detailed_path: self.storage.location(DETAILED_MANIFEST_FILE),
            preview: manifests
                .flat
                .keys()
                .take(self.options.preview)
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/tmp/project");
        assert_eq!(
            relative_key(root, &root.join("src").join("index.ts")).as_deref(),
            Some("src/index.ts")
        );
        assert_eq!(relative_key(root, root), None);
    }

    #[test]
    fn test_collect_paths_prunes_and_sorts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/z.rs", "");
        touch(temp.path(), "src/a.rs", "");
        touch(temp.path(), ".git/HEAD", "ref");
        touch(temp.path(), "app.min.js", "");
        touch(temp.path(), "README.md", "# hi");

        let paths =
            collect_paths(temp.path(), &ExclusionRules::default(), &BTreeSet::new()).unwrap();
        assert_eq!(paths, vec!["README.md", "src/a.rs", "src/z.rs"]);
    }

    #[test]
    fn test_build_manifests_skips_vanished_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "kept.txt", "hello");

        let manifests = build_manifests(
            temp.path(),
            vec!["kept.txt".to_string(), "gone.txt".to_string()],
        )
        .unwrap();

        assert_eq!(manifests.vanished, 1);
        assert!(manifests.detailed.contains_key("kept.txt"));
        assert!(!manifests.detailed.contains_key("gone.txt"));

        let record = &manifests.detailed["kept.txt"];
        assert_eq!(record.size, 5);
        assert!(record.is_file);
        assert!(!record.is_directory);
        assert!(DateTime::parse_from_rfc3339(&record.modified).is_ok());
    }

    #[test]
    fn test_output_keys_follow_output_dir_under_root() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("reports");

        let options = InventoryOptions::new(temp.path(), ExclusionRules::empty())
            .with_output_dir(&out);
        assert_eq!(options.preview, DEFAULT_PREVIEW);
        assert!(options.output_keys.contains("reports/file_mapping.json"));
        assert!(options.output_keys.contains("reports/detailed_file_mapping.json"));
        assert!(!options.rules.is_excluded(Path::new(FLAT_MANIFEST_FILE)));
    }

    #[test]
    fn test_output_dir_outside_root_excludes_nothing() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(root.path(), "data/file_mapping.json", "{}");
        touch(root.path(), "file_mapping.json", "{}");

        let options = InventoryOptions::new(root.path(), ExclusionRules::default())
            .with_output_dir(out.path());
        assert!(options.output_keys.is_empty());

        let paths = collect_paths(root.path(), &options.rules, &options.output_keys).unwrap();
        assert_eq!(paths, vec!["data/file_mapping.json", "file_mapping.json"]);
    }
}
