use std::collections::BTreeSet;
use std::path::{Component, Path};

/// 版本控制、相依套件快取、建置輸出、編輯器設定等暫存目錄
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "dist",
    "build",
    "out",
    "target",
    ".next",
    ".nuxt",
    ".vite",
    ".cache",
    ".parcel-cache",
    "coverage",
    ".idea",
    ".vscode",
];

/// 以後綴比對，所以 `.min.js` 這類複合副檔名也適用
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".log",
    ".tmp",
    ".temp",
    ".swp",
    ".swo",
    ".lock",
    ".map",
    ".pyc",
    ".lcov",
    ".min.js",
    ".min.css",
    ".bundle.js",
    ".chunk.js",
];

pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "npm-shrinkwrap.json",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".env.test",
    ".DS_Store",
    "Thumbs.db",
];

/// 檔案清單的排除規則
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRules {
    directories: BTreeSet<String>,
    extensions: BTreeSet<String>,
    files: BTreeSet<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::empty()
            .with_directories(DEFAULT_EXCLUDED_DIRECTORIES.iter().copied())
            .with_extensions(DEFAULT_EXCLUDED_EXTENSIONS.iter().copied())
            .with_files(DEFAULT_EXCLUDED_FILES.iter().copied())
    }
}

impl ExclusionRules {
    pub fn empty() -> Self {
        Self {
            directories: BTreeSet::new(),
            extensions: BTreeSet::new(),
            files: BTreeSet::new(),
        }
    }

    pub fn with_directories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directories.extend(names.into_iter().map(Into::into));
        self
    }

    /// 副檔名一律轉小寫，沒有前導 `.` 的會自動補上
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(extensions.into_iter().map(|ext| {
            let ext = ext.into().to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        }));
        self
    }

    pub fn with_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn directories(&self) -> &BTreeSet<String> {
        &self.directories
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    pub fn is_excluded_directory(&self, name: &str) -> bool {
        self.directories.contains(name)
    }

    pub fn is_excluded_file_name(&self, name: &str) -> bool {
        if self.files.contains(name) {
            return true;
        }
        // 副檔名比對不分大小寫
        let lowered = name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| lowered.ends_with(ext.as_str()))
    }

    /// `rel_path` 相對於清單根目錄。任一片段符合排除目錄，
    /// 或最後一段符合檔名/副檔名規則時排除。
    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        let segments: Vec<&str> = rel_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        if segments.iter().any(|s| self.is_excluded_directory(s)) {
            return true;
        }

        segments
            .last()
            .is_some_and(|name| self.is_excluded_file_name(name))
    }
}
