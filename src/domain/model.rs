use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// `businesses` 表中的一列：slug 與原始的 service_areas JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Business {
    pub slug: String,
    pub service_areas: Option<Value>,
}

impl Business {
    pub fn new(slug: impl Into<String>, service_areas: Option<Value>) -> Self {
        Self {
            slug: slug.into(),
            service_areas,
        }
    }

    /// 服務區域描述陣列；null、非陣列或空陣列都視為沒有
    pub fn descriptors(&self) -> Option<&[Value]> {
        match &self.service_areas {
            Some(Value::Array(items)) if !items.is_empty() => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// 註冊表的自然鍵。`zip` 缺省本身就是一個鍵值：
/// (Reno, NV, None) 與 (Reno, NV, Some("89501")) 是兩筆不同的項目。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaKey {
    pub city: String,
    pub state: String,
    pub zip: Option<String>,
}

impl AreaKey {
    pub fn new(city: impl Into<String>, state: impl Into<String>, zip: Option<&str>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            zip: zip.map(str::to_string),
        }
    }

    /// 從單一描述物件取出鍵；缺 city 或 state 時回傳 None
    pub fn from_descriptor(descriptor: &Value) -> Option<Self> {
        let obj = descriptor.as_object()?;
        let city = non_blank_str(obj.get("city"))?;
        let state = non_blank_str(obj.get("state"))?;
        let zip = obj.get("zip").and_then(normalize_zip);

        Some(Self {
            city: city.to_string(),
            state: state.to_string(),
            zip,
        })
    }
}

impl fmt::Display for AreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.city,
            self.state,
            self.zip.as_deref().unwrap_or("-")
        )
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// 郵遞區號一律轉成字串；數字取十進位文字，空字串與 null 視為缺省
pub fn normalize_zip(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(
            n.as_u64()
                .map(|v| v.to_string())
                .or_else(|| n.as_i64().map(|v| v.to_string()))
                .unwrap_or_else(|| n.to_string()),
        ),
        _ => None,
    }
}

/// 以有序陣列保存的 slug 集合。儲存格式本身不保證唯一，
/// 所以每次加入前都必須先檢查是否已存在。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlugSet(Vec<String>);

impl SlugSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(slug: &str) -> Self {
        Self(vec![slug.to_string()])
    }

    /// 解析資料庫中的 business_slugs；null 視為空集合
    pub fn from_json(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(format!("business_slugs contains non-string value {}", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(format!("business_slugs is not an array: {}", other)),
        }
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.iter().any(|s| s == slug)
    }

    /// 不存在時附加到尾端，回傳是否有變更
    pub fn insert(&mut self, slug: &str) -> bool {
        if self.contains(slug) {
            return false;
        }
        self.0.push(slug.to_string());
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl From<Vec<String>> for SlugSet {
    fn from(slugs: Vec<String>) -> Self {
        Self(slugs)
    }
}

/// 一次合併要做的事：把 slug 加入 key 對應的項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaAssignment {
    pub key: AreaKey,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Appended,
    Unchanged,
}

/// transform 階段的結果
#[derive(Debug, Clone, Default)]
pub struct NormalizePlan {
    pub assignments: Vec<AreaAssignment>,
    pub businesses_seen: usize,
    pub businesses_skipped: usize,
    pub descriptors_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub businesses_seen: usize,
    pub businesses_skipped: usize,
    pub descriptors_skipped: usize,
    pub inserted: usize,
    pub appended: usize,
    pub unchanged: usize,
    pub committed: bool,
}

impl NormalizeReport {
    pub fn changed(&self) -> usize {
        self.inserted + self.appended
    }
}

/// 詳細清單中的一筆檔案資訊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub modified: String,
    pub is_file: bool,
    pub is_directory: bool,
}

pub type FlatManifest = BTreeMap<String, String>;
pub type DetailedManifest = BTreeMap<String, FileRecord>;

#[derive(Debug, Clone, Default)]
pub struct Manifests {
    pub flat: FlatManifest,
    pub detailed: DetailedManifest,
    pub vanished: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryReport {
    pub files: usize,
    pub detailed: usize,
    pub vanished: usize,
    pub flat_path: String,
    pub detailed_path: String,
    pub preview: Vec<String>,
}
