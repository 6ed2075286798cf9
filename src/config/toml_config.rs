use crate::config::exclusion::ExclusionRules;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path_segment, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 檔案清單的排除規則設定檔
///
/// ```toml
/// [exclude]
/// replace_defaults = false
/// directories = ["vendor"]
/// extensions = [".bak"]
/// files = ["secrets.json"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub exclude: ExcludeSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeSection {
    /// false 時延伸內建清單，true 時完全取代
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl RulesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BUILD_DIR})，未設定的保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn into_rules(self) -> ExclusionRules {
        let base = if self.exclude.replace_defaults {
            ExclusionRules::empty()
        } else {
            ExclusionRules::default()
        };

        base.with_directories(self.exclude.directories)
            .with_extensions(self.exclude.extensions)
            .with_files(self.exclude.files)
    }
}

impl Validate for RulesConfig {
    fn validate(&self) -> Result<()> {
        for dir in &self.exclude.directories {
            validate_path_segment("exclude.directories", dir)?;
        }
        for ext in &self.exclude.extensions {
            validate_non_empty_string("exclude.extensions", ext)?;
        }
        for file in &self.exclude.files {
            validate_path_segment("exclude.files", file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extend_defaults() {
        let config = RulesConfig::from_toml_str(
            r#"
[exclude]
directories = ["vendor"]
extensions = ["bak"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let rules = config.into_rules();
        assert!(rules.is_excluded(Path::new("vendor/a.php")));
        assert!(rules.is_excluded(Path::new("old.bak")));
        assert!(rules.is_excluded(Path::new("node_modules/a.js")));
    }

    #[test]
    fn test_replace_defaults() {
        let config = RulesConfig::from_toml_str(
            r#"
[exclude]
replace_defaults = true
files = ["notes.txt"]
"#,
        )
        .unwrap();

        let rules = config.into_rules();
        assert!(rules.is_excluded(Path::new("notes.txt")));
        assert!(!rules.is_excluded(Path::new("node_modules/a.js")));
        assert!(!rules.is_excluded(Path::new("report.log")));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let rules = RulesConfig::from_toml_str("").unwrap().into_rules();
        assert_eq!(rules, ExclusionRules::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AREA_ETL_TEST_EXTRA_DIR", "generated");

        let config = RulesConfig::from_toml_str(
            r#"
[exclude]
directories = ["${AREA_ETL_TEST_EXTRA_DIR}"]
"#,
        )
        .unwrap();
        assert_eq!(config.exclude.directories, vec!["generated".to_string()]);

        std::env::remove_var("AREA_ETL_TEST_EXTRA_DIR");
    }

    #[test]
    fn test_validation_rejects_nested_directory() {
        let config = RulesConfig::from_toml_str(
            r#"
[exclude]
directories = ["a/b"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RulesConfig::from_toml_str("[exclude\ndirectories = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[exclude]\nfiles = [\"secrets.json\"]\n")
            .unwrap();

        let config = RulesConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.exclude.files, vec!["secrets.json".to_string()]);
    }
}
