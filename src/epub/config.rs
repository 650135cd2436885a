//! 编辑引擎配置模块
//!
//! 提供引擎配置的加载与生成功能，配置以YAML文件保存。

use crate::epub::error::{EpubError, Result};
use crate::epub::layout::Layout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "spineforge.yaml";

/// 布局选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutChoice {
    /// 根据包内容自动判断
    #[default]
    Auto,
    Legacy,
    Modern,
}

impl LayoutChoice {
    /// 固定布局，自动模式返回None
    pub fn fixed(&self) -> Option<Layout> {
        match self {
            LayoutChoice::Auto => None,
            LayoutChoice::Legacy => Some(Layout::Legacy),
            LayoutChoice::Modern => Some(Layout::Modern),
        }
    }
}

/// 编辑引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 目录布局
    pub layout: LayoutChoice,
    /// 章节文件扩展名
    pub chapter_extension: String,
    /// 文本目录中不属于章节的特殊文件（不区分大小写）
    pub special_files: Vec<String>,
    /// `dc:source` 元素id前缀
    pub source_id_prefix: String,
    /// 图片manifest id前缀
    pub image_id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl EngineConfig {
    /// 获取默认配置
    pub fn default_config() -> Self {
        Self {
            layout: LayoutChoice::Auto,
            chapter_extension: "xhtml".to_string(),
            special_files: vec![
                "Cover.xhtml".to_string(),
                "Information.xhtml".to_string(),
                "nav.xhtml".to_string(),
            ],
            source_id_prefix: "id.".to_string(),
            image_id_prefix: "image".to_string(),
        }
    }

    /// 从指定配置文件加载
    ///
    /// # 参数
    /// * `path` - YAML配置文件路径
    ///
    /// # 返回值
    /// * `Result<Self>` - 加载成功返回配置实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        serde_yml::from_str(&content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 配置文件存在时加载，不存在时使用默认配置
    ///
    /// 文件存在但格式错误时仍然返回错误。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("配置文件 {} 不存在，使用默认配置", path.as_ref().display());
            Ok(Self::default_config())
        }
    }

    /// 生成默认配置文件
    ///
    /// # 参数
    /// * `path` - 输出路径
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default_config())
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# spineforge 配置文件\n# layout: auto | legacy | modern\n# special_files 中的文件不会被当作章节\n\n{}",
            yaml_content
        );

        fs::write(path, content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 判断文本目录中的文件名是否为特殊文件
    pub fn is_special_file(&self, file_name: &str) -> bool {
        self.special_files
            .iter()
            .any(|special| special.eq_ignore_ascii_case(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spineforge.yaml");
        EngineConfig::generate_default_config(&path).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config, EngineConfig::default_config());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.yaml");
        fs::write(&path, "layout: modern\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.layout, LayoutChoice::Modern);
        assert_eq!(config.chapter_extension, "xhtml");
        assert!(config.is_special_file("cover.xhtml"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_or_default(dir.path().join("none.yaml")).unwrap();
        assert_eq!(config.layout, LayoutChoice::Auto);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "layout: [not, a, layout]\n").unwrap();
        assert!(matches!(
            EngineConfig::load_or_default(&path),
            Err(EpubError::ConfigError(_))
        ));
    }
}
