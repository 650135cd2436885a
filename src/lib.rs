pub mod epub;

// === 核心API重新导出 ===

/// 结构编辑（主要接口）
pub use epub::{delete, extract_chapters, find_by_source_url, insert, merge, refresh, reorder};

/// 编辑会话
pub use epub::EditSession;

/// 错误处理
pub use epub::{EpubError, Result};

// === 数据结构 ===

/// 章节记录与编号
pub use epub::{ChapterRecord, Sequence};

/// 章节定位
pub use epub::{ChapterLinks, ChapterLocator, ChapterRef, resolve_index};

/// 配置与目录布局
pub use epub::{DEFAULT_CONFIG_PATH, EngineConfig, Layout, LayoutChoice};

// === 底层组件（高级用法） ===

/// 包读取、写入与校验
pub use epub::{Package, PackageChanges, validate, validate_bytes, write_package};

/// 容器组件
pub use epub::{Container, RootFile};

/// OPF组件
pub use epub::{ManifestItem, PackageDocument, SourceEntry, SpineItem};

/// NCX与导航文档组件
pub use epub::{NavDocument, NavItem, NavPoint, Ncx};

// === 库信息 ===

/// SpineForge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SpineForge库的描述
pub const DESCRIPTION: &str = "一个用于增量编辑已发布EPUB文件的Rust库";

// === 便捷函数 ===

/// 快速打开EPUB文件并开始一次编辑
///
/// 这是读取文件后调用 `EditSession::open` 的便捷包装函数。
///
/// # 参数
/// * `path` - EPUB文件路径
/// * `config` - 引擎配置
///
/// # 返回值
/// * `Result<EditSession>` - 编辑会话
///
/// # 示例
///
/// ```no_run
/// use spineforge::{EngineConfig, ChapterRecord};
///
/// let config = EngineConfig::default_config();
/// let mut session = spineforge::open("book.epub", &config)?;
/// session.insert(1, &ChapterRecord::new("第二章", "<p>正文</p>"))?;
/// std::fs::write("book.new.epub", session.commit()?)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P, config: &EngineConfig) -> Result<EditSession> {
    let bytes = std::fs::read(path)?;
    EditSession::open(bytes, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        println!("SpineForge version: {}", VERSION);
    }

    #[test]
    fn test_description() {
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let result = open("/nonexistent/book.epub", &EngineConfig::default_config());
        assert!(matches!(result, Err(EpubError::Io(_))));
    }
}
