use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Epub相关的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("文件不是有效的EPUB格式: {0}")]
    InvalidEpub(String),

    #[error("无效的mimetype: {expected}, 找到: {found}")]
    InvalidMimetype { expected: String, found: String },

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("文件不是有效的UTF-8文本: {0}")]
    InvalidUtf8(String),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    /// 预期的manifest/spine/navMap片段不存在，包结构与布局不符或已被破坏
    #[error("结构不匹配: {0}")]
    StructuralMismatch(String),

    #[error("索引越界: {index}, 有效范围: 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// mimetype、包文档或NCX缺失
    #[error("缺少必需的条目: {0}")]
    MissingRequiredEntry(String),

    #[error("无法解析的引用: {0}")]
    UnresolvedReference(String),
}

impl From<quick_xml::escape::EscapeError> for EpubError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        EpubError::XmlError(quick_xml::Error::from(err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for EpubError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        EpubError::XmlError(quick_xml::Error::InvalidAttr(err))
    }
}
