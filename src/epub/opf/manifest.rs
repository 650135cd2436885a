//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

use crate::epub::xml::Element;

/// XHTML媒体类型
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// 清单项信息
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    /// 从 `<item>` 元素读取，缺少id或href时返回None
    pub fn from_element(element: &Element) -> Option<Self> {
        let id = element.attr("id")?;
        let href = element.attr("href")?;
        Some(Self {
            id: id.to_string(),
            href: href.to_string(),
            media_type: element.attr("media-type").unwrap_or_default().to_string(),
            properties: element.attr("properties").map(str::to_string),
        })
    }

    /// 生成 `<item>` 元素
    pub fn to_element(&self) -> Element {
        let element = Element::new("item")
            .with_attr("id", &self.id)
            .with_attr("href", &self.href)
            .with_attr("media-type", &self.media_type);
        match &self.properties {
            Some(properties) => element.with_attr("properties", properties),
            None => element,
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为图片文件
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }
}

/// 根据扩展名推断图片的媒体类型
pub fn image_media_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
