//! 元数据模块
//!
//! 包文档 `<metadata>` 中与章节相关的部分：每个章节的来源URL
//! 以 `<dc:source id="id.xhtmlNNNN">` 的形式保存。

use crate::epub::xml::Element;

/// 章节来源信息
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// 元素id，通常为 `id.` 加上章节的manifest id
    pub id: Option<String>,
    /// 来源URL
    pub url: String,
}

impl SourceEntry {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            url: url.into(),
        }
    }

    /// 生成 `<dc:source>` 元素
    pub fn to_element(&self) -> Element {
        let element = Element::new("dc:source");
        let element = match &self.id {
            Some(id) => element.with_attr("id", id),
            None => element,
        };
        element.with_text(&self.url)
    }
}
