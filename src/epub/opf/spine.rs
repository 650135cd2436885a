//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use crate::epub::xml::Element;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq)]
pub struct SpineItem {
    /// 引用的清单项ID
    pub idref: String,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineItem {
    /// 创建新的脊柱项
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
        }
    }

    /// 从 `<itemref>` 元素读取
    pub fn from_element(element: &Element) -> Option<Self> {
        Some(Self {
            idref: element.attr("idref")?.to_string(),
            linear: element.attr("linear") != Some("no"),
        })
    }

    /// 生成 `<itemref>` 元素
    pub fn to_element(&self) -> Element {
        let element = Element::new("itemref").with_attr("idref", &self.idref);
        if self.linear {
            element
        } else {
            element.with_attr("linear", "no")
        }
    }
}
