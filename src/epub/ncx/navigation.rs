//! NCX导航点数据结构定义

use crate::epub::error::Result;
use crate::epub::xml::Element;

/// 导航点
#[derive(Debug, Clone, PartialEq)]
pub struct NavPoint {
    /// 唯一标识符
    pub id: String,
    /// 播放顺序
    pub play_order: u32,
    /// 导航标签文本
    pub label: String,
    /// 内容引用（相对于NCX文件）
    pub src: String,
}

impl NavPoint {
    /// 创建新的导航点
    pub fn new(id: impl Into<String>, play_order: u32, label: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            play_order,
            label: label.into(),
            src: src.into(),
        }
    }

    /// 从 `<navPoint>` 元素读取
    pub fn from_element(element: &Element) -> Result<Self> {
        let label = match element.find_child("navLabel") {
            Some(nav_label) => nav_label.text()?.trim().to_string(),
            None => String::new(),
        };
        Ok(Self {
            id: element.attr("id").unwrap_or_default().to_string(),
            play_order: play_order_of(element).unwrap_or(0),
            label,
            src: element
                .find_child("content")
                .and_then(|content| content.attr("src"))
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// 生成 `<navPoint>` 元素
    pub fn to_element(&self) -> Element {
        Element::new("navPoint")
            .with_attr("id", &self.id)
            .with_attr("playOrder", self.play_order.to_string())
            .with_child(Element::new("navLabel").with_child(Element::new("text").with_text(&self.label)))
            .with_child(Element::new("content").with_attr("src", &self.src))
    }
}

/// 读取元素的playOrder属性
pub fn play_order_of(element: &Element) -> Option<u32> {
    element.attr("playOrder").and_then(|value| value.trim().parse().ok())
}
