//! EPUB3导航文档模块
//!
//! 导航文档是一个XHTML文件，`<nav epub:type="toc">` 中的有序列表与章节一一对应。
//! 列表项的href相对于导航文档自身所在目录，因此不同布局下可能带有 `../` 前缀，
//! 匹配时一律解析为绝对条目名后比较。

use crate::epub::error::{EpubError, Result};
use crate::epub::layout::{relative_href, resolve_href};
use crate::epub::xml::{Element, XmlDocument};
use std::fmt::{self, Display, Formatter};

/// 导航文档中的一个条目
#[derive(Debug, Clone, PartialEq)]
pub struct NavItem {
    /// 链接文本
    pub label: String,
    /// 原始href
    pub href: String,
    /// 解析后的绝对条目名
    pub target: String,
}

/// 可编辑的EPUB3导航文档
#[derive(Debug, Clone)]
pub struct NavDocument {
    doc: XmlDocument,
    base_dir: String,
}

fn is_toc_nav(element: &Element) -> bool {
    element.local_name() == "nav"
        && element
            .attr("epub:type")
            .or_else(|| element.attr("type"))
            .is_some_and(|value| value.split_whitespace().any(|t| t == "toc"))
}

fn is_any_nav(element: &Element) -> bool {
    element.local_name() == "nav"
}

fn link_of(item: &Element) -> Option<&Element> {
    item.find_descendant(&|e: &Element| e.local_name() == "a")
}

impl NavDocument {
    /// 解析导航文档
    ///
    /// # 参数
    /// * `xml_content` - 导航文档的XHTML内容
    /// * `base_dir` - 导航文档所在目录
    pub fn parse_xml(xml_content: &str, base_dir: &str) -> Result<NavDocument> {
        let nav = NavDocument {
            doc: XmlDocument::parse(xml_content)?,
            base_dir: base_dir.to_string(),
        };
        nav.toc_list()?;
        Ok(nav)
    }

    fn toc_list(&self) -> Result<&Element> {
        let root = self.doc.root()?;
        root.find_descendant(&is_toc_nav)
            .or_else(|| root.find_descendant(&is_any_nav))
            .and_then(|nav| nav.find_descendant(&|e: &Element| e.local_name() == "ol"))
            .ok_or_else(|| EpubError::StructuralMismatch("导航文档缺少目录列表 <nav><ol>".to_string()))
    }

    fn toc_list_mut(&mut self) -> Result<&mut Element> {
        let has_toc = self.doc.root()?.find_descendant(&is_toc_nav).is_some();
        let root = self.doc.root_mut()?;
        let nav = if has_toc {
            root.find_descendant_mut(&is_toc_nav)
        } else {
            root.find_descendant_mut(&is_any_nav)
        };
        nav.and_then(|nav| nav.find_descendant_mut(&|e: &Element| e.local_name() == "ol"))
            .ok_or_else(|| EpubError::StructuralMismatch("导航文档缺少目录列表 <nav><ol>".to_string()))
    }

    /// 目录条目（文档顺序）
    pub fn items(&self) -> Result<Vec<NavItem>> {
        let mut items = Vec::new();
        for li in self.toc_list()?.children_named("li") {
            let (label, href) = match link_of(li) {
                Some(a) => (a.text()?.trim().to_string(), a.attr("href").unwrap_or_default().to_string()),
                None => (li.text()?.trim().to_string(), String::new()),
            };
            let target = resolve_href(&self.base_dir, &href);
            items.push(NavItem { label, href, target });
        }
        Ok(items)
    }

    /// 指向 `target`（绝对条目名）的条目位置
    pub fn position_of_target(&self, target: &str) -> Result<Option<usize>> {
        Ok(self.items()?.iter().position(|item| item.target == target))
    }

    fn build_item(&self, label: &str, target: &str) -> Element {
        let href = relative_href(&self.base_dir, target);
        Element::new("li").with_child(Element::new("a").with_attr("href", href).with_text(label))
    }

    /// 在第 `position` 个条目之前插入指向 `target` 的条目（越界时追加）
    pub fn insert_item(&mut self, position: usize, label: &str, target: &str) -> Result<()> {
        let item = self.build_item(label, target);
        self.toc_list_mut()?.insert_named("li", position, item);
        Ok(())
    }

    /// 追加条目
    pub fn append_item(&mut self, label: &str, target: &str) -> Result<()> {
        let item = self.build_item(label, target);
        self.toc_list_mut()?.append_named("li", item);
        Ok(())
    }

    /// 移除第 `position` 个条目
    pub fn remove_item(&mut self, position: usize) -> Result<()> {
        self.toc_list_mut()?
            .remove_named("li", position)
            .map(|_| ())
            .ok_or_else(|| EpubError::StructuralMismatch(format!("导航文档中不存在第 {} 个条目", position)))
    }

    /// 按给定的原位置序列重排条目，`order` 必须是 `0..N` 的排列
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let list = self.toc_list_mut()?;
        let current: Vec<Element> = list.children_named("li").cloned().collect();
        let mut used = vec![false; current.len()];
        let mut reordered = Vec::with_capacity(order.len());
        for &index in order {
            if index >= current.len() || used[index] {
                return Err(EpubError::StructuralMismatch(format!("导航文档重排序列无效: {:?}", order)));
            }
            used[index] = true;
            reordered.push(current[index].clone());
        }
        list.replace_named("li", reordered)
    }

    /// 修改第 `position` 个条目的链接文本
    pub fn set_label(&mut self, position: usize, label: &str) -> Result<()> {
        let li = self
            .toc_list_mut()?
            .child_elements_mut()
            .filter(|e| e.local_name() == "li")
            .nth(position)
            .ok_or_else(|| EpubError::StructuralMismatch(format!("导航文档中不存在第 {} 个条目", position)))?;
        match li.find_descendant_mut(&|e: &Element| e.local_name() == "a") {
            Some(a) => a.set_text(label),
            None => li.set_text(label),
        }
        Ok(())
    }
}

impl Display for NavDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.doc, f)
    }
}
