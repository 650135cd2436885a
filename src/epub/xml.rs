//! XML文档树模块
//!
//! 基于quick-xml事件流构建可编辑的文档树。声明、DOCTYPE、注释以及空白文本
//! 均按源文本原样保留，元素可以在树上增删、重排后重新序列化，
//! 未被修改的部分与原文件逐字节一致。

use crate::epub::error::{EpubError, Result};
use quick_xml::escape::{escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

/// 宽松的反转义：识别全部HTML5命名实体（如 `&nbsp;`），
/// 遇到无法识别的实体时原样返回源文本
pub fn unescape_lenient(raw: &str) -> Cow<'_, str> {
    unescape_with(raw, resolve_html5_entity).unwrap_or(Cow::Borrowed(raw))
}

/// 文档树节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// 元素
    Element(Element),
    /// 文本（保持转义后的源文本形式）
    Text(String),
    /// 声明、DOCTYPE、注释、CDATA、处理指令等原样保留的片段
    Raw(String),
}

impl Node {
    fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}

/// XML元素
#[derive(Debug, Clone)]
pub struct Element {
    /// 带前缀的限定名（如 `dc:source`）
    pub name: String,
    /// 属性列表，值为反转义后的文本
    pub attributes: Vec<(String, String)>,
    /// 子节点
    pub children: Vec<Node>,
    self_closing: bool,
    // 解析时的属性源文本，值未被修改时按原样写回
    raw_values: Vec<(String, String)>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
            && self.self_closing == other.self_closing
    }
}

/// 返回限定名中冒号之后的本地名称
pub fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

impl Element {
    /// 创建新的空元素
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
            raw_values: Vec::new(),
        }
    }

    /// 链式设置属性
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// 链式追加子元素
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// 链式设置文本内容
    pub fn with_text(mut self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    fn from_start(e: &BytesStart, self_closing: bool) -> Result<Self> {
        let name = utf8(e.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        let mut raw_values = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let raw = utf8(&attr.value)?;
            attributes.push((key.clone(), unescape_lenient(raw).into_owned()));
            raw_values.push((key, raw.to_string()));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            self_closing,
            raw_values,
        })
    }

    /// 本地名称（去掉命名空间前缀）
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// 获取属性值
    ///
    /// 先按限定名精确匹配，再按本地名称匹配，
    /// 因此 `attr("href")` 同样能取到 `xlink:href`。
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.attributes.iter().find(|(k, _)| local_part(k) == key))
            .map(|(_, v)| v.as_str())
    }

    /// 设置属性值，已存在时原位替换
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// 遍历子元素
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// 可变遍历子元素
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// 指定本地名称的子元素
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.local_name() == local)
    }

    /// 第一个指定本地名称的子元素
    pub fn find_child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    pub fn find_child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.local_name() == local)
    }

    /// 深度优先查找第一个满足条件的后代元素（不含自身）
    pub fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_descendant_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        for child in self.child_elements_mut() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// 按文档顺序访问所有后代元素
    pub fn visit_descendants_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        for child in self.child_elements_mut() {
            f(child);
            child.visit_descendants_mut(f);
        }
    }

    /// 按文档顺序收集所有后代元素
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        for child in self.child_elements() {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    /// 指定本地名称的子元素数量
    pub fn count_named(&self, local: &str) -> usize {
        self.children_named(local).count()
    }

    /// 第 `position` 个指定名称子元素在 `children` 中的下标
    fn node_index(&self, local: &str, position: usize) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Element(e) if e.local_name() == local))
            .map(|(i, _)| i)
            .nth(position)
    }

    fn leading_whitespace(&self, node_index: usize) -> Option<String> {
        match node_index.checked_sub(1).map(|i| &self.children[i]) {
            Some(Node::Text(text)) if text.trim().is_empty() => Some(text.clone()),
            _ => None,
        }
    }

    /// 在同名子元素序列的 `position` 处插入元素
    ///
    /// `position` 不小于现有数量时追加到最后一个同名元素之后。
    /// 插入时沿用相邻元素前的缩进。
    pub fn insert_named(&mut self, local: &str, position: usize, element: Element) {
        self.self_closing = false;
        let count = self.count_named(local);
        if position < count {
            let Some(index) = self.node_index(local, position) else {
                return;
            };
            let indent = self.leading_whitespace(index);
            self.children.insert(index, Node::Element(element));
            if let Some(indent) = indent {
                self.children.insert(index + 1, Node::Text(indent));
            }
            return;
        }

        if let Some(last) = count.checked_sub(1).and_then(|p| self.node_index(local, p)) {
            let indent = self.leading_whitespace(last);
            let mut at = last + 1;
            if let Some(indent) = indent {
                self.children.insert(at, Node::Text(indent));
                at += 1;
            }
            self.children.insert(at, Node::Element(element));
            return;
        }

        // 没有同名元素时放在结束标签前的空白之前
        let closing = match self.children.last() {
            Some(Node::Text(text)) if text.trim().is_empty() => Some(text.clone()),
            _ => None,
        };
        match closing {
            Some(closing) => {
                let at = self.children.len() - 1;
                self.children.insert(at, Node::Element(element));
                self.children.insert(at, Node::Text(format!("{}  ", closing)));
            }
            None => self.children.push(Node::Element(element)),
        }
    }

    /// 追加同名子元素
    pub fn append_named(&mut self, local: &str, element: Element) {
        let count = self.count_named(local);
        self.insert_named(local, count, element);
    }

    /// 移除第 `position` 个同名子元素及其前导缩进
    pub fn remove_named(&mut self, local: &str, position: usize) -> Option<Element> {
        let index = self.node_index(local, position)?;
        let removed = match self.children.remove(index) {
            Node::Element(element) => element,
            _ => return None,
        };
        if index > 0 && self.children[index - 1].is_whitespace() {
            self.children.remove(index - 1);
        }
        Some(removed)
    }

    /// 移除所有满足条件的同名子元素，返回移除数量
    pub fn remove_named_where(&mut self, local: &str, pred: &dyn Fn(&Element) -> bool) -> usize {
        let mut removed = 0;
        let mut position = 0;
        loop {
            let Some(matched) = self.children_named(local).nth(position).map(pred) else {
                break;
            };
            if matched {
                self.remove_named(local, position);
                removed += 1;
            } else {
                position += 1;
            }
        }
        removed
    }

    /// 用新的顺序替换同名子元素，其他节点与缩进保持原位
    pub fn replace_named(&mut self, local: &str, elements: Vec<Element>) -> Result<()> {
        let slots: Vec<usize> = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Element(e) if e.local_name() == local))
            .map(|(i, _)| i)
            .collect();
        if slots.len() != elements.len() {
            return Err(EpubError::StructuralMismatch(format!(
                "<{}> 元素数量不一致: 现有 {}, 新序列 {}",
                local,
                slots.len(),
                elements.len()
            )));
        }
        for (slot, element) in slots.into_iter().zip(elements) {
            self.children[slot] = Node::Element(element);
        }
        Ok(())
    }

    /// 反转义后的文本内容（含所有后代文本）
    pub fn text(&self) -> Result<String> {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => out.push_str(&unescape_lenient(raw)),
                Node::Element(element) => out.push_str(&element.text()?),
                Node::Raw(_) => {}
            }
        }
        Ok(out)
    }

    /// 用纯文本替换全部子节点
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(escape(text).into_owned())];
        self.self_closing = false;
    }

    fn raw_value(&self, key: &str) -> Option<&str> {
        self.raw_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, raw)| raw.as_str())
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            match self.raw_value(key) {
                Some(raw) if !raw.contains('"') && unescape_lenient(raw) == value.as_str() => {
                    out.push_str(raw)
                }
                _ => out.push_str(&escape(value.as_str())),
            }
            out.push('"');
        }
        if self.children.is_empty() && self.self_closing {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => element.write_to(out),
        Node::Text(text) | Node::Raw(text) => out.push_str(text),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| EpubError::InvalidUtf8(e.to_string()))
}

/// 可编辑的XML文档
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// 顶层节点（声明、DOCTYPE、根元素、尾随空白）
    pub nodes: Vec<Node>,
}

impl XmlDocument {
    /// 解析XML文本
    ///
    /// # 参数
    /// * `xml_content` - 完整的XML文档文本
    ///
    /// # 返回值
    /// * `Result<XmlDocument, EpubError>` - 文档树
    pub fn parse(xml_content: &str) -> Result<XmlDocument> {
        let mut reader = Reader::from_str(xml_content);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut nodes = Vec::new();

        loop {
            let start = reader.buffer_position() as usize;
            let node = match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    stack.push(Element::from_start(e, false)?);
                    None
                }
                Event::Empty(ref e) => Some(Node::Element(Element::from_start(e, true)?)),
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        EpubError::StructuralMismatch("多余的结束标签".to_string())
                    })?;
                    Some(Node::Element(element))
                }
                Event::Text(_) => {
                    let end = reader.buffer_position() as usize;
                    Some(Node::Text(xml_content[start..end].to_string()))
                }
                Event::Eof => break,
                _ => {
                    let end = reader.buffer_position() as usize;
                    Some(Node::Raw(xml_content[start..end].to_string()))
                }
            };
            if let Some(node) = node {
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => nodes.push(node),
                }
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(EpubError::StructuralMismatch(format!(
                "元素 <{}> 未闭合",
                open.name
            )));
        }

        Ok(XmlDocument { nodes })
    }

    /// 根元素
    pub fn root(&self) -> Result<&Element> {
        self.nodes
            .iter()
            .find_map(|node| match node {
                Node::Element(element) => Some(element),
                _ => None,
            })
            .ok_or_else(|| EpubError::StructuralMismatch("文档缺少根元素".to_string()))
    }

    pub fn root_mut(&mut self) -> Result<&mut Element> {
        self.nodes
            .iter_mut()
            .find_map(|node| match node {
                Node::Element(element) => Some(element),
                _ => None,
            })
            .ok_or_else(|| EpubError::StructuralMismatch("文档缺少根元素".to_string()))
    }
}

impl Display for XmlDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        f.write_str(&out)
    }
}
