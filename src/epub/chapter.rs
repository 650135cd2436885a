//! 章节记录模块
//!
//! 章节是插入、删除、重排的基本单位。章节编号（4位补零）只是文件名与
//! 派生标识符的稳定键，不代表阅读位置；阅读顺序完全由spine决定。

use crate::epub::layout::{Layout, relative_href};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use scraper::{Html, Selector};

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("静态选择器"));
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3").expect("静态选择器"));

/// 由章节编号机械派生的交叉引用标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(pub u32);

impl Sequence {
    /// 4位补零形式，如 `0007`
    pub fn padded(&self) -> String {
        format!("{:04}", self.0)
    }

    /// manifest与spine使用的id：`xhtmlNNNN`
    pub fn manifest_id(&self) -> String {
        format!("xhtml{:04}", self.0)
    }

    /// navPoint的id：`bodyNNNN`
    pub fn nav_id(&self) -> String {
        format!("body{:04}", self.0)
    }

    /// 章节文件名：`NNNN_标题.xhtml`
    pub fn file_name(&self, title: &str, extension: &str) -> String {
        format!("{:04}_{}.{}", self.0, slugify(title), extension)
    }

    /// 用本编号替换文件名开头的编号，文件名没有编号时加上 `NNNN_` 前缀
    pub fn renumber_file_name(&self, file_name: &str) -> String {
        match Sequence::from_file_name(file_name) {
            Some(_) => format!("{:04}{}", self.0, &file_name[leading_digits(file_name)..]),
            None => format!("{:04}_{}", self.0, file_name),
        }
    }

    /// 下一个编号
    pub fn next(&self) -> Sequence {
        Sequence(self.0 + 1)
    }

    /// 从文件名开头的数字解析编号
    ///
    /// 至少需要4位；编号超过9999后文件名前缀自然变为5位及以上，按完整数字解析。
    pub fn from_file_name(file_name: &str) -> Option<Sequence> {
        let len = leading_digits(file_name);
        if len < 4 {
            return None;
        }
        file_name[..len].parse().ok().map(Sequence)
    }
}

fn leading_digits(file_name: &str) -> usize {
    file_name.bytes().take_while(u8::is_ascii_digit).count()
}

/// `dc:source` 的id：前缀加manifest id（默认 `id.xhtmlNNNN`）
pub fn source_id(prefix: &str, manifest_id: &str) -> String {
    format!("{}{}", prefix, manifest_id)
}

/// 把标题转换为可用于文件名的ASCII片段
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
        if slug.len() >= 40 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "chapter".to_string()
    } else {
        slug.to_string()
    }
}

/// 章节记录
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    /// 章节编号；插入时由引擎重新分配
    pub sequence: Option<Sequence>,
    /// 标题
    pub title: String,
    /// 来源URL，保存为 `dc:source`
    pub source_url: Option<String>,
    /// XHTML内容（完整文档或body片段）
    pub content: String,
}

impl ChapterRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sequence: None,
            title: title.into(),
            source_url: None,
            content: content.into(),
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// 内容是否已经是完整的XHTML文档
    pub fn is_full_document(&self) -> bool {
        let head = self.content.trim_start();
        head.starts_with("<?xml") || head.starts_with("<!DOCTYPE") || head.starts_with("<html")
    }

    /// 生成写入包中的XHTML文档
    ///
    /// 完整文档原样返回；body片段包装为带标题和样式表链接的XHTML。
    pub fn to_xhtml(&self, layout: Layout) -> String {
        if self.is_full_document() {
            return self.content.clone();
        }
        let stylesheet = relative_href(&layout.text_dir(), &layout.stylesheet_path());
        let title = escape(self.title.as_str());
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{title}</title>
  <link href="{stylesheet}" rel="stylesheet" type="text/css"/>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#,
            body = self.content.trim()
        )
    }
}

/// 从XHTML中提取标题：优先 `<title>`，其次第一个标题元素
pub fn title_from_xhtml(content: &str) -> Option<String> {
    let document = Html::parse_document(content);
    [&*TITLE_SELECTOR, &*HEADING_SELECTOR]
        .into_iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|title| !title.is_empty())
}
