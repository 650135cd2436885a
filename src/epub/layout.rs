//! 目录布局模块
//!
//! 一个EPUB包内部的目录约定有两种：旧式（`OEBPS/Text`）与新式（`EPUB/text`）。
//! 本模块给出两种布局下各类资源的绝对路径（zip条目名）与包相对路径
//! （相对于内容目录，用于manifest等交叉引用），并提供路径之间的相对化与解析。

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// EPUB内部目录布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `OEBPS/Text`、`OEBPS/Images`、`OEBPS/Styles`
    Legacy,
    /// `EPUB/text`、`EPUB/images`、`EPUB/styles`
    Modern,
}

impl Layout {
    /// 内容目录
    pub fn content_dir(&self) -> &'static str {
        match self {
            Layout::Legacy => "OEBPS",
            Layout::Modern => "EPUB",
        }
    }

    /// 文本目录（相对于内容目录）
    pub fn text_dir_name(&self) -> &'static str {
        match self {
            Layout::Legacy => "Text",
            Layout::Modern => "text",
        }
    }

    /// 图片目录（相对于内容目录）
    pub fn images_dir_name(&self) -> &'static str {
        match self {
            Layout::Legacy => "Images",
            Layout::Modern => "images",
        }
    }

    /// 样式目录（相对于内容目录）
    pub fn styles_dir_name(&self) -> &'static str {
        match self {
            Layout::Legacy => "Styles",
            Layout::Modern => "styles",
        }
    }

    pub fn text_dir(&self) -> String {
        format!("{}/{}", self.content_dir(), self.text_dir_name())
    }

    pub fn images_dir(&self) -> String {
        format!("{}/{}", self.content_dir(), self.images_dir_name())
    }

    pub fn styles_dir(&self) -> String {
        format!("{}/{}", self.content_dir(), self.styles_dir_name())
    }

    /// 包文档（OPF）路径
    pub fn package_document_path(&self) -> String {
        format!("{}/content.opf", self.content_dir())
    }

    /// 导航地图（NCX）路径
    pub fn nav_map_path(&self) -> String {
        format!("{}/toc.ncx", self.content_dir())
    }

    /// EPUB3导航文档路径
    pub fn nav_document_path(&self) -> String {
        match self {
            Layout::Legacy => format!("{}/nav.xhtml", self.text_dir()),
            Layout::Modern => format!("{}/nav.xhtml", self.content_dir()),
        }
    }

    /// 默认样式表路径
    pub fn stylesheet_path(&self) -> String {
        format!("{}/stylesheet.css", self.styles_dir())
    }

    /// 文本目录下某个文件的绝对路径
    pub fn text_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.text_dir(), file_name)
    }

    /// 图片目录下某个文件的绝对路径
    pub fn image_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.images_dir(), file_name)
    }

    /// 绝对路径转换为包相对路径（manifest中的href形式）
    pub fn package_href(&self, absolute: &str) -> String {
        relative_href(self.content_dir(), absolute)
    }

    /// 包相对路径还原为绝对路径
    pub fn resolve_package_href(&self, href: &str) -> String {
        resolve_href(self.content_dir(), href)
    }

    /// 根据包内条目判断布局
    ///
    /// 优先查看`container.xml`给出的包文档位置，其次查看条目前缀。
    pub fn detect<S: AsRef<str>>(entries: &[S], package_document: Option<&str>) -> Option<Layout> {
        if let Some(path) = package_document {
            for layout in [Layout::Legacy, Layout::Modern] {
                if path == layout.package_document_path() {
                    return Some(layout);
                }
            }
        }
        [Layout::Legacy, Layout::Modern].into_iter().find(|layout| {
            let opf = layout.package_document_path();
            entries.iter().any(|e| e.as_ref() == opf)
        })
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Legacy => write!(f, "legacy"),
            Layout::Modern => write!(f, "modern"),
        }
    }
}

/// 条目所在目录（不含末尾斜杠），根目录返回空串
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// 条目的文件名部分
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// 去掉href中的片段标识（`#...`）
pub fn strip_fragment(href: &str) -> &str {
    href.split('#').next().unwrap_or(href)
}

/// 计算从目录 `from_dir` 指向条目 `target` 的相对href
pub fn relative_href(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

/// 将相对于目录 `base_dir` 的href解析为规范化的绝对条目名
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = strip_fragment(href);
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
