//! 章节定位模块
//!
//! 从包条目中找出有序的章节文件，并在章节文件路径与它在manifest、spine、
//! navMap中的交叉引用之间相互解析。

use crate::epub::chapter::{Sequence, source_id};
use crate::epub::config::EngineConfig;
use crate::epub::error::{EpubError, Result};
use crate::epub::layout::{Layout, file_name, parent_dir};
use crate::epub::ncx::Ncx;
use crate::epub::opf::PackageDocument;

/// 包中的一个章节文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    /// 绝对条目名
    pub path: String,
    /// 文件名开头的编号；合并自其他来源的文件可能没有
    pub sequence: Option<Sequence>,
}

impl ChapterRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let sequence = Sequence::from_file_name(file_name(&path));
        Self { path, sequence }
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }
}

/// 章节在各个视图中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLinks {
    pub path: String,
    pub manifest_id: String,
    pub spine_position: usize,
    /// navMap中顶层导航点的位置
    pub nav_position: usize,
}

/// 章节定位器
pub struct ChapterLocator<'a> {
    layout: Layout,
    config: &'a EngineConfig,
}

impl<'a> ChapterLocator<'a> {
    pub fn new(layout: Layout, config: &'a EngineConfig) -> Self {
        Self { layout, config }
    }

    /// 条目是否为章节文件：位于文本目录下、扩展名匹配且不是特殊文件
    pub fn is_chapter(&self, entry: &str) -> bool {
        let name = file_name(entry);
        parent_dir(entry) == self.layout.text_dir()
            && name
                .rsplit_once('.')
                .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.config.chapter_extension))
            && !self.config.is_special_file(name)
    }

    /// 有序的章节文件列表（按文件名排序，即按编号排序）
    pub fn locate<S: AsRef<str>>(&self, entries: &[S]) -> Vec<ChapterRef> {
        let mut chapters: Vec<ChapterRef> = entries
            .iter()
            .map(AsRef::as_ref)
            .filter(|entry| self.is_chapter(entry))
            .map(ChapterRef::new)
            .collect();
        chapters.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        chapters
    }

    /// 解析章节的交叉引用位置
    ///
    /// manifest项、spine项、navPoint任意一个缺失都视为结构不匹配。
    pub fn links(&self, path: &str, opf: &PackageDocument, ncx: &Ncx) -> Result<ChapterLinks> {
        let manifest_id = self.manifest_id_of(path, opf)?.ok_or_else(|| {
            EpubError::StructuralMismatch(format!("manifest中找不到章节 {}", path))
        })?;
        let spine_position = opf.spine_position(&manifest_id)?.ok_or_else(|| {
            EpubError::StructuralMismatch(format!("spine中找不到章节 {} ({})", path, manifest_id))
        })?;
        let nav_position = ncx.position_of_target(path)?.ok_or_else(|| {
            EpubError::StructuralMismatch(format!("navMap中找不到指向 {} 的navPoint", path))
        })?;
        Ok(ChapterLinks {
            path: path.to_string(),
            manifest_id,
            spine_position,
            nav_position,
        })
    }

    /// 章节路径对应的manifest id
    pub fn manifest_id_of(&self, path: &str, opf: &PackageDocument) -> Result<Option<String>> {
        Ok(opf
            .manifest_items()?
            .into_iter()
            .find(|item| self.layout.resolve_package_href(&item.href) == path)
            .map(|item| item.id))
    }

    /// manifest id对应的章节路径
    pub fn path_of_manifest_id(&self, id: &str, opf: &PackageDocument) -> Result<Option<String>> {
        Ok(opf
            .manifest_item(id)?
            .map(|item| self.layout.resolve_package_href(&item.href)))
    }

    /// 章节按脊柱阅读顺序排列的路径
    ///
    /// 只包含实际是章节文件的spine项，封面等特殊页面被排除。
    pub fn spine_order(&self, opf: &PackageDocument) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for item in opf.spine_items()? {
            if let Some(path) = self.path_of_manifest_id(&item.idref, opf)? {
                if self.is_chapter(&path) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    /// 通过来源URL查找章节
    pub fn find_by_source_url<S: AsRef<str>>(
        &self,
        entries: &[S],
        opf: &PackageDocument,
        url: &str,
    ) -> Result<Option<ChapterRef>> {
        let sources = opf.sources()?;
        for chapter in self.locate(entries) {
            let Some(manifest_id) = self.manifest_id_of(&chapter.path, opf)? else {
                continue;
            };
            let id = source_id(&self.config.source_id_prefix, &manifest_id);
            if sources
                .iter()
                .any(|source| source.id.as_deref() == Some(id.as_str()) && source.url == url)
            {
                return Ok(Some(chapter));
            }
        }
        Ok(None)
    }
}

/// 校验索引
///
/// `allow_append` 为真时允许 `index == len`（追加到末尾）。
pub fn resolve_index(index: usize, len: usize, allow_append: bool) -> Result<usize> {
    let valid = if allow_append { index <= len } else { index < len };
    if valid {
        Ok(index)
    } else {
        Err(EpubError::IndexOutOfRange { index, len })
    }
}

/// 下一个可用的章节编号
///
/// 从 `章节数 + 1` 开始，跳过已被占用的编号。
pub fn next_sequence(chapters: &[ChapterRef]) -> Sequence {
    let mut candidate = chapters.len() as u32 + 1;
    while chapters.iter().any(|c| c.sequence == Some(Sequence(candidate))) {
        candidate += 1;
    }
    Sequence(candidate)
}

/// 目录下文件名开头编号的最大值
pub fn max_sequence<S: AsRef<str>>(entries: &[S], dir: &str) -> u32 {
    entries
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| parent_dir(entry) == dir)
        .filter_map(|entry| Sequence::from_file_name(file_name(entry)))
        .map(|seq| seq.0)
        .max()
        .unwrap_or(0)
}
