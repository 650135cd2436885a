//! 结构编辑模块
//!
//! 每次编辑都是一次纯变换：旧包字节加一个编辑操作得到新包字节。
//! [`EditSession`] 在内存中持有包文档、NCX与导航文档的可编辑树，
//! 编辑完成后由 [`EditSession::commit`] 一次性写出新包并校验；
//! 任何一步失败时会话被丢弃，原始字节不受影响。

mod delete;
mod extract;
mod insert;
mod merge;
mod refresh;
mod reorder;

pub use extract::ExtractedChapter;

use crate::epub::chapter::ChapterRecord;
use crate::epub::config::EngineConfig;
use crate::epub::error::{EpubError, Result};
use crate::epub::layout::Layout;
use crate::epub::locator::{ChapterLocator, ChapterRef, resolve_index};
use crate::epub::nav::NavDocument;
use crate::epub::ncx::Ncx;
use crate::epub::opf::PackageDocument;
use crate::epub::reader::Package;
use crate::epub::validator::{validate, validate_bytes};
use crate::epub::writer::{PackageChanges, write_package};

/// 一次编辑的内存状态
pub struct EditSession {
    package: Package,
    config: EngineConfig,
    opf: PackageDocument,
    ncx: Ncx,
    nav: Option<NavDocument>,
    changes: PackageChanges,
}

impl EditSession {
    /// 打开包并解析三个元数据文档
    ///
    /// 配置中指定了布局时使用该布局，否则自动判断。
    pub fn open(bytes: impl Into<Vec<u8>>, config: &EngineConfig) -> Result<EditSession> {
        let mut package = match config.layout.fixed() {
            Some(layout) => Package::from_bytes(bytes, layout)?,
            None => Package::open(bytes)?,
        };
        validate(&mut package)?;
        let opf = package.package_document()?;
        let ncx = package.nav_map()?;
        let nav = package.nav_document()?;
        Ok(EditSession {
            package,
            config: config.clone(),
            opf,
            ncx,
            nav,
            changes: PackageChanges::new(),
        })
    }

    pub fn layout(&self) -> Layout {
        self.package.layout()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn package_document(&self) -> &PackageDocument {
        &self.opf
    }

    pub fn nav_map(&self) -> &Ncx {
        &self.ncx
    }

    pub fn nav_document(&self) -> Option<&NavDocument> {
        self.nav.as_ref()
    }

    /// 当前条目（包含本次会话中尚未写出的变更）
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .package
            .entries()
            .iter()
            .filter(|entry| !self.changes.is_removed(entry))
            .cloned()
            .collect();
        for name in self.changes.written_entries() {
            if !entries.iter().any(|entry| entry == name) {
                entries.push(name.to_string());
            }
        }
        entries
    }

    pub fn contains(&self, name: &str) -> bool {
        if self.changes.is_removed(name) {
            return false;
        }
        self.changes.written(name).is_some() || self.package.contains(name)
    }

    /// 有序的章节文件（按编号）
    pub fn chapters(&self) -> Vec<ChapterRef> {
        ChapterLocator::new(self.layout(), &self.config).locate(&self.entries())
    }

    /// 按脊柱阅读顺序排列的章节路径
    pub fn reading_order(&self) -> Result<Vec<String>> {
        ChapterLocator::new(self.layout(), &self.config).spine_order(&self.opf)
    }

    /// 阅读顺序中第 `index` 个章节
    pub fn chapter_at(&self, index: usize) -> Result<String> {
        let order = self.reading_order()?;
        let index = resolve_index(index, order.len(), false)?;
        Ok(order[index].clone())
    }

    /// 通过来源URL查找章节
    pub fn find_by_source_url(&self, url: &str) -> Result<Option<ChapterRef>> {
        ChapterLocator::new(self.layout(), &self.config).find_by_source_url(&self.entries(), &self.opf, url)
    }

    pub fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        if let Some(data) = self.changes.written(name) {
            return Ok(data.to_vec());
        }
        if self.changes.is_removed(name) {
            return Err(EpubError::MissingRequiredEntry(name.to_string()));
        }
        self.package.read_bytes(name)
    }

    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_bytes(name)?;
        String::from_utf8(bytes)
            .map_err(|e| EpubError::InvalidUtf8(format!("{}: {}", name, e)))
    }

    /// 每个spine项指向的绝对路径（manifest中找不到时为None）
    fn spine_paths(&self) -> Result<Vec<Option<String>>> {
        let locator = ChapterLocator::new(self.layout(), &self.config);
        self.opf
            .spine_items()?
            .into_iter()
            .map(|item| locator.path_of_manifest_id(&item.idref, &self.opf))
            .collect()
    }

    /// 写出新包并校验
    pub fn commit(mut self) -> Result<Vec<u8>> {
        let layout = self.layout();
        self.opf.check_structure()?;
        self.changes.write(layout.package_document_path(), self.opf.to_string());
        self.changes.write(layout.nav_map_path(), self.ncx.to_string());
        if let Some(nav) = &self.nav {
            self.changes.write(layout.nav_document_path(), nav.to_string());
        }
        let bytes = write_package(&mut self.package, &self.changes)?;
        validate_bytes(&bytes, layout)?;
        Ok(bytes)
    }
}

/// 在阅读顺序的 `spine_index` 处插入章节
pub fn insert(bytes: &[u8], spine_index: usize, record: &ChapterRecord, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut session = EditSession::open(bytes.to_vec(), config)?;
    session.insert(spine_index, record)?;
    session.commit()
}

/// 删除章节
pub fn delete(bytes: &[u8], chapter_path: &str, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut session = EditSession::open(bytes.to_vec(), config)?;
    session.delete(chapter_path)?;
    session.commit()
}

/// 按新顺序重排一组章节
pub fn reorder<S: AsRef<str>>(bytes: &[u8], new_order: &[S], config: &EngineConfig) -> Result<Vec<u8>> {
    let mut session = EditSession::open(bytes.to_vec(), config)?;
    session.reorder(new_order)?;
    session.commit()
}

/// 把 `addition` 的全部章节追加到 `base` 末尾，返回新包与追加的章节数
pub fn merge(base: &[u8], addition: &[u8], config: &EngineConfig) -> Result<(Vec<u8>, usize)> {
    let mut session = EditSession::open(base.to_vec(), config)?;
    let mut source = EditSession::open(addition.to_vec(), config)?;
    let added = session.merge(&mut source)?;
    Ok((session.commit()?, added))
}

/// 原位替换章节内容与标题
pub fn refresh(bytes: &[u8], chapter_path: &str, record: &ChapterRecord, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut session = EditSession::open(bytes.to_vec(), config)?;
    session.refresh(chapter_path, record)?;
    session.commit()
}

/// 按阅读顺序读出全部章节
pub fn extract_chapters(bytes: &[u8], config: &EngineConfig) -> Result<Vec<ChapterRecord>> {
    let mut session = EditSession::open(bytes.to_vec(), config)?;
    Ok(session
        .extract()?
        .into_iter()
        .map(|chapter| chapter.record)
        .collect())
}

/// 通过来源URL查找章节
pub fn find_by_source_url(bytes: &[u8], url: &str, config: &EngineConfig) -> Result<Option<ChapterRef>> {
    EditSession::open(bytes.to_vec(), config)?.find_by_source_url(url)
}

/// 按 `moved` 给出的新顺序重排一个序列中的部分位置
///
/// 按原顺序遍历，在第一个属于 `moved` 的位置一次性放入整个新序列，
/// 其余属于 `moved` 的位置跳过；不在 `moved` 中的位置保持相对顺序不变。
pub(crate) fn splice_order(len: usize, moved: &[usize]) -> Vec<usize> {
    let mut order = Vec::with_capacity(len);
    let mut spliced = false;
    for position in 0..len {
        if moved.contains(&position) {
            if !spliced {
                order.extend_from_slice(moved);
                spliced = true;
            }
        } else {
            order.push(position);
        }
    }
    order
}
