//! 包写入模块
//!
//! 根据原始包和一组条目变更生成新的zip字节。未修改的条目按原始压缩数据
//! 逐字节复制，`mimetype` 总是第一个写入且不压缩。

use crate::epub::error::Result;
use crate::epub::reader::Package;
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MIMETYPE_PATH: &str = "mimetype";

/// 对包条目的一组变更
#[derive(Debug, Clone, Default)]
pub struct PackageChanges {
    /// 替换或新增的条目内容
    written: BTreeMap<String, Vec<u8>>,
    /// 新增条目的写入顺序
    added: Vec<String>,
    removed: HashSet<String>,
}

impl PackageChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入条目内容；条目已存在时原位替换，否则追加到末尾
    pub fn write(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = name.into();
        self.removed.remove(&name);
        if self.written.insert(name.clone(), data.into()).is_none() {
            self.added.push(name);
        }
    }

    /// 删除条目
    pub fn remove(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.written.remove(&name).is_some() {
            self.added.retain(|added| *added != name);
        }
        self.removed.insert(name);
    }

    pub fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
    }

    /// 待写入的内容（尚未提交的编辑可以在此读取）
    pub fn written(&self, name: &str) -> Option<&[u8]> {
        self.written.get(name).map(Vec::as_slice)
    }

    /// 写入过的条目名（按首次写入顺序）
    pub fn written_entries(&self) -> impl Iterator<Item = &str> {
        self.added.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

/// 生成新的包
///
/// # 参数
/// * `package` - 原始包
/// * `changes` - 条目变更
///
/// # 返回值
/// * `Result<Vec<u8>>` - 新的zip字节，原始包保持不变
pub fn write_package(package: &mut Package, changes: &PackageChanges) -> Result<Vec<u8>> {
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let mimetype = match changes.written(MIMETYPE_PATH) {
        Some(data) => Some(data.to_vec()),
        None if package.contains(MIMETYPE_PATH) && !changes.is_removed(MIMETYPE_PATH) => {
            Some(package.read_bytes(MIMETYPE_PATH)?)
        }
        None => None,
    };
    if let Some(data) = mimetype {
        zip.start_file(MIMETYPE_PATH, stored)?;
        zip.write_all(&data)?;
    }

    let archive = package.archive_mut();
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index_raw(i)?.name().to_string());
    }

    let mut copied = 0usize;
    let mut replaced = HashSet::new();
    for (i, name) in names.iter().enumerate() {
        if name == MIMETYPE_PATH || changes.is_removed(name) {
            continue;
        }
        match changes.written(name) {
            Some(data) => {
                zip.start_file(name.as_str(), deflated)?;
                zip.write_all(data)?;
                replaced.insert(name.as_str());
            }
            None => {
                zip.raw_copy_file(archive.by_index_raw(i)?)?;
                copied += 1;
            }
        }
    }

    for name in &changes.added {
        if name == MIMETYPE_PATH || replaced.contains(name.as_str()) {
            continue;
        }
        if let Some(data) = changes.written(name) {
            zip.start_file(name.as_str(), deflated)?;
            zip.write_all(data)?;
        }
    }

    tracing::debug!(
        "写入新包: 复制 {} 个条目, 替换 {} 个, 新增 {} 个, 删除 {} 个",
        copied,
        replaced.len(),
        changes.added.len() - replaced.len(),
        changes.removed.len()
    );
    Ok(zip.finish()?.into_inner())
}
