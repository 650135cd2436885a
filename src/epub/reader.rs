use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::error::{EpubError, Result};
use crate::epub::layout::{Layout, parent_dir};
use crate::epub::nav::NavDocument;
use crate::epub::ncx::Ncx;
use crate::epub::opf::PackageDocument;

/// 表示一个已加载到内存中的EPUB包
///
/// 包只是只读的快照：所有编辑都会生成新的字节缓冲区，原始字节保持不变。
pub struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    layout: Layout,
    entries: Vec<String>,
}

impl Package {
    /// 从字节创建Package实例，使用指定布局
    ///
    /// # 参数
    /// * `bytes` - 完整的zip编码EPUB
    /// * `layout` - 包内部目录布局
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, layout: Layout) -> Result<Package> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.into()))?;
        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if !file.is_dir() {
                entries.push(file.name().to_string());
            }
        }
        tracing::debug!("读取EPUB包: {} 个条目, 布局 {}", entries.len(), layout);
        Ok(Package {
            archive,
            layout,
            entries,
        })
    }

    /// 从字节创建Package实例，自动判断布局
    ///
    /// 先读取`container.xml`中的包文档位置，再退回到按条目前缀判断。
    pub fn open(bytes: impl Into<Vec<u8>>) -> Result<Package> {
        let mut package = Self::from_bytes(bytes, Layout::Legacy)?;
        let package_document = if package.contains(CONTAINER_PATH) {
            let content = package.read_text(CONTAINER_PATH)?;
            Container::parse_xml(&content)?
                .package_document_path()
                .map(str::to_string)
        } else {
            None
        };
        package.layout = Layout::detect(&package.entries, package_document.as_deref())
            .ok_or_else(|| {
                EpubError::InvalidEpub("无法识别包的目录布局（OEBPS或EPUB）".to_string())
            })?;
        Ok(package)
    }

    /// 从文件路径读取
    pub fn from_path<P: AsRef<Path>>(path: P, layout: Option<Layout>) -> Result<Package> {
        let bytes = fs::read(path)?;
        match layout {
            Some(layout) => Self::from_bytes(bytes, layout),
            None => Self::open(bytes),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// 所有非目录条目名（zip中的原始顺序）
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    /// 提取指定条目的文本内容
    ///
    /// # 参数
    /// * `name` - 条目名
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - UTF-8文本
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_bytes(name)?;
        String::from_utf8(bytes).map_err(|e| EpubError::InvalidUtf8(format!("{}: {}", name, e)))
    }

    /// 提取指定条目的二进制内容
    pub fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => EpubError::MissingRequiredEntry(name.to_string()),
            other => EpubError::Zip(other),
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 解析包文档
    pub fn package_document(&mut self) -> Result<PackageDocument> {
        let path = self.layout.package_document_path();
        let content = self.read_text(&path)?;
        PackageDocument::parse(&content)
    }

    /// 解析导航地图（NCX）
    pub fn nav_map(&mut self) -> Result<Ncx> {
        let path = self.layout.nav_map_path();
        let content = self.read_text(&path)?;
        Ncx::parse_xml(&content, parent_dir(&path))
    }

    /// 解析EPUB3导航文档，不存在时返回None
    pub fn nav_document(&mut self) -> Result<Option<NavDocument>> {
        let path = self.layout.nav_document_path();
        if !self.contains(&path) {
            return Ok(None);
        }
        let content = self.read_text(&path)?;
        NavDocument::parse_xml(&content, parent_dir(&path)).map(Some)
    }

    /// 供写入器按原始压缩数据复制条目
    pub(crate) fn archive_mut(&mut self) -> &mut ZipArchive<Cursor<Vec<u8>>> {
        &mut self.archive
    }
}
