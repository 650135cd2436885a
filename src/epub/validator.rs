//! 包校验模块
//!
//! 编辑结果被接受之前的最低限度检查：引擎自身依赖的几个必需条目必须存在。

use crate::epub::error::{EpubError, Result};
use crate::epub::layout::Layout;
use crate::epub::reader::Package;
use crate::epub::writer::MIMETYPE_PATH;

pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 检查 `mimetype`、包文档与NCX是否存在
pub fn validate(package: &mut Package) -> Result<()> {
    if !package.contains(MIMETYPE_PATH) {
        return Err(EpubError::MissingRequiredEntry(MIMETYPE_PATH.to_string()));
    }
    let mimetype = package.read_text(MIMETYPE_PATH)?;
    if mimetype.trim() != EPUB_MIMETYPE {
        return Err(EpubError::InvalidMimetype {
            expected: EPUB_MIMETYPE.to_string(),
            found: mimetype.trim().to_string(),
        });
    }

    let layout = package.layout();
    for required in [layout.package_document_path(), layout.nav_map_path()] {
        if !package.contains(&required) {
            return Err(EpubError::MissingRequiredEntry(required));
        }
    }
    Ok(())
}

/// 以指定布局读取字节并校验
pub fn validate_bytes(bytes: &[u8], layout: Layout) -> Result<()> {
    let mut package = Package::from_bytes(bytes.to_vec(), layout)?;
    validate(&mut package)
}
