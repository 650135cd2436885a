//! OPF（Open Packaging Format）包文档模块
//!
//! 此模块提供包文档中清单、脊柱与来源元数据的结构定义，
//! 以及在文档树上对它们进行编辑的 [`PackageDocument`]。

mod document;
mod manifest;
mod metadata;
mod spine;

pub use document::PackageDocument;
pub use manifest::{ManifestItem, XHTML_MEDIA_TYPE, image_media_type};
pub use metadata::SourceEntry;
pub use spine::SpineItem;
