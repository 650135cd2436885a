pub mod chapter;
pub mod config;
pub mod container;
pub mod editor;
pub mod error;
pub mod layout;
pub mod locator;
pub mod nav;
pub mod ncx;
pub mod opf;
pub mod reader;
pub mod validator;
pub mod writer;
pub mod xml;

#[cfg(test)]
pub mod fixture;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出配置与布局
pub use config::{DEFAULT_CONFIG_PATH, EngineConfig, LayoutChoice};
pub use layout::Layout;

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出包读取、写入与校验
pub use reader::Package;
pub use validator::{validate, validate_bytes};
pub use writer::{PackageChanges, write_package};

// 重新导出章节与定位
pub use chapter::{ChapterRecord, Sequence};
pub use locator::{ChapterLinks, ChapterLocator, ChapterRef, resolve_index};

// 重新导出结构编辑
pub use editor::{
    EditSession,
    ExtractedChapter,
    delete,
    extract_chapters,
    find_by_source_url,
    insert,
    merge,
    refresh,
    reorder,
};

// 重新导出OPF相关
pub use opf::{ManifestItem, PackageDocument, SourceEntry, SpineItem};

// 重新导出NCX与导航文档相关
pub use nav::{NavDocument, NavItem};
pub use ncx::{NavPoint, Ncx};
