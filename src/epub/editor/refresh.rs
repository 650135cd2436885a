use crate::epub::chapter::{ChapterRecord, source_id};
use crate::epub::editor::EditSession;
use crate::epub::error::Result;
use crate::epub::locator::ChapterLocator;
use crate::epub::opf::SourceEntry;

impl EditSession {
    /// 原位替换章节的内容与标题
    ///
    /// 位置、文件名与所有标识符保持不变；只更新内容文件、navMap标签、
    /// 导航文档标签，以及提供了来源URL时的 `dc:source`。
    pub fn refresh(&mut self, chapter_path: &str, record: &ChapterRecord) -> Result<()> {
        let links = ChapterLocator::new(self.layout(), &self.config).links(chapter_path, &self.opf, &self.ncx)?;
        let nav_item_position = match &self.nav {
            Some(nav) => nav.position_of_target(chapter_path)?,
            None => None,
        };

        let content = record.to_xhtml(self.layout());
        self.changes.write(chapter_path, content);
        self.ncx.set_label(links.nav_position, &record.title)?;
        if let (Some(nav), Some(position)) = (self.nav.as_mut(), nav_item_position) {
            nav.set_label(position, &record.title)?;
        }
        if let Some(url) = &record.source_url {
            let id = source_id(&self.config.source_id_prefix, &links.manifest_id);
            self.opf.set_source(&SourceEntry::new(id, url))?;
        }

        tracing::info!("已更新章节 {} ({})", record.title, chapter_path);
        Ok(())
    }
}
