use crate::epub::chapter::source_id;
use crate::epub::editor::EditSession;
use crate::epub::error::Result;
use crate::epub::locator::ChapterLocator;

impl EditSession {
    /// 从四个视图中删除章节并移除其内容文件
    ///
    /// 先定位manifest项、spine项与navPoint，任意一个找不到都直接返回
    /// 结构不匹配错误，此时不做任何修改。其他章节的编号与文件保持不变，
    /// 只有playOrder大于被删条目的导航点减一。
    pub fn delete(&mut self, chapter_path: &str) -> Result<()> {
        let links = ChapterLocator::new(self.layout(), &self.config).links(chapter_path, &self.opf, &self.ncx)?;
        let nav_item_position = match &self.nav {
            Some(nav) => nav.position_of_target(chapter_path)?,
            None => None,
        };
        tracing::debug!(
            "删除章节 {}: manifest id {}, spine位置 {}, navMap位置 {}",
            chapter_path,
            links.manifest_id,
            links.spine_position,
            links.nav_position
        );

        self.opf.remove_spine_item(&links.manifest_id)?;
        self.opf.remove_manifest_item(&links.manifest_id)?;
        self.ncx.remove_nav_point(links.nav_position)?;
        if let Some(nav) = self.nav.as_mut() {
            match nav_item_position {
                Some(position) => nav.remove_item(position)?,
                None => tracing::warn!("导航文档中没有指向 {} 的条目", chapter_path),
            }
        }
        let source = source_id(&self.config.source_id_prefix, &links.manifest_id);
        if self.opf.remove_source(&source)? {
            tracing::debug!("移除来源元数据 {}", source);
        }
        self.changes.remove(chapter_path);

        tracing::info!("已删除章节 {}", chapter_path);
        Ok(())
    }
}
