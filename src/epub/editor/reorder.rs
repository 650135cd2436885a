use crate::epub::editor::{EditSession, splice_order};
use crate::epub::error::{EpubError, Result};
use crate::epub::locator::ChapterLocator;

impl EditSession {
    /// 按 `new_order` 重排一组章节
    ///
    /// `new_order` 是现有章节（路径）的一个子集的排列。不属于该子集的spine项
    /// 保持原有相对位置，例如位于开头的封面重排后仍在开头。navMap与导航文档
    /// 按同样的规则重排，playOrder重新编号为 `1..N`。
    ///
    /// 在manifest或spine中找不到的章节返回 [`EpubError::UnresolvedReference`]，
    /// 重复出现的章节返回 [`EpubError::StructuralMismatch`]。
    pub fn reorder<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<()> {
        let locator = ChapterLocator::new(self.layout(), &self.config);
        let idrefs: Vec<String> = self
            .opf
            .spine_items()?
            .into_iter()
            .map(|item| item.idref)
            .collect();

        let mut spine_moved = Vec::with_capacity(new_order.len());
        let mut nav_moved = Vec::with_capacity(new_order.len());
        for path in new_order.iter().map(AsRef::as_ref) {
            let manifest_id = locator
                .manifest_id_of(path, &self.opf)?
                .ok_or_else(|| EpubError::UnresolvedReference(format!("manifest中没有章节 {}", path)))?;
            let position = idrefs
                .iter()
                .position(|idref| *idref == manifest_id)
                .ok_or_else(|| EpubError::UnresolvedReference(format!("spine中没有章节 {}", path)))?;
            if spine_moved.contains(&position) {
                return Err(EpubError::StructuralMismatch(format!("重排序列中 {} 重复出现", path)));
            }
            spine_moved.push(position);

            let nav_position = self
                .ncx
                .position_of_target(path)?
                .ok_or_else(|| EpubError::UnresolvedReference(format!("navMap中没有指向 {} 的navPoint", path)))?;
            nav_moved.push(nav_position);
        }

        let spine_order: Vec<String> = splice_order(idrefs.len(), &spine_moved)
            .into_iter()
            .map(|position| idrefs[position].clone())
            .collect();
        let nav_count = self.ncx.nav_points()?.len();
        let nav_order = splice_order(nav_count, &nav_moved);

        let nav_item_order = match &self.nav {
            Some(nav) => {
                let items = nav.items()?;
                let mut moved = Vec::with_capacity(new_order.len());
                for path in new_order.iter().map(AsRef::as_ref) {
                    match items.iter().position(|item| item.target == path) {
                        Some(position) => moved.push(position),
                        None => tracing::warn!("导航文档中没有指向 {} 的条目", path),
                    }
                }
                Some(splice_order(items.len(), &moved))
            }
            None => None,
        };

        tracing::debug!("重排spine: {:?}", spine_order);
        self.opf.reorder_spine(&spine_order)?;
        self.ncx.reorder(&nav_order)?;
        if let (Some(nav), Some(order)) = (self.nav.as_mut(), nav_item_order) {
            nav.reorder(&order)?;
        }

        tracing::info!("已重排 {} 个章节", new_order.len());
        Ok(())
    }
}
