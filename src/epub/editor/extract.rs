use crate::epub::chapter::{ChapterRecord, Sequence, source_id, title_from_xhtml};
use crate::epub::editor::EditSession;
use crate::epub::error::Result;
use crate::epub::layout::file_name;
use crate::epub::locator::ChapterLocator;

/// 从包中读出的章节及其在包内的位置
#[derive(Debug, Clone)]
pub struct ExtractedChapter {
    pub path: String,
    pub manifest_id: String,
    pub record: ChapterRecord,
}

impl EditSession {
    /// 按脊柱阅读顺序读出全部章节
    ///
    /// 标题优先取navMap标签，其次取XHTML的 `<title>`，最后退回到文件名。
    pub fn extract(&mut self) -> Result<Vec<ExtractedChapter>> {
        let locator = ChapterLocator::new(self.layout(), &self.config);
        let mut located = Vec::new();
        for path in locator.spine_order(&self.opf)? {
            let manifest_id = locator.manifest_id_of(&path, &self.opf)?.unwrap_or_default();
            let label = match self.ncx.position_of_target(&path)? {
                Some(position) => self.ncx.nav_points()?.get(position).map(|point| point.label.clone()),
                None => None,
            };
            let source = source_id(&self.config.source_id_prefix, &manifest_id);
            let source_url = self.opf.source_url(&source)?;
            located.push((path, manifest_id, label, source_url));
        }

        let mut chapters = Vec::with_capacity(located.len());
        for (path, manifest_id, label, source_url) in located {
            let content = self.read_text(&path)?;
            let title = label
                .filter(|label| !label.is_empty())
                .or_else(|| title_from_xhtml(&content))
                .unwrap_or_else(|| file_name(&path).to_string());
            let record = ChapterRecord {
                sequence: Sequence::from_file_name(file_name(&path)),
                title,
                source_url,
                content,
            };
            chapters.push(ExtractedChapter {
                path,
                manifest_id,
                record,
            });
        }
        tracing::debug!("读出 {} 个章节", chapters.len());
        Ok(chapters)
    }
}
