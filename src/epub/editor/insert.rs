use crate::epub::chapter::{ChapterRecord, source_id};
use crate::epub::editor::EditSession;
use crate::epub::error::Result;
use crate::epub::layout::relative_href;
use crate::epub::locator::next_sequence;
use crate::epub::ncx::NavPoint;
use crate::epub::opf::{ManifestItem, SourceEntry, SpineItem, XHTML_MEDIA_TYPE};

impl EditSession {
    /// 在脊柱的 `spine_index` 处插入章节，返回新章节文件的路径
    ///
    /// 章节编号取下一个未使用的编号，与插入位置无关；
    /// `spine_index` 不小于脊柱长度时追加到末尾。
    pub fn insert(&mut self, spine_index: usize, record: &ChapterRecord) -> Result<String> {
        let layout = self.layout();
        let mut sequence = next_sequence(&self.chapters());
        let mut path = layout.text_path(&sequence.file_name(&record.title, &self.config.chapter_extension));
        // 文件名与manifest id都必须未被占用
        while self.contains(&path) || self.opf.manifest_item(&sequence.manifest_id())?.is_some() {
            sequence = sequence.next();
            path = layout.text_path(&sequence.file_name(&record.title, &self.config.chapter_extension));
        }
        let manifest_id = sequence.manifest_id();

        let spine_paths = self.spine_paths()?;
        let spine_index = spine_index.min(spine_paths.len());
        let preceding = &spine_paths[..spine_index];

        // navMap与导航文档中的位置：之前有多少spine项带有导航条目
        let mut nav_position = 0;
        for target in preceding.iter().flatten() {
            if self.ncx.position_of_target(target)?.is_some() {
                nav_position += 1;
            }
        }
        let nav_item_position = match &self.nav {
            Some(nav) => {
                let targets: Vec<String> = nav.items()?.into_iter().map(|item| item.target).collect();
                Some(preceding.iter().flatten().filter(|p| targets.contains(p)).count())
            }
            None => None,
        };

        tracing::debug!(
            "插入章节 {} 于spine位置 {} (navMap位置 {})",
            path,
            spine_index,
            nav_position
        );

        self.changes.write(path.clone(), record.to_xhtml(layout));
        self.opf
            .add_manifest_item(&ManifestItem::new(&manifest_id, layout.package_href(&path), XHTML_MEDIA_TYPE))?;
        self.opf
            .insert_spine_item(spine_index, &SpineItem::new(&manifest_id))?;

        let src = relative_href(self.ncx.base_dir(), &path);
        self.ncx
            .insert_nav_point(nav_position, NavPoint::new(sequence.nav_id(), 0, &record.title, src))?;
        if let (Some(nav), Some(position)) = (self.nav.as_mut(), nav_item_position) {
            nav.insert_item(position, &record.title, &path)?;
        }
        if let Some(url) = &record.source_url {
            let id = source_id(&self.config.source_id_prefix, &manifest_id);
            self.opf.set_source(&SourceEntry::new(id, url))?;
        }

        tracing::info!("已插入章节 {} ({})", record.title, path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use crate::epub::chapter::ChapterRecord;
    use crate::epub::config::EngineConfig;
    use crate::epub::editor::{EditSession, delete, insert};
    use crate::epub::fixture::{FixtureBuilder, Snapshot};
    use crate::epub::layout::Layout;
    use crate::epub::opf::{ManifestItem, XHTML_MEDIA_TYPE};
    use crate::epub::reader::Package;

    fn record(title: &str) -> ChapterRecord {
        ChapterRecord::new(title, "<p>新内容</p>")
    }

    #[test]
    fn test_insert_in_middle() {
        let bytes = FixtureBuilder::new(Layout::Legacy).chapters(3).build();
        let config = EngineConfig::default_config();
        let output = insert(&bytes, 1, &record("New"), &config).unwrap();
        let snapshot = Snapshot::of(&output);
        snapshot.assert_consistent();

        assert_eq!(snapshot.spine, vec!["xhtml0001", "xhtml0004", "xhtml0002", "xhtml0003"]);
        let ids: Vec<_> = snapshot.nav_points.iter().map(|p| p.0.as_str()).collect();
        assert_eq!(ids, vec!["body0001", "body0004", "body0002", "body0003"]);
        assert_eq!(snapshot.nav_points[1].1, 2);
        assert_eq!(snapshot.nav_points[1].2, "OEBPS/Text/0004_New.xhtml");
        assert!(snapshot.entries.contains(&"OEBPS/Text/0004_New.xhtml".to_string()));
    }

    #[test]
    fn test_insert_with_entity_in_nav_labels() {
        let bytes = FixtureBuilder::new(Layout::Modern).chapters(2).with_entities().build();
        let config = EngineConfig::default_config();
        let output = insert(&bytes, 1, &record("New"), &config).unwrap();

        let snapshot = Snapshot::of(&output);
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine, vec!["xhtml0001", "xhtml0003", "xhtml0002"]);
        let labels: Vec<_> = snapshot.nav_items.unwrap().into_iter().map(|(_, label)| label).collect();
        assert_eq!(labels, vec!["Chapter\u{a0}1", "New", "Chapter\u{a0}2"]);
        assert_eq!(snapshot.nav_points[0].3, "Chapter\u{a0}1");

        let mut package = Package::open(output).unwrap();
        let nav = package.read_text(&Layout::Modern.nav_document_path()).unwrap();
        assert!(nav.contains(">Chapter&nbsp;1</a>"));
    }

    #[test]
    fn test_insert_skips_taken_manifest_id() {
        let bytes = FixtureBuilder::new(Layout::Legacy).chapters(3).build();
        let config = EngineConfig::default_config();
        let mut session = EditSession::open(bytes, &config).unwrap();
        session
            .opf
            .add_manifest_item(&ManifestItem::new("xhtml0004", "Misc/notes.xhtml", XHTML_MEDIA_TYPE))
            .unwrap();

        let path = session.insert(3, &record("New")).unwrap();
        assert_eq!(path, "OEBPS/Text/0005_New.xhtml");
        assert!(session.package_document().manifest_item("xhtml0005").unwrap().is_some());
    }

    #[test]
    fn test_insert_past_end_appends() {
        let bytes = FixtureBuilder::new(Layout::Modern).chapters(2).build();
        let config = EngineConfig::default_config();
        let output = insert(&bytes, 99, &record("Tail"), &config).unwrap();
        let snapshot = Snapshot::of(&output);
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine.last().map(String::as_str), Some("xhtml0003"));
        assert_eq!(snapshot.nav_points.last().map(|p| p.1), Some(3));
    }

    #[test]
    fn test_insert_after_cover_counts_nav_positions() {
        let bytes = FixtureBuilder::new(Layout::Legacy).chapters(2).with_cover().build();
        let config = EngineConfig::default_config();
        let output = insert(&bytes, 1, &record("First"), &config).unwrap();
        let snapshot = Snapshot::of(&output);
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine, vec!["cover", "xhtml0003", "xhtml0001", "xhtml0002"]);
        assert_eq!(snapshot.nav_points[0].0, "body0003");
        assert_eq!(snapshot.nav_points[0].1, 1);
    }

    #[test]
    fn test_insert_writes_source_and_content() {
        let bytes = FixtureBuilder::new(Layout::Modern).chapters(1).build();
        let config = EngineConfig::default_config();
        let chapter = record("Sourced").with_source_url("https://example.com/new");
        let output = insert(&bytes, 0, &chapter, &config).unwrap();

        let snapshot = Snapshot::of(&output);
        assert!(snapshot
            .sources
            .contains(&("id.xhtml0002".to_string(), "https://example.com/new".to_string())));
        let mut package = Package::open(output).unwrap();
        let content = package.read_text("EPUB/text/0002_Sourced.xhtml").unwrap();
        assert!(content.contains("<p>新内容</p>"));
        assert!(content.contains("../styles/stylesheet.css"));
    }

    #[test]
    fn test_insert_without_nav_document() {
        let bytes = FixtureBuilder::new(Layout::Legacy).chapters(2).without_nav_document().build();
        let config = EngineConfig::default_config();
        let output = insert(&bytes, 0, &record("Solo"), &config).unwrap();
        let snapshot = Snapshot::of(&output);
        snapshot.assert_consistent();
        assert!(snapshot.nav_items.is_none());
    }

    #[test]
    fn test_delete_then_insert_scenario() {
        let bytes = FixtureBuilder::new(Layout::Legacy).chapters(3).build();
        let config = EngineConfig::default_config();
        let second = FixtureBuilder::chapter_path(Layout::Legacy, 2);

        let deleted = delete(&bytes, &second, &config).unwrap();
        let snapshot = Snapshot::of(&deleted);
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine, vec!["xhtml0001", "xhtml0003"]);
        let orders: Vec<u32> = snapshot.nav_points.iter().map(|p| p.1).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(!snapshot.entries.contains(&second));

        // 编号3仍被占用，新章节跳到下一个未使用的编号
        let inserted = insert(&deleted, 1, &record("Again"), &config).unwrap();
        let snapshot = Snapshot::of(&inserted);
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine, vec!["xhtml0001", "xhtml0004", "xhtml0003"]);
        let nav: Vec<(&str, u32)> = snapshot.nav_points.iter().map(|p| (p.0.as_str(), p.1)).collect();
        assert_eq!(nav, vec![("body0001", 1), ("body0004", 2), ("body0003", 3)]);
    }

    #[test]
    fn test_sequential_inserts_in_one_session() {
        let bytes = FixtureBuilder::new(Layout::Modern).chapters(1).build();
        let mut session = EditSession::open(bytes, &EngineConfig::default_config()).unwrap();
        let first = session.insert(0, &record("A")).unwrap();
        let second = session.insert(0, &record("B")).unwrap();
        assert_ne!(first, second);
        let snapshot = Snapshot::of(&session.commit().unwrap());
        snapshot.assert_consistent();
        assert_eq!(snapshot.spine, vec!["xhtml0003", "xhtml0002", "xhtml0001"]);
    }
}
