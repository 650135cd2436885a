use crate::epub::chapter::{Sequence, source_id};
use crate::epub::editor::{EditSession, ExtractedChapter};
use crate::epub::error::Result;
use crate::epub::layout::{file_name, parent_dir, relative_href, resolve_href};
use crate::epub::locator::max_sequence;
use crate::epub::ncx::NavPoint;
use crate::epub::opf::{ManifestItem, SourceEntry, SpineItem, XHTML_MEDIA_TYPE, image_media_type};
use crate::epub::xml::{Element, XmlDocument, local_part};
use std::collections::HashMap;

fn is_image(element: &Element) -> bool {
    matches!(element.local_name(), "img" | "image")
}

fn is_local_href(href: &str) -> bool {
    !href.is_empty() && !href.starts_with('#') && !href.contains(':')
}

/// 章节标记中引用的图片（解析为绝对条目名）
fn referenced_resources(doc: &XmlDocument, chapter_dir: &str) -> Result<Vec<String>> {
    let mut resources = Vec::new();
    for element in doc.root()?.descendants() {
        if !is_image(element) {
            continue;
        }
        for (key, value) in &element.attributes {
            if matches!(local_part(key), "src" | "href") && is_local_href(value) {
                let target = resolve_href(chapter_dir, value);
                if !resources.contains(&target) {
                    resources.push(target);
                }
            }
        }
    }
    Ok(resources)
}

/// 把图片与样式表中指向 `relocated` 旧路径的引用改写为相对于 `new_dir` 的新路径
fn rewrite_references(doc: &mut XmlDocument, chapter_dir: &str, new_dir: &str, relocated: &HashMap<String, String>) -> Result<()> {
    doc.root_mut()?.visit_descendants_mut(&mut |element: &mut Element| {
        if !is_image(element) && element.local_name() != "link" {
            return;
        }
        for (key, value) in element.attributes.iter_mut() {
            if !matches!(local_part(key), "src" | "href") || !is_local_href(value) {
                continue;
            }
            if let Some(new_path) = relocated.get(&resolve_href(chapter_dir, value)) {
                *value = relative_href(new_dir, new_path);
            }
        }
    });
    Ok(())
}

impl EditSession {
    /// 把 `addition` 的全部章节按其阅读顺序追加到本包末尾，返回追加的章节数
    ///
    /// 章节与图片从本包现有的最大编号之后重新编号，所有交叉引用
    /// （manifest、spine、navMap、导航文档、`dc:source` 以及章节内的图片引用）
    /// 都改写为新编号。每个章节的四个视图一起追加，任何一步失败都使整个合并失败。
    pub fn merge(&mut self, addition: &mut EditSession) -> Result<usize> {
        let layout = self.layout();
        let source_layout = addition.layout();
        let chapters = addition.extract()?;
        let source_manifest = addition.opf.manifest_items()?;

        let entries = self.entries();
        let mut next_chapter = max_sequence(&entries, &layout.text_dir()) + 1;
        let mut next_image = max_sequence(&entries, &layout.images_dir()) + 1;

        // 旧路径 -> 本包中的新路径
        let mut relocated: HashMap<String, String> = HashMap::new();
        let stylesheet = layout.stylesheet_path();
        if self.contains(&stylesheet) {
            relocated.insert(source_layout.stylesheet_path(), stylesheet);
        }

        tracing::debug!(
            "合并 {} 个章节, 章节编号从 {} 开始, 图片编号从 {} 开始",
            chapters.len(),
            next_chapter,
            next_image
        );

        let mut added = 0;
        for ExtractedChapter { path, record, .. } in chapters {
            self.opf.check_structure()?;
            let chapter_dir = parent_dir(&path).to_string();
            let mut doc = XmlDocument::parse(&record.content)?;

            for resource in referenced_resources(&doc, &chapter_dir)? {
                if relocated.contains_key(&resource) {
                    continue;
                }
                if !addition.contains(&resource) {
                    tracing::warn!("章节 {} 引用的资源 {} 不存在", path, resource);
                    continue;
                }
                let name = file_name(&resource);
                let (id, new_path) = loop {
                    let sequence = Sequence(next_image);
                    let id = format!("{}{:04}", self.config.image_id_prefix, next_image);
                    let new_path = layout.image_path(&sequence.renumber_file_name(name));
                    if !self.contains(&new_path) && self.opf.manifest_item(&id)?.is_none() {
                        break (id, new_path);
                    }
                    next_image += 1;
                };
                let media_type = source_manifest
                    .iter()
                    .find(|item| source_layout.resolve_package_href(&item.href) == resource)
                    .map(|item| item.media_type.clone())
                    .unwrap_or_else(|| image_media_type(name).to_string());
                let data = addition.read_bytes(&resource)?;

                tracing::debug!("移动图片 {} -> {}", resource, new_path);
                self.changes.write(new_path.clone(), data);
                self.opf
                    .add_manifest_item(&ManifestItem::new(id, layout.package_href(&new_path), media_type))?;
                relocated.insert(resource, new_path);
                next_image += 1;
            }

            let (sequence, new_path) = loop {
                let sequence = Sequence(next_chapter);
                let new_path = layout.text_path(&sequence.renumber_file_name(file_name(&path)));
                if !self.contains(&new_path) && self.opf.manifest_item(&sequence.manifest_id())?.is_none() {
                    break (sequence, new_path);
                }
                next_chapter += 1;
            };
            rewrite_references(&mut doc, &chapter_dir, &layout.text_dir(), &relocated)?;

            let manifest_id = sequence.manifest_id();
            self.changes.write(new_path.clone(), doc.to_string());
            self.opf
                .add_manifest_item(&ManifestItem::new(&manifest_id, layout.package_href(&new_path), XHTML_MEDIA_TYPE))?;
            self.opf.append_spine_item(&SpineItem::new(&manifest_id))?;
            let src = relative_href(self.ncx.base_dir(), &new_path);
            self.ncx
                .append_nav_point(NavPoint::new(sequence.nav_id(), 0, &record.title, src))?;
            if let Some(nav) = self.nav.as_mut() {
                nav.append_item(&record.title, &new_path)?;
            }
            if let Some(url) = &record.source_url {
                let id = source_id(&self.config.source_id_prefix, &manifest_id);
                self.opf.set_source(&SourceEntry::new(id, url))?;
            }

            tracing::debug!("移动章节 {} -> {}", path, new_path);
            next_chapter += 1;
            added += 1;
        }

        tracing::info!("已合并 {} 个章节", added);
        Ok(added)
    }
}
