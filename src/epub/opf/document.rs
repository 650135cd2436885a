//! 包文档模块
//!
//! 在XML文档树上提供manifest、spine以及 `dc:source` 元数据的读取与编辑。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{ManifestItem, SourceEntry, SpineItem};
use crate::epub::xml::{Element, XmlDocument};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// 可编辑的包文档（content.opf）
#[derive(Debug, Clone)]
pub struct PackageDocument {
    doc: XmlDocument,
}

impl PackageDocument {
    /// 解析包文档
    ///
    /// 要求根元素下存在 `<metadata>`、`<manifest>` 与 `<spine>` 三个部分。
    pub fn parse(xml_content: &str) -> Result<PackageDocument> {
        let document = PackageDocument {
            doc: XmlDocument::parse(xml_content)?,
        };
        document.check_structure()?;
        Ok(document)
    }

    /// 检查三个必需部分是否都存在
    pub fn check_structure(&self) -> Result<()> {
        for section in ["metadata", "manifest", "spine"] {
            self.section(section)?;
        }
        Ok(())
    }

    fn section(&self, local: &str) -> Result<&Element> {
        self.doc
            .root()?
            .find_child(local)
            .ok_or_else(|| EpubError::StructuralMismatch(format!("包文档缺少 <{}>", local)))
    }

    fn section_mut(&mut self, local: &str) -> Result<&mut Element> {
        self.doc
            .root_mut()?
            .find_child_mut(local)
            .ok_or_else(|| EpubError::StructuralMismatch(format!("包文档缺少 <{}>", local)))
    }

    // === manifest ===

    /// 所有清单项（文档顺序）
    pub fn manifest_items(&self) -> Result<Vec<ManifestItem>> {
        Ok(self
            .section("manifest")?
            .children_named("item")
            .filter_map(ManifestItem::from_element)
            .collect())
    }

    /// 根据ID获取清单项
    pub fn manifest_item(&self, id: &str) -> Result<Option<ManifestItem>> {
        Ok(self.manifest_items()?.into_iter().find(|item| item.id == id))
    }

    /// 根据href获取清单项
    pub fn manifest_item_by_href(&self, href: &str) -> Result<Option<ManifestItem>> {
        Ok(self.manifest_items()?.into_iter().find(|item| item.href == href))
    }

    /// href到id的映射
    pub fn href_to_id(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .manifest_items()?
            .into_iter()
            .map(|item| (item.href, item.id))
            .collect())
    }

    /// 追加清单项
    ///
    /// manifest中的顺序没有意义，追加总是安全的；id重复时返回错误。
    pub fn add_manifest_item(&mut self, item: &ManifestItem) -> Result<()> {
        if self.manifest_item(&item.id)?.is_some() {
            return Err(EpubError::StructuralMismatch(format!(
                "manifest中已存在id为 {} 的项目",
                item.id
            )));
        }
        self.section_mut("manifest")?
            .append_named("item", item.to_element());
        Ok(())
    }

    /// 移除指定id的清单项
    pub fn remove_manifest_item(&mut self, id: &str) -> Result<()> {
        let removed = self
            .section_mut("manifest")?
            .remove_named_where("item", &|e: &Element| e.attr("id") == Some(id));
        if removed == 0 {
            return Err(EpubError::StructuralMismatch(format!(
                "manifest中找不到id为 {} 的项目",
                id
            )));
        }
        Ok(())
    }

    // === spine ===

    /// 脊柱项（阅读顺序）
    pub fn spine_items(&self) -> Result<Vec<SpineItem>> {
        Ok(self
            .section("spine")?
            .children_named("itemref")
            .filter_map(SpineItem::from_element)
            .collect())
    }

    /// 某个idref在脊柱中的位置
    pub fn spine_position(&self, idref: &str) -> Result<Option<usize>> {
        Ok(self
            .section("spine")?
            .children_named("itemref")
            .position(|e| e.attr("idref") == Some(idref)))
    }

    /// 在脊柱的 `position` 处插入itemref，越界时追加到末尾
    pub fn insert_spine_item(&mut self, position: usize, item: &SpineItem) -> Result<()> {
        self.section_mut("spine")?
            .insert_named("itemref", position, item.to_element());
        Ok(())
    }

    /// 追加itemref
    pub fn append_spine_item(&mut self, item: &SpineItem) -> Result<()> {
        self.section_mut("spine")?
            .append_named("itemref", item.to_element());
        Ok(())
    }

    /// 移除idref对应的itemref，返回其原位置
    pub fn remove_spine_item(&mut self, idref: &str) -> Result<usize> {
        let position = self.spine_position(idref)?.ok_or_else(|| {
            EpubError::StructuralMismatch(format!("spine中找不到idref为 {} 的项目", idref))
        })?;
        self.section_mut("spine")?.remove_named("itemref", position);
        Ok(position)
    }

    /// 按新的idref顺序重排全部itemref
    ///
    /// `order` 必须是现有itemref的一个排列；原有属性（如linear）随元素一起移动。
    pub fn reorder_spine(&mut self, order: &[String]) -> Result<()> {
        let spine = self.section_mut("spine")?;
        let mut existing: HashMap<String, Element> = HashMap::new();
        for element in spine.children_named("itemref") {
            if let Some(idref) = element.attr("idref") {
                existing.insert(idref.to_string(), element.clone());
            }
        }
        let mut reordered = Vec::with_capacity(order.len());
        for idref in order {
            let element = existing.remove(idref).ok_or_else(|| {
                EpubError::StructuralMismatch(format!("spine重排序列中的 {} 不存在或重复", idref))
            })?;
            reordered.push(element);
        }
        spine.replace_named("itemref", reordered)
    }

    // === metadata ===

    /// 所有 `dc:source` 元数据
    pub fn sources(&self) -> Result<Vec<SourceEntry>> {
        let mut sources = Vec::new();
        for element in self.section("metadata")?.children_named("source") {
            sources.push(SourceEntry {
                id: element.attr("id").map(str::to_string),
                url: element.text()?.trim().to_string(),
            });
        }
        Ok(sources)
    }

    /// 指定id的来源URL
    pub fn source_url(&self, source_id: &str) -> Result<Option<String>> {
        Ok(self
            .sources()?
            .into_iter()
            .find(|source| source.id.as_deref() == Some(source_id))
            .map(|source| source.url))
    }

    /// 设置来源URL，已存在同id条目时原位更新
    pub fn set_source(&mut self, source: &SourceEntry) -> Result<()> {
        let metadata = self.section_mut("metadata")?;
        if let Some(id) = source.id.as_deref() {
            if let Some(existing) = metadata
                .child_elements_mut()
                .find(|e| e.local_name() == "source" && e.attr("id") == Some(id))
            {
                existing.set_text(&source.url);
                return Ok(());
            }
        }
        metadata.append_named("source", source.to_element());
        Ok(())
    }

    /// 移除指定id的来源元数据，返回是否存在
    pub fn remove_source(&mut self, source_id: &str) -> Result<bool> {
        let removed = self
            .section_mut("metadata")?
            .remove_named_where("source", &|e: &Element| e.attr("id") == Some(source_id));
        Ok(removed > 0)
    }
}

impl Display for PackageDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.doc, f)
    }
}
