//! NCX文档模块
//!
//! 在XML文档树上提供导航地图（navMap）的读取与编辑，
//! 负责维护playOrder `{1..N}` 连续且与脊柱顺序一致。

use crate::epub::error::{EpubError, Result};
use crate::epub::layout::resolve_href;
use crate::epub::ncx::navigation::{NavPoint, play_order_of};
use crate::epub::xml::{Element, XmlDocument};
use std::fmt::{self, Display, Formatter};

/// 可编辑的NCX文档
#[derive(Debug, Clone)]
pub struct Ncx {
    doc: XmlDocument,
    /// NCX文件所在目录，src相对于此目录
    base_dir: String,
}

impl Ncx {
    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    /// * `base_dir` - NCX文件所在目录，用于解析content的src
    pub fn parse_xml(xml_content: &str, base_dir: &str) -> Result<Ncx> {
        let ncx = Ncx {
            doc: XmlDocument::parse(xml_content)?,
            base_dir: base_dir.to_string(),
        };
        ncx.nav_map()?;
        Ok(ncx)
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    fn nav_map(&self) -> Result<&Element> {
        self.doc
            .root()?
            .find_child("navMap")
            .ok_or_else(|| EpubError::StructuralMismatch("NCX缺少 <navMap>".to_string()))
    }

    fn nav_map_mut(&mut self) -> Result<&mut Element> {
        self.doc
            .root_mut()?
            .find_child_mut("navMap")
            .ok_or_else(|| EpubError::StructuralMismatch("NCX缺少 <navMap>".to_string()))
    }

    /// 顶层导航点（文档顺序）
    pub fn nav_points(&self) -> Result<Vec<NavPoint>> {
        self.nav_map()?
            .children_named("navPoint")
            .map(NavPoint::from_element)
            .collect()
    }

    /// 所有导航点的playOrder（深度优先文档顺序，含嵌套导航点）
    pub fn play_orders(&self) -> Result<Vec<u32>> {
        Ok(self
            .nav_map()?
            .descendants()
            .into_iter()
            .filter(|e| e.local_name() == "navPoint")
            .map(|e| play_order_of(e).unwrap_or(0))
            .collect())
    }

    /// 导航点src解析后的绝对条目名
    pub fn resolve_src(&self, src: &str) -> String {
        resolve_href(&self.base_dir, src)
    }

    /// 指向 `target`（绝对条目名）的顶层导航点位置
    ///
    /// 按 `content@src` 匹配而不是按id匹配：合并进来的章节不一定遵循编号约定。
    pub fn position_of_target(&self, target: &str) -> Result<Option<usize>> {
        Ok(self
            .nav_map()?
            .children_named("navPoint")
            .position(|e| {
                e.find_child("content")
                    .and_then(|content| content.attr("src"))
                    .is_some_and(|src| self.resolve_src(src) == target)
            }))
    }

    /// 在顶层第 `position` 个导航点之前插入（越界时追加）
    ///
    /// 插入后按文档顺序（含嵌套导航点）重新编号playOrder。
    pub fn insert_nav_point(&mut self, position: usize, point: NavPoint) -> Result<()> {
        let count = self.nav_map()?.count_named("navPoint");
        let position = position.min(count);
        self.nav_map_mut()?
            .insert_named("navPoint", position, point.to_element());
        self.renumber()
    }

    /// 追加导航点，playOrder取当前最大值加一
    pub fn append_nav_point(&mut self, mut point: NavPoint) -> Result<()> {
        point.play_order = self.play_orders()?.into_iter().max().unwrap_or(0) + 1;
        self.nav_map_mut()?
            .append_named("navPoint", point.to_element());
        Ok(())
    }

    /// 移除顶层第 `position` 个导航点
    ///
    /// 连同其嵌套导航点一起移除，之后重新编号playOrder。
    pub fn remove_nav_point(&mut self, position: usize) -> Result<NavPoint> {
        let removed = self
            .nav_map_mut()?
            .remove_named("navPoint", position)
            .ok_or_else(|| {
                EpubError::StructuralMismatch(format!("navMap中不存在第 {} 个navPoint", position))
            })?;
        let point = NavPoint::from_element(&removed)?;
        self.renumber()?;
        Ok(point)
    }

    /// 按给定的原位置序列重排顶层导航点，并重新编号playOrder
    ///
    /// `order` 必须是 `0..N` 的一个排列。
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let nav_map = self.nav_map_mut()?;
        let current: Vec<Element> = nav_map.children_named("navPoint").cloned().collect();
        let mut used = vec![false; current.len()];
        let mut reordered = Vec::with_capacity(order.len());
        for &index in order {
            if index >= current.len() || used[index] {
                return Err(EpubError::StructuralMismatch(format!(
                    "navPoint重排序列无效: {:?}",
                    order
                )));
            }
            used[index] = true;
            reordered.push(current[index].clone());
        }
        nav_map.replace_named("navPoint", reordered)?;
        self.renumber()
    }

    /// 按文档顺序把playOrder重新编号为 `1..N`
    pub fn renumber(&mut self) -> Result<()> {
        let mut next = 1u32;
        self.nav_map_mut()?.visit_descendants_mut(&mut |element: &mut Element| {
            if element.local_name() == "navPoint" {
                element.set_attr("playOrder", next.to_string());
                next += 1;
            }
        });
        Ok(())
    }

    /// 修改顶层第 `position` 个导航点的标签文本
    pub fn set_label(&mut self, position: usize, label: &str) -> Result<()> {
        let point = self
            .nav_map_mut()?
            .child_elements_mut()
            .filter(|e| e.local_name() == "navPoint")
            .nth(position)
            .ok_or_else(|| {
                EpubError::StructuralMismatch(format!("navMap中不存在第 {} 个navPoint", position))
            })?;
        let text = point
            .find_child_mut("navLabel")
            .and_then(|nav_label| nav_label.find_child_mut("text"))
            .ok_or_else(|| EpubError::StructuralMismatch("navPoint缺少 <navLabel><text>".to_string()))?;
        text.set_text(label);
        Ok(())
    }
}

impl Display for Ncx {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.doc, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta content="urn:uuid:1" name="dtb:uid"/>
  </head>
  <docTitle>
    <text>测试</text>
  </docTitle>
  <navMap>
    <navPoint id="body0001" playOrder="1"><navLabel><text>一</text></navLabel><content src="Text/0001_a.xhtml"/></navPoint>
    <navPoint id="body0002" playOrder="2"><navLabel><text>二</text></navLabel><content src="Text/0002_b.xhtml"/></navPoint>
    <navPoint id="body0003" playOrder="3"><navLabel><text>三</text></navLabel><content src="Text/0003_c.xhtml"/></navPoint>
  </navMap>
</ncx>"#;

    fn ncx() -> Ncx {
        Ncx::parse_xml(NCX, "OEBPS").unwrap()
    }

    fn ids(ncx: &Ncx) -> Vec<String> {
        ncx.nav_points().unwrap().into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_parse_nav_points() {
        let ncx = ncx();
        let points = ncx.nav_points().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].label, "二");
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3]);
        assert_eq!(ncx.to_string(), NCX);
    }

    #[test]
    fn test_missing_nav_map() {
        let result = Ncx::parse_xml("<ncx><head/></ncx>", "OEBPS");
        assert!(matches!(result, Err(EpubError::StructuralMismatch(_))));
    }

    #[test]
    fn test_position_of_target() {
        let ncx = ncx();
        assert_eq!(ncx.position_of_target("OEBPS/Text/0002_b.xhtml").unwrap(), Some(1));
        assert_eq!(ncx.position_of_target("OEBPS/Text/0009_x.xhtml").unwrap(), None);
    }

    #[test]
    fn test_insert_shifts_play_order() {
        let mut ncx = ncx();
        ncx.insert_nav_point(1, NavPoint::new("body0004", 0, "新", "Text/0004_d.xhtml"))
            .unwrap();
        assert_eq!(ids(&ncx), vec!["body0001", "body0004", "body0002", "body0003"]);
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut ncx = ncx();
        ncx.insert_nav_point(10, NavPoint::new("body0004", 0, "新", "Text/0004_d.xhtml"))
            .unwrap();
        assert_eq!(ids(&ncx).last().unwrap(), "body0004");
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_remove_decrements_following() {
        let mut ncx = ncx();
        let removed = ncx.remove_nav_point(0).unwrap();
        assert_eq!(removed.id, "body0001");
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2]);
        assert!(ncx.remove_nav_point(5).is_err());
    }

    #[test]
    fn test_nested_nav_points_stay_contiguous() {
        let nested = NCX.replace(
            r#"<content src="Text/0002_b.xhtml"/></navPoint>"#,
            r#"<content src="Text/0002_b.xhtml"/><navPoint id="sub1" playOrder="3"><navLabel><text>二.1</text></navLabel><content src="Text/0002_b.xhtml#s1"/></navPoint><navPoint id="sub2" playOrder="4"><navLabel><text>二.2</text></navLabel><content src="Text/0002_b.xhtml#s2"/></navPoint></navPoint>"#,
        )
        .replace(r#"id="body0003" playOrder="3""#, r#"id="body0003" playOrder="5""#);
        let mut ncx = Ncx::parse_xml(&nested, "OEBPS").unwrap();
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3, 4, 5]);

        ncx.insert_nav_point(2, NavPoint::new("body0004", 0, "新", "Text/0004_d.xhtml"))
            .unwrap();
        assert_eq!(ids(&ncx), vec!["body0001", "body0002", "body0004", "body0003"]);
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(ncx.nav_points().unwrap()[2].play_order, 5);

        let removed = ncx.remove_nav_point(1).unwrap();
        assert_eq!(removed.id, "body0002");
        assert_eq!(ids(&ncx), vec!["body0001", "body0004", "body0003"]);
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_reorder_renumbers() {
        let mut ncx = ncx();
        ncx.reorder(&[2, 0, 1]).unwrap();
        assert_eq!(ids(&ncx), vec!["body0003", "body0001", "body0002"]);
        assert_eq!(ncx.play_orders().unwrap(), vec![1, 2, 3]);
        assert!(ncx.reorder(&[0, 0, 1]).is_err());
    }

    #[test]
    fn test_append_and_label() {
        let mut ncx = ncx();
        ncx.append_nav_point(NavPoint::new("body0004", 0, "四", "Text/0004_d.xhtml"))
            .unwrap();
        assert_eq!(ncx.nav_points().unwrap()[3].play_order, 4);
        ncx.set_label(0, "第一章 & 序").unwrap();
        assert_eq!(ncx.nav_points().unwrap()[0].label, "第一章 & 序");
    }
}
