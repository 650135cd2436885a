use crate::epub::error::{EpubError, Result};
use crate::epub::layout::Layout;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// container.xml 在包内的固定位置
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container, EpubError>` - 解析后的Container信息
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"rootfile" => {
                    let mut full_path = String::new();
                    let mut media_type = String::new();
                    for attr_result in e.attributes() {
                        let attr = attr_result?;
                        match attr.key.local_name().as_ref() {
                            b"full-path" => full_path = attr.unescape_value()?.into_owned(),
                            b"media-type" => media_type = attr.unescape_value()?.into_owned(),
                            _ => {}
                        }
                    }
                    if !full_path.is_empty() {
                        rootfiles.push(RootFile { full_path, media_type });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError(
                "没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 获取包文档（OPF）路径
    ///
    /// 优先返回媒体类型为 `application/oebps-package+xml` 的rootfile，
    /// 否则返回第一个rootfile。
    pub fn package_document_path(&self) -> Option<&str> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.media_type == PACKAGE_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
            .map(|rootfile| rootfile.full_path.as_str())
    }

    /// 生成指定布局下的container.xml文本
    pub fn render(layout: Layout) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{}" media-type="{}"/>
  </rootfiles>
</container>"#,
            layout.package_document_path(),
            PACKAGE_MEDIA_TYPE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/toc.ncx" media-type="application/x-dtbncx+xml"/>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(container.rootfiles.len(), 2);
        assert_eq!(container.package_document_path(), Some("OEBPS/content.opf"));
    }

    #[test]
    fn test_render_roundtrip() {
        for layout in [Layout::Legacy, Layout::Modern] {
            let container = Container::parse_xml(&Container::render(layout)).unwrap();
            assert_eq!(
                container.package_document_path(),
                Some(layout.package_document_path().as_str())
            );
        }
    }

    #[test]
    fn test_empty_rootfiles_is_error() {
        let result = Container::parse_xml("<container><rootfiles/></container>");
        assert!(matches!(result, Err(EpubError::ContainerParseError(_))));
    }
}
