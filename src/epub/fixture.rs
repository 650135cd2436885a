//! 测试用EPUB包构造器

use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::layout::{Layout, parent_dir, relative_href};
use crate::epub::reader::Package;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// 构造测试用的EPUB包
pub struct FixtureBuilder {
    layout: Layout,
    chapters: usize,
    cover: bool,
    nav_document: bool,
    sources: bool,
    /// 导航标签与图片alt中使用HTML命名实体
    entities: bool,
    /// (章节编号, 图片文件名)
    images: Vec<(usize, String)>,
}

impl FixtureBuilder {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            chapters: 0,
            cover: false,
            nav_document: true,
            sources: false,
            entities: false,
            images: Vec::new(),
        }
    }

    pub fn chapters(mut self, count: usize) -> Self {
        self.chapters = count;
        self
    }

    pub fn with_cover(mut self) -> Self {
        self.cover = true;
        self
    }

    pub fn without_nav_document(mut self) -> Self {
        self.nav_document = false;
        self
    }

    pub fn with_sources(mut self) -> Self {
        self.sources = true;
        self
    }

    pub fn with_entities(mut self) -> Self {
        self.entities = true;
        self
    }

    fn label(&self, number: usize) -> String {
        if self.entities {
            format!("Chapter&nbsp;{}", number)
        } else {
            format!("Chapter {}", number)
        }
    }

    /// 在第 `chapter` 章（从1开始）中引用一张图片
    pub fn with_image(mut self, chapter: usize, file_name: &str) -> Self {
        self.images.push((chapter, file_name.to_string()));
        self
    }

    pub fn chapter_path(layout: Layout, number: usize) -> String {
        layout.text_path(&format!("{:04}_chapter-{}.xhtml", number, number))
    }

    fn chapter_xhtml(&self, number: usize) -> String {
        let text_dir = self.layout.text_dir();
        let mut images = String::new();
        for (_, file_name) in self.images.iter().filter(|(c, _)| *c == number) {
            let href = relative_href(&text_dir, &self.layout.image_path(file_name));
            let alt = if self.entities { "figure&nbsp;1" } else { "" };
            images.push_str(&format!("  <p><img alt=\"{}\" src=\"{}\"/></p>\n", alt, href));
        }
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>Chapter {n}</title>
  <link href="{css}" rel="stylesheet" type="text/css"/>
</head>
<body>
  <h1>Chapter {n}</h1>
  <p>Body of chapter {n}&nbsp;text.</p>
{images}</body>
</html>"#,
            n = number,
            css = relative_href(&text_dir, &self.layout.stylesheet_path()),
            images = images,
        )
    }

    fn opf(&self) -> String {
        let layout = self.layout;
        let mut sources = String::new();
        let mut manifest = String::new();
        let mut spine = String::new();

        manifest.push_str("    <item href=\"toc.ncx\" id=\"ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
        manifest.push_str(&format!(
            "    <item href=\"{}\" id=\"stylesheet\" media-type=\"text/css\"/>\n",
            layout.package_href(&layout.stylesheet_path())
        ));
        if self.nav_document {
            manifest.push_str(&format!(
                "    <item href=\"{}\" id=\"nav\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
                layout.package_href(&layout.nav_document_path())
            ));
        }
        if self.cover {
            manifest.push_str(&format!(
                "    <item href=\"{}\" id=\"cover\" media-type=\"application/xhtml+xml\"/>\n",
                layout.package_href(&layout.text_path("Cover.xhtml"))
            ));
            spine.push_str("    <itemref idref=\"cover\"/>\n");
        }
        for number in 1..=self.chapters {
            manifest.push_str(&format!(
                "    <item href=\"{}\" id=\"xhtml{:04}\" media-type=\"application/xhtml+xml\"/>\n",
                layout.package_href(&Self::chapter_path(layout, number)),
                number
            ));
            spine.push_str(&format!("    <itemref idref=\"xhtml{:04}\"/>\n", number));
            if self.sources {
                sources.push_str(&format!(
                    "    <dc:source id=\"id.xhtml{:04}\">https://example.com/chapter/{}</dc:source>\n",
                    number, number
                ));
            }
        }
        for (index, (_, file_name)) in self.images.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item href=\"{}\" id=\"image{:04}\" media-type=\"image/png\"/>\n",
                layout.package_href(&layout.image_path(file_name)),
                index + 1
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Fixture</dc:title>
    <dc:language>en</dc:language>
    <dc:identifier id="BookId">urn:uuid:fixture</dc:identifier>
{sources}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>"#
        )
    }

    fn ncx(&self) -> String {
        let ncx_dir = self.layout.content_dir();
        let mut points = String::new();
        for number in 1..=self.chapters {
            points.push_str(&format!(
                "    <navPoint id=\"body{n:04}\" playOrder=\"{n}\"><navLabel><text>{label}</text></navLabel><content src=\"{src}\"/></navPoint>\n",
                n = number,
                label = self.label(number),
                src = relative_href(ncx_dir, &Self::chapter_path(self.layout, number)),
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta content="urn:uuid:fixture" name="dtb:uid"/>
  </head>
  <docTitle>
    <text>Fixture</text>
  </docTitle>
  <navMap>
{points}  </navMap>
</ncx>"#
        )
    }

    fn nav_xhtml(&self) -> String {
        let nav_path = self.layout.nav_document_path();
        let nav_dir = parent_dir(&nav_path);
        let mut items = String::new();
        for number in 1..=self.chapters {
            items.push_str(&format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                relative_href(nav_dir, &Self::chapter_path(self.layout, number)),
                self.label(number)
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Contents</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <ol>
{items}    </ol>
  </nav>
</body>
</html>"#
        )
    }

    /// 生成zip字节
    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout;
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        write(&mut zip, "mimetype", b"application/epub+zip", stored);
        zip.add_directory("META-INF/", deflated).unwrap();
        write(&mut zip, CONTAINER_PATH, Container::render(layout).as_bytes(), deflated);
        write(&mut zip, &layout.package_document_path(), self.opf().as_bytes(), deflated);
        write(&mut zip, &layout.nav_map_path(), self.ncx().as_bytes(), deflated);
        write(&mut zip, &layout.stylesheet_path(), b"body { margin: 0; }", deflated);
        if self.nav_document {
            write(&mut zip, &layout.nav_document_path(), self.nav_xhtml().as_bytes(), deflated);
        }
        if self.cover {
            write(
                &mut zip,
                &layout.text_path("Cover.xhtml"),
                b"<?xml version=\"1.0\" encoding=\"utf-8\"?><html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Cover</title></head><body/></html>",
                deflated,
            );
        }
        for number in 1..=self.chapters {
            write(
                &mut zip,
                &Self::chapter_path(layout, number),
                self.chapter_xhtml(number).as_bytes(),
                deflated,
            );
        }
        for (_, file_name) in &self.images {
            let data = format!("\u{89}PNG fake {}", file_name);
            write(&mut zip, &layout.image_path(file_name), data.as_bytes(), stored);
        }

        zip.finish().unwrap().into_inner()
    }
}

fn write(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8], options: SimpleFileOptions) {
    zip.start_file(name, options).unwrap();
    zip.write_all(data).unwrap();
}

/// 编辑结果的结构摘要，用于断言四种视图是否一致
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<String>,
    /// manifest中的 (id, 绝对路径)
    pub manifest: Vec<(String, String)>,
    pub spine: Vec<String>,
    /// 顶层navPoint的 (id, playOrder, 绝对路径, 标签)
    pub nav_points: Vec<(String, u32, String, String)>,
    /// 导航文档条目的 (绝对路径, 标签)
    pub nav_items: Option<Vec<(String, String)>>,
    /// dc:source的 (id, url)
    pub sources: Vec<(String, String)>,
}

impl Snapshot {
    pub fn of(bytes: &[u8]) -> Snapshot {
        let mut package = Package::open(bytes.to_vec()).unwrap();
        let layout = package.layout();
        let opf = package.package_document().unwrap();
        let ncx = package.nav_map().unwrap();
        let nav = package.nav_document().unwrap();
        Snapshot {
            entries: package.entries().to_vec(),
            manifest: opf
                .manifest_items()
                .unwrap()
                .into_iter()
                .map(|item| (item.id, layout.resolve_package_href(&item.href)))
                .collect(),
            spine: opf.spine_items().unwrap().into_iter().map(|item| item.idref).collect(),
            nav_points: ncx
                .nav_points()
                .unwrap()
                .into_iter()
                .map(|p| (p.id, p.play_order, ncx.resolve_src(&p.src), p.label))
                .collect(),
            nav_items: nav.map(|nav| {
                nav.items()
                    .unwrap()
                    .into_iter()
                    .map(|item| (item.target, item.label))
                    .collect()
            }),
            sources: opf
                .sources()
                .unwrap()
                .into_iter()
                .map(|s| (s.id.unwrap_or_default(), s.url))
                .collect(),
        }
    }

    /// 脊柱中章节按阅读顺序对应的绝对路径
    pub fn spine_paths(&self) -> Vec<String> {
        self.spine
            .iter()
            .filter_map(|idref| {
                self.manifest
                    .iter()
                    .find(|(id, _)| id == idref)
                    .map(|(_, path)| path.clone())
            })
            .collect()
    }

    /// 检查四种视图一致、playOrder为 `{1..N}` 且与脊柱顺序一致
    pub fn assert_consistent(&self) {
        let nav_paths: Vec<&String> = self.nav_points.iter().map(|(_, _, path, _)| path).collect();
        let chapter_spine: Vec<String> = self
            .spine_paths()
            .into_iter()
            .filter(|path| nav_paths.contains(&path))
            .collect();
        assert_eq!(
            chapter_spine.len(),
            self.nav_points.len(),
            "每个navPoint都必须在脊柱中出现一次: {:?}",
            self
        );
        for (index, (_, play_order, path, _)) in self.nav_points.iter().enumerate() {
            assert_eq!(*play_order as usize, index + 1, "playOrder不连续: {:?}", self);
            assert_eq!(&chapter_spine[index], path, "navMap顺序与脊柱不一致: {:?}", self);
            assert!(self.entries.contains(path), "缺少章节文件 {}", path);
            let ids: Vec<_> = self.manifest.iter().filter(|(_, p)| p == path).collect();
            assert_eq!(ids.len(), 1, "章节 {} 在manifest中应恰好出现一次", path);
            assert_eq!(
                self.spine.iter().filter(|idref| **idref == ids[0].0).count(),
                1,
                "章节 {} 在spine中应恰好出现一次",
                path
            );
        }
        if let Some(items) = &self.nav_items {
            let targets: Vec<&String> = items.iter().map(|(target, _)| target).collect();
            assert_eq!(targets, nav_paths, "导航文档与navMap不一致");
        }
    }
}
