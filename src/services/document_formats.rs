//! 文档格式解析
//!
//! - docx / pptx / xlsx / odt：zip 压缩包 + XML，用 quick-xml 遍历文本节点
//! - html / xml：去掉标签和脚本，解码实体
//! - 其余纯文本类扩展名：按 UTF-8 读取
//!
//! 这里的函数都是同步的，由 `TextExtractor` 放到阻塞线程池执行。

use std::io::{Cursor, Read};

use phf::phf_map;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use zip::ZipArchive;

use crate::error::ExtractionError;

/// 兜底提取器支持的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackFormat {
    Text,
    Markup,
    Pptx,
    Xlsx,
    OpenDocument,
}

static FALLBACK_FORMATS: phf::Map<&'static str, FallbackFormat> = phf_map! {
    "md" => FallbackFormat::Text,
    "markdown" => FallbackFormat::Text,
    "csv" => FallbackFormat::Text,
    "tsv" => FallbackFormat::Text,
    "json" => FallbackFormat::Text,
    "log" => FallbackFormat::Text,
    "rst" => FallbackFormat::Text,
    "text" => FallbackFormat::Text,
    "yaml" => FallbackFormat::Text,
    "yml" => FallbackFormat::Text,
    "html" => FallbackFormat::Markup,
    "htm" => FallbackFormat::Markup,
    "xhtml" => FallbackFormat::Markup,
    "xml" => FallbackFormat::Markup,
    "pptx" => FallbackFormat::Pptx,
    "xlsx" => FallbackFormat::Xlsx,
    "odt" => FallbackFormat::OpenDocument,
    "odp" => FallbackFormat::OpenDocument,
};

/// 根据扩展名查找兜底格式
pub fn fallback_format(extension: &str) -> Option<FallbackFormat> {
    FALLBACK_FORMATS.get(extension).copied()
}

/// 通用多格式提取（主提取表之外的所有扩展名）
pub fn generic_text(extension: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let format = fallback_format(extension).ok_or_else(|| ExtractionError::UnsupportedFormat {
        extension: extension.to_string(),
    })?;

    match format {
        FallbackFormat::Text => utf8_text(bytes, extension),
        FallbackFormat::Markup => markup_text(&utf8_text(bytes, extension)?),
        FallbackFormat::Pptx => pptx_text(bytes),
        FallbackFormat::Xlsx => xlsx_text(bytes),
        FallbackFormat::OpenDocument => odf_text(bytes),
    }
}

fn utf8_text(bytes: &[u8], extension: &str) -> Result<String, ExtractionError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::InvalidUtf8 {
        path: format!("*.{extension}"),
    })
}

// ========== OpenXML / ODF ==========

/// 压缩包内 XML 的文本布局
///
/// 元素名按原样比较（带命名空间前缀，如 `w:t`）。
struct XmlLayout {
    /// 只收集这些元素内部的文本；为空时收集全部文本
    text_elements: &'static [&'static [u8]],
    /// 只收集该元素内部的文本
    scope: Option<&'static [u8]>,
    /// 段落元素，结束处换行
    paragraph_elements: &'static [&'static [u8]],
    tab_elements: &'static [&'static [u8]],
    break_elements: &'static [&'static [u8]],
    space_elements: &'static [&'static [u8]],
}

const DOCX_LAYOUT: XmlLayout = XmlLayout {
    text_elements: &[b"w:t"],
    scope: None,
    paragraph_elements: &[b"w:p"],
    tab_elements: &[b"w:tab"],
    break_elements: &[b"w:br", b"w:cr"],
    space_elements: &[],
};

const PPTX_LAYOUT: XmlLayout = XmlLayout {
    text_elements: &[b"a:t"],
    scope: None,
    paragraph_elements: &[b"a:p"],
    tab_elements: &[],
    break_elements: &[b"a:br"],
    space_elements: &[],
};

const XLSX_LAYOUT: XmlLayout = XmlLayout {
    text_elements: &[b"t"],
    scope: None,
    paragraph_elements: &[b"si"],
    tab_elements: &[],
    break_elements: &[],
    space_elements: &[],
};

const ODF_LAYOUT: XmlLayout = XmlLayout {
    text_elements: &[],
    scope: Some(b"office:body"),
    paragraph_elements: &[b"text:p", b"text:h"],
    tab_elements: &[b"text:tab"],
    break_elements: &[b"text:line-break"],
    space_elements: &[b"text:s"],
};

/// docx：`word/document.xml` 中的 `<w:t>`，每个段落一行
pub fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes, "docx")?;
    let xml = read_entry(&mut archive, "word/document.xml", "docx")?;
    xml_text(&xml, &DOCX_LAYOUT, "docx")
}

/// pptx：按幻灯片编号顺序读取 `<a:t>`
pub fn pptx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes, "pptx")?;
    let slide_re = compile(r"^ppt/slides/slide(\d+)\.xml$", "pptx")?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = slide_re.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    if slides.is_empty() {
        return Err(ExtractionError::Archive {
            format: "pptx",
            message: "no slides found".to_string(),
        });
    }

    let mut parts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name, "pptx")?;
        parts.push(xml_text(&xml, &PPTX_LAYOUT, "pptx")?);
    }
    Ok(parts.join("\n"))
}

/// xlsx：共享字符串表 `xl/sharedStrings.xml`
pub fn xlsx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes, "xlsx")?;
    let xml = read_entry(&mut archive, "xl/sharedStrings.xml", "xlsx")?;
    xml_text(&xml, &XLSX_LAYOUT, "xlsx")
}

/// odt / odp：`content.xml` 中 `<office:body>` 的正文
pub fn odf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes, "odf")?;
    let xml = read_entry(&mut archive, "content.xml", "odf")?;
    xml_text(&xml, &ODF_LAYOUT, "odf")
}

fn open_archive<'a>(
    bytes: &'a [u8],
    format: &'static str,
) -> Result<ZipArchive<Cursor<&'a [u8]>>, ExtractionError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Archive {
        format,
        message: e.to_string(),
    })
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: &'static str,
) -> Result<String, ExtractionError> {
    let mut entry = archive.by_name(name).map_err(|e| ExtractionError::Archive {
        format,
        message: format!("{name}: {e}"),
    })?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Archive {
            format,
            message: format!("{name}: {e}"),
        })?;
    Ok(xml)
}

fn is_scope(layout: &XmlLayout, name: &[u8]) -> bool {
    layout.scope.map_or(false, |scope| scope == name)
}

fn has_name(names: &[&[u8]], name: &[u8]) -> bool {
    names.iter().any(|candidate| *candidate == name)
}

/// 按布局遍历 XML 事件，拼接文本节点（实体由 quick-xml 解码）
fn xml_text(xml: &str, layout: &XmlLayout, format: &'static str) -> Result<String, ExtractionError> {
    let parse_failed = |message: String| ExtractionError::Parser { format, message };

    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut text_depth = 0usize;
    let mut scope_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| parse_failed(e.to_string()))?;

        let in_scope = layout.scope.is_none() || scope_depth > 0;
        let collecting = in_scope && (layout.text_elements.is_empty() || text_depth > 0);

        match event {
            Event::Start(e) => {
                let qname = e.name();
                let name = qname.as_ref();
                if is_scope(layout, name) {
                    scope_depth += 1;
                }
                if has_name(layout.text_elements, name) {
                    text_depth += 1;
                }
            }
            Event::End(e) => {
                let qname = e.name();
                let name = qname.as_ref();
                if has_name(layout.text_elements, name) {
                    text_depth = text_depth.saturating_sub(1);
                }
                if in_scope && has_name(layout.paragraph_elements, name) {
                    out.push('\n');
                }
                if is_scope(layout, name) {
                    scope_depth = scope_depth.saturating_sub(1);
                }
            }
            Event::Empty(e) if in_scope => {
                let qname = e.name();
                let name = qname.as_ref();
                if has_name(layout.tab_elements, name) {
                    out.push('\t');
                } else if has_name(layout.space_elements, name) {
                    out.push(' ');
                } else if has_name(layout.break_elements, name)
                    || has_name(layout.paragraph_elements, name)
                {
                    out.push('\n');
                }
            }
            Event::Text(e) if collecting => {
                let text = e.unescape().map_err(|err| parse_failed(err.to_string()))?;
                out.push_str(&text);
            }
            Event::CData(e) if collecting => {
                out.push_str(&String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(normalize_lines(&out))
}

// ========== HTML / XML ==========

/// 去掉标签，块级元素结束处换行
///
/// 网页不一定是合法 XML，所以标签用正则去除，实体再交给 quick-xml 的 HTML5 实体表解码。
pub fn markup_text(markup: &str) -> Result<String, ExtractionError> {
    let hidden_re = compile(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->|<!\[CDATA\[|\]\]>",
        "html",
    )?;
    let without_hidden = hidden_re.replace_all(markup, "");

    let block_re = compile(
        r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6]|section|article|title|blockquote|pre)\s*>",
        "html",
    )?;
    let with_breaks = block_re.replace_all(&without_hidden, "\n");

    let tag_re = compile(r"<[^>]*>", "html")?;
    let stripped = tag_re.replace_all(&with_breaks, " ");

    Ok(normalize_lines(&decode_html_entities(&stripped)?))
}

/// 解码 HTML 实体，无法识别的实体原样保留
///
/// 逐个实体解码，文本中的裸 `&` 不影响其余实体。
pub fn decode_html_entities(text: &str) -> Result<String, ExtractionError> {
    let entity_re = compile(r"&(?:#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z][a-zA-Z0-9]*);", "html")?;

    let decoded = entity_re.replace_all(text, |caps: &Captures| {
        let raw = &caps[0];
        unescape_with(raw, resolve_html5_entity)
            .map(|resolved| resolved.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    });

    Ok(decoded.into_owned())
}

/// 每行去掉首尾空白、行内连续空白压缩为一个空格，丢弃空行
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn compile(pattern: &str, format: &'static str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::Parser {
        format,
        message: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};

    /// 构造内存中的 zip 压缩包
    pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| {
                format!(
                    r#"<w:p w:rsidR="00A1"><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#
                )
            })
            .collect();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        );
        zip_archive(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", &document),
        ])
    }
}
