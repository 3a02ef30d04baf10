//! OOXML / OpenDocument 提取：两者都是 zip 容器，正文在固定路径的 XML 部件里
//!
//! - docx: word/document.xml（+ 脚注 / 尾注）
//! - pptx: ppt/slides/slideN.xml，按 N 数值排序
//! - xlsx: xl/sharedStrings.xml + xl/worksheets/sheetN.xml，按行输出，单元格以 \t 分隔
//! - odt / ods / odp: content.xml

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use zip::ZipArchive;

use super::{DocumentFormat, ExtractedContent};
use crate::core::ExtractionError;

type Rewrites = Vec<(Regex, &'static str)>;

fn rewrites(pairs: &[(&str, &'static str)]) -> Rewrites {
    pairs
        .iter()
        .map(|(pattern, to)| (Regex::new(pattern).expect("static regex"), *to))
        .collect()
}

static WORD_BREAKS: LazyLock<Rewrites> = LazyLock::new(|| {
    rewrites(&[
        (r"(?s)<w:(?:instrText|delText)\b[^>]*>.*?</w:(?:instrText|delText)>", ""),
        (r"</w:p>", "\n"),
        (r"<w:tab\b[^>]*/>", "\t"),
        (r"<w:(?:br|cr)\b[^>]*/>", "\n"),
    ])
});

static SLIDE_BREAKS: LazyLock<Rewrites> = LazyLock::new(|| {
    rewrites(&[
        (r"</a:p>", "\n"),
        (r"<a:br\b[^>]*/>", "\n"),
        (r"<a:tab\b[^>]*/>", "\t"),
    ])
});

static ODF_TEXT_BREAKS: LazyLock<Rewrites> = LazyLock::new(|| {
    rewrites(&[
        (r"</text:(?:p|h)>", "\n"),
        (r"<text:line-break\b[^>]*/>", "\n"),
        (r"<text:tab\b[^>]*/>", "\t"),
        (r"<text:s\b[^>]*/>", " "),
    ])
});

static ODF_SHEET_BREAKS: LazyLock<Rewrites> = LazyLock::new(|| {
    rewrites(&[
        (r"</text:p>", " "),
        (r"</table:table-cell>", "\t"),
        (r"</table:table-row>", "\n"),
        (r"<text:s\b[^>]*/>", " "),
    ])
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x?)([0-9a-fA-F]+);").expect("static regex"));
static SHARED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<si\b[^>]*>(.*?)</si>").expect("static regex"));
static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<t\b[^>]*>(.*?)</t>").expect("static regex"));
static PHONETIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<rPh\b.*?</rPh>").expect("static regex"));
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<row\b[^>/]*>(.*?)</row>").expect("static regex"));
static CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)"#).expect("static regex")
});
static CELL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bt="([^"]*)""#).expect("static regex"));
static CELL_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<v>(.*?)</v>").expect("static regex"));
static NUMBERED_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.xml$").expect("static regex"));

pub(super) fn extract(
    path: &Path,
    format: DocumentFormat,
) -> Result<ExtractedContent, ExtractionError> {
    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ExtractionError::Archive(format!("{}: {}", path.display(), e)))?;
    let names: Vec<String> = archive.file_names().map(String::from).collect();

    let fragments = match format {
        DocumentFormat::Docx => {
            let mut parts = vec!["word/document.xml".to_string()];
            parts.extend(
                ["word/footnotes.xml", "word/endnotes.xml"]
                    .into_iter()
                    .filter(|p| names.iter().any(|n| n == p))
                    .map(String::from),
            );
            let mut out = Vec::new();
            for part in parts {
                let xml = read_part(&mut archive, &part)?;
                out.extend(markup_to_lines(&xml, &WORD_BREAKS));
            }
            out
        }
        DocumentFormat::Pptx => {
            let slides = numbered_parts(&names, "ppt/slides/slide");
            if slides.is_empty() {
                return Err(ExtractionError::MissingContent("pptx slides".to_string()));
            }
            let mut out = Vec::new();
            for slide in slides {
                let xml = read_part(&mut archive, &slide)?;
                let text = markup_to_lines(&xml, &SLIDE_BREAKS).join("\n");
                if !text.is_empty() {
                    out.push(text);
                }
            }
            out
        }
        DocumentFormat::Xlsx => {
            let sheets = numbered_parts(&names, "xl/worksheets/sheet");
            if sheets.is_empty() {
                return Err(ExtractionError::MissingContent("xlsx worksheets".to_string()));
            }
            let shared = if names.iter().any(|n| n == "xl/sharedStrings.xml") {
                shared_strings(&read_part(&mut archive, "xl/sharedStrings.xml")?)
            } else {
                Vec::new()
            };
            let mut out = Vec::new();
            for sheet in sheets {
                let xml = read_part(&mut archive, &sheet)?;
                out.extend(sheet_rows(&xml, &shared));
            }
            out
        }
        DocumentFormat::Odt | DocumentFormat::Odp => {
            let xml = read_part(&mut archive, "content.xml")?;
            markup_to_lines(&xml, &ODF_TEXT_BREAKS)
        }
        DocumentFormat::Ods => {
            let xml = read_part(&mut archive, "content.xml")?;
            markup_to_lines(&xml, &ODF_SHEET_BREAKS)
        }
        DocumentFormat::PlainText | DocumentFormat::Pdf => {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{:?} is not a zip container",
                format
            )))
        }
    };

    Ok(ExtractedContent::new(fragments))
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<String, ExtractionError> {
    let mut entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => ExtractionError::MissingContent(name.to_string()),
        other => ExtractionError::Archive(format!("{}: {}", name, other)),
    })?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Archive(format!("{}: {}", name, e)))?;
    Ok(xml)
}

/// prefix + 数字 + .xml 的部件，按数字升序（slide2 在 slide10 之前）
fn numbered_parts(names: &[String], prefix: &str) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = names
        .iter()
        .filter(|n| n.starts_with(prefix) && !n[prefix.len()..].contains('/'))
        .filter_map(|n| {
            let idx = NUMBERED_PART.captures(n)?.get(1)?.as_str().parse().ok()?;
            Some((idx, n.clone()))
        })
        .collect();
    parts.sort();
    parts.into_iter().map(|(_, n)| n).collect()
}

/// 按格式把换行类标签改写为 \n / \t，剥掉其余标签，解码实体，按行去空白
fn markup_to_lines(xml: &str, breaks: &Rewrites) -> Vec<String> {
    let mut text = xml.to_string();
    for (re, to) in breaks {
        text = re.replace_all(&text, *to).into_owned();
    }
    let text = strip_tags(&text);
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn strip_tags(xml: &str) -> String {
    decode_entities(&TAG.replace_all(xml, ""))
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn shared_strings(xml: &str) -> Vec<String> {
    SHARED_STRING
        .captures_iter(xml)
        .map(|si| {
            let body = PHONETIC_RUN.replace_all(&si[1], "");
            TEXT_RUN
                .captures_iter(&body)
                .map(|t| decode_entities(&t[1]))
                .collect::<String>()
        })
        .collect()
}

fn sheet_rows(xml: &str, shared: &[String]) -> Vec<String> {
    ROW.captures_iter(xml)
        .filter_map(|row| {
            let cells: Vec<String> = CELL
                .captures_iter(&row[1])
                .map(|cell| {
                    let attrs = cell.get(1).map(|m| m.as_str()).unwrap_or("");
                    let body = cell.get(2).map(|m| m.as_str()).unwrap_or("");
                    cell_text(attrs, body, shared)
                })
                .collect();
            let line = cells.join("\t");
            let line = line.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect()
}

fn cell_text(attrs: &str, body: &str, shared: &[String]) -> String {
    let kind = CELL_TYPE
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");
    let value = CELL_VALUE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    match kind {
        "s" => value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        "inlineStr" => TEXT_RUN
            .captures_iter(body)
            .map(|t| decode_entities(&t[1]))
            .collect(),
        _ => value.map(decode_entities).unwrap_or_default(),
    }
}
