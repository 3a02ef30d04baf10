//! 文档文本提取
//!
//! 支持 OOXML（docx / xlsx / pptx）、OpenDocument（odt / ods / odp）、PDF 与纯文本。
//! 提取结果是有序的文本片段（段落、幻灯片、工作表），进入 prompt 前统一截断到固定字符数。

mod office;

use std::path::Path;

use serde::Serialize;

use crate::core::ExtractionError;

/// 可识别的文档格式（按扩展名判断）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Xlsx,
    Pptx,
    Odt,
    Ods,
    Odp,
    Pdf,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())?;
        match ext.as_str() {
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "pptx" => Some(Self::Pptx),
            "odt" => Some(Self::Odt),
            "ods" => Some(Self::Ods),
            "odp" => Some(Self::Odp),
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" | "csv" | "tsv" | "json" | "xml" | "html" | "htm"
            | "rtf" | "log" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// 从一个上传文件中提取出的文本片段，保持文档内顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    fragments: Vec<String>,
}

impl ExtractedContent {
    pub fn new(fragments: Vec<String>) -> Self {
        Self {
            fragments: fragments
                .into_iter()
                .filter(|f| !f.trim().is_empty())
                .collect(),
        }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// 所有片段按换行拼接后的全文
    pub fn text(&self) -> String {
        self.fragments.join("\n")
    }

    /// 全文的前 cap 个字符；内容不足 cap 时原样返回
    pub fn truncated(&self, cap: usize) -> String {
        self.text().chars().take(cap).collect()
    }
}

/// 按扩展名选择提取方式；同步 I/O，异步调用方应放进 spawn_blocking
pub fn extract(path: &Path) -> Result<ExtractedContent, ExtractionError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        ExtractionError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| "(no extension)".to_string()),
        )
    })?;

    match format {
        DocumentFormat::PlainText => extract_plain_text(path),
        DocumentFormat::Pdf => extract_pdf(path),
        office_format => office::extract(path, office_format),
    }
}

fn extract_plain_text(path: &Path) -> Result<ExtractedContent, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text.as_ref());
    Ok(ExtractedContent::new(
        text.lines().map(|l| l.trim_end().to_string()).collect(),
    ))
}

fn extract_pdf(path: &Path) -> Result<ExtractedContent, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text =
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(ExtractedContent::new(
        text.lines().map(|l| l.trim_end().to_string()).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/Report.DOCX")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.md")),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("scan.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("photo.jpg")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_truncation_shorter_than_cap_keeps_everything() {
        let content = ExtractedContent::new(vec!["Question 1".into(), "Question 2".into()]);
        assert_eq!(content.truncated(1000), content.text());
        assert_eq!(content.truncated(1000), "Question 1\nQuestion 2");
    }

    #[test]
    fn test_truncation_longer_than_cap_is_exact_prefix() {
        let long = "é".repeat(1500);
        let content = ExtractedContent::new(vec![long.clone()]);
        let cut = content.truncated(1000);
        assert_eq!(cut.chars().count(), 1000);
        assert!(long.starts_with(&cut));
    }

    #[test]
    fn test_truncation_of_empty_content() {
        let content = ExtractedContent::default();
        assert_eq!(content.truncated(1000), "");
    }

    #[test]
    fn test_plain_text_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hw.txt");
        std::fs::write(&path, "\u{FEFF}1. What is 2+2?\n\n2. Write fizzbuzz.\n").unwrap();
        let content = extract(&path).unwrap();
        assert_eq!(
            content.fragments(),
            &["1. What is 2+2?".to_string(), "2. Write fizzbuzz.".to_string()]
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = extract(Path::new("/tmp/whatever.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ref e) if e == ".jpg"));
    }

    #[test]
    fn test_corrupt_pdf_is_pdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hw.pdf");
        std::fs::write(&path, "not really a pdf").unwrap();
        let err = extract(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }
}
