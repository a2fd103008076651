use anyhow::{anyhow, Context, Result};
use encoding_rs::{Encoding, UTF_8};
use lopdf::Document as PdfDocument;
use quick_xml::escape::unescape;
use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};

const DOCX_BODY_XML: &str = "word/document.xml";

/// Upload formats we can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Detect the kind from the extension after the last `.`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;

        match extension.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Text => "text/plain",
        }
    }
}

/// Keep only the last path component and a conservative character set.
pub fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    // Windows-style paths are not split by `Path` on unix
    let base = base.rsplit('\\').next().unwrap_or(base);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub file_type: String,
    pub pages: Option<usize>,
    pub char_count: usize,
}

pub struct DocumentParser;

impl DocumentParser {
    /// Parse an in-memory upload.
    pub fn parse_bytes(data: &[u8], kind: DocumentKind) -> Result<ParsedDocument> {
        debug!("Parsing {} bytes as {:?}", data.len(), kind);

        let (content, pages) = match kind {
            DocumentKind::Pdf => Self::parse_pdf(data)?,
            DocumentKind::Docx => (Self::parse_docx(data)?, None),
            DocumentKind::Text => (Self::decode_text(data), None),
        };

        let metadata = DocumentMetadata {
            file_type: kind.mime_type().to_string(),
            pages,
            char_count: content.chars().count(),
        };

        debug!("Parsed {} characters", metadata.char_count);

        Ok(ParsedDocument { content, metadata })
    }

    /// Extract page text in page order, skipping pages without text.
    fn parse_pdf(data: &[u8]) -> Result<(String, Option<usize>)> {
        let doc = PdfDocument::load_mem(data).context("Failed to load PDF file")?;
        let pages = doc.get_pages();
        let page_count = pages.len();

        let mut page_texts = Vec::with_capacity(page_count);

        // BTreeMap keys: page numbers ascending
        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) if !text.trim().is_empty() => page_texts.push(text),
                Ok(_) => debug!("PDF page {} has no text", page_num),
                Err(e) => warn!("Failed to extract text from page {}: {}", page_num, e),
            }
        }

        Ok((page_texts.join("\n"), Some(page_count)))
    }

    fn parse_docx(data: &[u8]) -> Result<String> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).context("Failed to open DOCX as ZIP archive")?;

        let mut xml_file = archive
            .by_name(DOCX_BODY_XML)
            .map_err(|e| anyhow!("DOCX has no {}: {}", DOCX_BODY_XML, e))?;
        let mut xml = String::new();
        xml_file
            .read_to_string(&mut xml)
            .context("Failed to read DOCX body")?;

        Ok(Self::docx_paragraphs(&xml).join("\n"))
    }

    /// Walk WordprocessingML tags and collect the text of each `<w:p>`.
    fn docx_paragraphs(xml: &str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut current = String::new();
        let mut in_text_run = false;
        let mut rest = xml;

        while let Some(open) = rest.find('<') {
            if in_text_run {
                current.push_str(&decode_xml_text(&rest[..open]));
            }

            let Some(close) = rest[open..].find('>') else {
                break;
            };
            let tag = &rest[open + 1..open + close];
            rest = &rest[open + close + 1..];

            let self_closing = tag.ends_with('/');
            let name = tag
                .trim_end_matches('/')
                .split_whitespace()
                .next()
                .unwrap_or("");

            match name {
                "w:t" => in_text_run = !self_closing,
                "/w:t" => in_text_run = false,
                "w:tab" => current.push('\t'),
                "w:br" | "w:cr" => current.push('\n'),
                "/w:p" => paragraphs.push(std::mem::take(&mut current)),
                "w:p" if self_closing => paragraphs.push(String::new()),
                _ => {}
            }
        }

        if !current.is_empty() {
            paragraphs.push(current);
        }

        paragraphs
    }

    /// UTF-8 with BOM removal; undecodable byte sequences are skipped,
    /// everything that decodes (including U+FFFD itself) is kept.
    fn decode_text(bytes: &[u8]) -> String {
        let body = match Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) if encoding == UTF_8 => &bytes[bom_len..],
            _ => bytes,
        };

        match UTF_8.decode_without_bom_handling_and_without_replacement(body) {
            Some(text) => text.into_owned(),
            None => {
                warn!("Text upload contained invalid UTF-8; dropping undecodable bytes");
                body.utf8_chunks().map(|chunk| chunk.valid()).collect()
            }
        }
    }
}

/// Resolve predefined entities and numeric character references in `<w:t>` text.
fn decode_xml_text(raw: &str) -> Cow<'_, str> {
    match unescape(raw) {
        Ok(text) => text,
        Err(e) => {
            debug!("Keeping raw DOCX text after unescape failure: {}", e);
            Cow::Borrowed(raw)
        }
    }
}
