use std::sync::Arc;

use base64::Engine as _;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, error, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// What a stored upload contributes to a chat turn: prompt text plus
/// base64-encoded page images for vision models.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    pub text: String,
    pub images: Vec<String>,
}

impl ExtractedDocument {
    pub fn text(text: String) -> Self {
        Self { text, images: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.images.is_empty()
    }
}

/// Turns a stored upload into prompt input. PDFs are parsed off the async
/// runtime; anything else is read as (lossy) UTF-8.
///
/// A PDF without a text layer is treated as a scan: its first page image is
/// attached and the metadata title stands in for the text.
pub async fn extract_document(bytes: Vec<u8>) -> Result<ExtractedDocument, AppError> {
    if !is_pdf(&bytes) {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        debug!("Extracted {} chars from text upload", text.len());
        return Ok(ExtractedDocument::text(text));
    }

    let bytes: Arc<[u8]> = bytes.into();
    let parsed = {
        let bytes = Arc::clone(&bytes);
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await
    };

    // Image-only pages often trip the text extractor, so its failures only
    // count when there is no scan to fall back on.
    let failure = match parsed {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            debug!("Extracted {} chars of PDF text", text.len());
            return Ok(ExtractedDocument::text(text));
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            warn!("PDF text extraction failed: {e}");
            Some(e.to_string())
        }
        Err(e) => {
            warn!("PDF text extraction task failed: {e}");
            Some("PDF parser crashed".to_string())
        }
    };

    let scan = tokio::task::spawn_blocking(move || scanned_fallback(&bytes))
        .await
        .map_err(|e| {
            error!("PDF fallback task failed: {e}");
            AppError::PdfProcessing { message: "PDF parser crashed".to_string() }
        })?;

    match (scan, failure) {
        (Some(document), _) if !document.images.is_empty() => Ok(document),
        (_, Some(message)) => {
            error!("PDF processing error: {message}");
            Err(AppError::PdfProcessing { message })
        }
        (document, None) => {
            warn!("No text layer in PDF and no page image, falling back to metadata");
            Ok(document.unwrap_or_else(|| ExtractedDocument::text(title_line(None))))
        }
    }
}

fn title_line(title: Option<String>) -> String {
    format!("Document metadata title: {}", title.as_deref().unwrap_or("Unknown"))
}

/// Builds the document for a PDF whose text could not be read: the metadata
/// title plus the first page JPEG when there is one. `None` when lopdf
/// cannot parse the file either.
fn scanned_fallback(bytes: &[u8]) -> Option<ExtractedDocument> {
    let doc = Document::load_mem(bytes).ok()?;
    let images = first_page_jpeg(&doc)
        .map(|image| {
            warn!("No text layer in PDF, attaching first page image ({} bytes)", image.len());
            vec![base64::engine::general_purpose::STANDARD.encode(image)]
        })
        .unwrap_or_default();
    Some(ExtractedDocument { text: title_line(pdf_title(&doc)), images })
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    doc.dereference(object).ok().map(|(_, object)| object)
}

fn is_dct(filter: &Object) -> bool {
    match filter {
        Object::Name(name) => name == b"DCTDecode",
        Object::Array(filters) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == b"DCTDecode")),
        _ => false,
    }
}

/// Page resources, inherited through the `Parent` chain when the page has none.
fn page_resources(doc: &Document, page: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page).ok()?;
    loop {
        if let Some(resources) = node.get(b"Resources").ok().and_then(|r| resolve(doc, r)) {
            return resources.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

/// Raw bytes of the first JPEG image on page one. A `DCTDecode` stream is a
/// complete JPEG file, so no rendering is needed.
fn first_page_jpeg(doc: &Document) -> Option<Vec<u8>> {
    let page = doc.get_pages().values().next().copied()?;
    let resources = page_resources(doc, page)?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;

    xobjects.iter().find_map(|(_, xobject)| {
        let stream = resolve(doc, xobject)?.as_stream().ok()?;
        let is_image = stream.dict.get(b"Subtype").ok()?.as_name().ok()? == b"Image";
        let filter = resolve(doc, stream.dict.get(b"Filter").ok()?)?;
        (is_image && is_dct(filter)).then(|| stream.content.clone())
    })
}

fn pdf_title(doc: &Document) -> Option<String> {
    let info = resolve(doc, doc.trailer.get(b"Info").ok()?)?;
    let raw = info.as_dict().ok()?.get(b"Title").ok()?.as_str().ok()?;
    let title = decode_pdf_string(raw);
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// PDF text strings are UTF-16BE or UTF-8 behind a byte-order mark, or a
/// single-byte encoding; the latter is read as Latin-1.
fn decode_pdf_string(raw: &[u8]) -> String {
    match raw {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => raw.iter().map(|&b| b as char).collect(),
    }
}
