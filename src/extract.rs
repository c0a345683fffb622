//! PDF text extraction and whitespace normalization.
//!
//! Raw document bytes come out of blob storage; this module turns them into a
//! single normalized string suitable for chunking. Normalization follows two
//! rules applied per page: runs of newline characters collapse to one space,
//! then any remaining run of two or more whitespace characters collapses to
//! one space. Pages are trimmed and joined with a single space. The routine is
//! deterministic and idempotent.

use lopdf::Document;
use thiserror::Error;

/// Errors produced while extracting text from document bytes.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes could not be parsed as a PDF document.
    #[error("Failed to read PDF document: {0}")]
    Unreadable(String),
    /// The document parsed but contained no extractable text.
    #[error("PDF document contains no extractable text")]
    EmptyDocument,
}

/// Extract and normalize the full text of a PDF document.
///
/// Pages are visited in page order; each page is normalized independently and
/// the non-empty results are joined with a single space.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractionError::Unreadable(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_number, _object_id) in document.get_pages() {
        let raw = document
            .extract_text(&[page_number])
            .map_err(|error| ExtractionError::Unreadable(error.to_string()))?;
        let normalized = normalize(&raw);
        if !normalized.is_empty() {
            pages.push(normalized);
        }
    }

    if pages.is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    tracing::debug!(pages = pages.len(), "Extracted document text");
    Ok(pages.join(" "))
}

/// Normalize extracted page text.
///
/// Newline runs become a single space, whitespace runs of length two or more
/// become a single space, and the result is trimmed. A lone non-newline
/// whitespace character is kept verbatim, matching the original service's
/// regex pair (`\n+` then `\s{2,}`).
pub fn normalize(text: &str) -> String {
    collapse_whitespace_runs(&collapse_newlines(text))
        .trim()
        .to_string()
}

fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_newline_run = false;
    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            in_newline_run = true;
        } else {
            if in_newline_run {
                out.push(' ');
                in_newline_run = false;
            }
            out.push(ch);
        }
    }
    if in_newline_run {
        out.push(' ');
    }
    out
}

fn collapse_whitespace_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            let mut run_length = 1;
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
                run_length += 1;
            }
            if run_length == 1 {
                out.push(ch);
            } else {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use lopdf::Document;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a minimal in-memory PDF with one text line per page.
    pub(crate) fn pdf_with_pages(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![50.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let kid_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kid_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize fixture PDF");
        bytes
    }
}
