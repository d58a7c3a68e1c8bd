//! crates/studyforge_core/src/extract.rs
//!
//! Format-specific text extractors and corpus assembly. Each extractor takes
//! raw bytes and returns plain text; none of them touch the filesystem or
//! any ambient state, so they are independently testable.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use lopdf::Document;
use std::io::Cursor;

use crate::domain::{ExtractedDocument, UploadFile};

/// Why a file's content could not be turned into text. Any one failure
/// aborts the whole batch for that generation request.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("could not parse PDF: {0}")]
    Pdf(String),
    #[error("could not parse document: {0}")]
    Docx(String),
    #[error("file is not valid UTF-8 text")]
    InvalidUtf8,
    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("no text extractor for MIME type {0}")]
    UnsupportedMime(String),
}

/// Extraction failure tied to the file it happened in, for per-file error
/// reporting at the request boundary.
#[derive(Debug, thiserror::Error)]
#[error("failed to extract text from {file_name}: {source}")]
pub struct CorpusError {
    pub file_name: String,
    #[source]
    pub source: ExtractionError,
}

/// Extracts text from a PDF, page by page in document order.
///
/// Text objects within a page are joined with single spaces; pages are
/// joined with newlines. A page with no decodable text (a scanned image,
/// for instance) contributes an empty line rather than failing the file.
pub fn extract_pdf(data: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(data).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let page_text = match doc.extract_text(&[*page_number]) {
            Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Err(_) => String::new(),
        };
        pages.push(page_text);
    }

    Ok(pages.join("\n"))
}

/// Extracts the raw paragraph text of a DOCX file, discarding styling.
/// Paragraph order is preserved; empty paragraphs are dropped.
pub fn extract_docx(data: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(data).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut paragraphs: Vec<String> = Vec::new();
    for child in docx.document.children.iter() {
        if let DocumentChild::Paragraph(paragraph) = child {
            let paragraph_text: String = paragraph
                .children
                .iter()
                .filter_map(|pc| {
                    if let ParagraphChild::Run(run) = pc {
                        Some(
                            run.children
                                .iter()
                                .filter_map(|rc| {
                                    if let RunChild::Text(t) = rc {
                                        Some(t.text.clone())
                                    } else {
                                        None
                                    }
                                })
                                .collect::<Vec<_>>()
                                .join(""),
                        )
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
                .join("");

            if !paragraph_text.is_empty() {
                paragraphs.push(paragraph_text);
            }
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Decodes the bytes as UTF-8 and passes the text through unchanged.
pub fn extract_plain_text(data: &[u8]) -> Result<String, ExtractionError> {
    String::from_utf8(data.to_vec()).map_err(|_| ExtractionError::InvalidUtf8)
}

/// Reads the first sheet of an XLS/XLSX workbook into a row-major
/// array-of-arrays and serializes it as indented JSON text, so the AI
/// consumes the sheet's structure rather than flattened prose.
pub fn extract_spreadsheet(data: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ExtractionError::Spreadsheet("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let rows: Vec<Vec<serde_json::Value>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_json).collect())
        .collect();

    serde_json::to_string_pretty(&rows).map_err(|e| ExtractionError::Spreadsheet(e.to_string()))
}

fn cell_to_json(cell: &Data) -> serde_json::Value {
    match cell {
        Data::Empty => serde_json::Value::Null,
        Data::String(s) => serde_json::Value::String(s.clone()),
        Data::Int(i) => serde_json::json!(i),
        Data::Float(f) => serde_json::json!(f),
        Data::Bool(b) => serde_json::Value::Bool(*b),
        Data::DateTime(dt) => serde_json::json!(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => serde_json::Value::String(s.clone()),
        Data::Error(e) => serde_json::Value::String(e.to_string()),
    }
}

/// Routes one file to the extractor for its MIME type.
///
/// Legacy `.doc` files go through the DOCX reader, matching the upload
/// surfaces that accept them; genuinely binary `.doc` content fails there
/// with an [`ExtractionError`].
pub fn extract_file(file: &UploadFile) -> Result<ExtractedDocument, ExtractionError> {
    let text = match file.mime_type.as_str() {
        "application/pdf" => extract_pdf(&file.data)?,
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            extract_docx(&file.data)?
        }
        "text/plain" => extract_plain_text(&file.data)?,
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            extract_spreadsheet(&file.data)?
        }
        other => return Err(ExtractionError::UnsupportedMime(other.to_string())),
    };

    Ok(ExtractedDocument {
        source_file_id: file.id.clone(),
        text,
    })
}

/// Extracts every file sequentially, in selection order, and joins the
/// texts with blank lines into the working corpus.
///
/// Fail-fast: the first extraction error aborts the batch with no partial
/// corpus, carrying the failing file's name.
pub fn build_corpus(files: &[UploadFile]) -> Result<String, CorpusError> {
    let mut texts = Vec::with_capacity(files.len());
    for file in files {
        let doc = extract_file(file).map_err(|source| CorpusError {
            file_name: file.file_name.clone(),
            source,
        })?;
        texts.push(doc.text);
    }
    Ok(texts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn text_file(id: &str, name: &str, contents: &str) -> UploadFile {
        UploadFile {
            id: id.to_string(),
            file_name: name.to_string(),
            file_size: contents.len() as u64,
            mime_type: "text/plain".to_string(),
            data: contents.as_bytes().to_vec(),
        }
    }

    /// Builds an in-memory PDF whose first page says "Hello World!" and
    /// whose second page has no text objects at all.
    fn two_page_pdf() -> Vec<u8> {
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

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello World!")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page 1 content"),
        ));
        let page_one = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let empty = Content { operations: vec![] };
        let empty_id = doc.add_object(Stream::new(
            dictionary! {},
            empty.encode().expect("encode page 2 content"),
        ));
        let page_two = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => empty_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_one.into(), page_two.into()],
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize test PDF");
        bytes
    }

    #[test]
    fn pdf_with_textless_second_page_yields_empty_second_line() {
        let text = extract_pdf(&two_page_pdf()).expect("extraction should succeed");

        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Hello World!");
        assert_eq!(lines[1], "");
    }

    #[test]
    fn garbage_pdf_bytes_fail() {
        let err = extract_pdf(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let text = extract_plain_text("line one\nline two".as_bytes()).unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = extract_plain_text(&[0xff, 0xfe, 0x41]).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidUtf8));
    }

    #[test]
    fn corpus_joins_files_with_blank_lines_in_order() {
        let files = vec![
            text_file("a", "first.txt", "alpha"),
            text_file("b", "second.txt", "beta"),
        ];
        let corpus = build_corpus(&files).unwrap();
        assert_eq!(corpus, "alpha\n\nbeta");
    }

    #[test]
    fn corpus_aborts_on_first_failure_and_names_the_file() {
        let mut bad = text_file("b", "broken.txt", "");
        bad.data = vec![0xff, 0xfe];
        let files = vec![text_file("a", "fine.txt", "alpha"), bad];

        let err = build_corpus(&files).unwrap_err();
        assert_eq!(err.file_name, "broken.txt");
        assert!(matches!(err.source, ExtractionError::InvalidUtf8));
    }

    #[test]
    fn mime_without_extractor_is_rejected() {
        let file = UploadFile {
            id: "img".to_string(),
            file_name: "scan.png".to_string(),
            file_size: 4,
            mime_type: "image/png".to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        };
        let err = extract_file(&file).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedMime(m) if m == "image/png"));
    }
}
