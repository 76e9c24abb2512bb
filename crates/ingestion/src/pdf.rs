//! PDF text extraction module
//!
//! Extracts text content from PDF files using lopdf. Pages without a text
//! layer are handed to an [`OcrEngine`] when one is configured.

use crate::errors::IngestionError;
use crate::ocr::OcrEngine;
use fuelforge_common::metrics;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, warn};

/// Maximum depth followed when walking `Parent` links for inherited resources
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// TJ adjustments at or below this value (thousandths of an em) read as a word gap
const WORD_GAP_THRESHOLD: f32 = -200.0;

/// Extract text content from a PDF file
pub fn extract_text_from_pdf(
    path: &Path,
    ocr: Option<&dyn OcrEngine>,
) -> Result<String, IngestionError> {
    if !path.exists() {
        return Err(IngestionError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, &path.display().to_string(), ocr)
}

/// Extract text content from an in-memory PDF. `label` names the document in errors.
pub fn extract_text(
    bytes: &[u8],
    label: &str,
    ocr: Option<&dyn OcrEngine>,
) -> Result<String, IngestionError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestionError::PdfParseError {
        path: label.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), document = label, "Extracting text from PDF");

    let mut page_texts = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages.iter() {
        let mut text = match extract_page_text(&doc, *page_id) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
                String::new()
            }
        };

        if text.trim().is_empty() {
            if let Some(engine) = ocr {
                text = ocr_page(&doc, *page_id, *page_num, engine);
            }
        }

        if !text.trim().is_empty() {
            page_texts.push(text);
        }
    }

    let text = clean_text(&page_texts.join("\n"));
    if text.trim().is_empty() {
        return Err(IngestionError::NoText {
            path: label.to_string(),
        });
    }

    debug!(len = text.len(), document = label, "Text extraction complete");
    Ok(text)
}

/// Extract text from a single page content stream
fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<String, String> {
    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
    let content = Content::decode(&content).map_err(|e| e.to_string())?;
    Ok(text_from_operations(&content.operations))
}

/// Walk text operators, grouping shown text into lines by baseline
fn text_from_operations(operations: &[lopdf::content::Operation]) -> String {
    let mut lines = LineBuilder::default();
    let mut cursor = TextCursor::default();

    for op in operations {
        match op.operator.as_str() {
            "BT" => {
                cursor.begin();
                lines.moved();
            }
            "Tj" => {
                if let Some(s) = op.operands.last().and_then(decode_string) {
                    lines.show(cursor.baseline(), &s);
                }
            }
            "'" | "\"" => {
                cursor.next_line();
                lines.break_line();
                if let Some(s) = op.operands.last().and_then(decode_string) {
                    lines.show(cursor.baseline(), &s);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(..) => {
                                if let Some(s) = decode_string(item) {
                                    lines.show(cursor.baseline(), &s);
                                }
                            }
                            other => {
                                if number(other).is_some_and(|n| n <= WORD_GAP_THRESHOLD) {
                                    lines.push(" ");
                                }
                            }
                        }
                    }
                }
            }
            "Td" | "TD" => {
                let tx = op.operands.first().and_then(number).unwrap_or(0.0);
                let ty = op.operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    cursor.leading = -ty;
                }
                cursor.translate(tx, ty);
                lines.moved();
            }
            "TL" => {
                cursor.leading = op.operands.first().and_then(number).unwrap_or(0.0);
            }
            "Tm" => {
                let values: Vec<f32> = op.operands.iter().filter_map(number).collect();
                if let [a, b, c, d, e, f] = values[..] {
                    cursor.matrix = [a, b, c, d, e, f];
                }
                lines.moved();
            }
            "T*" => {
                cursor.next_line();
                lines.break_line();
            }
            _ => {}
        }
    }

    lines.finish()
}

/// Baselines closer than this (text space units) belong to the same line
const BASELINE_TOLERANCE: f32 = 1.0;

/// Text line matrix `[a b c d e f]` and leading, carried across text objects
struct TextCursor {
    matrix: [f32; 6],
    leading: f32,
}

impl Default for TextCursor {
    fn default() -> Self {
        Self {
            matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            leading: 0.0,
        }
    }
}

impl TextCursor {
    /// `BT` resets the line matrix; the leading is graphics state and survives
    fn begin(&mut self) {
        self.matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.matrix;
        self.matrix[4] = tx * a + ty * c + e;
        self.matrix[5] = tx * b + ty * d + f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn baseline(&self) -> f32 {
        self.matrix[5]
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<String>,
    current: String,
    baseline: Option<f32>,
    moved: bool,
}

impl LineBuilder {
    /// Append shown text, starting a new line when the baseline changes.
    /// Fragments repositioned onto the same baseline are joined with a space.
    fn show(&mut self, baseline: f32, text: &str) {
        match self.baseline {
            Some(y) if (y - baseline).abs() <= BASELINE_TOLERANCE => {
                if self.moved {
                    self.current.push(' ');
                }
            }
            Some(_) => self.break_line(),
            None => {}
        }
        self.baseline = Some(baseline);
        self.moved = false;
        self.current.push_str(text);
    }

    fn push(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn moved(&mut self) {
        self.moved = true;
    }

    fn break_line(&mut self) {
        let line = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            self.lines.push(line);
        }
        self.current.clear();
        self.baseline = None;
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a PDF string operand. UTF-16BE when BOM-prefixed, Latin-1 otherwise.
fn decode_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }

    Some(bytes.iter().map(|&b| b as char).collect())
}

/// OCR every JPEG image on a page
fn ocr_page(doc: &Document, page_id: ObjectId, page_num: u32, engine: &dyn OcrEngine) -> String {
    let images = page_jpeg_images(doc, page_id);
    if images.is_empty() {
        debug!(page = page_num, "Page has no text and no JPEG images");
        return String::new();
    }

    let mut text = String::new();
    for image in images {
        match engine.recognize(image, "jpg") {
            Ok(recognized) => {
                metrics::record_ocr(true);
                text.push_str(recognized.trim_end());
                text.push('\n');
            }
            Err(e) => {
                metrics::record_ocr(false);
                warn!(page = page_num, error = %e, "OCR failed for page image");
            }
        }
    }
    text
}

/// Raw bytes of the DCTDecode image XObjects used by a page
fn page_jpeg_images(doc: &Document, page_id: ObjectId) -> Vec<&[u8]> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, obj)| resolve(doc, obj))
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|stream| is_jpeg_image(stream))
        .map(|stream| stream.content.as_slice())
        .collect()
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn is_jpeg_image(stream: &Stream) -> bool {
    let is_image = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image");
    let is_dct = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(name) if name == b"DCTDecode")
        }
        _ => false,
    };
    is_image && is_dct
}

/// Clean extracted text: drop BOMs, normalize quotes, collapse blank lines
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pdf_with_jpeg_page, pdf_with_pages, FakeOcr};
    use lopdf::content::Operation;

    #[test]
    fn test_clean_text() {
        let input = "  Hello World \n\n\u{FEFF}Test \u{201C}quoted\u{201D}";
        assert_eq!(clean_text(input), "Hello World\nTest \"quoted\"");
    }

    #[test]
    fn test_decode_utf16_string() {
        let obj = Object::String(vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42], lopdf::StringFormat::Hexadecimal);
        assert_eq!(decode_string(&obj).as_deref(), Some("AB"));
    }

    #[test]
    fn test_tj_array_word_gaps() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Invoice"),
                    Object::Integer(-250),
                    Object::string_literal("Num"),
                    Object::Integer(-20),
                    Object::string_literal("ber"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ];
        assert_eq!(text_from_operations(&ops), "Invoice Number");
    }

    #[test]
    fn test_line_moves_become_newlines() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tj", vec![Object::string_literal("first")]),
            Operation::new("Td", vec![0.into(), (-14).into()]),
            Operation::new("Tj", vec![Object::string_literal("second")]),
            Operation::new("Td", vec![40.into(), 0.into()]),
            Operation::new("Tj", vec![Object::string_literal("same")]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![Object::string_literal("third")]),
            Operation::new("ET", vec![]),
        ];
        assert_eq!(text_from_operations(&ops), "first\nsecond same\nthird");
    }

    fn text_block(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_text_objects_on_one_baseline_share_a_line() {
        let mut ops = text_block(50, 700, "Delivery Docket No.: 42");
        ops.extend(text_block(50, 680, "ATTSHUNT"));
        ops.extend(text_block(300, 680, "1200"));

        let text = text_from_operations(&ops);
        assert_eq!(text, "Delivery Docket No.: 42\nATTSHUNT 1200");

        let docket = crate::docket::parse_shunt_docket(&text).unwrap();
        assert_eq!(docket.docket_number, "42");
        assert_eq!(docket.shunt_qty, 1200);
    }

    #[test]
    fn test_text_matrix_positions_lines() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 500.into()]),
            Operation::new("Tj", vec![Object::string_literal("ULSD 10PPM")]),
            Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 200.into(), 500.into()]),
            Operation::new("Tj", vec![Object::string_literal("2,000 L")]),
            Operation::new("TL", vec![12.into()]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![Object::string_literal("next")]),
            Operation::new("ET", vec![]),
        ];
        assert_eq!(text_from_operations(&ops), "ULSD 10PPM 2,000 L\nnext");
    }

    #[test]
    fn test_extract_text_from_generated_pdf() {
        let pdf = pdf_with_pages(&[
            &["Invoice Number 12345", "Invoice Date 05 Jan 2024"],
            &["Delivery Docket Number / Date: 777 / 03 Jan 2024"],
        ]);

        let text = extract_text(&pdf, "invoice.pdf", None).unwrap();
        assert_eq!(
            text,
            "Invoice Number 12345\nInvoice Date 05 Jan 2024\nDelivery Docket Number / Date: 777 / 03 Jan 2024"
        );
    }

    #[test]
    fn test_invalid_pdf_is_parse_error() {
        let err = extract_text(b"not a pdf", "broken.pdf", None).unwrap_err();
        assert!(matches!(err, IngestionError::PdfParseError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = extract_text_from_pdf(Path::new("/nonexistent/fuelforge.pdf"), None).unwrap_err();
        assert!(matches!(err, IngestionError::FileNotFound(_)));
    }

    #[test]
    fn test_scanned_page_without_ocr_has_no_text() {
        let pdf = pdf_with_jpeg_page(b"\xFF\xD8fake-jpeg\xFF\xD9");
        let err = extract_text(&pdf, "scan.pdf", None).unwrap_err();
        assert!(matches!(err, IngestionError::NoText { .. }));
    }

    #[test]
    fn test_scanned_page_uses_ocr() {
        let jpeg = b"\xFF\xD8fake-jpeg\xFF\xD9";
        let pdf = pdf_with_jpeg_page(jpeg);
        let ocr = FakeOcr::new("Delivery Docket No.: 4455\nATTSHUNT 1200");

        let text = extract_text(&pdf, "scan.pdf", Some(&ocr)).unwrap();
        assert_eq!(text, "Delivery Docket No.: 4455\nATTSHUNT 1200");
        assert_eq!(ocr.seen(), vec![jpeg.to_vec()]);
    }
}
