use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::{BIG5, UTF_16BE};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::ExtractError;
use crate::geometry::GeometryProvider;
use crate::model::{PageGeometry, Word};
use crate::options::StitchOptions;
use crate::table_detect::detect_tables_in_page;

const DEFAULT_PAGE_WIDTH: f64 = 612.0;
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;
/// Horizontal advance per character, as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;
const MAX_PARENT_DEPTH: usize = 32;
/// `TJ` adjustment, in thousandths of the font size, wide enough to read as a
/// space between words. Smaller adjustments are kerning inside a word.
const WORD_BREAK_ADJUST: f64 = 200.0;

fn looks_decoding_broken(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        let bytes = if bytes.len() > 2 { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    if let Some(name) = encoding {
        let lower = name.to_ascii_lowercase();

        if lower.contains("utf16")
            || lower.contains("ucs2")
            || lower.contains("identity-h")
            || lower.contains("unicode")
        {
            let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
            if !had_errors && !utf16.is_empty() {
                return utf16.into_owned();
            }
        }

        if lower.contains("big5") || lower.contains("b5") || lower.contains("eten") {
            let (big5, _, had_errors) = BIG5.decode(bytes);
            if !had_errors && !big5.is_empty() {
                return big5.into_owned();
            }
        }
    }

    String::from_utf8_lossy(bytes).to_string()
}

#[allow(clippy::cast_precision_loss)]
fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands.iter().filter_map(number).collect()
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(values: &[f64]) -> Option<Self> {
        match *values {
            [a, b, c, d, e, f] => Some(Self { a, b, c, d, e, f }),
            _ => None,
        }
    }

    fn then(self, next: Self) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn translate(self, tx: f64, ty: f64) -> Self {
        Self {
            e: tx * self.a + ty * self.c + self.e,
            f: tx * self.b + ty * self.d + self.f,
            ..self
        }
    }

    fn apply(self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Word being assembled from one or more shown strings.
struct PendingWord {
    text: String,
    x0: f64,
    x1: f64,
    baseline_y: f64,
    height: f64,
}

/// Text state while walking one content stream.
struct TextCursor<'a> {
    page_height: f64,
    encodings: &'a BTreeMap<Vec<u8>, &'a str>,
    ctm: Matrix,
    saved_ctm: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
    encoding: Option<&'a str>,
    pending: Option<PendingWord>,
    words: Vec<Word>,
}

impl<'a> TextCursor<'a> {
    fn new(page_height: f64, encodings: &'a BTreeMap<Vec<u8>, &'a str>) -> Self {
        Self {
            page_height,
            encodings,
            ctm: Matrix::IDENTITY,
            saved_ctm: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            encoding: None,
            pending: None,
            words: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = self.line_matrix.translate(tx, ty);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = self.text_matrix.translate(tx, 0.0);
    }

    /// Appends glyphs to the pending word; whitespace closes it. The word
    /// stays open after the string ends so kerned `TJ` pieces join up.
    fn show_text(&mut self, bytes: &[u8]) {
        let text = decode_pdf_bytes(self.encoding, bytes);
        let advance = GLYPH_ADVANCE * self.font_size;
        let render = self.text_matrix.then(self.ctm);
        let height = (self.font_size * render.d).abs().max(1.0);

        let mut offset = 0.0;
        for ch in text.chars() {
            let (x, y) = render.apply(offset, 0.0);
            let (x_end, _) = render.apply(offset + advance, 0.0);
            offset += advance;

            if ch.is_whitespace() || ch.is_control() {
                self.flush_word();
                continue;
            }

            match self.pending.as_mut() {
                Some(word) => {
                    word.text.push(ch);
                    word.x1 = x_end;
                }
                None => {
                    self.pending = Some(PendingWord {
                        text: ch.to_string(),
                        x0: x,
                        x1: x_end,
                        baseline_y: y,
                        height,
                    });
                }
            }
        }

        self.advance(offset);
    }

    fn flush_word(&mut self) {
        let Some(word) = self.pending.take() else {
            return;
        };
        let bottom = self.page_height - word.baseline_y;
        self.words.push(Word {
            text: word.text,
            x0: word.x0.min(word.x1),
            top: bottom - word.height,
            x1: word.x0.max(word.x1),
            bottom,
        });
    }

    fn show_array(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(bytes, _) => self.show_text(bytes),
                other => {
                    if let Some(adjust) = number(other) {
                        if -adjust > WORD_BREAK_ADJUST {
                            self.flush_word();
                        }
                        self.advance(-adjust / 1000.0 * self.font_size);
                    }
                }
            }
        }
        self.flush_word();
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved_ctm.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved_ctm.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(&numbers(operands)) {
                    self.ctm = matrix.then(self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(font_name) = operands.first().and_then(|operand| operand.as_name().ok())
                {
                    self.encoding = self.encodings.get(font_name).copied();
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = numbers(operands).as_slice() {
                    if operator == "TD" {
                        self.leading = -ty;
                    }
                    self.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(matrix) = Matrix::from_operands(&numbers(operands)) {
                    self.line_matrix = matrix;
                    self.text_matrix = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_text(bytes);
                    self.flush_word();
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show_text(bytes);
                    self.flush_word();
                }
            }
            "\"" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show_text(bytes);
                    self.flush_word();
                }
            }
            _ => {}
        }
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Page size from the `MediaBox`, inherited through `Parent` when needed.
fn page_size(document: &Document, page_id: ObjectId) -> (f64, f64) {
    let mut current = Some(page_id);
    for _ in 0..MAX_PARENT_DEPTH {
        let Some(dictionary) = current.and_then(|id| document.get_dictionary(id).ok()) else {
            break;
        };

        let media_box = dictionary
            .get(b"MediaBox")
            .ok()
            .and_then(|object| resolve(document, object))
            .and_then(|object| object.as_array().ok())
            .map(|items| numbers(items));
        if let Some([x0, y0, x1, y1]) = media_box.as_deref() {
            return ((x1 - x0).abs(), (y1 - y0).abs());
        }

        current = dictionary
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok();
    }

    (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
}

/// Geometry provider over a parsed PDF.
pub struct PdfGeometry {
    document: Document,
    page_ids: Vec<ObjectId>,
    min_cols: usize,
    line_tolerance: f64,
}

impl PdfGeometry {
    pub fn open(path: &Path, options: &StitchOptions) -> Result<Self, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::SourceNotFound(path.to_path_buf()));
        }
        Ok(Self::new(Document::load(path)?, options))
    }

    pub fn from_bytes(bytes: &[u8], options: &StitchOptions) -> Result<Self, ExtractError> {
        Ok(Self::new(Document::load_mem(bytes)?, options))
    }

    fn new(document: Document, options: &StitchOptions) -> Self {
        let page_ids = document.get_pages().into_values().collect();
        Self {
            document,
            page_ids,
            min_cols: options.min_cols,
            line_tolerance: options.line_tolerance,
        }
    }

    fn extract_words(
        &self,
        page: u32,
        page_id: ObjectId,
        page_height: f64,
    ) -> Result<Vec<Word>, ExtractError> {
        let raw_content = self
            .document
            .get_page_content(page_id)
            .map_err(|source| ExtractError::Extraction { page, source })?;
        let content = Content::decode(&raw_content)
            .map_err(|source| ExtractError::Extraction { page, source })?;
        let encodings = self
            .document
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, font.get_font_encoding()))
            .collect::<BTreeMap<Vec<u8>, &str>>();

        let mut cursor = TextCursor::new(page_height, &encodings);
        for operation in &content.operations {
            cursor.apply(operation.operator.as_str(), &operation.operands);
        }
        cursor.flush_word();
        Ok(cursor.words)
    }
}

impl GeometryProvider for PdfGeometry {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page(&self, page: u32) -> Result<PageGeometry, ExtractError> {
        let page_id = usize::try_from(page)
            .ok()
            .and_then(|index| self.page_ids.get(index))
            .copied()
            .ok_or(ExtractError::InvalidPageNumber {
                page: page.saturating_add(1),
                page_count: self.page_ids.len(),
            })?;

        let (width, height) = page_size(&self.document, page_id);
        let words = self.extract_words(page, page_id, height)?;
        let tables = detect_tables_in_page(page, &words, self.min_cols, self.line_tolerance);
        tracing::debug!(
            page,
            words = words.len(),
            tables = tables.len(),
            "extracted page geometry"
        );

        Ok(PageGeometry {
            page,
            width,
            height,
            tables,
            words,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use lopdf::Object;

    use super::{Matrix, TextCursor, decode_pdf_bytes};

    #[test]
    fn decodes_big5_when_encoding_hint_is_present() {
        let (bytes, _, had_errors) = encoding_rs::BIG5.encode("測試");
        assert!(!had_errors);
        let decoded = decode_pdf_bytes(Some("ETen-B5-H"), &bytes);
        assert_eq!(decoded, "測試");
    }

    #[test]
    fn matrix_composition_applies_translation_last() {
        let scale = Matrix::from_operands(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0]).expect("six operands");
        let shift = Matrix::from_operands(&[1.0, 0.0, 0.0, 1.0, 10.0, 20.0]).expect("six operands");
        assert_eq!(scale.then(shift).apply(1.0, 1.0), (12.0, 22.0));
    }

    #[test]
    fn positions_words_in_top_left_space() {
        let encodings = BTreeMap::new();
        let mut cursor = TextCursor::new(792.0, &encodings);
        cursor.apply("BT", &[]);
        cursor.apply("Tf", &["F1".into(), 10.into()]);
        cursor.apply("Td", &[50.into(), 700.into()]);
        cursor.apply("Tj", &[Object::string_literal("Name  Qty")]);
        cursor.apply("T*", &[]);
        cursor.apply("ET", &[]);

        let words = cursor.words;
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Name");
        assert!((words[0].x0 - 50.0).abs() < 1e-9);
        assert!((words[0].x1 - 74.0).abs() < 1e-9);
        assert!((words[0].bottom - 92.0).abs() < 1e-9);
        assert!((words[0].top - 82.0).abs() < 1e-9);
        assert!((words[1].x0 - 86.0).abs() < 1e-9);
    }

    #[test]
    fn kerned_pieces_of_one_array_form_one_word() {
        let encodings = BTreeMap::new();
        let mut cursor = TextCursor::new(792.0, &encodings);
        cursor.apply("BT", &[]);
        cursor.apply("Tf", &["F1".into(), 10.into()]);
        cursor.apply("Td", &[50.into(), 700.into()]);
        cursor.apply(
            "TJ",
            &[Object::Array(vec![
                Object::string_literal("Inv"),
                (-20).into(),
                Object::string_literal("entory"),
                (-2000).into(),
                Object::string_literal("Qty"),
            ])],
        );
        cursor.apply("ET", &[]);

        let texts = cursor
            .words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["Inventory", "Qty"]);
        assert!((cursor.words[0].x0 - 50.0).abs() < 1e-9);
        // Nine glyphs of 6 units plus the 0.2 unit kern.
        assert!((cursor.words[0].x1 - 104.2).abs() < 1e-9);

        let lines = crate::table_parse::group_lines(&cursor.words, 2.0);
        assert_eq!(
            crate::table_parse::split_line_into_cells(&lines[0]),
            vec!["Inventory", "Qty"]
        );
    }

    #[test]
    fn leading_moves_to_next_line() {
        let encodings = BTreeMap::new();
        let mut cursor = TextCursor::new(792.0, &encodings);
        cursor.apply("BT", &[]);
        cursor.apply("Tf", &["F1".into(), 10.into()]);
        cursor.apply("TL", &[14.into()]);
        cursor.apply("Td", &[50.into(), 700.into()]);
        cursor.apply("Tj", &[Object::string_literal("a")]);
        cursor.apply("T*", &[]);
        cursor.apply("Tj", &[Object::string_literal("b")]);

        assert!((cursor.words[1].bottom - cursor.words[0].bottom - 14.0).abs() < 1e-9);
        assert!((cursor.words[1].x0 - 50.0).abs() < 1e-9);
    }
}
