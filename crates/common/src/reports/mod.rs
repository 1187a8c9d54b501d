//! PDF report rendering
//!
//! Renders one analysis result into a small, self-contained PDF using the
//! standard Helvetica fonts, so no font files are embedded.

use crate::analysis::ResolvedAnalysis;
use crate::errors::{AppError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument};

/// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const LINE_HEIGHT: i64 = 14;
const BODY_FONT_SIZE: i64 = 10;
const TITLE_FONT_SIZE: i64 = 16;
/// Characters per body line at 10pt Helvetica within the margins
const WRAP_COLUMNS: usize = 90;

/// One line of report text
#[derive(Debug, Clone, PartialEq)]
enum Line {
    Title(String),
    Heading(String),
    Body(String),
    Blank,
}

/// Renders analysis reports as PDF bytes
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    organization: String,
}

impl ReportRenderer {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// File name offered to the client for a report download
    pub fn file_name(analysis: &ResolvedAnalysis) -> String {
        format!("analysis_report_{}.pdf", analysis.id())
    }

    /// Render the report for `analysis`, prepared for `owner` (display name)
    #[instrument(skip(self, analysis), fields(analysis_id = %analysis.id()))]
    pub fn render(&self, analysis: &ResolvedAnalysis, owner: &str) -> Result<Vec<u8>> {
        let lines = self.layout(analysis, owner);
        let bytes = build_document(&lines)?;

        crate::metrics::record_report_rendered(analysis.kind().label(), bytes.len());
        debug!(bytes = bytes.len(), "Report rendered");

        Ok(bytes)
    }

    fn layout(&self, analysis: &ResolvedAnalysis, owner: &str) -> Vec<Line> {
        let mut lines = vec![
            Line::Title(format!("{} Analysis Report", self.organization)),
            Line::Blank,
            Line::Body(format!("Report type: {}", analysis.kind().label())),
            Line::Body(format!("Analysis ID: {}", analysis.id())),
            Line::Body(format!("Prepared for: {}", owner)),
            Line::Body(format!(
                "Analyzed on: {}",
                analysis.created_at().format("%Y-%m-%d %H:%M UTC")
            )),
            Line::Blank,
            Line::Heading("Result".to_string()),
            Line::Body(format!("Verdict: {}", humanize(analysis.verdict()))),
            Line::Body(format!("Confidence: {:.1}%", analysis.confidence() * 100.0)),
            Line::Blank,
            Line::Heading("Summary".to_string()),
        ];
        lines.extend(wrap(analysis.summary()).into_iter().map(Line::Body));

        lines.push(Line::Blank);
        lines.push(Line::Heading("Analyzed content".to_string()));
        lines.extend(wrap(&analysis.subject()).into_iter().map(Line::Body));

        if let Some(details) = analysis.details().as_object().filter(|d| !d.is_empty()) {
            lines.push(Line::Blank);
            lines.push(Line::Heading("Details".to_string()));
            for (key, value) in details {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.extend(
                    wrap(&format!("{}: {}", humanize(key), value))
                        .into_iter()
                        .map(Line::Body),
                );
            }
        }

        lines.push(Line::Blank);
        lines.push(Line::Body(format!(
            "Generated by {} on {}",
            self.organization,
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        )));

        lines
    }
}

/// `ai_generated` -> `Ai generated`
fn humanize(value: &str) -> String {
    let spaced = value.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > WRAP_COLUMNS {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                out.push(word.drain(..WRAP_COLUMNS).collect());
            }
            let word: String = word.into_iter().collect();

            if current.is_empty() {
                current = word;
            } else if current.chars().count() + 1 + word.chars().count() <= WRAP_COLUMNS {
                current.push(' ');
                current.push_str(&word);
            } else {
                out.push(std::mem::replace(&mut current, word));
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }

    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// The standard fonts only cover Latin-1; anything else is replaced
fn pdf_text(text: &str) -> Object {
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect();
    Object::String(bytes, lopdf::StringFormat::Literal)
}

fn build_document(lines: &[Line]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT) as usize;
    let mut kids: Vec<Object> = Vec::new();

    for chunk in lines.chunks(lines_per_page) {
        let page_id = add_page(&mut doc, pages_id, chunk)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| AppError::Report {
        message: format!("Failed to write PDF: {}", e),
    })?;

    Ok(buffer)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, lines: &[Line]) -> Result<ObjectId> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("TL", vec![LINE_HEIGHT.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
    ];

    for line in lines {
        let (font, size, text) = match line {
            Line::Title(text) => ("F2", TITLE_FONT_SIZE, text.as_str()),
            Line::Heading(text) => ("F2", BODY_FONT_SIZE + 2, text.as_str()),
            Line::Body(text) => ("F1", BODY_FONT_SIZE, text.as_str()),
            Line::Blank => ("F1", BODY_FONT_SIZE, ""),
        };
        operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
        operations.push(Operation::new("Tj", vec![pdf_text(text)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let encoded = content.encode().map_err(|e| AppError::Report {
        message: format!("Failed to encode page content: {}", e),
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    }))
}
