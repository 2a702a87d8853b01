use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tracing::{debug, info, warn};

use crate::core::error::{Result, ResumakeError};
use crate::core::models::{Experience, MasterRecord};

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 15.0;
const BOTTOM_MM: f64 = 12.0;

/// Descending attempts for the one-page fit; the last size is kept even if
/// the content spills to a second page.
const FONT_SIZES: [f64; 4] = [11.0, 10.5, 10.0, 9.5];

/// Renders the tailored record to an A4 PDF under `outputs_dir` and returns
/// the file path. Tries each font size until the content fits one page.
pub fn generate_pdf_resume(
    record: &MasterRecord,
    target_role: &str,
    outputs_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(outputs_dir)?;

    let mut chosen: Option<PdfDocumentReference> = None;
    for (attempt, font_size) in FONT_SIZES.iter().enumerate() {
        let (doc, pages) = render_document(record, *font_size)?;
        debug!(
            "Render attempt {}: {}pt -> {} page(s)",
            attempt + 1,
            font_size,
            pages
        );
        if pages == 1 {
            info!("Content fits one page at {}pt", font_size);
            chosen = Some(doc);
            break;
        }
        chosen = Some(doc);
        if attempt == FONT_SIZES.len() - 1 {
            warn!("Content exceeds one page at every size, keeping multi-page output");
        }
    }

    let doc = chosen.ok_or_else(|| ResumakeError::Render("no render attempt made".to_string()))?;

    let safe_name = sanitize_component(if record.name.is_empty() {
        "Resume"
    } else {
        &record.name
    });
    let safe_role = sanitize_component(target_role);
    let path = outputs_dir.join(format!("{safe_name}_{safe_role}_Tailored_Resume.pdf"));

    doc.save(&mut BufWriter::new(File::create(&path)?))
        .map_err(|e| ResumakeError::Render(e.to_string()))?;
    info!("PDF saved to {}", path.display());
    Ok(path)
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '/' && *c != '\\')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Sort key for reverse-chronological sections. "Present" sorts newest;
/// unparseable dates sink to the bottom.
fn start_date_key(start_date: &str) -> NaiveDate {
    if start_date.trim().eq_ignore_ascii_case("present") {
        return chrono::Utc::now().date_naive();
    }
    let normalized = start_date.trim().replace("Sept", "Sep");
    NaiveDate::parse_from_str(&format!("1 {normalized}"), "%d %b %Y").unwrap_or(NaiveDate::MIN)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

/// Cursor-based writer over PDF layers. Starts a new page when the cursor
/// runs past the bottom margin and counts pages for the fit check.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
    size: f64,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference, size: f64) -> Self {
        Self {
            doc,
            layer,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
            size,
            pages: 1,
        }
    }

    fn line_height(&self) -> f64 {
        self.size * 0.45
    }

    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < BOTTOM_MM {
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH_MM as f32),
                Mm(PAGE_HEIGHT_MM as f32),
                "content",
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
            self.pages += 1;
        }
    }

    fn text_at(&mut self, text: &str, size: f64, x: f64, font: &IndirectFontRef) {
        self.layer
            .use_text(text, size as f32, Mm(x as f32), Mm(self.y as f32), font);
    }

    fn line(&mut self, text: &str, size: f64, font: &IndirectFontRef) {
        self.ensure_space(self.line_height());
        self.text_at(text, size, MARGIN_MM, font);
        self.y -= self.line_height();
    }

    /// Left text plus a right-hand column (dates, locations).
    fn split_line(
        &mut self,
        left: &str,
        right: &str,
        size: f64,
        left_font: &IndirectFontRef,
        right_font: &IndirectFontRef,
    ) {
        self.ensure_space(self.line_height());
        self.text_at(left, size, MARGIN_MM, left_font);
        self.text_at(right, size - 0.5, PAGE_WIDTH_MM - MARGIN_MM - 45.0, right_font);
        self.y -= self.line_height();
    }

    fn section_title(&mut self, label: &str, font: &IndirectFontRef) {
        self.gap(self.line_height() * 0.5);
        self.ensure_space(self.line_height() * 2.0);
        self.text_at(&label.to_uppercase(), self.size + 1.5, MARGIN_MM, font);
        self.y -= self.line_height() * 1.2;
    }

    fn bullet(&mut self, text: &str, font: &IndirectFontRef) {
        let max_chars = wrap_width(self.size, 6.0);
        for (i, segment) in wrap_text(text, max_chars).into_iter().enumerate() {
            self.ensure_space(self.line_height());
            let prefix = if i == 0 { "- " } else { "  " };
            self.text_at(&format!("{prefix}{segment}"), self.size, MARGIN_MM + 3.0, font);
            self.y -= self.line_height();
        }
    }

    fn paragraph(&mut self, text: &str, font: &IndirectFontRef) {
        let max_chars = wrap_width(self.size, 0.0);
        for segment in wrap_text(text, max_chars) {
            self.ensure_space(self.line_height());
            self.text_at(&segment, self.size, MARGIN_MM, font);
            self.y -= self.line_height();
        }
    }

    fn gap(&mut self, dy: f64) {
        self.y -= dy;
    }
}

/// Estimated characters per line for a Helvetica run at `size` points with
/// `indent_mm` of extra indent.
fn wrap_width(size: f64, indent_mm: f64) -> usize {
    let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent_mm;
    let char_mm = size * 0.352_778 * 0.5;
    (usable_mm / char_mm).floor() as usize
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn render_document(
    record: &MasterRecord,
    font_size: f64,
) -> Result<(PdfDocumentReference, usize)> {
    let (doc, page, layer) = PdfDocument::new(
        format!("{} - Tailored Resume", record.name),
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "content",
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ResumakeError::Render(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ResumakeError::Render(e.to_string()))?,
        oblique: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| ResumakeError::Render(e.to_string()))?,
    };

    let first_layer = doc.get_page(page).get_layer(layer);
    let mut writer = PageWriter::new(&doc, first_layer, font_size);

    // Header
    writer.line(&record.name, font_size + 8.0, &fonts.bold);
    writer.gap(1.0);
    let contact = [&record.phone_number, &record.email, &record.address]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    if !contact.is_empty() {
        writer.line(&contact, font_size, &fonts.regular);
    }
    let links = [&record.linkedin, &record.github, &record.portfolio_website]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    if !links.is_empty() {
        writer.line(&links, font_size - 0.5, &fonts.regular);
    }

    if !record.summary.is_empty() {
        writer.section_title("Professional Summary", &fonts.bold);
        writer.paragraph(&record.summary, &fonts.regular);
    }

    if !record.skills.is_empty() {
        writer.section_title("Technical Skills", &fonts.bold);
        for (category, value) in &record.skills {
            let label = category.replace('_', " ");
            writer.paragraph(&format!("{label}: {}", value.joined()), &fonts.regular);
        }
    }

    if !record.experiences.is_empty() {
        writer.section_title("Professional Experience", &fonts.bold);
        let mut experiences: Vec<&Experience> = record.experiences.values().collect();
        experiences.sort_by_key(|exp| std::cmp::Reverse(start_date_key(&exp.start_date)));
        for exp in experiences {
            let dates = format!("{} - {}", exp.start_date, exp.end_date);
            writer.split_line(&exp.position, &dates, font_size, &fonts.bold, &fonts.bold);
            writer.split_line(&exp.company, &exp.location, font_size, &fonts.oblique, &fonts.oblique);
            for bullet in &exp.description {
                writer.bullet(bullet, &fonts.regular);
            }
            writer.gap(1.5);
        }
    }

    if !record.projects.is_empty() {
        writer.section_title("Key Projects", &fonts.bold);
        for proj in record.projects.values() {
            let heading = if proj.technologies.is_empty() {
                proj.name.clone()
            } else {
                format!("{} | {}", proj.name, proj.technologies)
            };
            writer.line(&heading, font_size, &fonts.bold);
            for bullet in &proj.description {
                writer.bullet(bullet, &fonts.regular);
            }
            writer.gap(1.5);
        }
    }

    if !record.educations.is_empty() {
        writer.section_title("Education", &fonts.bold);
        let mut educations: Vec<_> = record.educations.values().collect();
        educations.sort_by_key(|edu| std::cmp::Reverse(start_date_key(&edu.start_date)));
        for edu in educations {
            let dates = format!("{} - {}", edu.start_date, edu.end_date);
            let degree = if edu.field_of_study.is_empty() {
                edu.degree.clone()
            } else {
                format!("{} - {}", edu.degree, edu.field_of_study)
            };
            writer.split_line(&degree, &dates, font_size, &fonts.bold, &fonts.bold);
            writer.line(&edu.university, font_size, &fonts.oblique);
            writer.gap(1.0);
        }
    }

    if !record.certifications.is_empty() {
        writer.section_title("Certifications & Licenses", &fonts.bold);
        for cert in record.certifications.values() {
            let entry = if cert.issuer.is_empty() {
                format!("{} {}", cert.name, cert.date)
            } else {
                format!("{} ({}) {}", cert.name, cert.issuer, cert.date)
            };
            writer.bullet(entry.trim(), &fonts.regular);
        }
    }

    let pages = writer.pages;
    Ok((doc, pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Education, SkillValue};

    fn record() -> MasterRecord {
        let mut record = MasterRecord::default();
        record.name = "Jane Doe".to_string();
        record.email = "jane@example.com".to_string();
        record.phone_number = "555-0100".to_string();
        record.summary = "Engineer with a decade of data platform work.".to_string();
        record.experiences.insert(
            "experience_1".to_string(),
            Experience {
                position: "Data Engineer".to_string(),
                company: "Acme".to_string(),
                location: "Toronto, ON".to_string(),
                start_date: "Jan 2022".to_string(),
                end_date: "Present".to_string(),
                description: vec!["Built streaming ETL with Kafka and Rust.".to_string()],
            },
        );
        record.skills.insert(
            "languages".to_string(),
            SkillValue::Text("Rust, Python, SQL".to_string()),
        );
        record.educations.insert(
            "education_1".to_string(),
            Education {
                degree: "BSc".to_string(),
                field_of_study: "Computer Science".to_string(),
                university: "University of Toronto".to_string(),
                start_date: "Sep 2014".to_string(),
                end_date: "Jun 2018".to_string(),
            },
        );
        record
    }

    #[test]
    fn test_generate_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = generate_pdf_resume(&record(), "Data Engineer", dir.path()).unwrap();
        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Jane_Doe_Data_Engineer_Tailored_Resume.pdf"
        );
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("AI/ML Specialist"), "AIML_Specialist");
        assert_eq!(sanitize_component("Jane Doe"), "Jane_Doe");
    }

    #[test]
    fn test_start_date_ordering() {
        assert!(start_date_key("Present") > start_date_key("Jan 2024"));
        assert!(start_date_key("Jan 2024") > start_date_key("Sept 2020"));
        assert!(start_date_key("Sept 2020") > start_date_key("garbage"));
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("one two three four five six seven", 10);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 20), vec![String::new()]);
    }
}
