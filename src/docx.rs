//! Structured document composer – builds a DOCX directly from the record.
//!
//! Unlike the PDF path, nothing here goes through the visual tree: the
//! document is recomposed from [`ResumeRecord`] fields. The output is a
//! real OOXML package: a zip container with the content-types manifest,
//! relationship parts, `word/document.xml`, and a minimal styles part for
//! the two heading levels.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::record::{format_month_year, sanitize_base_name, ResumeRecord};

/// Hex colour of the rule drawn beneath every section heading.
const HEADING_RULE_COLOR: &str = "2563EB";

// ---------------------------------------------------------------------------
// Paragraph model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Font size in half-points, when it differs from the style default.
    pub size: Option<u32>,
}

impl Run {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// One paragraph of the composed document.
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub style: Option<&'static str>,
    pub centered: bool,
    /// Draw the fixed-colour section rule under this paragraph.
    pub rule_below: bool,
    /// Spacing in twentieths of a point.
    pub spacing_before: Option<u32>,
    pub spacing_after: Option<u32>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    fn text(text: &str) -> Self {
        Self {
            runs: vec![Run::plain(text)],
            ..Default::default()
        }
    }

    fn to_xml(&self) -> String {
        let mut props = String::new();
        if let Some(style) = self.style {
            props.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if self.rule_below {
            props.push_str(&format!(
                r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="{HEADING_RULE_COLOR}"/></w:pBdr>"#
            ));
        }
        if self.spacing_before.is_some() || self.spacing_after.is_some() {
            let before = self
                .spacing_before
                .map(|v| format!(r#" w:before="{v}""#))
                .unwrap_or_default();
            let after = self
                .spacing_after
                .map(|v| format!(r#" w:after="{v}""#))
                .unwrap_or_default();
            props.push_str(&format!("<w:spacing{before}{after}/>"));
        }
        if self.centered {
            props.push_str(r#"<w:jc w:val="center"/>"#);
        }

        let mut xml = String::from("<w:p>");
        if !props.is_empty() {
            xml.push_str(&format!("<w:pPr>{props}</w:pPr>"));
        }
        for run in &self.runs {
            let mut rpr = String::new();
            if run.bold {
                rpr.push_str("<w:b/>");
            }
            if run.italic {
                rpr.push_str("<w:i/>");
            }
            if let Some(size) = run.size {
                rpr.push_str(&format!(r#"<w:sz w:val="{size}"/>"#));
            }
            xml.push_str("<w:r>");
            if !rpr.is_empty() {
                xml.push_str(&format!("<w:rPr>{rpr}</w:rPr>"));
            }
            xml.push_str(&format!(
                r#"<w:t xml:space="preserve">{}</w:t>"#,
                escape_xml(&run.text)
            ));
            xml.push_str("</w:r>");
        }
        xml.push_str("</w:p>");
        xml
    }
}

fn section_heading(title: &str) -> Paragraph {
    Paragraph {
        style: Some("Heading2"),
        rule_below: true,
        spacing_before: Some(200),
        spacing_after: Some(100),
        runs: vec![Run::plain(title)],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Compose the paragraph sequence for a record. A record with nothing but a
/// name yields exactly two paragraphs: the name heading and the (empty)
/// contact line. Sections appear only when populated, entries with a blank
/// required field are skipped individually.
pub fn compose_paragraphs(record: &ResumeRecord) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();

    // Name header
    paragraphs.push(Paragraph {
        style: Some("Heading1"),
        centered: true,
        spacing_after: Some(200),
        runs: vec![Run::plain(&record.full_name)],
        ..Default::default()
    });

    // Contact line
    paragraphs.push(Paragraph {
        centered: true,
        spacing_after: Some(300),
        runs: vec![Run::plain(&record.contact_fields().join(" | "))],
        ..Default::default()
    });

    if record.has_summary() {
        paragraphs.push(section_heading("PROFESSIONAL SUMMARY"));
        paragraphs.push(Paragraph {
            spacing_after: Some(200),
            ..Paragraph::text(&record.summary)
        });
    }

    if record.has_experience() {
        paragraphs.push(section_heading("WORK EXPERIENCE"));
        for exp in &record.experience {
            if exp.company.trim().is_empty() {
                continue;
            }
            paragraphs.push(Paragraph {
                spacing_before: Some(100),
                runs: vec![Run {
                    text: exp.position.clone(),
                    bold: true,
                    size: Some(24),
                    ..Default::default()
                }],
                ..Default::default()
            });
            paragraphs.push(Paragraph {
                runs: vec![Run {
                    text: exp.company.clone(),
                    italic: true,
                    ..Default::default()
                }],
                ..Default::default()
            });
            paragraphs.push(Paragraph {
                runs: vec![Run {
                    text: format!(
                        "{} - {}",
                        format_month_year(&exp.start_date),
                        format_month_year(&exp.end_date)
                    ),
                    size: Some(20),
                    ..Default::default()
                }],
                ..Default::default()
            });
            paragraphs.push(Paragraph {
                spacing_after: Some(150),
                ..Paragraph::text(&exp.description)
            });
        }
    }

    if record.has_education() {
        paragraphs.push(section_heading("EDUCATION"));
        for edu in &record.education {
            if edu.school.trim().is_empty() {
                continue;
            }
            paragraphs.push(Paragraph {
                runs: vec![Run {
                    text: format!("{} in {}", edu.degree, edu.field),
                    bold: true,
                    ..Default::default()
                }],
                ..Default::default()
            });
            paragraphs.push(Paragraph::text(&edu.school));
            paragraphs.push(Paragraph {
                spacing_after: Some(150),
                ..Paragraph::text(&format_month_year(&edu.graduation_date))
            });
        }
    }

    if record.has_skills() {
        paragraphs.push(section_heading("SKILLS"));
        let joined = record
            .skills
            .iter()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" \u{2022} ");
        paragraphs.push(Paragraph {
            spacing_after: Some(200),
            ..Paragraph::text(&joined)
        });
    }

    if record.has_certifications() {
        paragraphs.push(section_heading("CERTIFICATIONS"));
        for cert in &record.certifications {
            if cert.name.trim().is_empty() {
                continue;
            }
            paragraphs.push(Paragraph {
                runs: vec![Run {
                    text: cert.name.clone(),
                    bold: true,
                    ..Default::default()
                }],
                ..Default::default()
            });
            paragraphs.push(Paragraph {
                spacing_after: Some(100),
                ..Paragraph::text(&format!(
                    "{} - {}",
                    cert.issuer,
                    format_month_year(&cert.date)
                ))
            });
        }
    }

    paragraphs
}

// ---------------------------------------------------------------------------
// OOXML packaging
// ---------------------------------------------------------------------------

/// Build the complete DOCX bytes for a record.
pub fn write_docx(record: &ResumeRecord) -> Result<Vec<u8>, String> {
    let paragraphs = compose_paragraphs(record);
    let body: String = paragraphs.iter().map(|p| p.to_xml()).collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let write_part = |zip: &mut ZipWriter<&mut Cursor<Vec<u8>>>,
                          name: &str,
                          content: &str|
         -> Result<(), String> {
            zip.start_file(name, options)
                .map_err(|e| format!("DOCX packaging failed ({name}): {e}"))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| format!("DOCX packaging failed ({name}): {e}"))?;
            Ok(())
        };

        write_part(&mut zip, "[Content_Types].xml", CONTENT_TYPES_XML)?;
        write_part(&mut zip, "_rels/.rels", ROOT_RELS_XML)?;
        write_part(&mut zip, "word/_rels/document.xml.rels", DOCUMENT_RELS_XML)?;
        write_part(&mut zip, "word/document.xml", &document)?;
        write_part(&mut zip, "word/styles.xml", STYLES_XML)?;

        zip.finish()
            .map_err(|e| format!("DOCX packaging failed: {e}"))?;
    }
    Ok(cursor.into_inner())
}

/// Download name for a DOCX export.
pub fn docx_file_name(record: &ResumeRecord) -> String {
    format!("{}_resume.docx", sanitize_base_name(record.display_name()))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:pPr><w:spacing w:before="200" w:after="100"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style></w:styles>"#;
