//! Resume data model – the structured record every export path reads from,
//! plus the small shared helpers (date formatting, filename sanitising) both
//! the PDF and DOCX paths use.

use serde::{Deserialize, Serialize};

/// A full resume record as supplied by the caller. Read-only to this crate.
///
/// All string fields except `full_name` may be empty, which means "absent".
/// Dates are either empty (meaning "Present"/unspecified) or `"YYYY-MM"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<CertificationEntry>,
    /// Listing metadata from the persistence layer; not rendered.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub job_title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub graduation_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificationEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
}

impl ResumeRecord {
    /// Section gate: experience is exported only when the first entry names
    /// a company. Later entries cannot resurrect a section whose first entry
    /// is blank.
    pub fn has_experience(&self) -> bool {
        self.experience
            .first()
            .map(|e| !e.company.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_education(&self) -> bool {
        self.education
            .first()
            .map(|e| !e.school.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_skills(&self) -> bool {
        self.skills
            .first()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_certifications(&self) -> bool {
        self.certifications
            .first()
            .map(|c| !c.name.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    /// Contact fields in display order, empties skipped.
    pub fn contact_fields(&self) -> Vec<&str> {
        [
            self.email.as_str(),
            self.phone.as_str(),
            self.address.as_str(),
            self.linkedin.as_str(),
            self.website.as_str(),
        ]
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect()
    }

    /// Name used in email subjects and filenames when `full_name` is blank.
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            "Applicant"
        } else {
            name
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format a `"YYYY-MM"` date as `"Mon YYYY"`. Empty or malformed input
/// (missing month, month out of range, non-numeric) formats as `"Present"`.
pub fn format_month_year(date: &str) -> String {
    let date = date.trim();
    if date.is_empty() {
        return "Present".to_string();
    }
    let mut parts = date.splitn(2, '-');
    let year = parts.next().unwrap_or("");
    let month = match parts.next() {
        Some(m) => m,
        None => return "Present".to_string(),
    };
    let month_idx = match month.parse::<usize>() {
        Ok(m) if (1..=12).contains(&m) => m - 1,
        _ => return "Present".to_string(),
    };
    if year.is_empty() || year.parse::<u32>().is_err() {
        return "Present".to_string();
    }
    format!("{} {}", MONTH_NAMES[month_idx], year)
}

/// Sanitise a download base name: every character outside `[a-zA-Z0-9]`
/// becomes `_`, runs of `_` collapse to one, and the result is lowercased.
pub fn sanitize_base_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_underscore = false;
        } else if !last_was_underscore {
            out.push('_');
            last_was_underscore = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_regular() {
        assert_eq!(format_month_year("2021-06"), "Jun 2021");
        assert_eq!(format_month_year("1999-12"), "Dec 1999");
    }

    #[test]
    fn format_date_empty_is_present() {
        assert_eq!(format_month_year(""), "Present");
        assert_eq!(format_month_year("   "), "Present");
    }

    #[test]
    fn format_date_malformed_is_present() {
        assert_eq!(format_month_year("2021"), "Present");
        assert_eq!(format_month_year("2021-13"), "Present");
        assert_eq!(format_month_year("2021-xx"), "Present");
        assert_eq!(format_month_year("-05"), "Present");
    }

    #[test]
    fn sanitize_collapses_and_lowercases() {
        assert_eq!(sanitize_base_name("Jane O'Brien!!"), "jane_o_brien_");
        assert_eq!(sanitize_base_name("ACME  Corp"), "acme_corp");
        assert!(!sanitize_base_name("a---b").contains("__"));
    }

    #[test]
    fn section_gates_use_first_entry_only() {
        let mut record = ResumeRecord::default();
        record.experience = vec![
            ExperienceEntry::default(),
            ExperienceEntry {
                company: "Globex".to_string(),
                ..Default::default()
            },
        ];
        assert!(!record.has_experience());

        record.experience.remove(0);
        assert!(record.has_experience());
    }

    #[test]
    fn contact_fields_skip_empties() {
        let record = ResumeRecord {
            full_name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            website: "jane.dev".to_string(),
            ..Default::default()
        };
        assert_eq!(record.contact_fields(), vec!["jane@example.com", "jane.dev"]);
    }

    #[test]
    fn display_name_falls_back_to_applicant() {
        let record = ResumeRecord::default();
        assert_eq!(record.display_name(), "Applicant");
    }

    #[test]
    fn record_json_roundtrip() {
        let json = r#"{
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "experience": [{"company": "Acme", "position": "Engineer",
                            "start_date": "2020-01", "end_date": "",
                            "description": "Built things."}],
            "skills": ["Rust", "SQL"]
        }"#;
        let record: ResumeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.experience.len(), 1);
        assert!(record.has_experience());
        assert!(record.has_skills());
        assert!(!record.has_education());
    }
}
