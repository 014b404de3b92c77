//! Sample record and rendered view for testing and demonstration.
//!
//! The view mirrors what the editing UI renders: modern colour functions in
//! the inline styles (which the normaliser must rewrite) and a `no-export`
//! toolbar (which the capture must drop).

use crate::record::{CertificationEntry, EducationEntry, ExperienceEntry, ResumeRecord};

/// A fully populated sample record.
pub fn sample_record() -> ResumeRecord {
    ResumeRecord {
        full_name: "Jane Doe".to_string(),
        email: "jane.doe@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        address: "Portland, OR".to_string(),
        linkedin: "linkedin.com/in/janedoe".to_string(),
        website: "janedoe.dev".to_string(),
        summary: "Backend engineer with eight years of experience building \
                  document pipelines and storage systems."
            .to_string(),
        experience: vec![
            ExperienceEntry {
                company: "Acme Corp".to_string(),
                position: "Senior Engineer".to_string(),
                start_date: "2021-06".to_string(),
                end_date: String::new(),
                description: "Own the document export services and their rollout."
                    .to_string(),
            },
            ExperienceEntry {
                company: "Globex".to_string(),
                position: "Engineer".to_string(),
                start_date: "2017-02".to_string(),
                end_date: "2021-05".to_string(),
                description: "Built and operated the billing renderer.".to_string(),
            },
        ],
        education: vec![EducationEntry {
            school: "Portland State University".to_string(),
            degree: "BSc".to_string(),
            field: "Computer Science".to_string(),
            graduation_date: "2016-06".to_string(),
        }],
        skills: vec![
            "Rust".to_string(),
            "PostgreSQL".to_string(),
            "Kubernetes".to_string(),
        ],
        certifications: vec![CertificationEntry {
            name: "CKA".to_string(),
            issuer: "CNCF".to_string(),
            date: "2023-03".to_string(),
        }],
        title: String::new(),
        job_title: "Senior Engineer".to_string(),
    }
}

/// Render a record into the capture-ready HTML view.
pub fn resume_view(record: &ResumeRecord) -> String {
    let mut html = String::new();
    html.push_str(r#"<div class="p-6" style="background-color: #ffffff">"#);

    // Editing toolbar: present in the live view, excluded from captures.
    html.push_str(
        r#"<div class="no-export flex justify-end gap-2 mb-2" style="background-color: oklch(0.95 0.01 250)"><span>Edit</span><span>Share</span></div>"#,
    );

    html.push_str(&format!(
        r#"<h1 class="text-3xl font-bold text-center" style="color: oklch(0.21 0.03 264)">{}</h1>"#,
        escape(&record.full_name)
    ));
    let contact = record.contact_fields().join(" | ");
    if !contact.is_empty() {
        html.push_str(&format!(
            r#"<p class="text-center text-sm" style="color: oklch(0.45 0.02 264)">{}</p>"#,
            escape(&contact)
        ));
    }

    if record.has_summary() {
        push_section_heading(&mut html, "Professional Summary");
        html.push_str(&format!(r#"<p class="text-sm">{}</p>"#, escape(&record.summary)));
    }

    if record.has_experience() {
        push_section_heading(&mut html, "Work Experience");
        for exp in &record.experience {
            if exp.company.trim().is_empty() {
                continue;
            }
            html.push_str(&format!(
                r#"<p class="font-bold mb-0">{}</p><p class="italic mb-0">{}</p><p class="text-xs mb-0">{} - {}</p><p class="text-sm">{}</p>"#,
                escape(&exp.position),
                escape(&exp.company),
                crate::record::format_month_year(&exp.start_date),
                crate::record::format_month_year(&exp.end_date),
                escape(&exp.description)
            ));
        }
    }

    if record.has_education() {
        push_section_heading(&mut html, "Education");
        for edu in &record.education {
            if edu.school.trim().is_empty() {
                continue;
            }
            html.push_str(&format!(
                r#"<p class="font-bold mb-0">{} in {}</p><p class="mb-0">{}</p><p class="text-xs">{}</p>"#,
                escape(&edu.degree),
                escape(&edu.field),
                escape(&edu.school),
                crate::record::format_month_year(&edu.graduation_date)
            ));
        }
    }

    if record.has_skills() {
        push_section_heading(&mut html, "Skills");
        let joined = record
            .skills
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| escape(s))
            .collect::<Vec<_>>()
            .join(" \u{2022} ");
        html.push_str(&format!(r#"<p class="text-sm">{joined}</p>"#));
    }

    if record.has_certifications() {
        push_section_heading(&mut html, "Certifications");
        for cert in &record.certifications {
            if cert.name.trim().is_empty() {
                continue;
            }
            html.push_str(&format!(
                r#"<p class="font-bold mb-0">{}</p><p class="text-xs">{} - {}</p>"#,
                escape(&cert.name),
                escape(&cert.issuer),
                crate::record::format_month_year(&cert.date)
            ));
        }
    }

    html.push_str("</div>");
    html
}

fn push_section_heading(html: &mut String, title: &str) {
    html.push_str(&format!(
        r#"<h2 class="text-xl font-bold mt-4" style="color: oklch(0.55 0.2 262); border-bottom: 2px solid #2563eb">{title}</h2>"#
    ));
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{first_element, parse_html};
    use crate::normalize::contains_unsupported_color;

    #[test]
    fn sample_view_parses_into_the_controlled_subset() {
        let html = resume_view(&sample_record());
        let nodes = parse_html(&html);
        let root = first_element(&nodes).unwrap();
        assert!(!root.child_elements().is_empty());
    }

    #[test]
    fn sample_view_exercises_the_normalizer_and_exclusion() {
        let html = resume_view(&sample_record());
        assert!(contains_unsupported_color(&html));
        assert!(html.contains("no-export"));
    }

    #[test]
    fn empty_sections_are_omitted_from_the_view() {
        let record = ResumeRecord {
            full_name: "Min".to_string(),
            ..Default::default()
        };
        let html = resume_view(&record);
        assert!(!html.contains("Work Experience"));
        assert!(!html.contains("Skills"));
    }
}
