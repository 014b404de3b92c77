//! rexport – command-line resume exporter.
//!
//! Usage:
//!   rexport <record.json> [--view resume.html] [--out dir] [--pdf] [--docx] [--email addr]
//!
//! Without `--pdf`/`--docx`/`--email` both documents are written. The view
//! defaults to one rendered from the record; `--sample` runs the embedded
//! sample record instead of reading a file.

use std::{env, fs, path::Path, path::PathBuf, process};

use resume_export::dom::{body_children, first_element, parse_html, DomNode, ElementNode, Tag};
use resume_export::fonts::FontManager;
use resume_export::outcome::{ExportError, ExportOutcome};
use resume_export::{
    export_docx, export_pdf, samples, send_resume_email, HttpEmailService, PixelSurface,
    ResumeRecord,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut record_path: Option<PathBuf> = None;
    let mut view_path: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from(".");
    let mut want_pdf = false;
    let mut want_docx = false;
    let mut email_to: Option<String> = None;
    let mut use_sample = false;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--view" | "-v" => match iter.next() {
                Some(v) => view_path = Some(PathBuf::from(v)),
                None => {
                    eprintln!("--view requires a file argument");
                    process::exit(1);
                }
            },
            "--out" | "-o" => match iter.next() {
                Some(v) => out_dir = PathBuf::from(v),
                None => {
                    eprintln!("--out requires a directory argument");
                    process::exit(1);
                }
            },
            "--email" | "-e" => match iter.next() {
                Some(v) => email_to = Some(v.clone()),
                None => {
                    eprintln!("--email requires an address argument");
                    process::exit(1);
                }
            },
            "--pdf" => want_pdf = true,
            "--docx" => want_docx = true,
            "--sample" => use_sample = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if record_path.is_some() {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                record_path = Some(PathBuf::from(path));
            }
        }
    }

    let record: ResumeRecord = if use_sample {
        samples::sample_record()
    } else {
        let path = match record_path {
            Some(p) => p,
            None => {
                eprintln!("Error: no record file specified (or pass --sample).");
                print_usage(&args[0]);
                process::exit(1);
            }
        };
        let json = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", path.display());
                process::exit(1);
            }
        };
        match serde_json::from_str(&json) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error parsing '{}': {e}", path.display());
                process::exit(1);
            }
        }
    };

    let view_html = match &view_path {
        Some(p) => match fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", p.display());
                process::exit(1);
            }
        },
        None => samples::resume_view(&record),
    };
    let source = match view_root(&view_html) {
        Some(e) => e,
        None => {
            eprintln!("Error: view HTML contains no elements.");
            process::exit(1);
        }
    };

    // No explicit selection means both documents.
    if !want_pdf && !want_docx && email_to.is_none() {
        want_pdf = true;
        want_docx = true;
    }

    if let Err(e) = fs::create_dir_all(&out_dir) {
        eprintln!("Error creating output directory: {e}");
        process::exit(1);
    }

    let surface = PixelSurface::new();
    let fonts = FontManager::with_system_fonts();
    let mut failed = false;

    if want_pdf {
        match export_pdf(&surface, &source, &record, &fonts) {
            ExportOutcome {
                data: Some(pdf), ..
            } => {
                failed |= !write_file(&out_dir, &pdf.file_name, &pdf.bytes, Some(pdf.pages));
            }
            outcome => {
                report_error(outcome.error);
                failed = true;
            }
        }
    }

    if want_docx {
        match export_docx(&record) {
            ExportOutcome {
                data: Some(docx), ..
            } => {
                failed |= !write_file(&out_dir, &docx.file_name, &docx.bytes, None);
            }
            outcome => {
                report_error(outcome.error);
                failed = true;
            }
        }
    }

    if let Some(to) = email_to {
        let service = HttpEmailService::from_env();
        match send_resume_email(&surface, Some(&source), &record, &to, &fonts, &service).await {
            ExportOutcome {
                data: Some(delivery),
                ..
            } => {
                let id = if delivery.message_id.is_empty() {
                    "n/a".to_string()
                } else {
                    delivery.message_id
                };
                eprintln!("Emailed '{}' to {to} (message id: {id})", delivery.file_name);
            }
            outcome => {
                report_error(outcome.error);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

/// Root element for capture: the first top-level element, or a synthetic
/// container when the view has several siblings.
fn view_root(html: &str) -> Option<ElementNode> {
    let nodes = parse_html(html);
    let body = body_children(&nodes);
    let element_count = body
        .iter()
        .filter(|n| matches!(n, DomNode::Element(_)))
        .count();
    match element_count {
        0 => None,
        1 => first_element(&body).cloned(),
        _ => {
            let mut wrapper = ElementNode::new(Tag::Div);
            wrapper.children = body;
            Some(wrapper)
        }
    }
}

fn write_file(out_dir: &Path, file_name: &str, bytes: &[u8], pages: Option<usize>) -> bool {
    let path = out_dir.join(file_name);
    if let Err(e) = fs::write(&path, bytes) {
        eprintln!("Error writing '{}': {e}", path.display());
        return false;
    }
    match pages {
        Some(pages) => eprintln!(
            "Wrote '{}' ({} bytes, {} page{})",
            path.display(),
            bytes.len(),
            pages,
            if pages == 1 { "" } else { "s" }
        ),
        None => eprintln!("Wrote '{}' ({} bytes)", path.display(), bytes.len()),
    }
    true
}

fn report_error(error: Option<ExportError>) {
    match error {
        Some(e) => {
            eprintln!("Error [{}]: {}", e.code.as_str(), e.message);
            if let Some(details) = e.details {
                eprintln!("  {details}");
            }
        }
        None => eprintln!("Error: export failed without a reported cause."),
    }
}

fn print_usage(prog: &str) {
    eprintln!("rexport – resume exporter (resume-export)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <record.json> [--view resume.html] [--out dir] [--pdf] [--docx] [--email addr]");
    eprintln!("  {prog} --sample [--pdf] [--docx]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <record.json>  Resume record (JSON)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --view, -v     Rendered view HTML (default: generated from the record)");
    eprintln!("  --out, -o      Output directory (default: current directory)");
    eprintln!("  --pdf          Export the paginated PDF");
    eprintln!("  --docx         Export the structured DOCX");
    eprintln!("  --email, -e    Email the PDF via the endpoint in RESUME_MAILER_URL");
    eprintln!("  --sample       Use the embedded sample record");
    eprintln!("  --help         Print this message");
    eprintln!();
    eprintln!("With no format flags both the PDF and the DOCX are written.");
}
