//! pdfwalk - Interpret PDF pages and report the drawing calls they make.
//!
//! Pages are interpreted in parallel against one shared resource cache.
//! Output is one JSON document, or a plain listing with `--text`.

use anyhow::{Context, Result, bail};
use clap::Parser;
use folio_core::interp::DrawCall;
use folio_core::{
    Factories, InterpreterOptions, PDFDocument, PageInterpreter, RecordingHandler,
    ResourceManager,
};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdfwalk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PDF file to interpret
    file: PathBuf,

    /// Comma-separated 1-based page numbers (default: all pages)
    #[arg(short = 'p', long = "pages", value_delimiter = ',')]
    pages: Vec<usize>,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value = "0")]
    jobs: usize,

    /// Deepest form/pattern nesting before a page fails
    #[arg(long = "max-depth", default_value_t = folio_core::interp::DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    /// Print drawing calls one per line instead of JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    text: bool,

    /// Only report per-page counts, not individual calls
    #[arg(short = 's', long, action = clap::ArgAction::SetTrue)]
    summary: bool,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short = 'd', long, action = clap::ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Debug, Default, Serialize)]
struct Counts {
    fills: usize,
    strokes: usize,
    clips: usize,
    images: usize,
    text_runs: usize,
    marked_content: usize,
}

impl Counts {
    fn tally(calls: &[DrawCall]) -> Self {
        let mut counts = Self::default();
        for call in calls {
            match call {
                DrawCall::Fill { .. } => counts.fills += 1,
                DrawCall::Stroke { .. } => counts.strokes += 1,
                DrawCall::Clip { .. } => counts.clips += 1,
                DrawCall::Image { .. } => counts.images += 1,
                DrawCall::Text { .. } => counts.text_runs += 1,
                DrawCall::BeginMarkedContent { .. } | DrawCall::MarkedContentPoint { .. } => {
                    counts.marked_content += 1
                }
                DrawCall::BeginPage { .. }
                | DrawCall::EndPage
                | DrawCall::EndMarkedContent => {}
            }
        }
        counts
    }
}

#[derive(Debug, Serialize)]
struct PageReport {
    page: usize,
    width: f64,
    height: f64,
    rotate: i64,
    counts: Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    calls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    file: String,
    page_count: usize,
    encrypted: bool,
    cached_fonts: usize,
    cached_images: usize,
    pages: Vec<PageReport>,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Interprets one page. Load and interpretation failures both end up in
/// the report so the remaining pages still run.
fn walk_page(
    doc: &PDFDocument,
    factories: &Factories,
    resources: &ResourceManager,
    options: &InterpreterOptions,
    index: usize,
    with_calls: bool,
) -> PageReport {
    let page = match doc.page(index) {
        Ok(page) => page,
        Err(err) => {
            warn!(page = index + 1, error = %err, "page could not be loaded");
            return PageReport {
                page: index + 1,
                width: 0.0,
                height: 0.0,
                rotate: 0,
                counts: Counts::default(),
                calls: None,
                error: Some(format!("loading page {}: {err}", index + 1)),
            };
        }
    };
    let (width, height) = page.size();
    let mut handler = RecordingHandler::new();
    let result = PageInterpreter::new(doc, factories, resources, &mut handler)
        .with_options(options.clone())
        .process_page(&page);
    if let Err(err) = &result {
        warn!(page = index + 1, error = %err, "page failed");
    }
    let calls = handler.take_calls();
    debug!(page = index + 1, calls = calls.len(), "page interpreted");
    PageReport {
        page: index + 1,
        width,
        height,
        rotate: page.rotate,
        counts: Counts::tally(&calls),
        calls: with_calls.then(|| calls.iter().map(ToString::to_string).collect()),
        error: result.err().map(|e| e.to_string()),
    }
}

fn write_text<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "{}: {} pages", report.file, report.page_count)?;
    for page in &report.pages {
        writeln!(
            out,
            "page {} ({}x{}, rotate {})",
            page.page, page.width, page.height, page.rotate
        )?;
        for call in page.calls.iter().flatten() {
            writeln!(out, "  {call}")?;
        }
        let c = &page.counts;
        writeln!(
            out,
            "  fills={} strokes={} clips={} images={} text={} marked={}",
            c.fills, c.strokes, c.clips, c.images, c.text_runs, c.marked_content
        )?;
        if let Some(err) = &page.error {
            writeln!(out, "  error: {err}")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let doc = PDFDocument::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let page_count = doc.page_count();
    let selected: Vec<usize> = if args.pages.is_empty() {
        (0..page_count).collect()
    } else {
        let mut pages = Vec::with_capacity(args.pages.len());
        for &n in &args.pages {
            if n == 0 || n > page_count {
                bail!("page {n} out of range (document has {page_count})");
            }
            pages.push(n - 1);
        }
        pages
    };
    info!(pages = selected.len(), file = %args.file.display(), "interpreting");

    let factories = Factories::default();
    let resources = ResourceManager::new();
    let options = InterpreterOptions::default().with_max_nesting_depth(args.max_depth);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build()
        .context("building worker pool")?;
    let with_calls = !args.summary;
    let mut pages: Vec<PageReport> = pool.install(|| {
        selected
            .par_iter()
            .map(|&index| walk_page(&doc, &factories, &resources, &options, index, with_calls))
            .collect()
    });
    pages.sort_by_key(|p| p.page);

    let report = Report {
        file: args.file.display().to_string(),
        page_count,
        encrypted: doc.is_encrypted(),
        cached_fonts: resources.font_count(),
        cached_images: resources.image_count(),
        pages,
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.text {
        write_text(&mut out, &report)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-page document whose page draws `content`.
    fn one_page_pdf(content: &str) -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 50] /Contents 4 0 R >>".to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        ];
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{body}\nendobj\n", i + 1).into_bytes());
        }
        let xref = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
        for offset in offsets {
            out.extend(format!("{offset:010} 00000 n \n").into_bytes());
        }
        out.extend(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .into_bytes(),
        );
        out
    }

    fn walk(doc: &PDFDocument, index: usize) -> PageReport {
        walk_page(
            doc,
            &Factories::default(),
            &ResourceManager::new(),
            &InterpreterOptions::default(),
            index,
            true,
        )
    }

    #[test]
    fn test_page_report_counts_calls() {
        let doc = PDFDocument::new(one_page_pdf("0 0 10 10 re f")).unwrap();
        let report = walk(&doc, 0);
        assert_eq!((report.width, report.height), (100.0, 50.0));
        assert_eq!(report.counts.fills, 1);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_interpretation_error_is_reported() {
        let doc = PDFDocument::new(one_page_pdf("0 0 10 10 re f Q")).unwrap();
        let report = walk(&doc, 0);
        assert_eq!(report.counts.fills, 1);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_unloadable_page_is_reported_not_fatal() {
        let doc = PDFDocument::new(one_page_pdf("")).unwrap();
        let reports: Vec<PageReport> = [0, 1].iter().map(|&i| walk(&doc, i)).collect();
        assert!(reports[0].error.is_none());
        let error = reports[1].error.as_deref().unwrap();
        assert!(error.starts_with("loading page 2"));
        assert!(reports[1].calls.is_none());
    }
}
