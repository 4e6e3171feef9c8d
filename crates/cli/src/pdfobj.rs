//! pdfobj - Dump PDF objects, the trailer and cross-reference state as JSON.
//!
//! Names print as `/Name`, references as `"5 0 R"`. Strings print as text
//! when they are printable UTF-8 and as `{"hex": ...}` otherwise.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use folio_core::document::EntryState;
use folio_core::{PDFDocument, PDFObject};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// What to do with stream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum StreamData {
    /// Dictionary and lengths only
    #[default]
    None,
    /// Decoded data as text or hex
    Decoded,
    /// Undecoded file bytes as hex
    Raw,
}

#[derive(Parser, Debug)]
#[command(name = "pdfobj")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PDF file to read
    file: PathBuf,

    /// Comma-separated object numbers to dump
    #[arg(short = 'i', long = "objids", value_delimiter = ',')]
    objids: Vec<u32>,

    /// Dump every object in the cross-reference table
    #[arg(short = 'a', long = "all", action = ArgAction::SetTrue)]
    all: bool,

    /// Include the merged trailer
    #[arg(short = 'T', long = "trailer", action = ArgAction::SetTrue)]
    trailer: bool,

    /// Include the state of every cross-reference entry
    #[arg(short = 'x', long = "xref", action = ArgAction::SetTrue)]
    xref: bool,

    /// Include page attributes with inheritance applied
    #[arg(short = 'p', long = "pages", action = ArgAction::SetTrue)]
    pages: bool,

    /// Stream data to include
    #[arg(short = 's', long = "stream-data", value_enum, default_value = "none")]
    stream_data: StreamData,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Debug, Serialize)]
struct XrefRow {
    objid: u32,
    state: &'static str,
}

fn state_name(state: EntryState) -> &'static str {
    match state {
        EntryState::Unknown => "unknown",
        EntryState::Deleted => "deleted",
        EntryState::NotYetRead => "not_yet_read",
        EntryState::Read => "read",
        EntryState::Compressed => "compressed",
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn bytes_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.chars().all(|c| !c.is_control() || c.is_whitespace()) => json!(s),
        _ => json!({ "hex": hex(bytes) }),
    }
}

fn to_json(doc: &PDFDocument, obj: &PDFObject, mode: StreamData) -> Value {
    match obj {
        PDFObject::Null => Value::Null,
        PDFObject::Bool(b) => json!(b),
        PDFObject::Int(n) => json!(n),
        PDFObject::Real(n) => json!(n),
        PDFObject::Name(name) => json!(format!("/{name}")),
        PDFObject::String(s) => bytes_value(s),
        PDFObject::Array(items) => items.iter().map(|i| to_json(doc, i, mode)).collect(),
        PDFObject::Dict(dict) => dict_json(doc, dict, mode),
        PDFObject::Ref(r) => json!(format!("{} {} R", r.objid, r.genno)),
        PDFObject::Stream(stream) => {
            let mut out = Map::new();
            out.insert("dict".into(), dict_json(doc, &stream.attrs, mode));
            out.insert("raw_length".into(), json!(stream.get_rawdata().len()));
            match mode {
                StreamData::None => {}
                StreamData::Raw => {
                    out.insert("raw".into(), json!(hex(stream.get_rawdata())));
                }
                StreamData::Decoded => match doc.decode_image(stream) {
                    Ok(decoded) => {
                        out.insert("data".into(), bytes_value(&decoded.data));
                        if let Some(step) = decoded.image_filter {
                            out.insert("image_filter".into(), json!(step.filter.name()));
                        }
                    }
                    Err(err) => {
                        warn!(objid = ?stream.objid, error = %err, "stream not decoded");
                        out.insert("error".into(), json!(err.to_string()));
                    }
                },
            }
            Value::Object(out)
        }
    }
}

fn dict_json(doc: &PDFDocument, dict: &folio_core::PDFDict, mode: StreamData) -> Value {
    Value::Object(
        dict.iter()
            .map(|(k, v)| (k.clone(), to_json(doc, v, mode)))
            .collect(),
    )
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

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let doc = PDFDocument::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let mut report = Map::new();

    let objids: Vec<u32> = if args.all {
        doc.objids().collect()
    } else {
        args.objids.clone()
    };
    if !objids.is_empty() {
        let mut objects = Map::new();
        for objid in objids {
            let value = match doc.getobj(objid) {
                Ok(obj) => to_json(&doc, &obj, args.stream_data),
                Err(err) => {
                    warn!(objid, error = %err, "object not loaded");
                    json!({ "error": err.to_string() })
                }
            };
            objects.insert(objid.to_string(), value);
        }
        report.insert("objects".into(), Value::Object(objects));
    }

    if args.trailer {
        report.insert("trailer".into(), dict_json(&doc, doc.trailer(), args.stream_data));
    }

    if args.pages {
        let mut pages = Vec::with_capacity(doc.page_count());
        for (index, page) in doc.pages().enumerate() {
            let page = page.with_context(|| format!("loading page {}", index + 1))?;
            pages.push(json!({
                "page": index + 1,
                "objid": page.objid,
                "mediabox": [page.mediabox.0, page.mediabox.1, page.mediabox.2, page.mediabox.3],
                "cropbox": [page.cropbox.0, page.cropbox.1, page.cropbox.2, page.cropbox.3],
                "rotate": page.rotate,
                "attrs": dict_json(&doc, &page.attrs, StreamData::None),
            }));
        }
        report.insert("pages".into(), Value::Array(pages));
    }

    // Last, so the states reflect the loads above.
    if args.xref {
        let xref = doc.xref();
        let rows: Vec<XrefRow> = (0..xref.len() as u32)
            .map(|objid| XrefRow {
                objid,
                state: state_name(xref.state(objid)),
            })
            .collect();
        report.insert("xref".into(), serde_json::to_value(rows)?);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    serde_json::to_writer_pretty(&mut out, &Value::Object(report))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
