//! In-memory PDF fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

/// Writes a PDF with a classic xref table from numbered object bodies.
#[derive(Default)]
pub struct PdfBuilder {
    objects: BTreeMap<u32, Vec<u8>>,
    trailer: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, id: u32, body: &str) -> Self {
        self.objects.insert(id, body.as_bytes().to_vec());
        self
    }

    /// Adds a stream object; `/Length` is filled in.
    pub fn stream(mut self, id: u32, dict: &str, data: &[u8]) -> Self {
        self.objects.insert(id, stream_body(dict, data));
        self
    }

    /// Extra trailer entries, e.g. `/Info 9 0 R`.
    pub fn trailer(mut self, entries: &str) -> Self {
        self.trailer = entries.to_string();
        self
    }

    /// Serialises the file with `/Root` pointing at `root`.
    pub fn build(&self, root: u32) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec();
        let offsets = write_objects(&mut out, &self.objects);
        let size = self.objects.keys().max().map_or(1, |id| id + 1);
        let xref = out.len();
        out.extend(format!("xref\n0 {size}\n").as_bytes());
        for id in 0..size {
            match offsets.get(&id) {
                Some(offset) => out.extend(format!("{offset:010} 00000 n\r\n").as_bytes()),
                None if id == 0 => out.extend(b"0000000000 65535 f\r\n"),
                None => out.extend(b"0000000000 00001 f\r\n"),
            }
        }
        out.extend(
            format!(
                "trailer\n<< /Size {size} /Root {root} 0 R {} >>\nstartxref\n{xref}\n%%EOF\n",
                self.trailer
            )
            .as_bytes(),
        );
        out
    }
}

pub fn stream_body(dict: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< {dict} /Length {} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

fn write_objects(out: &mut Vec<u8>, objects: &BTreeMap<u32, Vec<u8>>) -> BTreeMap<u32, usize> {
    let mut offsets = BTreeMap::new();
    for (id, body) in objects {
        offsets.insert(*id, out.len());
        out.extend(format!("{id} 0 obj\n").as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    offsets
}

/// Writes a PDF 1.5 file whose cross-reference data is a stream. `packed`
/// objects go into one object stream numbered after every other object;
/// the xref stream follows it.
pub fn compressed_pdf(plain: &[(u32, &str)], packed: &[(u32, &str)], root: u32) -> Vec<u8> {
    let stm_id = plain
        .iter()
        .chain(packed)
        .map(|(id, _)| *id)
        .max()
        .unwrap_or(0)
        + 1;
    let xref_id = stm_id + 1;

    let mut header = String::new();
    let mut body = Vec::new();
    for (id, obj) in packed {
        header.push_str(&format!("{id} {} ", body.len()));
        body.extend_from_slice(obj.as_bytes());
        body.push(b'\n');
    }
    let mut data = header.clone().into_bytes();
    data.extend(body);

    let mut objects: BTreeMap<u32, Vec<u8>> = plain
        .iter()
        .map(|(id, body)| (*id, body.as_bytes().to_vec()))
        .collect();
    objects.insert(
        stm_id,
        stream_body(
            &format!("/Type /ObjStm /N {} /First {}", packed.len(), header.len()),
            &data,
        ),
    );

    let mut out = b"%PDF-1.5\n".to_vec();
    let offsets = write_objects(&mut out, &objects);
    let xref = out.len();
    let size = xref_id + 1;
    let mut rows = Vec::new();
    for id in 0..size {
        let (kind, f1, f2): (u8, u32, u16) = if id == xref_id {
            (1, xref as u32, 0)
        } else if let Some(offset) = offsets.get(&id) {
            (1, *offset as u32, 0)
        } else if let Some(index) = packed.iter().position(|(p, _)| *p == id) {
            (2, stm_id, index as u16)
        } else if id == 0 {
            (0, 0, 65535)
        } else {
            (0, 0, 1)
        };
        rows.push(kind);
        rows.extend(f1.to_be_bytes());
        rows.extend(f2.to_be_bytes());
    }
    out.extend(format!("{xref_id} 0 obj\n").as_bytes());
    out.extend(stream_body(
        &format!("/Type /XRef /Size {size} /W [1 4 2] /Root {root} 0 R"),
        &rows,
    ));
    out.extend(format!("\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes());
    out
}

/// Appends an incremental update replacing or adding `objects`. Each
/// object gets its own one-entry subsection.
pub fn append_update(mut base: Vec<u8>, objects: &[(u32, &str)], root: u32) -> Vec<u8> {
    let prev = last_startxref(&base);
    let map: BTreeMap<u32, Vec<u8>> = objects
        .iter()
        .map(|(id, body)| (*id, body.as_bytes().to_vec()))
        .collect();
    let offsets = write_objects(&mut base, &map);
    let size = map.keys().max().map_or(1, |id| id + 1);
    let xref = base.len();
    base.extend(b"xref\n");
    for (id, offset) in &offsets {
        base.extend(format!("{id} 1\n{offset:010} 00000 n\r\n").as_bytes());
    }
    base.extend(
        format!(
            "trailer\n<< /Size {size} /Root {root} 0 R /Prev {prev} >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .as_bytes(),
    );
    base
}

fn last_startxref(data: &[u8]) -> usize {
    let text = String::from_utf8_lossy(data);
    let at = text.rfind("startxref").expect("startxref");
    text[at + "startxref".len()..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .expect("startxref offset")
}

/// A one-page document: catalog 1, pages 2, page 3 with a 200 x 100
/// media box, content 4. Further objects start at 5.
pub fn page_builder(content: &[u8], resources: &str) -> PdfBuilder {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Resources {resources} /Contents 4 0 R >>"
            ),
        )
        .stream(4, "", content)
}

pub fn single_page(content: &[u8], resources: &str) -> Vec<u8> {
    page_builder(content, resources).build(1)
}
