//! Workbook fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;

/// A cell written into a fixture worksheet.
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn column_letter(idx: usize) -> String {
    let mut n = idx + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build a single-sheet `.xlsx` with `headers` in row 1 and `rows` below,
/// using inline strings.
pub fn workbook(headers: &[&str], rows: &[Vec<Cell<'_>>]) -> Vec<u8> {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );

    let header_cells: Vec<Cell<'_>> = headers.iter().map(|h| Cell::Text(h)).collect();
    for (r, row) in std::iter::once(&header_cells).chain(rows.iter()).enumerate() {
        xml.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Text(s) => xml.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    reference,
                    escape(s)
                )),
                Cell::Number(n) => {
                    xml.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, n))
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// The two-product fixture: `A1 Foo 10` and `A2 Bar 20`.
pub fn foo_bar() -> Vec<u8> {
    workbook(
        &["code", "title", "price"],
        &[
            vec![Cell::Text("A1"), Cell::Text("Foo"), Cell::Number(10.0)],
            vec![Cell::Text("A2"), Cell::Text("Bar"), Cell::Number(20.0)],
        ],
    )
}
