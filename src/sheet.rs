//! Spreadsheet (OOXML `.xlsx`) parsing.
//!
//! Reads the first worksheet (in tab order) of a workbook into a header row plus data
//! rows of [`CellValue`]s. Cells are placed by their `r` reference so
//! sparse rows keep their columns. Shared strings, inline strings,
//! formula strings, numbers, and booleans are supported; error cells read
//! as null.

use std::io::Read;

use chrono::{Duration, NaiveDate};
use quick_xml::events::{BytesStart, Event};

use crate::error::CatalogError;
use crate::models::CellValue;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 200 * 1024 * 1024;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";

/// A parsed worksheet: the first non-empty row becomes the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` wide. Fully empty rows are dropped.
    pub rows: Vec<Vec<CellValue>>,
}

type ZipReader<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn parse_err(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Parse(e.to_string())
}

/// Parse an `.xlsx` workbook.
pub fn parse_xlsx(bytes: &[u8]) -> Result<Sheet, CatalogError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| CatalogError::Parse(format!("not an xlsx workbook: {}", e)))?;

    let shared_strings = if archive.file_names().any(|n| n == SHARED_STRINGS) {
        read_shared_strings(&mut archive)?
    } else {
        Vec::new()
    };

    let first_sheet =
        first_worksheet(&mut archive)?.ok_or_else(|| parse_err("workbook has no worksheets"))?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &first_sheet, MAX_XML_ENTRY_BYTES)?;
    let grid = read_sheet_cells(&sheet_xml, &shared_strings)?;
    build_sheet(grid)
}

fn read_zip_entry_bounded(
    archive: &mut ZipReader<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, CatalogError> {
    let entry = archive.by_name(name).map_err(parse_err)?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(parse_err)?;
    if out.len() as u64 >= max_bytes {
        return Err(CatalogError::Parse(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Read `xl/sharedStrings.xml`. Rich-text entries (`<si><r><t>..</t></r>..</si>`)
/// are concatenated; phonetic runs (`<rPh>`) are skipped.
fn read_shared_strings(archive: &mut ZipReader<'_>) -> Result<Vec<String>, CatalogError> {
    let xml = read_zip_entry_bounded(archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(parse_err)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn has_entry(archive: &ZipReader<'_>, name: &str) -> bool {
    archive.file_names().any(|n| n == name)
}

/// Part name of the first worksheet in tab order.
///
/// Tab order comes from `<sheets>` in `xl/workbook.xml`, resolved through
/// the workbook relationships. Part names are not renumbered when tabs
/// move, so the lowest `sheetN.xml` is only used when those parts are
/// missing.
fn first_worksheet(archive: &mut ZipReader<'_>) -> Result<Option<String>, CatalogError> {
    if let Some(part) = first_sheet_in_tab_order(archive)? {
        return Ok(Some(part));
    }
    Ok(list_worksheet_names(archive).into_iter().next())
}

fn first_sheet_in_tab_order(archive: &mut ZipReader<'_>) -> Result<Option<String>, CatalogError> {
    if !has_entry(archive, WORKBOOK) || !has_entry(archive, WORKBOOK_RELS) {
        return Ok(None);
    }

    let workbook = read_zip_entry_bounded(archive, WORKBOOK, MAX_XML_ENTRY_BYTES)?;
    let rel_id = match first_sheet_rel_id(&workbook)? {
        Some(id) => id,
        None => return Ok(None),
    };

    let rels = read_zip_entry_bounded(archive, WORKBOOK_RELS, MAX_XML_ENTRY_BYTES)?;
    let target = match relationship_target(&rels, &rel_id)? {
        Some(target) => target,
        None => return Ok(None),
    };

    let part = resolve_part(&target);
    Ok(has_entry(archive, &part).then_some(part))
}

/// The `r:id` of the first `<sheet>` element in the workbook.
fn first_sheet_rel_id(xml: &[u8]) -> Result<Option<String>, CatalogError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(parse_err)?;
                    if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                        return Ok(Some(attr.unescape_value().map_err(parse_err)?.into_owned()));
                    }
                }
                return Ok(None);
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(parse_err(e)),
            _ => {}
        }
        buf.clear();
    }
}

/// `Target` of the relationship with the given `Id`.
fn relationship_target(xml: &[u8], rel_id: &str) -> Result<Option<String>, CatalogError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(parse_err)?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value().map_err(parse_err)?.into_owned()),
                        b"Target" => {
                            target = Some(attr.unescape_value().map_err(parse_err)?.into_owned())
                        }
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rel_id) {
                    return Ok(target);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(parse_err(e)),
            _ => {}
        }
        buf.clear();
    }
}

/// Relationship targets are relative to `xl/` unless rooted.
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn list_worksheet_names(archive: &ZipReader<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Cells of one row, as (zero-based column, value).
type RawRow = Vec<(usize, CellValue)>;

/// In-progress `<c>` element.
struct PendingCell {
    col: usize,
    kind: Option<String>,
    raw: String,
}

fn read_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<Vec<RawRow>, CatalogError> {
    let mut rows: Vec<RawRow> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let next_col = next_column(&rows);
                    cell = Some(start_cell(&e, next_col)?);
                }
                b"rPh" => in_phonetic = true,
                b"v" | b"t" if cell.is_some() && !in_phonetic => in_value = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"row" {
                    rows.push(Vec::new());
                }
            }
            Ok(Event::Text(te)) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.raw.push_str(&te.unescape().map_err(parse_err)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let value = finish_cell(&c, shared_strings)?;
                        match rows.last_mut() {
                            Some(row) => row.push((c.col, value)),
                            None => return Err(parse_err("cell outside of a row")),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn next_column(rows: &[RawRow]) -> usize {
    rows.last()
        .and_then(|r| r.last())
        .map(|(col, _)| col + 1)
        .unwrap_or(0)
}

fn start_cell(e: &BytesStart<'_>, fallback_col: usize) -> Result<PendingCell, CatalogError> {
    let mut col = fallback_col;
    let mut kind = None;
    for attr in e.attributes() {
        let attr = attr.map_err(parse_err)?;
        match attr.key.as_ref() {
            b"r" => {
                let reference = String::from_utf8_lossy(&attr.value).into_owned();
                col = column_index(&reference)
                    .ok_or_else(|| CatalogError::Parse(format!("bad cell reference: {}", reference)))?;
            }
            b"t" => kind = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            _ => {}
        }
    }
    Ok(PendingCell {
        col,
        kind,
        raw: String::new(),
    })
}

fn finish_cell(cell: &PendingCell, shared_strings: &[String]) -> Result<CellValue, CatalogError> {
    let raw = cell.raw.as_str();
    let value = match cell.kind.as_deref() {
        Some("s") => {
            if raw.trim().is_empty() {
                return Ok(CellValue::Null);
            }
            let idx: usize = raw
                .trim()
                .parse()
                .map_err(|_| CatalogError::Parse(format!("bad shared string index: {}", raw)))?;
            let s = shared_strings
                .get(idx)
                .ok_or_else(|| CatalogError::Parse(format!("shared string {} out of range", idx)))?;
            CellValue::text(s.clone())
        }
        Some("inlineStr") | Some("str") => CellValue::text(raw),
        Some("b") => match raw.trim() {
            "1" => CellValue::Number(1.0),
            "0" => CellValue::Number(0.0),
            _ => CellValue::Null,
        },
        Some("e") => CellValue::Null,
        _ => match raw.trim() {
            "" => CellValue::Null,
            t => t
                .parse::<f64>()
                .map(CellValue::Number)
                .unwrap_or_else(|_| CellValue::text(raw)),
        },
    };
    Ok(value)
}

/// Zero-based column index of a cell reference such as `AB12`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let n = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    Some(n - 1)
}

fn build_sheet(grid: Vec<RawRow>) -> Result<Sheet, CatalogError> {
    let mut rows = grid
        .into_iter()
        .filter(|r| r.iter().any(|(_, v)| !v.is_null()));

    let header_row = match rows.next() {
        Some(r) => r,
        None => return Ok(Sheet::default()),
    };
    let data: Vec<RawRow> = rows.collect();

    let width = header_row
        .iter()
        .chain(data.iter().flatten())
        .map(|(col, _)| col + 1)
        .max()
        .unwrap_or(0);

    let mut headers = vec![String::new(); width];
    for (col, value) in header_row {
        headers[col] = value.as_text().map(|s| s.trim().to_string()).unwrap_or_default();
    }

    let rows: Vec<Vec<CellValue>> = data
        .into_iter()
        .map(|raw| {
            let mut row = vec![CellValue::Null; width];
            for (col, value) in raw {
                row[col] = value;
            }
            row
        })
        .collect();

    for (col, header) in headers.iter().enumerate() {
        if header.is_empty() && rows.iter().any(|r| !r[col].is_null()) {
            return Err(CatalogError::Parse(format!(
                "column {} holds data but has no header",
                col + 1
            )));
        }
    }

    Ok(Sheet { headers, rows })
}

/// Convert a spreadsheet serial date (days since 1899-12-30, 1900 date
/// system) to `YYYY-MM-DD HH:MM:SS`.
pub fn serial_to_datetime(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = base.checked_add_signed(Duration::milliseconds(millis))?;
    Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
