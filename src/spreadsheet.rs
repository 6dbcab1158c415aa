//! Reading challenge rows out of an `.xlsx` workbook.
//!
//! An xlsx file is a ZIP archive of SpreadsheetML parts. Only the first
//! worksheet (in workbook order) is read; its first row is the header.
//! Each data row becomes a [`RowRecord`] whose text lists every column as
//! `"col: value"` joined by `" | "`.
//!
//! Numeric cells styled with a date format are rendered as
//! `YYYY-MM-DD HH:MM:SS`; error cells (`#N/A`, `#REF!`, ...) become empty.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::SourceConfig;
use crate::error::SpreadsheetError;
use crate::models::{RowMetadata, RowRecord};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const NO_TITLE: &str = "No title";
const NO_URL: &str = "No URL";

/// Day zero of the 1900 date system, accounting for Excel's phantom 1900-02-29.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const DATE_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

/// Header plus data rows of one worksheet. Every row has `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read the first worksheet of the workbook at `path`.
pub fn read_workbook(path: &Path) -> Result<Table, SpreadsheetError> {
    let bytes = std::fs::read(path).map_err(|source| SpreadsheetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_workbook_bytes(&bytes)
}

pub fn read_workbook_bytes(bytes: &[u8]) -> Result<Table, SpreadsheetError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Archive(e.to_string()))?;
    let shared_strings = match read_optional_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let date_styles = match read_optional_entry(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_date_styles(&xml)?,
        None => Vec::new(),
    };
    let sheet_name = first_worksheet_name(&mut archive)?;
    let sheet_xml = read_optional_entry(&mut archive, &sheet_name)?
        .ok_or(SpreadsheetError::NoWorksheet)?;
    let grid = parse_sheet(&sheet_xml, &shared_strings, &date_styles)?;
    Ok(into_table(grid))
}

/// Flatten table rows into records carrying title/url/source metadata.
pub fn row_records(table: &Table, source: &SourceConfig) -> Vec<RowRecord> {
    let title_col = table.column(&source.title_column);
    let url_col = table.column(&source.url_column);
    let label = source.source_label();

    table
        .rows
        .iter()
        .map(|row| {
            let text = table
                .headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| format!("{}: {}", h, v))
                .collect::<Vec<_>>()
                .join(" | ");
            let pick = |col: Option<usize>, fallback: &str| match col {
                Some(i) => row[i].clone(),
                None => fallback.to_string(),
            };
            RowRecord {
                text,
                metadata: RowMetadata {
                    title: pick(title_col, NO_TITLE),
                    url: pick(url_col, NO_URL),
                    source: label.clone(),
                },
            }
        })
        .collect()
}

fn into_table(mut grid: Vec<Vec<String>>) -> Table {
    grid.retain(|row| row.iter().any(|c| !c.is_empty()));
    if grid.is_empty() {
        return Table::default();
    }
    let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    let header_row = grid.remove(0);
    let headers = (0..width)
        .map(|i| match header_row.get(i) {
            Some(h) if !h.is_empty() => h.clone(),
            _ => format!("Unnamed: {}", i),
        })
        .collect();
    let rows = grid
        .into_iter()
        .map(|mut r| {
            r.resize(width, String::new());
            r
        })
        .collect();
    Table { headers, rows }
}

fn read_optional_entry(
    archive: &mut Archive<'_>,
    name: &str,
) -> Result<Option<Vec<u8>>, SpreadsheetError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(SpreadsheetError::Archive(e.to_string())),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| SpreadsheetError::Archive(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(SpreadsheetError::Archive(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(Some(out))
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == key {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Part name of the first sheet listed in `xl/workbook.xml`.
///
/// Falls back to the lowest numbered `xl/worksheets/sheetN.xml` when the
/// workbook relationships cannot be resolved.
fn first_worksheet_name(archive: &mut Archive<'_>) -> Result<String, SpreadsheetError> {
    if let Some(name) = resolve_first_sheet(archive)? {
        if archive.file_names().any(|n| n == name) {
            return Ok(name);
        }
    }
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
    names.into_iter().next().ok_or(SpreadsheetError::NoWorksheet)
}

fn resolve_first_sheet(archive: &mut Archive<'_>) -> Result<Option<String>, SpreadsheetError> {
    let Some(workbook) = read_optional_entry(archive, "xl/workbook.xml")? else {
        return Ok(None);
    };
    let Some(rels) = read_optional_entry(archive, "xl/_rels/workbook.xml.rels")? else {
        return Ok(None);
    };

    let mut first_rid = None;
    for_each_start(&workbook, |e| {
        if first_rid.is_none() && e.local_name().as_ref() == b"sheet" {
            first_rid = attr(e, b"id");
        }
    })?;
    let Some(rid) = first_rid else {
        return Ok(None);
    };

    let mut targets = HashMap::new();
    for_each_start(&rels, |e| {
        if e.local_name().as_ref() == b"Relationship" {
            if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                targets.insert(id, target);
            }
        }
    })?;

    Ok(targets.remove(&rid).map(|target| {
        match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        }
    }))
}

fn for_each_start(
    xml: &[u8],
    mut f: impl FnMut(&BytesStart<'_>),
) -> Result<(), SpreadsheetError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => f(&e),
            Ok(Event::Eof) => break,
            Err(e) => return Err(SpreadsheetError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Each `<si>` is one string; rich-text runs inside it are concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, SpreadsheetError> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    // Phonetic hints (<rPh>) carry their own <t> elements that are not cell text.
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_t = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SpreadsheetError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Built-in number formats that display a date or time.
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Whether a custom format code displays a date, ignoring quoted literals
/// and bracketed sections such as `[Red]` or `[$-409]`.
fn is_date_format_code(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut prev_escape = false;
    for ch in code.chars() {
        if prev_escape {
            prev_escape = false;
            continue;
        }
        match ch {
            '\\' => prev_escape = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            c if !in_quotes && !in_brackets => {
                if matches!(c.to_ascii_lowercase(), 'd' | 'm' | 'y') {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// For each `cellXfs` entry (the `s` attribute of a cell), whether it
/// applies a date format.
fn parse_date_styles(xml: &[u8]) -> Result<Vec<bool>, SpreadsheetError> {
    let mut custom: HashMap<u32, bool> = HashMap::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) = (attr(&e, b"numFmtId"), attr(&e, b"formatCode")) {
                        if let Ok(id) = id.parse::<u32>() {
                            custom.insert(id, is_date_format_code(&code));
                        }
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attr(&e, b"numFmtId")
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0);
                    xf_formats.push(id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(SpreadsheetError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(xf_formats
        .into_iter()
        .map(|id| custom.get(&id).copied().unwrap_or_else(|| is_builtin_date_format(id)))
        .collect())
}

/// Render an Excel serial date (1900 date system) as `YYYY-MM-DD HH:MM:SS`.
fn excel_serial_to_datetime(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = chrono::NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let dt = epoch.checked_add_signed(chrono::Duration::try_seconds(seconds)?)?;
    Some(dt.format(DATE_DISPLAY).to_string())
}

/// Zero-based column index of a cell reference such as `"AB12"`.
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: Vec<u8> = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let n = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    Some(n - 1)
}

struct PendingCell {
    col: usize,
    kind: Option<String>,
    style: Option<usize>,
    value: String,
}

impl PendingCell {
    fn resolve(self, shared_strings: &[String], date_styles: &[bool]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i).cloned())
                .unwrap_or_default(),
            Some("b") => {
                if self.value.trim() == "1" {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Some("e") => String::new(),
            None | Some("n") if self.has_date_style(date_styles) => self
                .value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(excel_serial_to_datetime)
                .unwrap_or(self.value),
            _ => self.value,
        }
    }

    fn has_date_style(&self, date_styles: &[bool]) -> bool {
        self.style
            .and_then(|i| date_styles.get(i).copied())
            .unwrap_or(false)
    }
}

fn store_row(grid: &mut Vec<Vec<String>>, idx: usize, cells: Vec<String>) {
    if idx >= grid.len() {
        grid.resize(idx + 1, Vec::new());
    }
    grid[idx] = cells;
}

/// Cell grid of a worksheet, indexed by zero-based row then column.
fn parse_sheet(
    xml: &[u8],
    shared_strings: &[String],
    date_styles: &[bool],
) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row_idx = 0usize;
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row_idx = attr(&e, b"r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .map(|r| r.saturating_sub(1))
                        .unwrap_or(grid.len());
                    row.clear();
                }
                b"c" => {
                    let col = attr(&e, b"r")
                        .and_then(|r| column_index(&r))
                        .unwrap_or(row.len());
                    cell = Some(PendingCell {
                        col,
                        kind: attr(&e, b"t"),
                        style: attr(&e, b"s").and_then(|v| v.parse::<usize>().ok()),
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let col = c.col;
                        let value = c.resolve(shared_strings, date_styles);
                        if col >= row.len() {
                            row.resize(col + 1, String::new());
                        }
                        row[col] = value;
                    }
                }
                b"row" => {
                    store_row(&mut grid, row_idx, std::mem::take(&mut row));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SpreadsheetError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, body) in parts {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<si><t>Challenge Name</t></si>
<si><t>URL</t></si>
<si><t>Smart Logistics</t></si>
<si><r><t>Fewer </t></r><r><t>empty trucks</t></r></si>
</sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="inlineStr"><is><t>Budget</t></is></c><c r="D1" t="inlineStr"><is><t>Goal</t></is></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="C2"><v>25000</v></c><c r="D2" t="s"><v>3</v></c></row>
<row r="4"><c r="A4" t="inlineStr"><is><t>Green &amp; Clean</t></is></c><c r="B4" t="str"><f>CONCAT("x")</f><v>https://example.org/gc</v></c><c r="C4" t="b"><v>1</v></c></row>
</sheetData>
</worksheet>"#;

    fn sample_workbook() -> Vec<u8> {
        zip_parts(&[
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", SHEET),
        ])
    }

    #[test]
    fn test_reads_header_and_rows() {
        let table = read_workbook_bytes(&sample_workbook()).unwrap();
        assert_eq!(table.headers, vec!["Challenge Name", "URL", "Budget", "Goal"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            vec!["Smart Logistics", "", "25000", "Fewer empty trucks"]
        );
        assert_eq!(
            table.rows[1],
            vec!["Green & Clean", "https://example.org/gc", "TRUE", ""]
        );
    }

    #[test]
    fn test_row_records_flatten_all_columns() {
        let table = read_workbook_bytes(&sample_workbook()).unwrap();
        let records = row_records(&table, &SourceConfig::default());
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].text,
            "Challenge Name: Smart Logistics | URL:  | Budget: 25000 | Goal: Fewer empty trucks"
        );
        assert_eq!(records[0].metadata.title, "Smart Logistics");
        assert_eq!(records[0].metadata.url, "");
        assert_eq!(records[0].metadata.source, "MKB-challenge-data");
        assert_eq!(records[1].metadata.url, "https://example.org/gc");
    }

    #[test]
    fn test_missing_columns_use_fallbacks() {
        let table = Table {
            headers: vec!["Name".to_string()],
            rows: vec![vec!["Thing".to_string()]],
        };
        let records = row_records(&table, &SourceConfig::default());
        assert_eq!(records[0].metadata.title, "No title");
        assert_eq!(records[0].metadata.url, "No URL");
        assert_eq!(records[0].text, "Name: Thing");
    }

    #[test]
    fn test_first_sheet_follows_workbook_order() {
        let workbook = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="2" r:id="rId2"/><sheet name="Old" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="worksheets/sheet2.xml"/></Relationships>"#;
        let old = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Old</t></is></c></row></sheetData></worksheet>"#;
        let data = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Current</t></is></c></row></sheetData></worksheet>"#;
        let bytes = zip_parts(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", old),
            ("xl/worksheets/sheet2.xml", data),
        ]);
        let table = read_workbook_bytes(&bytes).unwrap();
        assert_eq!(table.headers, vec!["Current"]);
    }

    #[test]
    fn test_blank_header_cells_are_named() {
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="B1" t="inlineStr"><is><t>URL</t></is></c></row><row r="2"><c r="A2"><v>7</v></c><c r="B2" t="inlineStr"><is><t>u</t></is></c></row></sheetData></worksheet>"#;
        let table = read_workbook_bytes(&zip_parts(&[("xl/worksheets/sheet1.xml", sheet)])).unwrap();
        assert_eq!(table.headers, vec!["Unnamed: 0", "URL"]);
        assert_eq!(table.rows, vec![vec!["7".to_string(), "u".to_string()]]);
    }

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="2"><numFmt numFmtId="164" formatCode="dd/mm/yyyy hh:mm"/><numFmt numFmtId="165" formatCode="&quot;Week &quot;0"/></numFmts>
<cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
<cellXfs count="4"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/><xf numFmtId="164"><alignment wrapText="1"/></xf><xf numFmtId="165"/></cellXfs>
</styleSheet>"#;

    #[test]
    fn test_date_styled_cells_render_as_datetimes() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Challenge Name</t></is></c><c r="B1" t="inlineStr"><is><t>Deadline</t></is></c><c r="C1" t="inlineStr"><is><t>Kickoff</t></is></c><c r="D1" t="inlineStr"><is><t>Week</t></is></c><c r="E1" t="inlineStr"><is><t>Budget</t></is></c><c r="F1" t="inlineStr"><is><t>Score</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Smart Logistics</t></is></c><c r="B2" s="1"><v>45838</v></c><c r="C2" s="2"><v>45838.5</v></c><c r="D2" s="3"><v>12</v></c><c r="E2" s="0"><v>25000</v></c><c r="F2" t="e"><v>#N/A</v></c></row>
</sheetData></worksheet>"#;
        let bytes = zip_parts(&[
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let table = read_workbook_bytes(&bytes).unwrap();
        assert_eq!(
            table.rows[0],
            vec![
                "Smart Logistics",
                "2025-06-30 00:00:00",
                "2025-06-30 12:00:00",
                "12",
                "25000",
                ""
            ]
        );
        let records = row_records(&table, &SourceConfig::default());
        assert!(records[0].text.contains("Deadline: 2025-06-30 00:00:00"));
    }

    #[test]
    fn test_date_styles_only_count_cell_xfs() {
        assert_eq!(
            parse_date_styles(STYLES.as_bytes()).unwrap(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn test_date_format_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("[$-409]d-mmm-yy;@"));
        assert!(!is_date_format_code("[Red]0.00"));
        assert!(!is_date_format_code("\"Day \"0"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("#,##0"));
    }

    #[test]
    fn test_serial_conversion() {
        assert_eq!(
            excel_serial_to_datetime(1.0).as_deref(),
            Some("1899-12-31 00:00:00")
        );
        assert_eq!(
            excel_serial_to_datetime(45838.25).as_deref(),
            Some("2025-06-30 06:00:00")
        );
        assert_eq!(excel_serial_to_datetime(-1.0), None);
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_workbook_bytes(b"not a workbook").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Archive(_)));
    }

    #[test]
    fn test_no_worksheet() {
        let err = read_workbook_bytes(&zip_parts(&[("xl/other.xml", "<x/>")])).unwrap_err();
        assert!(matches!(err, SpreadsheetError::NoWorksheet));
    }
}
