//! Export of fetched entries to CSV and XLSX files.
//!
//! CSV is written UTF-8 with a byte-order mark so spreadsheet applications
//! pick the right encoding. XLSX is a minimal SpreadsheetML package: one sheet
//! named `entries`, inline strings, the id as a number.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::db::{Entry, EntryField, TIMESTAMP_FORMAT};

/// Header row shared by both formats.
pub const COLUMNS: [&str; 10] = [
    "id",
    "date",
    "customer",
    "project",
    "contact",
    "summary",
    "actions",
    "next_steps",
    "tags",
    "created_at",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX packaging error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// File name used when the caller gives no output path.
    pub fn default_file_name(self) -> String {
        format!("export.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("Unsupported export format '{}' (use csv or xlsx)", other)),
        }
    }
}

/// Cell values of one entry in [`COLUMNS`] order.
fn row_values(entry: &Entry) -> [String; 10] {
    [
        entry.id.to_string(),
        entry.field(EntryField::Date),
        entry.field(EntryField::Customer),
        entry.field(EntryField::Project),
        entry.field(EntryField::Contact),
        entry.field(EntryField::Summary),
        entry.field(EntryField::Actions),
        entry.field(EntryField::NextSteps),
        entry.field(EntryField::Tags),
        entry.created_at.format(TIMESTAMP_FORMAT).to_string(),
    ]
}

/// Write entries as CSV, prefixed with a UTF-8 BOM.
pub fn write_csv<W: Write>(entries: &[Entry], mut out: W) -> Result<(), ExportError> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(COLUMNS)?;
    for entry in entries {
        writer.write_record(row_values(entry))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write entries to `path` in the requested format.
pub fn export_to_path(entries: &[Entry], format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(entries, BufWriter::new(File::create(path)?))?,
        ExportFormat::Xlsx => write_xlsx(entries, BufWriter::new(File::create(path)?))?,
    }
    log::info!("Exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="entries" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Write entries as a single-sheet XLSX workbook.
pub fn write_xlsx<W: Write + std::io::Seek>(entries: &[Entry], out: W) -> Result<(), ExportError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(out);

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(sheet_xml(entries).as_bytes())?;
    zip.finish()?.flush()?;
    Ok(())
}

fn sheet_xml(entries: &[Entry]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    push_row(&mut xml, 1, COLUMNS.iter().map(|c| Cell::Text(*c)));
    for (i, entry) in entries.iter().enumerate() {
        let values = row_values(entry);
        let cells = values.iter().enumerate().map(|(col, value)| {
            if col == 0 {
                Cell::Number(value)
            } else {
                Cell::Text(value)
            }
        });
        push_row(&mut xml, i + 2, cells);
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

enum Cell<'a> {
    Text(&'a str),
    Number(&'a str),
}

fn push_row<'a>(xml: &mut String, row: usize, cells: impl Iterator<Item = Cell<'a>>) {
    xml.push_str(&format!(r#"<row r="{row}">"#));
    for (col, cell) in cells.enumerate() {
        let reference = format!("{}{}", column_letters(col), row);
        match cell {
            Cell::Number(value) => {
                xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            }
            Cell::Text(value) => {
                let stripped = strip_invalid_xml_chars(value);
                let text = quick_xml::escape::escape(stripped.as_str());
                xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{text}</t></is></c>"#
                ));
            }
        }
    }
    xml.push_str("</row>");
}

/// Spreadsheet column name for a zero-based index: 0 → A, 25 → Z, 26 → AA.
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// XML 1.0 forbids most control characters, even escaped.
fn strip_invalid_xml_chars(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}
