//! Reads one worksheet of an Office Open XML workbook (.xlsx, .xlsm) into a [`Sheet`].
use crate::error::ResultMessage;
use crate::error::SheetRowsError;
use crate::helpers::reader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::CellGrid;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fmt::Display;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

// XML local names used by the workbook parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts";
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";
const TAG_FORMAT_INDEX: &[u8] = b"xf";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

const PATH_WORKBOOK: &str = "xl/workbook.xml";
const PATH_RELATIONSHIPS: &str = "xl/_rels/workbook.xml.rels";
const PATH_SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const PATH_STYLES: &str = "xl/styles.xml";

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Workbook part '{0}' is missing")]
    MissingPartError(String),

    #[error("Workbook contains no worksheets")]
    EmptyWorkbookError,

    #[error("Worksheet {0} not found")]
    SheetNotFoundError(String),

    #[error("Invalid cell value '{value}' at {reference}")]
    CellValueError { reference: String, value: String },
}

/// Chooses which worksheet of a workbook to read.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SheetSelector {
    /// The first worksheet in workbook order
    #[default]
    First,
    /// Zero-based position in workbook order
    Index(usize),
    /// Exact worksheet name
    Name(String),
}

impl Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::First => write!(f, "#0"),
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Type of a `<c>` element as given by its `t` attribute
#[derive(Copy, Clone, Debug, Default, PartialEq)]
enum CellKind {
    #[default]
    Number,
    SharedString,
    InlineString,
    Boolean,
    IsoDateTime,
    Error,
}

impl CellKind {
    fn parse(t: Option<&str>) -> Self {
        match t {
            Some("s") => Self::SharedString,
            Some("inlineStr") | Some("str") => Self::InlineString,
            Some("b") => Self::Boolean,
            Some("d") => Self::IsoDateTime,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// Opens a workbook at a local path or `file://` URL and reads one worksheet.
pub fn open_worksheet(location: &str, selector: &SheetSelector) -> Result<Sheet, SheetRowsError> {
    let reader = reader::open(location)?;
    read_worksheet(reader, selector).with_prefix(location)
}

/// Reads one worksheet from workbook bytes.
pub fn read_worksheet<RS: Read + Seek>(reader: RS, selector: &SheetSelector) -> Result<Sheet, SheetRowsError> {
    let mut zip = ZipArchive::new(reader)?;
    let sheets = load_workbook(&mut zip)?;
    let is_1904 = sheets.is_1904;
    let (name, path) = select_sheet(sheets.entries, selector)?;
    debug!(sheet = %name, path = %path, "selected worksheet");

    let number_formats = load_number_formats(&mut zip).with_prefix(PATH_STYLES)?;
    let shared_strings = load_shared_strings(&mut zip).with_prefix(PATH_SHARED_STRINGS)?;
    let sheet = load_cells(&mut zip, &name, &path, &number_formats, &shared_strings, is_1904)
        .with_prefix(&path)?;
    debug!(
        sheet = %name,
        cells = sheet.len(),
        rows = sheet.highest_row(),
        columns = sheet.highest_column(),
        "loaded worksheet"
    );
    Ok(sheet)
}

/// Worksheets in workbook order plus the date system flag
struct WorkbookSheets {
    /// (name, zip path) pairs
    entries: Vec<(String, String)>,
    is_1904: bool,
}

fn select_sheet(entries: Vec<(String, String)>, selector: &SheetSelector) -> Result<(String, String), WorkbookError> {
    if entries.is_empty() {
        return Err(WorkbookError::EmptyWorkbookError);
    }
    let found = match selector {
        SheetSelector::First => entries.into_iter().next(),
        SheetSelector::Index(index) => entries.into_iter().nth(*index),
        SheetSelector::Name(name) => entries.into_iter().find(|(sheet_name, _)| sheet_name == name),
    };
    found.ok_or_else(|| WorkbookError::SheetNotFoundError(selector.to_string()))
}

/// Maps relationship IDs to worksheet paths inside the archive.
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<HashMap<String, String>, SheetRowsError> {
    let mut reader = zip
        .xml_reader(PATH_RELATIONSHIPS)?
        .ok_or_else(|| WorkbookError::MissingPartError(PATH_RELATIONSHIPS.to_owned()))?;
    let mut relationships = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id, to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<WorkbookSheets, SheetRowsError> {
    let relationships = load_relationships(zip)?;
    let mut reader = zip
        .xml_reader(PATH_WORKBOOK)?
        .ok_or_else(|| WorkbookError::MissingPartError(PATH_WORKBOOK.to_owned()))?;
    let mut entries = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_attribute_value("id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    entries.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok(WorkbookSheets { entries, is_1904 })
}

/// Number formats indexed by cell style (`s` attribute).
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<NumberFormat>, SheetRowsError> {
    let mut reader = match zip.xml_reader(PATH_STYLES)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberFormat>::new();
    let mut format_indexes_context = false;
    let mut format_ids = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let code = event.get_attribute_value("formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id, NumberFormat::parse_custom(&code));
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            format_ids.push(event.get_attribute_value("numFmtId")?.unwrap_or_default());
        }
    });

    Ok(format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::parse_builtin_id(id))
                .unwrap_or_default()
        })
        .collect())
}

fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, SheetRowsError> {
    let mut shared_strings = Vec::new();
    let mut reader = match zip.xml_reader(PATH_SHARED_STRINGS)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

fn load_cells<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    name: &str,
    path: &str,
    number_formats: &[NumberFormat],
    shared_strings: &[String],
    is_1904: bool,
) -> Result<Sheet, SheetRowsError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| WorkbookError::MissingPartError(path.to_owned()))?;
    let mut sheet = Sheet::new(name);
    // Positions used when `r` attributes are omitted
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellKind::default();
    let mut format = NumberFormat::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
            if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                row_count = number.saturating_sub(1);
            }
            col_count = 0;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_ROW => row_count += 1,
        Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
            (row, col) = event
                .get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            kind = CellKind::parse(event.get_attribute_value("t")?.as_deref());
            format = event
                .parse_attribute_value::<usize>("s")?
                .and_then(|index| number_formats.get(index).copied())
                .unwrap_or_default();
            value.clear();
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
            if !value.is_empty() {
                let cell = to_cell_value(kind, format, &value, shared_strings, is_1904)
                    .ok_or_else(|| WorkbookError::CellValueError {
                        reference: index_to_reference(row, col),
                        value: value.to_owned(),
                    })?;
                sheet.set(row, col, cell);
            }
            value.clear();
        }
    });
    Ok(sheet)
}

fn to_cell_value(
    kind: CellKind,
    format: NumberFormat,
    raw: &str,
    shared_strings: &[String],
    is_1904: bool,
) -> Option<CellValue> {
    match kind {
        CellKind::SharedString => raw
            .parse::<usize>()
            .ok()
            .and_then(|index| shared_strings.get(index))
            .map(|value| CellValue::String(value.to_owned())),
        CellKind::InlineString => Some(CellValue::String(raw.to_owned())),
        CellKind::Boolean => Some(CellValue::Bool(raw == "1" || raw.eq_ignore_ascii_case("true"))),
        CellKind::Error => Some(CellValue::Error(raw.to_owned())),
        CellKind::IsoDateTime => parse_iso_datetime(raw),
        CellKind::Number => format.to_value(raw.parse::<f64>().ok()?, is_1904),
    }
}

fn parse_iso_datetime(raw: &str) -> Option<CellValue> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Some(CellValue::DateTime(datetime))
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Some(CellValue::Date(date))
    } else {
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f").ok().map(CellValue::Time)
    }
}

/// Normalizes a relationship target to an archive path under `xl/`.
fn to_zip_path(target: &str) -> String {
    if let Some(path) = target.strip_prefix('/') {
        path.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Collects the text of a string item up to `end_tag`.
/// Phonetic runs are skipped; `<v>` holds text directly, other items wrap it in `<t>`.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, SheetRowsError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
