//! Trajectory ingest (CSV and Excel workbooks) and normalization.
//!
//! This module turns a heterogeneous tracking export into a clean
//! `TrajectorySet` that is safe to analyse.
//!
//! Design goals:
//! - **Flexible schema**: common column spellings (`Time`, `POSITION_X`,
//!   `Center_Y`, `TRACK_ID`, ...) resolve to `t`, `x`, `y`, `z`, `particle_id`
//! - **TrackMate aware**: the three descriptive header lines of TrackMate spot
//!   exports are skipped automatically
//! - **Workbooks**: one sheet per particle, the sheet name is the particle id
//! - **Row-level validation**: bad rows are skipped and reported, not fatal
//! - **Separation of concerns**: no MSD logic here

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use csv::StringRecord;

use crate::domain::{Dimension, Trajectory, TrajectoryPoint, TrajectorySet};
use crate::error::AppError;

/// Particle id used when the file has no id column.
pub const SINGLE_PARTICLE_ID: &str = "1";

const T_ALIASES: &[&str] = &["t", "time", "times", "position_t", "frame"];
const X_ALIASES: &[&str] = &["x", "position_x", "positionx", "center_x", "centerx"];
const Y_ALIASES: &[&str] = &["y", "position_y", "positiony", "center_y", "centery"];
const Z_ALIASES: &[&str] = &["z", "position_z", "positionz", "center_z", "centerz"];
// `track_id` ranks above `id`: TrackMate exports both, and its `ID` is per spot.
const ID_ALIASES: &[&str] = &["particle_id", "particleid", "track_id", "id", "pid", "particle"];

const TRACKMATE_COLUMNS: [&str; 4] = ["TRACK_ID", "POSITION_X", "POSITION_Y", "QUALITY"];
const TRACKMATE_UNIT_MARKERS: [&str; 3] = ["(pixel)", "(frame)", "(µm)"];
/// Lines after the header that hold TrackMate's long names, short names, units.
const TRACKMATE_EXTRA_HEADER_LINES: usize = 3;

/// Layout of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A single header line followed by data.
    Plain,
    /// TrackMate spot export (header + 3 descriptive lines).
    TrackMate,
    /// Excel workbook, one sheet per particle.
    Excel,
}

impl SourceFormat {
    pub fn label(self) -> &'static str {
        match self {
            SourceFormat::Plain => "CSV",
            SourceFormat::TrackMate => "TrackMate CSV",
            SourceFormat::Excel => "Excel workbook",
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: trajectories + format + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub path: Option<PathBuf>,
    pub format: SourceFormat,
    pub set: TrajectorySet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Resolved column indices for the standard fields.
#[derive(Debug, Clone, Copy)]
struct Columns {
    t: usize,
    x: usize,
    y: usize,
    z: Option<usize>,
    particle_id: Option<usize>,
}

/// Load trajectories from a file, dispatching on the extension.
pub fn load_trajectories(path: &Path) -> Result<IngestedData, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut data = match ext.as_str() {
        "csv" | "txt" => load_csv(path)?,
        "xlsx" | "xls" => load_excel(path)?,
        other => {
            return Err(AppError::input(format!(
                "Unsupported file format: '.{other}'. Use .csv, .xlsx or .xls."
            )));
        }
    };
    data.path = Some(path.to_path_buf());

    tracing::info!(
        path = %path.display(),
        format = data.format.label(),
        particles = data.set.len(),
        rows = data.rows_used,
        skipped = data.row_errors.len(),
        "loaded trajectories"
    );
    Ok(data)
}

fn load_csv(path: &Path) -> Result<IngestedData, AppError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}", path.display())))?;
    parse_trajectories(&decode_text(&bytes)).map_err(|e| e.context(path.display()))
}

/// Decode file bytes as UTF-8, falling back to Latin-1.
///
/// Tracking tools on Windows sometimes write Latin-1 (`µ` in unit lines);
/// every byte maps to the code point of the same value.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("input is not valid UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
        }
    }
}

/// Load an Excel workbook where every sheet holds one particle.
pub fn load_excel(path: &Path) -> Result<IngestedData, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::input(format!("Failed to open workbook '{}': {e}", path.display())))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| AppError::input(format!("Failed to read sheet '{name}': {e}")))?;
        let rows: Vec<StringRecord> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<StringRecord>())
            .collect();
        sheets.push((name, rows));
    }

    parse_sheets(sheets).map_err(|e| e.context(path.display()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Build trajectories from `(sheet name, rows)` pairs; the first row of each
/// sheet is its header.
///
/// The dimension comes from the first sheet and every sheet must carry its
/// columns. The sheet name is the particle id; any id column is ignored.
pub fn parse_sheets(sheets: Vec<(String, Vec<StringRecord>)>) -> Result<IngestedData, AppError> {
    let Some((first_name, first_rows)) = sheets.first() else {
        return Err(AppError::input("Workbook contains no sheets."));
    };
    let first_header = first_rows.first().cloned().unwrap_or_else(StringRecord::new);
    let first_columns =
        resolve_columns(&build_header_map(&first_header)).map_err(|e| e.context(format!("Sheet '{first_name}'")))?;
    let dimension = if first_columns.z.is_some() {
        Dimension::Three
    } else {
        Dimension::Two
    };

    let mut trajectories: Vec<Trajectory> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;

    for (name, rows) in sheets {
        let header = rows.first().cloned().unwrap_or_else(StringRecord::new);
        let mut columns =
            resolve_columns(&build_header_map(&header)).map_err(|e| e.context(format!("Sheet '{name}'")))?;
        columns.particle_id = None;
        if dimension == Dimension::Two {
            columns.z = None;
        } else if columns.z.is_none() {
            return Err(AppError::input(format!(
                "Sheet '{name}' is missing the `z` column required by a 3D workbook."
            )));
        }

        let mut points = Vec::new();
        for (idx, record) in rows.iter().enumerate().skip(1) {
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows_read += 1;
            match parse_row(record, &columns) {
                Ok((_, point)) => points.push(point),
                Err(message) => row_errors.push(RowError {
                    line: idx + 1,
                    message: format!("sheet '{name}': {message}"),
                }),
            }
        }

        if points.is_empty() {
            continue;
        }
        rows_used += points.len();
        points.sort_by(|a, b| a.t.total_cmp(&b.t));
        trajectories.push(Trajectory { id: name, points });
    }

    if rows_used == 0 {
        return Err(AppError::insufficient("No valid trajectory rows found."));
    }

    Ok(IngestedData {
        path: None,
        format: SourceFormat::Excel,
        set: TrajectorySet {
            dimension,
            trajectories,
        },
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Parse trajectory CSV text.
pub fn parse_trajectories(text: &str) -> Result<IngestedData, AppError> {
    let format = detect_format(text);
    let skipped_lines = match format {
        SourceFormat::Plain | SourceFormat::Excel => 0,
        SourceFormat::TrackMate => TRACKMATE_EXTRA_HEADER_LINES,
    };
    let body = strip_lines_after_header(text, skipped_lines);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = resolve_columns(&header_map)?;
    let dimension = if columns.z.is_some() {
        Dimension::Three
    } else {
        Dimension::Two
    };

    let mut trajectories: Vec<Trajectory> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and lines are 1-based.
        let line = idx + 2 + skipped_lines;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            rows_read -= 1;
            continue;
        }

        match parse_row(&record, &columns) {
            Ok((id, point)) => {
                let slot = *index_by_id.entry(id.clone()).or_insert_with(|| {
                    trajectories.push(Trajectory {
                        id,
                        points: Vec::new(),
                    });
                    trajectories.len() - 1
                });
                trajectories[slot].points.push(point);
                rows_used += 1;
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if rows_used == 0 {
        return Err(AppError::insufficient("No valid trajectory rows found."));
    }

    for trajectory in &mut trajectories {
        trajectory.points.sort_by(|a, b| a.t.total_cmp(&b.t));
    }

    Ok(IngestedData {
        path: None,
        format,
        set: TrajectorySet {
            dimension,
            trajectories,
        },
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Detect a TrackMate spot export from its first lines.
///
/// Both conditions must hold: the header names TrackMate's characteristic
/// columns, and the fourth line carries unit annotations.
pub fn detect_format(text: &str) -> SourceFormat {
    let lines: Vec<&str> = text.lines().take(5).map(str::trim).collect();
    let Some(first) = lines.first() else {
        return SourceFormat::Plain;
    };

    let first = first.to_ascii_uppercase();
    let has_columns = TRACKMATE_COLUMNS.iter().all(|c| first.contains(c));
    let has_units = lines
        .get(3)
        .map(|l| {
            let l = l.to_lowercase();
            TRACKMATE_UNIT_MARKERS.iter().any(|m| l.contains(m))
        })
        .unwrap_or(false);

    if has_columns && has_units {
        SourceFormat::TrackMate
    } else {
        SourceFormat::Plain
    }
}

fn strip_lines_after_header(text: &str, n: usize) -> String {
    if n == 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if (1..=n).contains(&i) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // Keep the first occurrence of duplicated names.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, column resolution fails.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(*a).copied())
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<Columns, AppError> {
    let t = find_column(header_map, T_ALIASES).ok_or_else(|| {
        AppError::input("Missing time column (expected one of: t, time, times, position_t, frame).")
    })?;
    let x = find_column(header_map, X_ALIASES);
    let y = find_column(header_map, Y_ALIASES);
    let (Some(x), Some(y)) = (x, y) else {
        return Err(AppError::input(
            "Missing position columns: need `t,x,y` (2D) or `t,x,y,z` (3D).",
        ));
    };

    Ok(Columns {
        t,
        x,
        y,
        z: find_column(header_map, Z_ALIASES),
        particle_id: find_column(header_map, ID_ALIASES),
    })
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Result<(String, TrajectoryPoint), String> {
    let id = match columns.particle_id {
        Some(idx) => {
            let raw = record.get(idx).unwrap_or("");
            if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                return Err("Missing particle id.".to_string());
            }
            normalize_particle_id(raw)
        }
        None => SINGLE_PARTICLE_ID.to_string(),
    };

    let t = parse_field(record, columns.t, "t")?;
    let x = parse_field(record, columns.x, "x")?;
    let y = parse_field(record, columns.y, "y")?;
    let z = match columns.z {
        Some(idx) => parse_field(record, idx, "z")?,
        None => 0.0,
    };

    Ok((id, TrajectoryPoint { t, pos: [x, y, z] }))
}

fn parse_field(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{name}` value."))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{name}` value: '{raw}'."))?;
    if !value.is_finite() {
        return Err(format!("Non-finite `{name}` value."));
    }
    Ok(value)
}

/// Normalize numeric particle ids so `3`, `3.0` and ` 3 ` group together.
pub fn normalize_particle_id(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_csv_groups_by_particle() {
        let csv = "particle_id,t,x,y\n1,0,0,0\n2,0,5,5\n1,1,1,0\n2,1,5,6\n1,2,1,1\n";
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.format, SourceFormat::Plain);
        assert_eq!(data.set.dimension, Dimension::Two);
        assert_eq!(data.set.len(), 2);
        assert_eq!(data.set.trajectories[0].id, "1");
        assert_eq!(data.set.trajectories[0].len(), 3);
        assert_eq!(data.rows_used, 5);
    }

    #[test]
    fn aliases_and_bom_resolve() {
        let csv = "\u{feff}Time,Center_X,Center_Y,Center_Z,PID\n0,0,0,0,7.0\n1,1,1,1,7\n";
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.set.dimension, Dimension::Three);
        assert_eq!(data.set.len(), 1);
        assert_eq!(data.set.trajectories[0].id, "7");
        assert_eq!(data.set.trajectories[0].points[1].pos, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_id_column_means_single_particle() {
        let csv = "t,x,y\n0,0,0\n1,1,0\n";
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.set.len(), 1);
        assert_eq!(data.set.trajectories[0].id, SINGLE_PARTICLE_ID);
    }

    #[test]
    fn missing_time_column_is_an_input_error() {
        let err = parse_trajectories("x,y\n0,0\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let csv = "t,x,y\n0,0,0\n1,abc,0\n2,2,2\n";
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 3);
    }

    #[test]
    fn points_are_sorted_by_time() {
        let csv = "id,t,x,y\na,2,2,0\na,0,0,0\na,1,1,0\n";
        let data = parse_trajectories(csv).unwrap();
        let ts: Vec<f64> = data.set.trajectories[0].points.iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn trackmate_export_skips_descriptive_lines() {
        let csv = concat!(
            "LABEL,ID,TRACK_ID,QUALITY,POSITION_X,POSITION_Y,POSITION_Z,POSITION_T,FRAME\n",
            "Label,Spot ID,Track ID,Quality,X,Y,Z,T,Frame\n",
            "Label,Spot ID,Track ID,Quality,X,Y,Z,T,Frame\n",
            ",,,(quality),(pixel),(pixel),(pixel),(sec),(frame)\n",
            "ID100,100,0,5.0,1.0,2.0,0.0,0.0,0\n",
            "ID101,101,0,5.0,1.5,2.5,0.0,1.0,1\n",
            "ID200,200,1,5.0,9.0,9.0,0.0,0.0,0\n",
        );
        assert_eq!(detect_format(csv), SourceFormat::TrackMate);
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.format, SourceFormat::TrackMate);
        // Grouped by TRACK_ID, not the per-spot ID.
        assert_eq!(data.set.len(), 2);
        assert_eq!(data.set.trajectories[0].len(), 2);
        assert_eq!(data.set.dimension, Dimension::Three);
        assert_eq!(data.rows_read, 3);
    }

    #[test]
    fn track_id_outranks_id() {
        let csv = "id,track_id,t,x,y\n10,0,0,0,0\n11,0,1,1,0\n12,0,2,2,0\n";
        let data = parse_trajectories(csv).unwrap();
        assert_eq!(data.set.len(), 1);
        assert_eq!(data.set.trajectories[0].id, "0");
        assert_eq!(data.set.trajectories[0].len(), 3);
    }

    #[test]
    fn header_without_units_is_plain() {
        let csv = "TRACK_ID,POSITION_X,POSITION_Y,QUALITY,POSITION_T\n0,1,1,1,0\n0,2,2,1,1\n";
        assert_eq!(detect_format(csv), SourceFormat::Plain);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_trajectories(Path::new("tracks.parquet")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains(".xlsx"));
    }

    #[test]
    fn latin1_trackmate_units_are_detected() {
        let mut bytes = b"TRACK_ID,QUALITY,POSITION_X,POSITION_Y,POSITION_T\n".to_vec();
        bytes.extend_from_slice(b"Track ID,Quality,X,Y,T\n");
        bytes.extend_from_slice(b"Track ID,Quality,X,Y,T\n");
        bytes.extend_from_slice(b",(quality),(\xB5m),(\xB5m),(sec)\n");
        bytes.extend_from_slice(b"0,1.0,0.0,0.0,0\n0,1.0,1.0,0.0,1\n0,1.0,1.0,1.0,2\n");
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(decode_text(&bytes).lines().nth(3), Some(",(quality),(µm),(µm),(sec)"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spots.csv");
        std::fs::write(&path, &bytes).unwrap();
        let data = load_trajectories(&path).unwrap();
        assert_eq!(data.format, SourceFormat::TrackMate);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.rows_used, 3);
    }

    fn records(rows: &[&[&str]]) -> Vec<StringRecord> {
        rows.iter().map(|r| StringRecord::from(r.to_vec())).collect()
    }

    #[test]
    fn sheets_become_particles() {
        let sheets = vec![
            ("cell-a".to_string(), records(&[&["Time", "X", "Y"], &["1", "1", "0"], &["0", "0", "0"]])),
            ("cell-b".to_string(), records(&[&["t", "x", "y", "z"], &["0", "5", "5", "9"], &["1", "oops", "5", "9"], &["", "", "", ""]])),
        ];
        let data = parse_sheets(sheets).unwrap();
        assert_eq!(data.format, SourceFormat::Excel);
        assert_eq!(data.set.dimension, Dimension::Two);
        let ids: Vec<_> = data.set.ids().collect();
        assert_eq!(ids, vec!["cell-a", "cell-b"]);
        assert_eq!(data.set.trajectories[0].points[0].t, 0.0);
        // 2D workbook: `z` on later sheets is ignored.
        assert_eq!(data.set.trajectories[1].points[0].pos, [5.0, 5.0, 0.0]);
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 3);
        assert!(data.row_errors[0].message.contains("cell-b"));
    }

    #[test]
    fn sheet_missing_columns_is_an_input_error() {
        let sheets = vec![
            ("p1".to_string(), records(&[&["t", "x", "y", "z"], &["0", "0", "0", "0"]])),
            ("p2".to_string(), records(&[&["t", "x", "y"], &["0", "0", "0"]])),
        ];
        let err = parse_sheets(sheets).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("p2"));

        let sheets = vec![("p1".to_string(), records(&[&["t", "x"], &["0", "0"]]))];
        assert_eq!(parse_sheets(sheets).unwrap_err().exit_code(), 2);
        assert_eq!(parse_sheets(Vec::new()).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn workbook_file_round_trip() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.xlsx");
        let mut workbook = Workbook::new();
        for (name, speed) in [("p1", 1.0), ("p2", 2.0)] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            for (col, head) in ["POSITION_T", "POSITION_X", "POSITION_Y", "POSITION_Z"].iter().enumerate() {
                sheet.write_string(0, col as u16, *head).unwrap();
            }
            for i in 0..5u32 {
                let t = f64::from(i);
                sheet.write_number(i + 1, 0, t * 0.5).unwrap();
                sheet.write_number(i + 1, 1, speed * t).unwrap();
                sheet.write_number(i + 1, 2, 0.0).unwrap();
                sheet.write_number(i + 1, 3, t).unwrap();
            }
        }
        workbook.save(&path).unwrap();

        let data = load_trajectories(&path).unwrap();
        assert_eq!(data.format, SourceFormat::Excel);
        assert_eq!(data.set.dimension, Dimension::Three);
        assert_eq!(data.set.len(), 2);
        assert_eq!(data.set.get("p2").unwrap().points[4].pos, [8.0, 0.0, 4.0]);
        assert_eq!(data.set.get("p1").unwrap().points[4].t, 2.0);
        assert_eq!(data.rows_used, 10);
        assert_eq!(data.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn normalize_particle_id_handles_numeric_forms() {
        assert_eq!(normalize_particle_id("3.0"), "3");
        assert_eq!(normalize_particle_id(" 12 "), "12");
        assert_eq!(normalize_particle_id("cell-a"), "cell-a");
        assert_eq!(normalize_particle_id("1.5"), "1.5");
    }
}
