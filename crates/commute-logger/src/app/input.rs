//! Loading recorded traces from disk

use super::AppError;
use commute_trip_lib::Fix;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Load every usable fix from a `.gpx` or `.jsonl` trace
pub fn load_fixes(path: &Path) -> Result<Vec<Fix>, AppError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let file = File::open(path).map_err(|source| AppError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    match extension.as_deref() {
        Some("gpx") => read_gpx(reader),
        Some("jsonl") | Some("ndjson") => read_json_lines(reader),
        _ => Err(AppError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Track points in file order; points without a timestamp are skipped
pub fn read_gpx<R: Read>(reader: R) -> Result<Vec<Fix>, AppError> {
    let gpx = gpx::read(reader)?;

    let mut skipped = 0usize;
    let mut fixes = Vec::new();
    for waypoint in gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
    {
        match Fix::from_waypoint(waypoint) {
            Some(fix) => fixes.push(fix),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} track points without a timestamp", skipped);
    }
    Ok(fixes)
}

/// One JSON-encoded fix per line; blank lines are ignored
pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Vec<Fix>, AppError> {
    let mut fixes = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fix = serde_json::from_str(&line).map_err(|source| AppError::FixLine {
            line: index + 1,
            source,
        })?;
        fixes.push(fix);
    }
    Ok(fixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_json_lines() {
        let input = r#"{"t_millis":1000,"lat":29.7,"lon":-95.4,"acc":5.0}

{"t_millis":2000,"lat":29.71,"lon":-95.39}
"#;
        let fixes = read_json_lines(Cursor::new(input)).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].accuracy_m(), Some(5.0));
        assert_eq!(fixes[1].timestamp_millis(), 2000);
        assert_eq!(fixes[1].accuracy_m(), None);
    }

    #[test]
    fn test_read_json_lines_reports_line() {
        let input = "{\"t_millis\":1000,\"lat\":29.7,\"lon\":-95.4}\nnot json\n";
        match read_json_lines(Cursor::new(input)) {
            Err(AppError::FixLine { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_gpx_skips_untimed_points() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="29.7" lon="-95.4"><time>2024-01-02T03:04:05Z</time></trkpt>
      <trkpt lat="29.71" lon="-95.39"></trkpt>
      <trkpt lat="29.72" lon="-95.38"><time>2024-01-02T03:04:06Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let fixes = read_gpx(Cursor::new(input)).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].timestamp_millis(), 1_704_164_645_000);
        assert_eq!(fixes[1].lat(), 29.72);
    }

    #[test]
    fn test_load_fixes_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        std::fs::write(&path, "lat,lon\n").unwrap();
        assert!(matches!(
            load_fixes(&path),
            Err(AppError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_fixes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_fixes(&dir.path().join("missing.gpx")),
            Err(AppError::Open { .. })
        ));
    }
}
