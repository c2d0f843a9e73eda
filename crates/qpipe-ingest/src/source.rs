//! Record source
//!
//! Enumerates the input files of a directory and streams their rows as
//! [`Record`]s. Files are opened one at a time and read row by row; nothing
//! is buffered beyond the current row.

use crate::error::{IngestError, Result};
use crate::record::Record;
use csv::StringRecord;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// List the files directly inside `dir` whose extension matches `extension`
/// (case-insensitive, without the dot), sorted by file name.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::source_read(
            dir.display().to_string(),
            "not a directory",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestError::source_read(dir.display().to_string(), e))?;
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

        // `Path::is_file` follows symlinks; dangling links are skipped.
        if matches && entry.path().is_file() {
            files.push(entry.into_path());
        }
    }

    info!(dir = %dir.display(), count = files.len(), "Found input files");
    Ok(files)
}

/// Lazily yields `(file, record)` pairs for a list of files
pub struct RecordSource {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<OpenFile>,
    failed: bool,
}

struct OpenFile {
    path: PathBuf,
    headers: StringRecord,
    rows: csv::StringRecordsIntoIter<File>,
}

impl RecordSource {
    /// Scan `dir` for files with `extension`
    pub fn open(dir: &Path, extension: &str) -> Result<Self> {
        Ok(Self::from_files(list_files(dir, extension)?))
    }

    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            failed: false,
        }
    }

    fn open_file(path: PathBuf) -> Result<OpenFile> {
        debug!(file = %path.display(), "Opening input file");

        let display = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| IngestError::source_read(&display, e))?;

        let headers = reader
            .headers()
            .map_err(|e| IngestError::source_read(&display, e))?
            .clone();

        Ok(OpenFile {
            path,
            headers,
            rows: reader.into_records(),
        })
    }

    /// Build a record from a row, padding short rows with empty values.
    fn to_record(file: &OpenFile, row: &StringRecord) -> Result<Record> {
        if row.len() > file.headers.len() {
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            return Err(IngestError::source_read(
                file.path.display().to_string(),
                format!(
                    "line {} has {} fields but the header has {}",
                    line,
                    row.len(),
                    file.headers.len()
                ),
            ));
        }

        Ok(file
            .headers
            .iter()
            .enumerate()
            .map(|(i, field)| (field, row.get(i).unwrap_or("")))
            .collect())
    }
}

impl Iterator for RecordSource {
    type Item = Result<(PathBuf, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if self.current.is_none() {
                let path = self.files.next()?;
                match Self::open_file(path) {
                    Ok(file) => self.current = Some(file),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    },
                }
            }

            let file = self.current.as_mut()?;
            match file.rows.next() {
                Some(Ok(row)) => {
                    let result = Self::to_record(file, &row).map(|r| (file.path.clone(), r));
                    self.failed = result.is_err();
                    return Some(result);
                },
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(IngestError::source_read(
                        file.path.display().to_string(),
                        e,
                    )));
                },
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_list_files_filters_extension() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.csv", "country\nFrance\n");
        write(&dir, "a.CSV", "country\nMali\n");
        write(&dir, "notes.txt", "ignore me");
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = list_files(dir.path(), "csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.CSV", "b.csv"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_includes_symlinked_files() {
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("real.csv"), "country\nPeru\n").unwrap();

        let dir = TempDir::new().unwrap();
        write(&dir, "a.csv", "country\nMali\n");
        std::os::unix::fs::symlink(elsewhere.path().join("real.csv"), dir.path().join("b.csv"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.csv"), dir.path().join("c.csv")).unwrap();

        let files = list_files(dir.path(), "csv").unwrap();
        assert_eq!(files, [dir.path().join("a.csv"), dir.path().join("b.csv")]);

        let countries: Vec<_> = RecordSource::from_files(files)
            .map(|item| item.unwrap().1.get("country").unwrap().to_string())
            .collect();
        assert_eq!(countries, ["Mali", "Peru"]);
    }

    #[test]
    fn test_missing_directory() {
        let err = list_files(Path::new("/definitely/not/here"), "csv").unwrap_err();
        assert!(matches!(err, IngestError::SourceRead { .. }));
    }

    #[test]
    fn test_rows_follow_header() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "countries.csv",
            "country,capital\nFrance,Paris\n\"Korea, South\",Seoul\nCôte d'Ivoire,Yamoussoukro\n",
        );

        let records: Vec<_> = RecordSource::open(dir.path(), "csv")
            .unwrap()
            .map(|r| r.unwrap().1)
            .collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("country"), Some("France"));
        assert_eq!(records[1].get("country"), Some("Korea, South"));
        assert_eq!(records[2].get("country"), Some("Côte d'Ivoire"));
        assert_eq!(records[2].fields().collect::<Vec<_>>(), ["country", "capital"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = TempDir::new().unwrap();
        write(&dir, "short.csv", "country,capital,population\nFrance,Paris\n");

        let (_, record) = RecordSource::open(dir.path(), "csv")
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("population"), Some(""));
    }

    #[test]
    fn test_long_row_is_an_error_and_stops_iteration() {
        let dir = TempDir::new().unwrap();
        write(&dir, "long.csv", "country\nFrance,extra\nMali\n");

        let mut source = RecordSource::open(dir.path(), "csv").unwrap();
        assert!(matches!(
            source.next(),
            Some(Err(IngestError::SourceRead { .. }))
        ));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_files_are_chained() {
        let dir = TempDir::new().unwrap();
        write(&dir, "1.csv", "country\nFrance\nMali\n");
        write(&dir, "2.csv", "country\nPeru\n");
        write(&dir, "3.csv", "country\n");

        let pairs: Vec<_> = RecordSource::open(dir.path(), "csv")
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(pairs.len(), 3);
        assert!(pairs[0].0.ends_with("1.csv"));
        assert!(pairs[2].0.ends_with("2.csv"));
        assert_eq!(pairs[2].1.get("country"), Some("Peru"));
    }
}
