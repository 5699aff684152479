//! CSV summary sink for folder mode.

use crate::error::CountError;
use crate::model::FileTokens;
use std::path::Path;
use tracing::info;

const HEADER: [&str; 2] = ["filename", "tokencount"];

/// Write `filename,tokencount` followed by one row per file, replacing any existing file.
pub fn write_summary(path: &Path, files: &[FileTokens]) -> Result<(), CountError> {
    let wrap = |source: csv::Error| CountError::Summary {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    writer.write_record(HEADER).map_err(wrap)?;
    for file in files {
        let tokens = file.tokens.to_string();
        writer
            .write_record([file.name.as_str(), tokens.as_str()])
            .map_err(wrap)?;
    }
    writer.flush().map_err(|e| wrap(e.into()))?;
    info!(path = %path.display(), rows = files.len(), "wrote token summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_one_row_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token_counts.csv");
        let files = vec![
            FileTokens {
                name: "a.pdf".into(),
                tokens: 12,
            },
            FileTokens {
                name: "b, with comma.docx".into(),
                tokens: 0,
            },
        ];
        write_summary(&path, &files).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "filename,tokencount\na.pdf,12\n\"b, with comma.docx\",0\n"
        );
    }

    #[test]
    fn empty_batch_still_gets_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token_counts.csv");
        write_summary(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "filename,tokencount\n"
        );
    }

    #[test]
    fn unwritable_destination_is_a_summary_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("token_counts.csv");
        let err = write_summary(&path, &[]).unwrap_err();
        assert!(matches!(err, CountError::Summary { .. }));
    }
}
