//! Resolving command-line paths into documents.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use loan_docs_extract::DocumentInput;

/// Expands `paths` into the list of PDF files to process.
///
/// Files are taken as given. Directories contribute their `*.pdf` entries
/// (case-insensitive, not recursive) in name order.
///
/// # Errors
///
/// Returns an error if a path does not exist or a directory cannot be
/// read.
pub fn collect_pdfs(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry_path = entry?.path();
                if entry_path.is_file() && is_pdf(&entry_path) {
                    found.push(entry_path);
                }
            }
            found.sort();
            log::debug!("{}: {} PDF files", path.display(), found.len());
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file or directory", path.display()),
            ));
        }
    }

    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// The name records are keyed by: the file's base name.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Reads every file into a [`DocumentInput`].
///
/// # Errors
///
/// Returns the first read error.
pub async fn read_documents(files: &[PathBuf]) -> io::Result<Vec<DocumentInput>> {
    let mut inputs = Vec::with_capacity(files.len());
    for file in files {
        let bytes = tokio::fs::read(file).await?;
        inputs.push(DocumentInput::new(display_name(file), bytes));
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    #[test]
    fn directories_yield_sorted_pdfs_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.pdf");
        touch(dir.path(), "a.PDF");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = collect_pdfs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, ["a.PDF", "b.pdf"]);
    }

    #[test]
    fn explicit_files_are_kept_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let scan = touch(dir.path(), "scan.bin");

        let files = collect_pdfs(std::slice::from_ref(&scan)).unwrap();
        assert_eq!(files, [scan]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_pdfs(&[dir.path().join("gone.pdf")]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn documents_are_named_by_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "loan.pdf");

        let inputs = read_documents(&[file]).await.unwrap();
        assert_eq!(inputs[0].filename, "loan.pdf");
        assert_eq!(inputs[0].bytes, b"%PDF-1.4");
    }
}
