use crate::error::{CliError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const STRUCTURE_EXTENSIONS: [&str; 2] = ["pdb", "ent"];

pub fn is_structure_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            STRUCTURE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Resolves `input` to the structure files to process, sorted by path.
///
/// A file is taken as-is; a directory contributes its `.pdb`/`.ent` files (not recursive).
pub fn collect_structures(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(CliError::Argument(format!(
            "Input path does not exist: {}",
            input.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && is_structure_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    debug!(count = files.len(), dir = ?input, "Collected structure files.");

    if files.is_empty() {
        return Err(CliError::Argument(format!(
            "No .pdb or .ent files found in {}",
            input.display()
        )));
    }
    Ok(files)
}

/// File stem used to name a structure's output directory and files.
pub fn structure_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "structure".to_string())
}
