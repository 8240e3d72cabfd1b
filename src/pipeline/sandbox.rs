//! Per-document scratch directories

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::utils::error::Result;
use crate::utils::files::TEX_EXTENSIONS;

/// A private copy of a source tree, removed on drop.
#[derive(Debug)]
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    /// Copy every file below `source` into a fresh temporary directory.
    pub fn copy_from(source: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("texrainbow-").tempdir()?;
        copy_tree(source, dir.path())?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Read a file relative to the sandbox root, replacing invalid UTF-8.
    pub fn read(&self, rel: &Path) -> Result<String> {
        let bytes = fs::read(self.path().join(rel))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write(&self, rel: &Path, text: &str) -> Result<()> {
        fs::write(self.path().join(rel), text)?;
        Ok(())
    }

    /// Rewrite every TeX file directly below the root with `edit`.
    pub fn rewrite_root_sources(&self, edit: impl Fn(&str) -> String) -> Result<usize> {
        let mut count = 0;
        for rel in root_sources(self.path())? {
            let text = self.read(&rel)?;
            self.write(&rel, &edit(&text))?;
            count += 1;
        }
        Ok(count)
    }
}

/// Recursively copy the contents of `from` into the existing `to`.
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// `.tex`/`.latex` files directly below `dir`, sorted by name.
pub fn root_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = PathBuf::from(entry.file_name());
        let is_source = name
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TEX_EXTENSIONS[..2].contains(&e));
        if is_source && entry.file_type()?.is_file() {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

/// The root TeX file that declares `\documentclass`, preferring `main.tex`.
pub fn find_main_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut found = Vec::new();
    for rel in root_sources(dir)? {
        let bytes = fs::read(dir.join(&rel))?;
        if String::from_utf8_lossy(&bytes).contains("\\documentclass") {
            found.push(rel);
        }
    }
    let main = Path::new("main.tex");
    if found.iter().any(|p| p == main) {
        return Ok(Some(main.to_path_buf()));
    }
    Ok(found.into_iter().next())
}
