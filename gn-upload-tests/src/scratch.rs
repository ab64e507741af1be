use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use commons_error::*;
use log::*;
use tempfile::TempPath;
use zip::write::FileOptions;
use zip::ZipWriter;

///
/// Scratch files created by a test, deleted when the list is dropped
///
#[derive(Default)]
pub struct ScratchFiles {
    files: Vec<TempPath>,
}

impl ScratchFiles {
    /// New empty file with this extension (ex: ".csv")
    pub fn temp_file(&mut self, ext: &str) -> anyhow::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("gn_e2e_")
            .suffix(ext)
            .tempfile()
            .map_err(err_fwd!("Cannot create the temp file, ext=[{}]", ext))?;
        let path = file.into_temp_path();
        let abspath = path.to_path_buf();
        self.files.push(path);
        Ok(abspath)
    }

    ///
    /// Csv file with a header line, every row gives the value of some of the fields.
    /// A missing field is written empty.
    ///
    pub fn make_csv(&mut self, fieldnames: &[&str], rows: &[&[(&str, &str)]]) -> anyhow::Result<PathBuf> {
        let abspath = self.temp_file(".csv")?;
        let mut writer = csv::Writer::from_path(&abspath)?;
        writer.write_record(fieldnames)?;
        for row in rows {
            let record: Vec<&str> = fieldnames
                .iter()
                .map(|f| row.iter().find(|(k, _)| k == f).map(|(_, v)| *v).unwrap_or(""))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(abspath)
    }

    /// Zip of all the files matching the glob pattern, stored with their base name
    pub fn make_zip(&mut self, pattern: &str) -> anyhow::Result<PathBuf> {
        let abspath = self.temp_file(".zip")?;
        let mut zip = ZipWriter::new(File::create(&abspath)?);
        let mut count = 0;
        for entry in glob::glob(pattern)? {
            let path = entry?;
            let name = base_name(&path)?;
            zip.start_file(name, FileOptions::default())?;
            let mut file = File::open(&path)?;
            io::copy(&mut file, &mut zip)?;
            count += 1;
        }
        zip.finish()?;
        log_debug!("Zip created, path=[{}], files=[{}]", abspath.display(), count);
        Ok(abspath)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete the files now, errors are only logged
    pub fn clear(&mut self) {
        for path in self.files.drain(..) {
            let display = path.display().to_string();
            if let Err(e) = path.close() {
                log_warn!("Cannot delete the temp file, path=[{}], e=[{}]", display, e);
            }
        }
    }
}

fn base_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No file name, path=[{}]", path.display()))
}
