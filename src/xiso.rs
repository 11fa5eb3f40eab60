//! Xbox ISO repacking through an external packer (xdvdfs).

use crate::error::{Error, Result};
use crate::jobs::Job;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of packed output images
pub const XISO_SUFFIX: &str = ".xiso.iso";

/// `*.iso` files directly in `dir`, excluding already packed `*.xiso.iso`, sorted
pub fn scan_isos(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::not_found(dir.display().to_string()));
    }
    let read = fs::read_dir(dir).map_err(|e| Error::from_io(dir.display().to_string(), e))?;

    let mut isos = read
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            name.ends_with(".iso") && !name.ends_with(XISO_SUFFIX)
        })
        .collect::<Vec<_>>();
    isos.sort();
    Ok(isos)
}

/// `<base>.xiso.iso` next to `iso`
pub fn output_path(iso: &Path) -> PathBuf {
    let base = iso
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    iso.with_file_name(format!("{base}{XISO_SUFFIX}"))
}

/// Job running `<packer> pack <iso> <output>`
pub fn pack_job(packer: &Path, iso: &Path) -> Job {
    let label = iso
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| iso.display().to_string());
    Job::new(label, packer)
        .arg("pack")
        .arg(iso)
        .arg(output_path(iso))
}
