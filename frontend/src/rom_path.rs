//! Region path resolution: loads [`RomRegions`] from a ZIP of region dumps,
//! a directory holding `<machine>.zip` or `<machine>/`, or a directory of
//! loose `<region>.bin` files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use marquee_machines::{MachineError, RomRegions};

/// Resolve a region path and load every file in it.
///
/// Resolution order:
/// 1. `path` ends with `.zip` → load it as an archive.
/// 2. `path` is a directory containing `{machine_name}.zip` → load that archive.
/// 3. `path` is a directory containing a `{machine_name}` directory → load it.
/// 4. `path` is a directory of loose files → [`RomRegions::from_directory`].
pub fn load_regions(machine_name: &str, path: &Path) -> Result<RomRegions, MachineError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }

    if path.is_dir() {
        let zip_path = path.join(format!("{machine_name}.zip"));
        if zip_path.is_file() {
            return load_from_zip(&zip_path);
        }
        let sub_dir = path.join(machine_name);
        if sub_dir.is_dir() {
            return RomRegions::from_directory(&sub_dir);
        }
        return RomRegions::from_directory(path);
    }

    Err(MachineError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("region path not found: {}", path.display()),
    )))
}

/// Region name for an archive entry: the file stem, without directories.
fn region_name(entry_name: &str) -> String {
    Path::new(entry_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn load_from_zip(path: &Path) -> Result<RomRegions, MachineError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
    })?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("ZIP entry error: {e}"),
            )
        })?;
        if entry.is_dir() {
            continue;
        }

        let name = region_name(entry.name());
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        log::debug!("{}: region {name} ({} bytes)", path.display(), data.len());
        entries.push((name, data));
    }

    Ok(RomRegions::from_entries(entries))
}
