//! Packed (`.tar.gz`) pack handling

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

use crate::error::{CoreError, Result};
use crate::pack::LoadedPack;

/// Whether a path names a packed pack
pub fn is_archive(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Create a tar.gz archive from a loaded pack
///
/// Entries are stored relative to the pack root with a zero mtime, so equal
/// packs produce equal archives.
pub fn create_archive(pack: &LoadedPack, output: &Path) -> Result<PathBuf> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    add_file_to_archive(&mut builder, &pack.root.join("Pack.yaml"), "Pack.yaml")?;

    if pack.values_path.exists() {
        add_file_to_archive(&mut builder, &pack.values_path, "values.yaml")?;
    }

    if let Some(schema_path) = &pack.schema_path {
        let schema_name = schema_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "values.schema.json".to_string());
        add_file_to_archive(&mut builder, schema_path, &schema_name)?;
    }

    for file_path in pack.template_files()? {
        let rel_path = file_path
            .strip_prefix(&pack.root)
            .unwrap_or(&file_path)
            .to_string_lossy()
            .replace('\\', "/");
        add_file_to_archive(&mut builder, &file_path, &rel_path)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output.to_path_buf())
}

/// Extract an archive to a destination directory
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    std::fs::create_dir_all(dest)?;
    archive.unpack(dest)?;

    Ok(())
}

/// Locate the pack root inside an extracted archive
///
/// Archives either hold `Pack.yaml` at the top level or wrap everything in a
/// single directory named after the pack.
pub fn find_pack_root(extracted: &Path) -> Result<PathBuf> {
    if extracted.join("Pack.yaml").exists() {
        return Ok(extracted.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(extracted)? {
        let path = entry?.path();
        if path.is_dir() && path.join("Pack.yaml").exists() {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(CoreError::Archive {
            message: "archive does not contain a Pack.yaml".to_string(),
        }),
        n => Err(CoreError::Archive {
            message: format!("archive contains {} packs, expected one", n),
        }),
    }
}

fn add_file_to_archive<W: Write>(
    builder: &mut Builder<W>,
    file_path: &Path,
    archive_path: &str,
) -> Result<()> {
    let content = std::fs::read(file_path)?;

    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content.as_slice())?;
    Ok(())
}

/// Default archive filename for a pack (`<name>-<version>.tar.gz`)
#[must_use]
pub fn default_archive_name(pack: &LoadedPack) -> String {
    format!(
        "{}-{}.tar.gz",
        pack.pack.metadata.name, pack.pack.metadata.version
    )
}
