//! Archive extraction module
//!
//! Strips a single compression layer from bare compressed files, then
//! unpacks tar (plain, gzip, xz, zstd, bzip2) and zip archives. Anything else is
//! treated as a lone file and moved into the extraction directory as is.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use thiserror::Error;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Container format recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    TarZst,
    TarBz2,
    Zip,
    Gz,
    Xz,
    Zst,
    Bz2,
    Bare,
}

impl ArchiveFormat {
    /// Detect the format from the (case-insensitive) file name of `path`.
    pub fn detect(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let has = |suffixes: &[&str]| suffixes.iter().any(|s| name.ends_with(s));

        if has(&[".tar.gz", ".tgz"]) {
            Self::TarGz
        } else if has(&[".tar.xz", ".txz"]) {
            Self::TarXz
        } else if has(&[".tar.zst", ".tzst"]) {
            Self::TarZst
        } else if has(&[".tar.bz2", ".tar.bz", ".tbz", ".tbz2"]) {
            Self::TarBz2
        } else if has(&[".tar"]) {
            Self::Tar
        } else if has(&[".zip"]) {
            Self::Zip
        } else if has(&[".gz"]) {
            Self::Gz
        } else if has(&[".xz", ".lzma"]) {
            Self::Xz
        } else if has(&[".zst"]) {
            Self::Zst
        } else if has(&[".bz2", ".bz", ".bzip"]) {
            Self::Bz2
        } else {
            Self::Bare
        }
    }
}

/// Remove one compression layer from a single compressed file.
///
/// The decompressed stream is written next to `path` with the compression
/// extension stripped, and the new path is returned. Files that are not a
/// single compressed stream are returned unchanged.
///
/// # Errors
///
/// Returns [`ExtractError::Io`] if reading or writing fails.
pub fn decompress_single(path: &Path) -> Result<PathBuf, ExtractError> {
    let format = ArchiveFormat::detect(path);
    let reader = || File::open(path).map(BufReader::new);

    let decoder: Box<dyn Read> = match format {
        ArchiveFormat::Gz => Box::new(flate2::read::GzDecoder::new(reader()?)),
        ArchiveFormat::Xz => Box::new(xz_decoder(path, reader()?)?),
        ArchiveFormat::Zst => Box::new(ZstdDecoder::new(reader()?)?),
        ArchiveFormat::Bz2 => Box::new(BzDecoder::new(reader()?)),
        _ => return Ok(path.to_path_buf()),
    };

    let output = path.with_extension("");
    tracing::debug!("Decompressing {} -> {}", path.display(), output.display());
    copy_to_file(decoder, &output)?;
    fs::remove_file(path)?;
    Ok(output)
}

/// `.lzma` files are legacy LZMA-alone streams; `.xz` uses the xz container.
fn xz_decoder<R: Read>(path: &Path, reader: R) -> Result<xz2::read::XzDecoder<R>, ExtractError> {
    let is_lzma = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("lzma"));
    if is_lzma {
        let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        Ok(xz2::read::XzDecoder::new_stream(reader, stream))
    } else {
        Ok(xz2::read::XzDecoder::new(reader))
    }
}

fn copy_to_file(mut reader: impl Read, output: &Path) -> Result<(), ExtractError> {
    let result = File::create(output).and_then(|mut out| io::copy(&mut reader, &mut out));
    if let Err(e) = result {
        fs::remove_file(output).ok();
        return Err(e.into());
    }
    Ok(())
}

/// Unpack `path` into `extract_dir`, which is created if needed.
///
/// Entries that would land outside `extract_dir` are rejected. A file that
/// is not an archive is moved into `extract_dir` under its own name.
///
/// # Errors
///
/// Returns an [`ExtractError`] if the archive is corrupt, escapes the
/// extraction directory, or cannot be written.
pub fn unpack_into(path: &Path, extract_dir: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(extract_dir)?;
    let open = || File::open(path).map(BufReader::new);

    match ArchiveFormat::detect(path) {
        ArchiveFormat::Tar => unpack_tar(open()?, extract_dir),
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(open()?), extract_dir),
        ArchiveFormat::TarXz => unpack_tar(xz2::read::XzDecoder::new(open()?), extract_dir),
        ArchiveFormat::TarZst => unpack_tar(ZstdDecoder::new(open()?)?, extract_dir),
        ArchiveFormat::TarBz2 => unpack_tar(BzDecoder::new(open()?), extract_dir),
        ArchiveFormat::Zip => unpack_zip(path, extract_dir),
        ArchiveFormat::Gz
        | ArchiveFormat::Xz
        | ArchiveFormat::Zst
        | ArchiveFormat::Bz2
        | ArchiveFormat::Bare => {
            let name = path
                .file_name()
                .ok_or_else(|| ExtractError::Archive("Invalid filename".to_string()))?;
            let target = extract_dir.join(name);
            tracing::debug!("Treating {} as a bare file", path.display());
            if fs::rename(path, &target).is_err() {
                fs::copy(path, &target)?;
                fs::remove_file(path)?;
            }
            Ok(())
        }
    }
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.unpack_in(dest_dir)? {
            let path = entry.path()?.display().to_string();
            return Err(ExtractError::Archive(format!("Invalid path in archive: {path}")));
        }
    }

    Ok(())
}

fn unpack_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };
        let absolute_path = dest_dir.join(relative_path);

        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    Ok(())
}
