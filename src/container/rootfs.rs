use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use tar::Archive;

use crate::container::layer::{align, LayerRecord};
use crate::container::layout::ImageLayout;
use crate::container::CompressType;
use crate::util::sha::file_sha256;

const WHITEOUT_PREFIX: &str = ".wh.";
const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

/// Flattens every layer of `layout` into `target`, lowest layer first.
pub fn unpack_layout(layout: &ImageLayout, target: &Path) -> Result<usize> {
    let records = align(layout)?;
    unpack_layers(&records, target)?;
    Ok(records.len())
}

pub fn unpack_layers(layers: &[LayerRecord], target: &Path) -> Result<()> {
    fs::create_dir_all(target).with_context(|| format!("create {}", target.display()))?;
    for record in layers {
        let blob = record.blob_path();
        let actual = file_sha256(&blob).with_context(|| format!("read {}", blob.display()))?;
        if actual != record.digest.sha256 {
            bail!("layer {} does not match its digest (got sha256:{})", record.digest, actual);
        }
        apply_layer(&blob, target).with_context(|| format!("unpack layer {}", record.digest))?;
    }
    info!("Unpacked {} layers into {}", layers.len(), target.display());
    Ok(())
}

/// Whiteouts only hide content from lower layers, so they are applied in a
/// first pass before any file of the same layer lands.
fn apply_layer(blob: &Path, target: &Path) -> Result<()> {
    let (removed, opaque) = collect_whiteouts(blob)?;
    for dir in &opaque {
        let dst = match whiteout_target(target, dir)? {
            Some(dst) => dst,
            None => continue,
        };
        let is_real_dir = fs::symlink_metadata(&dst).map(|m| m.is_dir()).unwrap_or(false);
        if is_real_dir {
            for child in fs::read_dir(&dst)? {
                remove_path(&child?.path())?;
            }
        }
    }
    for path in &removed {
        if let Some(dst) = whiteout_target(target, path)? {
            remove_path(&dst)?;
        }
    }

    let mut archive = open_layer(blob)?;
    let mut count = 0usize;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_whiteout = entry
            .path()?
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(WHITEOUT_PREFIX))
            .unwrap_or(false);
        if is_whiteout {
            continue;
        }
        entry.unpack_in(target)?;
        count += 1;
    }
    debug!(
        "Layer {}: {} entries, {} whiteouts, {} opaque dirs",
        blob.display(),
        count,
        removed.len(),
        opaque.len()
    );
    Ok(())
}

fn collect_whiteouts(blob: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut removed = Vec::new();
    let mut opaque = Vec::new();
    let mut archive = open_layer(blob)?;
    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?.into_owned();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        match path.file_name().and_then(|n| n.to_str()) {
            Some(OPAQUE_WHITEOUT) => opaque.push(parent),
            Some(name) => {
                if let Some(hidden) = name.strip_prefix(WHITEOUT_PREFIX) {
                    removed.push(parent.join(hidden));
                }
            }
            None => {}
        }
    }
    Ok((removed, opaque))
}

fn open_layer(blob: &Path) -> Result<Archive<Box<dyn Read>>> {
    let mut file = File::open(blob).with_context(|| format!("open {}", blob.display()))?;
    let mut header = Vec::with_capacity(4);
    (&mut file).take(4).read_to_end(&mut header)?;
    file.seek(SeekFrom::Start(0))?;
    let compress_type = CompressType::sniff(&header);
    debug!("Open layer {} as {}", blob.display(), compress_type);
    let reader: Box<dyn Read> = match compress_type {
        CompressType::Tar => Box::new(BufReader::new(file)),
        CompressType::Tgz => Box::new(GzDecoder::new(BufReader::new(file))),
        CompressType::Zstd => Box::new(zstd::Decoder::new(file)?),
    };
    Ok(Archive::new(reader))
}

/// Joins an archive path onto `root`, refusing anything that could escape it.
fn safe_join(root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => return Err(anyhow!("refusing path outside of rootfs: {}", relative.display())),
        }
    }
    Ok(joined)
}

/// Resolves a whiteout path inside `root` without following symlinks.
/// `None` when a parent is missing or not a directory, so there is nothing to
/// remove. A symlinked parent is refused since removal would happen wherever
/// it points.
fn whiteout_target(root: &Path, relative: &Path) -> Result<Option<PathBuf>> {
    let joined = safe_join(root, relative)?;
    let parents = joined.strip_prefix(root)?.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut current = root.to_path_buf();
    for part in parents.components() {
        current.push(part);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                bail!("refusing whiteout {} below symlink {}", relative.display(), current.display())
            }
            Ok(metadata) if !metadata.is_dir() => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(joined))
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}
