use crate::config::INDEX_CACHE_VERSION;
use crate::index::TitleIndex;
use anyhow::{bail, Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Metadata stored with the title-index cache for validation.
#[derive(Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: u32,
    pub input_path: String,
    pub input_mtime: u64,
    pub input_size: u64,
    pub page_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct IndexCache {
    pub metadata: CacheMetadata,
    pub pages: Vec<(u32, String)>,
}

pub fn cache_path(work_dir: &Path) -> PathBuf {
    work_dir.join("title_index.cache")
}

fn input_metadata(input_path: &Path) -> Result<(u64, u64)> {
    let metadata = fs::metadata(input_path)
        .with_context(|| format!("failed to stat input: {}", input_path.display()))?;
    let mtime = metadata
        .modified()
        .context("failed to get modification time")?
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("invalid modification time")?
        .as_secs();
    Ok((mtime, metadata.len()))
}

/// Check whether an existing cache matches the given input dump.
pub fn is_cache_valid(cache_file: &Path, input_path: &Path) -> Result<bool> {
    if !cache_file.exists() {
        return Ok(false);
    }

    let file_size = fs::metadata(cache_file).map(|m| m.len()).unwrap_or(0);
    let file = File::open(cache_file).context("failed to open index cache")?;
    let reader = BufReader::new(file);

    // Size limit guards against allocation blow-ups on corrupt data.
    let options = bincode::options().with_limit(file_size.saturating_add(1024));

    let cache: IndexCache = match options.deserialize_from(reader) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "index cache is corrupt or unreadable");
            return Ok(false);
        }
    };

    if cache.metadata.version != INDEX_CACHE_VERSION {
        info!(
            cached = cache.metadata.version,
            current = INDEX_CACHE_VERSION,
            "index cache version mismatch"
        );
        return Ok(false);
    }

    if cache.metadata.input_path != input_path.to_string_lossy() {
        info!(
            cached = %cache.metadata.input_path,
            current = %input_path.display(),
            "index cache input path mismatch"
        );
        return Ok(false);
    }

    let (mtime, size) = input_metadata(input_path)?;
    if cache.metadata.input_mtime != mtime || cache.metadata.input_size != size {
        info!("input dump changed since index cache was created");
        return Ok(false);
    }

    Ok(true)
}

/// Persist the title index next to the other work artifacts. Write to a
/// temp file then rename so a crash never leaves a half-written cache.
pub fn save_index(index: &TitleIndex, input_path: &Path, work_dir: &Path) -> Result<()> {
    let path = cache_path(work_dir);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let (mtime, size) = input_metadata(input_path)?;
    let pages = index.to_serializable();

    let cache = IndexCache {
        metadata: CacheMetadata {
            version: INDEX_CACHE_VERSION,
            input_path: input_path.to_string_lossy().into_owned(),
            input_mtime: mtime,
            input_size: size,
            page_count: pages.len(),
        },
        pages,
    };

    let tmp_path = path.with_extension("cache.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("failed to create temp cache file: {}", tmp_path.display()))?;
    let writer = BufWriter::new(file);

    bincode::DefaultOptions::new()
        .serialize_into(writer, &cache)
        .context("failed to serialize index cache")?;

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to rename temp cache file to: {}", path.display()))?;

    info!(pages = cache.metadata.page_count, path = %path.display(), "title index cached");
    Ok(())
}

pub fn load_index(cache_file: &Path) -> Result<TitleIndex> {
    if !cache_file.exists() {
        bail!("index cache does not exist: {}", cache_file.display());
    }

    let file_size = fs::metadata(cache_file).map(|m| m.len()).unwrap_or(0);
    let file = File::open(cache_file)
        .with_context(|| format!("failed to open index cache: {}", cache_file.display()))?;
    let reader = BufReader::new(file);

    let options = bincode::options().with_limit(file_size.saturating_add(1024));
    let cache: IndexCache = options
        .deserialize_from(reader)
        .context("failed to deserialize index cache")?;

    info!(pages = cache.metadata.page_count, "title index loaded from cache");
    Ok(TitleIndex::from_serializable(cache.pages))
}

/// Build the index, using the cache when it is still valid for `dump_path`.
pub fn build_or_load(dump_path: &Path, work_dir: &Path) -> Result<TitleIndex> {
    let cache_file = cache_path(work_dir);
    if is_cache_valid(&cache_file, dump_path)? {
        return load_index(&cache_file);
    }
    let index = TitleIndex::build(dump_path)?;
    save_index(&index, dump_path, work_dir)?;
    Ok(index)
}
