use crate::data::Dataset;
use crate::model::EnrichedObservation;
use crate::utils::slug;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Enriched series memoized on disk.
///
/// Entries are keyed by the dataset content digest and the city, so results
/// computed for one input file are never served for another.
pub struct EnrichmentCache {
    cache_dir: PathBuf,
}

impl EnrichmentCache {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// Return the cached entry for (`dataset`, `city`), computing and storing it on a miss.
    pub fn get_or_compute<F>(
        &self,
        dataset: &Dataset,
        city: &str,
        compute: F,
    ) -> Result<Vec<EnrichedObservation>>
    where
        F: FnOnce() -> Vec<EnrichedObservation>,
    {
        let file = self.entry_file(&dataset.digest, city);
        if file.is_file() {
            match load_entry(&file) {
                Ok(enriched) => {
                    log::info!("loaded {file:?}");
                    return Ok(enriched);
                }
                Err(error) => log::warn!("discarding unreadable {file:?}: {error:#}"),
            }
        }

        let enriched = compute();

        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("failed to create {:?}", self.cache_dir))?;
        save_entry(&file, &enriched).context("failed to save cache entry")?;
        log::info!("saved {file:?}");

        Ok(enriched)
    }

    /// Remove every entry, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let pattern = self.cache_dir.join("*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut count = 0;
        for file in glob(pattern)
            .context("failed to glob cache entries")?
            .filter_map(Result::ok)
        {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            count += 1;
        }
        Ok(count)
    }

    fn entry_file(&self, digest: &str, city: &str) -> PathBuf {
        let city_digest = crate::data::content_digest(city);
        self.cache_dir.join(format!(
            "{digest}-{}-{}.msgpack",
            slug(city),
            &city_digest[..8]
        ))
    }
}

fn save_entry(file: &Path, enriched: &[EnrichedObservation]) -> Result<()> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, &enriched).context("failed to serialize enriched series")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_entry(file: &Path) -> Result<Vec<EnrichedObservation>> {
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let enriched = decode::from_read(&mut reader).context("failed to deserialize enriched series")?;
    Ok(enriched)
}
