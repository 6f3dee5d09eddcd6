use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use filetime::FileTime;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::model::Photo;
use crate::naming::{self, NamingMode};

pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    /// Bytes of the largest available size of the photo.
    async fn fetch_photo(&self, photo: &Photo) -> Result<Bytes>;

    /// Capture time as reported by the service, for photos listed without it.
    async fn date_taken(&self, photo: &Photo) -> Result<String>;
}

/// Receives updates while photos are processed. Every method defaults to a
/// no-op.
pub trait DownloadProgress: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_skip(&self, _filename: &str) {}

    fn on_saved(&self, _filename: &str) {}

    fn on_finish(&self, _summary: &DownloadSummary) {}
}

/// Used when verbose logging already reports every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_directory: PathBuf,
    pub naming: NamingMode,
    /// Skip photos whose id suffix matches any file in the output directory.
    pub fast_forward: bool,
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            naming: NamingMode::default(),
            fast_forward: true,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl DownloadConfig {
    pub fn with_output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = output_directory.into();
        self
    }

    pub fn with_naming(mut self, naming: NamingMode) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_fast_forward(mut self, fast_forward: bool) -> Self {
        self.fast_forward = fast_forward;
        self
    }

    #[cfg(test)]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

pub struct Downloader {
    config: DownloadConfig,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Downloader {
        Downloader { config }
    }

    /// Downloads every photo missing from the output directory, in order.
    /// Stops at the first photo that still fails after its retry.
    pub async fn download_all<F, P>(
        &self,
        fetcher: &F,
        photos: &[Photo],
        progress: &P,
    ) -> Result<DownloadSummary>
    where
        F: PhotoFetcher + ?Sized,
        P: DownloadProgress + ?Sized,
    {
        let directory = self.config.output_directory.as_path();
        fs::create_dir_all(directory)?;

        let mut known_suffixes = if self.config.fast_forward {
            existing_id_suffixes(directory)?
        } else {
            HashSet::new()
        };

        let mut summary = DownloadSummary::default();
        progress.on_start(photos.len());

        for photo in photos {
            let id_suffix = naming::id_suffix(photo);
            if self.config.fast_forward && known_suffixes.contains(&id_suffix) {
                debug!("Fast forwarding past {id}", id = photo.id);
                summary.skipped += 1;
                progress.on_skip(&id_suffix);
                continue;
            }

            // Only the timestamp mode needs the capture time to pick a name.
            let mut taken = None;
            if self.config.naming.uses_capture_time() {
                taken = Some(self.capture_time(fetcher, photo).await?);
            }
            let filename = self.config.naming.filename(
                photo,
                taken.map(|t| t.timestamp()).unwrap_or_default(),
                "",
            );
            let path = directory.join(&filename);

            if path.exists() {
                // TODO: compare size or checksum to catch truncated downloads.
                debug!("Skipping {filename}, as it exists already");
                summary.skipped += 1;
                progress.on_skip(&filename);
                continue;
            }

            let taken = match taken {
                Some(taken) => taken,
                None => self.capture_time(fetcher, photo).await?,
            };

            debug!("Saving: {filename}");
            self.save_with_retry(fetcher, photo, &path).await?;

            let file_time = FileTime::from_unix_time(taken.timestamp(), 0);
            filetime::set_file_times(&path, file_time, file_time)?;

            known_suffixes.insert(id_suffix);
            summary.downloaded += 1;
            progress.on_saved(&filename);
        }

        progress.on_finish(&summary);
        Ok(summary)
    }

    async fn capture_time<F>(&self, fetcher: &F, photo: &Photo) -> Result<DateTime<Local>>
    where
        F: PhotoFetcher + ?Sized,
    {
        match &photo.date_taken {
            Some(date_taken) => parse_taken(date_taken),
            None => parse_taken(&fetcher.date_taken(photo).await?),
        }
    }

    async fn save_with_retry<F>(&self, fetcher: &F, photo: &Photo, path: &Path) -> Result<()>
    where
        F: PhotoFetcher + ?Sized,
    {
        match save(fetcher, photo, path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    "Download of {id} failed ({e}), retrying in {delay:?}",
                    id = photo.id,
                    delay = self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
                save(fetcher, photo, path).await
            }
        }
    }
}

async fn save<F>(fetcher: &F, photo: &Photo, path: &Path) -> Result<()>
where
    F: PhotoFetcher + ?Sized,
{
    let bytes = fetcher.fetch_photo(photo).await?;
    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

/// Collects the `-{id}.jpg` endings of the files in `directory`. Photo ids
/// never contain a dash, so the last dash starts the ending whatever the
/// title looks like.
fn existing_id_suffixes(directory: &Path) -> Result<HashSet<String>> {
    let mut suffixes = HashSet::new();
    for entry in fs::read_dir(directory)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(index) = name.rfind('-') {
            suffixes.insert(name[index..].to_string());
        }
    }
    Ok(suffixes)
}

/// Parses a capture time such as `2010-01-01 12:00:00` as local time.
pub fn parse_taken(value: &str) -> Result<DateTime<Local>> {
    let value = value.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| Error::Timestamp(value.to_string()))?;

    // Times falling in a DST gap have no local equivalent.
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive)))
}
