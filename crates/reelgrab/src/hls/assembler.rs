// HLS Stream Assembler: drives concurrent segment fetches under a worker cap and
// writes payloads to the destination strictly in sequence order.
//
// Workers only fetch. The coordinator owns the reorder buffer, the progress
// counter and the output file, so none of them is shared across tasks.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::DownloadError;
use crate::error::{AssemblyError, AssemblyResult};
use crate::hls::fetcher::SegmentDownloader;
use crate::hls::playlist::SegmentReference;
use crate::progress::{ProgressCallback, ProgressEvent, emit};

type WorkerOutput = (usize, Result<Bytes, DownloadError>);

pub struct StreamAssembler {
    fetcher: Arc<dyn SegmentDownloader>,
    max_workers: usize,
    on_progress: Option<ProgressCallback>,
}

impl StreamAssembler {
    pub fn new(fetcher: Arc<dyn SegmentDownloader>, max_workers: usize) -> Self {
        Self {
            fetcher,
            max_workers: max_workers.max(1),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fetch every segment and write them, in `sequence_index` order, to `destination`.
    ///
    /// Bytes go to `<destination>.part` as soon as they form a contiguous prefix;
    /// the part file is renamed onto `destination` only after all segments are
    /// written. Any failure removes the part file and leaves `destination` untouched.
    #[instrument(skip_all, fields(segments = segments.len(), destination = %destination.display()))]
    pub async fn assemble(
        &self,
        segments: &[SegmentReference],
        destination: &Path,
        token: &CancellationToken,
    ) -> AssemblyResult {
        if segments.is_empty() {
            return Err(AssemblyError::EmptySegmentList);
        }

        let destination =
            std::path::absolute(destination).map_err(|e| AssemblyError::io(destination, e))?;
        let part_path = part_path(&destination);
        let file = File::create(&part_path)
            .await
            .map_err(|e| AssemblyError::io(&part_path, e))?;
        let mut writer = BufWriter::new(file);

        info!(
            segments = segments.len(),
            max_workers = self.max_workers,
            "Starting segment download"
        );
        let started = Instant::now();

        let batch_token = token.child_token();
        let mut tasks = self.spawn_workers(segments, &batch_token);

        let outcome = self
            .collect(&mut tasks, segments.len(), &mut writer, &part_path, token)
            .await;

        // Stops backoff sleeps and queued workers; in-flight results are dropped.
        batch_token.cancel();
        tasks.shutdown().await;

        match outcome {
            Ok(()) => {
                if let Err(err) = persist(writer, &part_path, &destination).await {
                    remove_part_file(&part_path).await;
                    warn!(error = %err, "Failed to finalize assembled output");
                    return Err(err);
                }

                info!(
                    segments = segments.len(),
                    duration = ?started.elapsed(),
                    path = %destination.display(),
                    "Segments assembled"
                );
                emit(
                    self.on_progress.as_ref(),
                    ProgressEvent::Finished {
                        path: destination.clone(),
                    },
                );
                Ok(destination)
            }
            Err(err) => {
                drop(writer);
                remove_part_file(&part_path).await;
                warn!(error = %err, "Segment assembly aborted");
                Err(err)
            }
        }
    }

    fn spawn_workers(
        &self,
        segments: &[SegmentReference],
        batch_token: &CancellationToken,
    ) -> JoinSet<WorkerOutput> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for segment in segments.iter().cloned() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let token = batch_token.clone();

            tasks.spawn(async move {
                let index = segment.sequence_index;
                let _permit = tokio::select! {
                    _ = token.cancelled() => return (index, Err(DownloadError::Cancelled)),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (index, Err(DownloadError::Cancelled)),
                    },
                };
                if token.is_cancelled() {
                    return (index, Err(DownloadError::Cancelled));
                }

                debug!(index, url = %segment.url, "Fetching segment");
                (index, fetcher.fetch(&segment.url, &token).await)
            });
        }

        tasks
    }

    /// Drain worker results until every segment is written or one fails.
    async fn collect(
        &self,
        tasks: &mut JoinSet<WorkerOutput>,
        total: usize,
        writer: &mut BufWriter<File>,
        part_path: &Path,
        token: &CancellationToken,
    ) -> Result<(), AssemblyError> {
        let mut reorder_buffer: BTreeMap<usize, Bytes> = BTreeMap::new();
        let mut next_index = 0usize;
        let mut completed = 0usize;

        emit(
            self.on_progress.as_ref(),
            ProgressEvent::SegmentsStarted { total },
        );

        loop {
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AssemblyError::Cancelled),
                joined = tasks.join_next() => joined,
            };

            let (index, result) = match joined {
                None => break,
                Some(Ok(output)) => output,
                Some(Err(join_err)) => {
                    return Err(AssemblyError::Worker {
                        reason: join_err.to_string(),
                    });
                }
            };

            let payload = match result {
                Ok(payload) => payload,
                Err(DownloadError::Cancelled) if token.is_cancelled() => {
                    return Err(AssemblyError::Cancelled);
                }
                Err(source) => {
                    return Err(AssemblyError::Segment {
                        position: index + 1,
                        total,
                        source,
                    });
                }
            };

            completed += 1;
            emit(
                self.on_progress.as_ref(),
                ProgressEvent::SegmentCompleted { completed, total },
            );

            reorder_buffer.insert(index, payload);
            while let Some(payload) = reorder_buffer.remove(&next_index) {
                writer
                    .write_all(&payload)
                    .await
                    .map_err(|e| AssemblyError::io(part_path, e))?;
                next_index += 1;
            }
            debug!(
                index,
                completed,
                written = next_index,
                buffered = reorder_buffer.len(),
                "Segment completed"
            );
        }

        if next_index != total {
            return Err(AssemblyError::Worker {
                reason: format!("only {next_index} of {total} segments were written"),
            });
        }

        writer
            .flush()
            .await
            .map_err(|e| AssemblyError::io(part_path, e))
    }
}

/// Sync the part file to disk and move it onto `destination`.
async fn persist(
    writer: BufWriter<File>,
    part_path: &Path,
    destination: &Path,
) -> Result<(), AssemblyError> {
    let file = writer.into_inner();
    file.sync_all()
        .await
        .map_err(|e| AssemblyError::io(part_path, e))?;
    drop(file);
    tokio::fs::rename(part_path, destination)
        .await
        .map_err(|e| AssemblyError::io(destination, e))
}

/// Sibling temporary path: `video.mp4` -> `video.mp4.part`.
pub(crate) fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    destination.with_file_name(name)
}

pub(crate) async fn remove_part_file(part_path: &Path) {
    match tokio::fs::remove_file(part_path).await {
        Ok(()) => debug!(path = %part_path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %part_path.display(), error = %e, "Failed to remove partial output"),
    }
}
