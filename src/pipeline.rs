use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::color::{ColorExtractor, DominantColors};
use crate::config::PipelineConfig;
use crate::detection::VehicleDetector;
use crate::error::{ConfigError, DecodeError, InferenceError, PipelineError};
use crate::mask::{self, VehicleMask};
use crate::models::{BatchSummary, ColorCluster, Detection, DetectionResult, ImageRecord, SummaryRow};
use crate::progress::{CancelToken, ChannelProgress, ProgressEvent, ProgressSink};
use crate::sink::{CsvResultSink, ResultSink};
use crate::source::{self, DecodedImage, ImageSource};

/// Where a batch run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Scanning,
    Detecting,
    Masking,
    Clustering,
    Recording,
    ErrorSkipped,
    Done,
}

fn enter(state: &mut BatchState, next: BatchState) {
    tracing::trace!(from = ?*state, to = ?next, "batch state");
    *state = next;
}

/// Everything the pipeline learned about one image
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub record: ImageRecord,
    pub detections: Vec<Detection>,
    pub mask: VehicleMask,
    pub has_vehicle: bool,
    /// `None` when extraction was skipped for a vehicle-free batch image
    pub colors: Option<DominantColors>,
}

impl ImageAnalysis {
    pub fn clusters(&self) -> &[ColorCluster] {
        self.colors.as_ref().map(|c| c.clusters.as_slice()).unwrap_or(&[])
    }

    pub fn to_result(&self) -> DetectionResult {
        DetectionResult {
            file_name: self.record.file_name(),
            has_vehicle: self.has_vehicle,
            clusters: self.clusters().to_vec(),
        }
    }
}

/// Outcome of one batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub vehicles: usize,
    /// Files that could not be decoded, with the reason
    pub failures: Vec<(String, String)>,
    pub cancelled: bool,
    pub summary: BatchSummary,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
}

/// Vehicle detection and dominant-color pipeline.
///
/// Holds only immutable state (detector, configuration), so one instance
/// can serve interactive requests and batch runs alike.
pub struct Pipeline {
    detector: Arc<dyn VehicleDetector>,
    config: PipelineConfig,
    extractor: ColorExtractor,
}

impl Pipeline {
    pub fn new(detector: Arc<dyn VehicleDetector>, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = ColorExtractor::from_config(&config);
        Ok(Self {
            detector,
            config,
            extractor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Inference failures count as "nothing detected".
    fn absorb(file_name: &str, result: Result<Vec<Detection>, InferenceError>) -> Vec<Detection> {
        result.unwrap_or_else(|e| {
            tracing::warn!(file = file_name, error = %e, "inference failed, treating as no detections");
            Vec::new()
        })
    }

    /// Mask and colors for an image whose detections are known.
    ///
    /// Colors are extracted for vehicle images, and for every image when
    /// `always_extract` is set.
    fn analyze(
        &self,
        decoded: &DecodedImage,
        detections: Vec<Detection>,
        extractor: &ColorExtractor,
        always_extract: bool,
        state: &mut BatchState,
    ) -> ImageAnalysis {
        enter(state, BatchState::Masking);
        let outcome = mask::build_mask(
            decoded.image.width(),
            decoded.image.height(),
            &detections,
            &self.config.target_classes,
        );
        let has_vehicle = outcome.has_vehicle();

        let colors = (always_extract || has_vehicle).then(|| {
            enter(state, BatchState::Clustering);
            extractor.extract(&decoded.image, &outcome.mask)
        });

        ImageAnalysis {
            record: decoded.record.clone(),
            detections,
            mask: outcome.mask,
            has_vehicle,
            colors,
        }
    }

    /// Full analysis of one image. Colors are always extracted.
    pub fn inspect(&self, path: &Path) -> Result<ImageAnalysis, DecodeError> {
        let decoded = source::decode_image(path)?;
        let file_name = decoded.record.file_name();
        let detections = Self::absorb(&file_name, self.detector.detect(&decoded.image));
        Ok(self.analyze(&decoded, detections, &self.extractor, true, &mut BatchState::Idle))
    }

    /// Dominant colors of one image, whether or not it shows a vehicle.
    pub fn extract_colors(&self, path: &Path, cluster_count: usize) -> Result<Vec<ColorCluster>, DecodeError> {
        let decoded = source::decode_image(path)?;
        let file_name = decoded.record.file_name();
        let detections = Self::absorb(&file_name, self.detector.detect(&decoded.image));
        let extractor = self.extractor.clone().with_cluster_count(cluster_count.max(1));
        let analysis = self.analyze(&decoded, detections, &extractor, true, &mut BatchState::Idle);
        Ok(analysis.colors.map(|c| c.clusters).unwrap_or_default())
    }

    /// Run the batch, writing the ledger and copies configured in `config`.
    pub fn run(&self, input_dir: &Path, progress: &dyn ProgressSink, cancel: &CancelToken) -> Result<BatchReport, PipelineError> {
        let mut sink = CsvResultSink::create(&self.config.summary_path, &self.config.output_dir)?;
        self.run_batch(input_dir, &mut sink, progress, cancel)
    }

    /// Process every image of `input_dir` in lexical order.
    ///
    /// Per-image failures are logged and skipped; only sink and input
    /// directory failures end the run early. Cancellation is honored
    /// between images.
    pub fn run_batch(
        &self,
        input_dir: &Path,
        sink: &mut dyn ResultSink,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<BatchReport, PipelineError> {
        let span = tracing::info_span!("batch", dir = %input_dir.display());
        let _enter = span.enter();
        let started_at = OffsetDateTime::now_utc();

        let mut state = BatchState::Idle;
        enter(&mut state, BatchState::Scanning);
        let images = ImageSource::open(input_dir)?;
        let total = images.len();
        tracing::info!(total, detector = self.detector.name(), "starting batch");

        let mut processed = 0;
        let mut vehicles = 0;
        let mut failures = Vec::new();
        let mut summary = Vec::with_capacity(total);
        let mut cancelled = false;
        let mut reached_end = total == 0;

        let mut files = images.iter();
        'batch: loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let chunk: Vec<_> = files.by_ref().take(self.config.detect_batch_size).collect();
            if chunk.is_empty() {
                break;
            }

            enter(&mut state, BatchState::Detecting);
            let decoded: Vec<_> = chunk
                .iter()
                .filter_map(|(_, image)| image.as_ref().ok().map(|d| &d.image))
                .collect();
            let mut detections = self.detector.detect_batch(&decoded).into_iter();

            for (file_name, image) in chunk {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'batch;
                }
                let _image_span = tracing::debug_span!("image", file = %file_name).entered();
                let source_path = images.dir().join(&file_name);

                let result = match image {
                    Err(e) => {
                        enter(&mut state, BatchState::ErrorSkipped);
                        tracing::warn!(error = %e, "skipping unreadable image");
                        progress.on_event(ProgressEvent::Skipped {
                            file_name: file_name.clone(),
                            reason: e.reason.clone(),
                        });
                        failures.push((file_name.clone(), e.reason));
                        DetectionResult {
                            file_name: file_name.clone(),
                            has_vehicle: false,
                            clusters: Vec::new(),
                        }
                    }
                    Ok(decoded) => {
                        let found = detections
                            .next()
                            .map(|r| Self::absorb(&file_name, r))
                            .unwrap_or_default();

                        let analysis = self.analyze(&decoded, found, &self.extractor, false, &mut state);
                        tracing::debug!(
                            detections = analysis.detections.len(),
                            has_vehicle = analysis.has_vehicle,
                            colors = analysis.clusters().len(),
                            "analyzed"
                        );
                        analysis.to_result()
                    }
                };

                enter(&mut state, BatchState::Recording);
                sink.record(&result, &source_path)?;
                if result.has_vehicle {
                    vehicles += 1;
                    tracing::info!(file = %file_name, "vehicle found");
                }
                summary.push(SummaryRow {
                    file_name: result.file_name,
                    has_vehicle: result.has_vehicle,
                });

                processed += 1;
                reached_end = processed == total;
                progress.on_event(ProgressEvent::Advanced {
                    processed,
                    total,
                    fraction: if reached_end { 1.0 } else { processed as f32 / total as f32 },
                });
            }
        }

        sink.finish()?;
        enter(&mut state, BatchState::Done);

        // An empty directory never produced a per-image 1.0
        if total == 0 {
            progress.on_event(ProgressEvent::Advanced {
                processed: 0,
                total: 0,
                fraction: 1.0,
            });
        }
        debug_assert!(cancelled || reached_end);
        progress.on_event(ProgressEvent::Finished {
            processed,
            vehicles,
            cancelled,
        });

        tracing::info!(processed, vehicles, failed = failures.len(), cancelled, "batch finished");

        Ok(BatchReport {
            total,
            processed,
            vehicles,
            failures,
            cancelled,
            summary,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        })
    }

    /// Run the batch on a blocking worker, reporting progress over a channel.
    /// Must be called from within a tokio runtime.
    pub fn spawn_batch(self: Arc<Self>, input_dir: PathBuf) -> BatchHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            let progress = ChannelProgress::new(sender);
            self.run(&input_dir, &progress, &token)
        });

        BatchHandle {
            progress: receiver,
            cancel,
            task,
        }
    }
}

/// A batch running in the background
pub struct BatchHandle {
    progress: UnboundedReceiver<ProgressEvent>,
    cancel: CancelToken,
    task: JoinHandle<Result<BatchReport, PipelineError>>,
}

impl BatchHandle {
    /// Next progress event; `None` once the batch has ended and all events were read.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// Ask the batch to stop before its next image.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> Result<BatchReport, PipelineError> {
        self.task
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?
    }
}
