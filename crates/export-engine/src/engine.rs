//! Executes planned jobs against the frame source and transcode backend.
//!
//! Each job moves through
//! `Planned -> Validating -> {Skipped | Executing -> {Succeeded | Failed}}`.
//! A job that fails never stops the jobs after it; only an output folder
//! that cannot be created ends the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{ProgressCallback, TranscodeBackend};
use crate::error::{ExportError, ExportResult};
use crate::frame_source::{FrameSource, VideoInfo};
use crate::planner::{ExportJob, ExportPlan, JobKind};
use crate::still::write_png;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Planned,
    Validating,
    Skipped(ExportError),
    Executing,
    Succeeded(PathBuf),
    Failed(ExportError),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Final state of one planned job, or of one entry the planner skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub display_name: String,

    /// `None` for entries skipped while planning.
    pub kind: Option<JobKind>,

    pub state: JobState,
}

/// Result of a whole export run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,

    /// Set when the run was aborted between jobs.
    pub aborted: bool,

    /// Jobs never started because of an abort.
    pub pending: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&JobOutcome, &Path)> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            JobState::Succeeded(path) => Some((o, path.as_path())),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&JobOutcome, &ExportError)> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            JobState::Failed(err) => Some((o, err)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&JobOutcome, &ExportError)> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            JobState::Skipped(err) => Some((o, err)),
            _ => None,
        })
    }
}

/// Runs export jobs one at a time.
pub struct TranscodeEngine {
    backend: Box<dyn TranscodeBackend>,
    source: Box<dyn FrameSource>,
    abort: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
}

impl TranscodeEngine {
    pub fn new(backend: Box<dyn TranscodeBackend>, source: Box<dyn FrameSource>) -> Self {
        Self {
            backend,
            source,
            abort: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag checked between jobs; setting it stops the run after the
    /// current job.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run a whole plan.
    ///
    /// Returns `Err` only when an output folder cannot be created; nothing
    /// has been written at that point.
    pub fn run(&mut self, plan: &ExportPlan) -> ExportResult<BatchReport> {
        for dir in plan.output_dirs() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                let err = ExportError::OutputDirectory {
                    path: dir.clone(),
                    detail: e.to_string(),
                };
                tracing::error!(error = %err, "Export aborted");
                err
            })?;
        }

        let mut report = BatchReport::default();
        report.outcomes.extend(plan.skipped.iter().map(|err| JobOutcome {
            display_name: err.display_name().unwrap_or_default().to_string(),
            kind: None,
            state: JobState::Skipped(err.clone()),
        }));

        tracing::info!(
            jobs = plan.jobs.len(),
            backend = self.backend.name(),
            "Starting export"
        );
        for (index, job) in plan.jobs.iter().enumerate() {
            if self.abort.load(Ordering::SeqCst) {
                report.aborted = true;
                report.pending = plan.jobs.len() - index;
                tracing::warn!(pending = report.pending, "Export aborted");
                break;
            }
            let state = self.drive(job);
            report.outcomes.push(JobOutcome {
                display_name: job.display_name.clone(),
                kind: Some(job.kind),
                state,
            });
        }

        tracing::info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            skipped = report.skipped().count(),
            "Export finished"
        );
        Ok(report)
    }

    /// Validate and run one job.
    pub fn execute(&mut self, job: &ExportJob) -> ExportResult<PathBuf> {
        let info = self.validate(job)?;
        self.perform(job, &info)
    }

    fn drive(&mut self, job: &ExportJob) -> JobState {
        let mut state = JobState::Planned;
        tracing::debug!(display_name = %job.display_name, kind = %job.kind, state = ?state, "Job queued");

        state = JobState::Validating;
        tracing::debug!(display_name = %job.display_name, kind = %job.kind, state = ?state, "Job state");
        let info = match self.validate(job) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(display_name = %job.display_name, kind = %job.kind, error = %err, "Job skipped");
                return JobState::Skipped(err);
            }
        };

        state = JobState::Executing;
        tracing::debug!(display_name = %job.display_name, kind = %job.kind, state = ?state, "Job state");
        match self.perform(job, &info) {
            Ok(path) => {
                tracing::info!(
                    display_name = %job.display_name,
                    kind = %job.kind,
                    output = %path.display(),
                    "Job succeeded"
                );
                JobState::Succeeded(path)
            }
            Err(err) => {
                tracing::error!(display_name = %job.display_name, kind = %job.kind, error = %err, "Job failed");
                JobState::Failed(err)
            }
        }
    }

    /// Re-check the job against the source as it is now. The handle opened
    /// here is closed before returning.
    fn validate(&self, job: &ExportJob) -> ExportResult<VideoInfo> {
        let info = self
            .source
            .open(&job.source_path)
            .map_err(|e| ExportError::SourceUnavailable {
                display_name: job.display_name.clone(),
                path: job.source_path.clone(),
                detail: e.to_string(),
            })?
            .info();

        if job.trim_start >= info.frame_count {
            return Err(ExportError::TrimOutOfRange {
                display_name: job.display_name.clone(),
                trim_start: job.trim_start,
                frame_count: info.frame_count,
            });
        }
        if let Some(crop) = job.crop {
            crop.check_bounds(info.size())
                .map_err(|violation| ExportError::InvalidRegion {
                    display_name: job.display_name.clone(),
                    crop,
                    source_size: info.size(),
                    violation,
                })?;
        }
        Ok(info)
    }

    fn perform(&mut self, job: &ExportJob, info: &VideoInfo) -> ExportResult<PathBuf> {
        match job.kind {
            JobKind::StillImage => self.export_still(job)?,
            JobKind::CroppedVideo | JobKind::UncroppedVideo => self.export_video(job, info)?,
        }
        if let Some(caption) = &job.caption {
            let sidecar = job.sidecar_path();
            std::fs::write(&sidecar, caption).map_err(|e| ExportError::OutputWrite {
                display_name: job.display_name.clone(),
                path: sidecar.clone(),
                detail: e.to_string(),
            })?;
        }
        Ok(job.output_path.clone())
    }

    fn export_still(&mut self, job: &ExportJob) -> ExportResult<()> {
        let read_failure = |detail: String| ExportError::FrameReadFailure {
            display_name: job.display_name.clone(),
            frame: job.trim_start,
            detail,
        };

        let frame = {
            let mut handle = self
                .source
                .open(&job.source_path)
                .map_err(|e| read_failure(e.to_string()))?;
            handle
                .seek(job.trim_start)
                .map_err(|e| read_failure(e.to_string()))?;
            handle
                .read_frame()
                .map_err(|e| read_failure(e.to_string()))?
                .ok_or_else(|| read_failure("end of stream".to_string()))?
        };

        let frame = match &job.crop {
            Some(region) => frame
                .crop(region)
                .ok_or_else(|| read_failure(format!("crop {region} does not fit the decoded {} frame", frame.size())))?,
            None => frame,
        };

        write_png(&frame, &job.output_path).map_err(|e| ExportError::OutputWrite {
            display_name: job.display_name.clone(),
            path: job.output_path.clone(),
            detail: e.to_string(),
        })
    }

    fn export_video(&mut self, job: &ExportJob, info: &VideoInfo) -> ExportResult<()> {
        let Some(request) = job.to_request() else {
            return Ok(());
        };
        tracing::debug!(
            display_name = %job.display_name,
            source_size = %info.size(),
            filters = %request.filter_chain(),
            "Transcoding"
        );

        self.backend
            .transcode(&request, self.progress.as_ref())
            .map_err(|e| ExportError::BackendFailure {
                display_name: job.display_name.clone(),
                backend: self.backend.name().to_string(),
                diagnostic: e.to_string(),
            })?;

        match self.backend.probe_frame_count(&job.output_path) {
            Ok(frames) => tracing::info!(
                display_name = %job.display_name,
                output = %job.output_path.display(),
                frames,
                "Output probed"
            ),
            Err(e) => tracing::warn!(
                display_name = %job.display_name,
                output = %job.output_path.display(),
                error = %e,
                "Could not probe output frame count"
            ),
        }
        Ok(())
    }
}
