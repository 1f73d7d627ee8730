//! # Job Runner
//!
//! Drives one job through
//! `pending → generating → slicing → assembling → … → combining → emitting_metadata → completed`.
//!
//! Animations run one after another in request order. Pixel work happens on the blocking
//! pool and results are persisted between stages. Any error fails the whole job: the
//! record becomes `Failed` and the job directory is removed, so a job directory on disk
//! always belongs to a running or completed job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};

use super::paths::{ArtifactKind, ArtifactLayout};
use super::store::{InMemoryJobStore, JobStore};
use super::{AnimationReport, JobId, JobRecord, JobReport, JobRequest, JobStatus};
use crate::config::{ForgeConfig, GeneratorConfig, MetadataConfig, PresetStore};
use crate::error::{SpriteError, SpriteResult};
use crate::generator::{SheetGenerator, SheetRequest, select_generator};
use crate::processing::assemble::{make_combined_sheet, make_gif, make_sheet};
use crate::processing::background::BackgroundRemover;
use crate::processing::metadata::{AnimationArtifacts, build_metadata};
use crate::processing::normalize::FrameNormalizer;
use crate::processing::slice::process_sheet;

pub struct JobRunner {
    generator: Arc<dyn SheetGenerator>,
    store: Arc<dyn JobStore>,
    remover: Arc<BackgroundRemover>,
    layout: ArtifactLayout,
    metadata: MetadataConfig,
    presets: PresetStore,
    seed: u64,
}

impl JobRunner {
    pub fn builder() -> JobRunnerBuilder {
        JobRunnerBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.store.get(id).map(|r| r.status)
    }

    /// Resolve `request` against its preset and store a pending record.
    pub fn submit(&self, request: JobRequest) -> SpriteResult<JobId> {
        let preset = self.presets.load(&request.preset);
        preset.validate()?;
        let animations = request.resolve(&preset)?;

        let id = JobId::new();
        let mut record = JobRecord::new(
            id.clone(),
            request.prompt.trim(),
            preset,
            animations,
            request.seed.unwrap_or(self.seed),
        );
        record.refinement = request
            .refinement
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        tracing::info!(
            job = %id,
            preset = %record.preset.name,
            animations = record.animations.len(),
            "job submitted"
        );
        self.store.put(record);
        Ok(id)
    }

    /// Run a pending job to completion.
    ///
    /// The job is claimed by a compare-and-set from `Pending` to the first `Generating`
    /// state, so concurrent calls for the same id run it at most once.
    pub async fn run(&self, id: &JobId) -> SpriteResult<JobReport> {
        let pending = self
            .store
            .get(id)
            .ok_or_else(|| SpriteError::validation("job_id", "known job", id.as_str()))?;
        let first = pending.animations.names().next().unwrap_or_default();
        let claimed = JobStatus::Generating {
            animation: first.to_string(),
        };
        let record = self
            .store
            .swap_status(id, &JobStatus::Pending, claimed)
            .map_err(|e| e.with_operation("run"))?;
        tracing::info!(job = %id, status = %record.status, "job status");

        tracing::info!(job = %id, generator = self.generator.name(), "job started");
        match self.execute(&record).await {
            Ok(report) => {
                self.store.update(id, &mut |r| {
                    r.status = JobStatus::Completed;
                    r.report = Some(report.clone());
                })?;
                tracing::info!(job = %id, animations = report.animations.len(), "job completed");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(job = %id, category = e.category(), error = %e, "job failed");
                let reason = e.to_string();
                if let Err(store_err) = self.store.update(id, &mut |r| {
                    r.status = JobStatus::Failed {
                        reason: reason.clone(),
                    };
                }) {
                    tracing::warn!(job = %id, error = %store_err, "could not record failure");
                }
                self.discard(id);
                Err(e)
            }
        }
    }

    /// [`submit`](Self::submit) then [`run`](Self::run).
    pub async fn generate(&self, request: JobRequest) -> SpriteResult<JobReport> {
        let id = self.submit(request)?;
        self.run(&id).await
    }

    fn transition(&self, id: &JobId, status: JobStatus) -> SpriteResult<()> {
        tracing::info!(job = %id, status = %status, "job status");
        self.store.update(id, &mut |r| r.status = status.clone())?;
        Ok(())
    }

    fn discard(&self, id: &JobId) {
        let dir = self.layout.job_dir(id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "removed partial job output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "could not remove job output"),
        }
    }

    async fn execute(&self, record: &JobRecord) -> SpriteResult<JobReport> {
        let id = &record.id;
        let preset = &record.preset;
        let (canvas_w, canvas_h) = preset.canvas;
        let duration_ms = preset.frame_duration_ms;

        let job_dir = self.layout.job_dir(id);
        blocking("create job dir", move || create_dir(&job_dir)).await?;

        let mut rows = Vec::with_capacity(record.animations.len());
        let mut artifacts = Vec::with_capacity(record.animations.len());
        let mut reports = Vec::with_capacity(record.animations.len());
        let mut urls = vec![
            (
                "combined_sheet".to_string(),
                self.layout.url(id, ArtifactKind::CombinedSheet),
            ),
            (
                "metadata".to_string(),
                self.layout.url(id, ArtifactKind::Metadata),
            ),
        ];

        for (index, (name, frame_count)) in record.animations.iter().enumerate() {
            // the first animation was entered when the job was claimed
            if index > 0 {
                self.transition(
                    id,
                    JobStatus::Generating {
                        animation: name.to_string(),
                    },
                )?;
            }
            let request = SheetRequest {
                prompt: record.prompt.clone(),
                animation: name.to_string(),
                frame_count,
                style: preset.style.clone(),
                canvas: preset.canvas,
                seed: record.seed,
                refinement: record.refinement.clone(),
            };
            let bytes = self
                .generator
                .generate_sheet(&request)
                .await
                .map_err(|e| e.with_operation(format!("generate '{}'", name)))?;

            self.transition(
                id,
                JobStatus::Slicing {
                    animation: name.to_string(),
                },
            )?;
            let frame_paths: Vec<PathBuf> = (0..frame_count as usize)
                .map(|i| self.layout.path(id, ArtifactKind::Frame(name, i)))
                .collect();
            let frames = {
                let remover = Arc::clone(&self.remover);
                let raw_path = self.layout.path(id, ArtifactKind::RawSheet(name));
                let frame_dir = self.layout.frame_dir(id, name);
                let frame_paths = frame_paths.clone();
                blocking("slice sheet", move || {
                    let sheet = image::load_from_memory(&bytes)
                        .map_err(|e| SpriteError::image("decode sheet", e))?
                        .to_rgba8();
                    save_png(&sheet, &raw_path)?;

                    let mut normalizer = FrameNormalizer::new(canvas_w, canvas_h);
                    let sliced = process_sheet(&sheet, frame_count, &remover, &mut normalizer)?;

                    create_dir(&frame_dir)?;
                    for (frame, path) in sliced.frames.iter().zip(&frame_paths) {
                        save_png(frame, path)?;
                    }
                    Ok(sliced.frames)
                })
                .await
                .map_err(|e| e.with_context(format!("animation '{}'", name)))?
            };

            self.transition(
                id,
                JobStatus::Assembling {
                    animation: name.to_string(),
                },
            )?;
            let sheet_path = self.layout.path(id, ArtifactKind::Sheet(name));
            let gif_path = self.layout.path(id, ArtifactKind::Gif(name));
            let frames = {
                let sheet_path = sheet_path.clone();
                let gif_path = gif_path.clone();
                blocking("assemble animation", move || {
                    let sheet = make_sheet(&frames)?;
                    save_png(&sheet, &sheet_path)?;
                    let gif = make_gif(&frames, duration_ms)?;
                    write_file(&gif_path, &gif)?;
                    Ok(frames)
                })
                .await
                .map_err(|e| e.with_context(format!("animation '{}'", name)))?
            };

            let frame_strings: Vec<String> =
                frame_paths.iter().map(|p| p.display().to_string()).collect();
            artifacts.push(AnimationArtifacts {
                name: name.to_string(),
                frame_count,
                sprite_sheet: sheet_path.display().to_string(),
                gif: gif_path.display().to_string(),
                frames: frame_strings.clone(),
            });
            reports.push((
                name.to_string(),
                AnimationReport {
                    sprite_sheet: sheet_path.display().to_string(),
                    gif: gif_path.display().to_string(),
                    frame_count,
                    frames: frame_strings,
                },
            ));
            urls.push((
                format!("{}_sheet", name),
                self.layout.url(id, ArtifactKind::Sheet(name)),
            ));
            urls.push((
                format!("{}_gif", name),
                self.layout.url(id, ArtifactKind::Gif(name)),
            ));
            rows.push(frames);
        }

        self.transition(id, JobStatus::Combining)?;
        let combined_path = self.layout.path(id, ArtifactKind::CombinedSheet);
        {
            let combined_path = combined_path.clone();
            blocking("combine sheets", move || {
                let combined = make_combined_sheet(&rows)?;
                save_png(&combined, &combined_path)
            })
            .await?;
        }

        self.transition(id, JobStatus::EmittingMetadata)?;
        let metadata = build_metadata(
            id.as_str(),
            &record.prompt,
            preset,
            &artifacts,
            &self.metadata,
        );
        let json = serde_json::to_vec_pretty(&metadata)?;
        let metadata_path = self.layout.path(id, ArtifactKind::Metadata);
        {
            let metadata_path = metadata_path.clone();
            blocking("write metadata", move || write_file(&metadata_path, &json)).await?;
        }

        Ok(JobReport {
            job_id: id.to_string(),
            status: JobStatus::Completed.to_string(),
            prompt: record.prompt.clone(),
            preset: preset.name.clone(),
            frame_size: preset.canvas,
            animations: reports,
            combined_sheet: combined_path.display().to_string(),
            metadata: metadata_path.display().to_string(),
            download_urls: urls,
        })
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> SpriteResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SpriteResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SpriteError::processing(operation, e.to_string()))?
}

fn create_dir(path: &Path) -> SpriteResult<()> {
    std::fs::create_dir_all(path).map_err(|e| SpriteError::io_at("create dir", path, e))
}

fn save_png(image: &RgbaImage, path: &Path) -> SpriteResult<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| SpriteError::image("save png", e).with_context(path.display().to_string()))
}

fn write_file(path: &Path, bytes: &[u8]) -> SpriteResult<()> {
    std::fs::write(path, bytes).map_err(|e| SpriteError::io_at("write", path, e))
}

/// Builder for [`JobRunner`]. Only the generator is mandatory.
#[derive(Default)]
pub struct JobRunnerBuilder {
    generator: Option<Arc<dyn SheetGenerator>>,
    store: Option<Arc<dyn JobStore>>,
    remover: Option<BackgroundRemover>,
    layout: Option<ArtifactLayout>,
    metadata: MetadataConfig,
    presets: PresetStore,
    seed: Option<u64>,
}

impl JobRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything from `config`, including the generator it selects.
    pub fn from_config(config: &ForgeConfig) -> SpriteResult<Self> {
        config.validate()?;
        Ok(Self::new()
            .with_generator(select_generator(&config.generator)?)
            .with_background_remover(BackgroundRemover::from_config(&config.background))
            .with_layout(ArtifactLayout::new(config.output_root.clone()))
            .with_metadata_config(config.metadata.clone())
            .with_presets(PresetStore::new(config.presets_dir.clone()))
            .with_seed(config.generator.seed))
    }

    pub fn with_generator(mut self, generator: Arc<dyn SheetGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_background_remover(mut self, remover: BackgroundRemover) -> Self {
        self.remover = Some(remover);
        self
    }

    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_metadata_config(mut self, metadata: MetadataConfig) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_presets(mut self, presets: PresetStore) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> SpriteResult<JobRunner> {
        let generator = self.generator.ok_or_else(|| {
            SpriteError::config("generator", "", "no sheet generator configured")
        })?;
        Ok(JobRunner {
            generator,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryJobStore::new())),
            remover: Arc::new(self.remover.unwrap_or_default()),
            layout: self.layout.unwrap_or_default(),
            metadata: self.metadata,
            presets: self.presets,
            seed: self.seed.unwrap_or(GeneratorConfig::default().seed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnimationSet, Preset};
    use crate::generator::MockGenerator;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FailingGenerator;

    #[async_trait]
    impl SheetGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate_sheet(&self, request: &SheetRequest) -> SpriteResult<Vec<u8>> {
            if request.animation == "run" {
                Err(SpriteError::generator("failing", Some(503), "upstream busy"))
            } else {
                MockGenerator::new().generate_sheet(request).await
            }
        }
    }

    /// Records every status the runner passes through.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryJobStore,
        seen: Mutex<Vec<String>>,
    }

    impl JobStore for RecordingStore {
        fn get(&self, id: &JobId) -> Option<JobRecord> {
            self.inner.get(id)
        }

        fn put(&self, record: JobRecord) {
            self.inner.put(record)
        }

        fn update(&self, id: &JobId, f: &mut dyn FnMut(&mut JobRecord)) -> SpriteResult<JobRecord> {
            let record = self.inner.update(id, f)?;
            self.seen.lock().unwrap().push(record.status.to_string());
            Ok(record)
        }

        fn swap_status(
            &self,
            id: &JobId,
            expected: &JobStatus,
            next: JobStatus,
        ) -> SpriteResult<JobRecord> {
            let record = self.inner.swap_status(id, expected, next)?;
            self.seen.lock().unwrap().push(record.status.to_string());
            Ok(record)
        }
    }

    fn tiny_presets(dir: &Path) -> PresetStore {
        let store = PresetStore::new(Some(dir.to_path_buf()));
        store
            .save(&Preset {
                name: "tiny".to_string(),
                display_name: "Tiny".to_string(),
                description: String::new(),
                style: "pixel art".to_string(),
                medium: String::new(),
                canvas: (32, 32),
                color_scheme: String::new(),
                frame_rate: 10,
                frame_duration_ms: 100,
                animations: AnimationSet::from_iter([("idle", 2), ("run", 3)]),
            })
            .unwrap();
        store
    }

    fn runner(
        generator: Arc<dyn SheetGenerator>,
        store: Arc<dyn JobStore>,
        tmp: &Path,
    ) -> JobRunner {
        JobRunner::builder()
            .with_generator(generator)
            .with_store(store)
            .with_layout(ArtifactLayout::new(tmp.join("out")))
            .with_presets(tiny_presets(&tmp.join("presets")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_generator() {
        let err = JobRunner::builder().build().err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn test_state_machine_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let runner = runner(Arc::new(MockGenerator::new()), store.clone(), tmp.path());

        let report = runner
            .generate(JobRequest::new("a robot", "tiny"))
            .await
            .unwrap();
        assert_eq!(report.status, "completed");

        let seen = store.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            [
                "generating(idle)",
                "slicing(idle)",
                "assembling(idle)",
                "generating(run)",
                "slicing(run)",
                "assembling(run)",
                "combining",
                "emitting_metadata",
                "completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_generator_failure_fails_job_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let runner = runner(Arc::new(FailingGenerator), store.clone(), tmp.path());

        let id = runner.submit(JobRequest::new("a robot", "tiny")).unwrap();
        let err = runner.run(&id).await.unwrap_err();
        assert_eq!(err.category(), "generator");

        let record = store.get(&id).unwrap();
        match record.status {
            JobStatus::Failed { reason } => assert!(reason.contains("upstream busy")),
            other => panic!("unexpected status {other}"),
        }
        assert!(record.report.is_none());
        assert!(!runner.layout().job_dir(&id).exists());
    }

    #[tokio::test]
    async fn test_only_pending_jobs_run() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner(
            Arc::new(MockGenerator::new()),
            Arc::new(InMemoryJobStore::new()),
            tmp.path(),
        );
        let id = runner.submit(JobRequest::new("a robot", "tiny")).unwrap();
        runner.run(&id).await.unwrap();

        let err = runner.run(&id).await.unwrap_err();
        assert_eq!(err.category(), "state");
        assert_eq!(runner.status(&id), Some(JobStatus::Completed));
        assert!(runner.layout().job_dir(&id).join("metadata.json").exists());

        let unknown = runner.run(&JobId::new()).await.unwrap_err();
        assert_eq!(unknown.category(), "validation");
    }

    #[tokio::test]
    async fn test_concurrent_runs_of_one_job_run_it_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::default());
        let runner = runner(Arc::new(MockGenerator::new()), store.clone(), tmp.path());
        let id = runner.submit(JobRequest::new("a robot", "tiny")).unwrap();

        let (a, b) = tokio::join!(runner.run(&id), runner.run(&id));
        let (ok, err) = match (a, b) {
            (Ok(report), Err(e)) | (Err(e), Ok(report)) => (report, e),
            (a, b) => panic!("expected one run to win: {a:?} / {b:?}"),
        };
        assert_eq!(err.category(), "state");
        assert_eq!(ok.status, "completed");
        assert_eq!(runner.status(&id), Some(JobStatus::Completed));
        assert!(runner.layout().job_dir(&id).join("metadata.json").exists());

        let seen = store.seen.lock().unwrap().clone();
        assert_eq!(seen.iter().filter(|s| *s == "generating(idle)").count(), 1);
        assert_eq!(seen.iter().filter(|s| *s == "emitting_metadata").count(), 1);
    }

    /// Keeps the refinement of every sheet request it serves.
    #[derive(Default)]
    struct CapturingGenerator {
        refinements: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl SheetGenerator for CapturingGenerator {
        fn name(&self) -> &str {
            "capturing"
        }

        async fn generate_sheet(&self, request: &SheetRequest) -> SpriteResult<Vec<u8>> {
            self.refinements
                .lock()
                .unwrap()
                .push(request.refinement.clone());
            MockGenerator::new().generate_sheet(request).await
        }
    }

    #[tokio::test]
    async fn test_refinement_reaches_every_sheet_request() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = Arc::new(CapturingGenerator::default());
        let runner = runner(
            generator.clone(),
            Arc::new(InMemoryJobStore::new()),
            tmp.path(),
        );

        let request = JobRequest::new("a robot", "tiny").with_refinement("  keep the cape red ");
        runner.generate(request).await.unwrap();
        runner
            .generate(JobRequest::new("a robot", "tiny").with_refinement("   "))
            .await
            .unwrap();

        let seen = generator.refinements.lock().unwrap().clone();
        let cape = Some("keep the cape red".to_string());
        assert_eq!(seen, [cape.clone(), cape, None, None]);
    }

    #[tokio::test]
    async fn test_request_seed_overrides_default() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let runner = runner(Arc::new(MockGenerator::new()), store.clone(), tmp.path());

        let default_id = runner.submit(JobRequest::new("a robot", "tiny")).unwrap();
        let seeded_id = runner
            .submit(JobRequest::new("a robot", "tiny").with_seed(7))
            .unwrap();
        assert_eq!(store.get(&default_id).unwrap().seed, 42);
        assert_eq!(store.get(&seeded_id).unwrap().seed, 7);
    }
}
