//! In-memory collaborators for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;

use super::progress::ProgressSink;
use super::render::ffmpeg::{JobKind, MediaProbe, TranscodeJob, Transcoder};
use super::sourcing::{AssetFetcher, MediaSearch, SearchError, SearchHit, SearchRequest};
use super::translate::Translator;

/// Transcoder that writes placeholder files and tracks their durations.
///
/// Output durations follow the job: trims yield the requested length (or
/// the source length when shorter), concats the sum of their inputs, music
/// fits and muxes their expected duration.
#[derive(Default)]
pub struct FakeTranscoder {
    media: Mutex<HashMap<PathBuf, MediaProbe>>,
    jobs: Mutex<Vec<TranscodeJob>>,
    fail_inputs: Mutex<HashSet<PathBuf>>,
    fail_kinds: Mutex<HashSet<JobKind>>,
    /// Added to every trim result
    trim_drift: Mutex<f64>,
}

impl FakeTranscoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, path: &Path, duration: Option<f64>, width: u32, height: u32) {
        if let Ok(mut media) = self.media.lock() {
            media.insert(
                path.to_path_buf(),
                MediaProbe {
                    duration,
                    width: Some(width),
                    height: Some(height),
                },
            );
        }
    }

    /// Create `path` on disk and register its duration
    pub fn create_media(&self, path: &Path, duration: Option<f64>) {
        fs::write(path, b"media").unwrap();
        self.register(path, duration, 1920, 1080);
    }

    pub fn fail_on_input(&self, path: &Path) {
        self.fail_inputs.lock().unwrap().insert(path.to_path_buf());
    }

    pub fn fail_kind(&self, kind: JobKind) {
        self.fail_kinds.lock().unwrap().insert(kind);
    }

    pub fn set_trim_drift(&self, drift: f64) {
        *self.trim_drift.lock().unwrap() = drift;
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn jobs_of(&self, kind: JobKind) -> Vec<TranscodeJob> {
        self.jobs().into_iter().filter(|job| job.kind == kind).collect()
    }

    pub fn duration_of(&self, path: &Path) -> Option<f64> {
        self.media
            .lock()
            .unwrap()
            .get(path)
            .and_then(|probe| probe.duration)
    }

    fn output_duration(&self, job: &TranscodeJob) -> Option<f64> {
        let input_durations: Vec<Option<f64>> =
            job.inputs.iter().map(|path| self.duration_of(path)).collect();
        let first = input_durations.first().copied().flatten();

        match job.kind {
            JobKind::ExtractAudio => first,
            JobKind::Normalize => first,
            JobKind::Concat => Some(input_durations.iter().map(|d| d.unwrap_or(0.0)).sum()),
            JobKind::Trim => {
                let requested = job.expected_duration.unwrap_or(0.0);
                let drift = *self.trim_drift.lock().unwrap();
                Some(first.map_or(requested, |source| source.min(requested)) + drift)
            }
            JobKind::FitMusic | JobKind::Mux => job.expected_duration,
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe(&self, path: &Path) -> Result<MediaProbe> {
        self.media
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .ok_or_else(|| anyhow!("cannot probe {}", path.display()))
    }

    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> Result<()> {
        self.jobs.lock().unwrap().push(job.clone());

        if self.fail_kinds.lock().unwrap().contains(&job.kind) {
            bail!("{} failed", job.kind);
        }
        let fail_inputs = self.fail_inputs.lock().unwrap().clone();
        if job.inputs.iter().any(|input| fail_inputs.contains(input)) {
            bail!("{} failed for {:?}", job.kind, job.inputs);
        }

        if job.reports_progress() {
            sink.transcode_started(job.kind.label());
            sink.transcode_progress(50.0);
            sink.transcode_progress(100.0);
            sink.transcode_finished(true);
        }

        let duration = self.output_duration(job);
        fs::write(&job.output, b"media")?;
        self.register(&job.output, duration, 1920, 1080);
        Ok(())
    }
}

/// Search results keyed by query; unknown queries return `fallback`
#[derive(Default)]
pub struct FakeSearch {
    results: Mutex<HashMap<String, Vec<SearchHit>>>,
    fallback: Mutex<Vec<SearchHit>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_results(&self, query: &str, hits: Vec<SearchHit>) {
        self.results.lock().unwrap().insert(query.to_string(), hits);
    }

    pub fn set_fallback(&self, hits: Vec<SearchHit>) {
        *self.fallback.lock().unwrap() = hits;
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSearch for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        let all = self
            .results
            .lock()
            .unwrap()
            .get(&request.query)
            .cloned()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        let per_page = request.per_page.max(1) as usize;
        let start = (request.page.max(1) as usize - 1) * per_page;
        Ok(all.into_iter().skip(start).take(per_page).collect())
    }
}

/// Writes a placeholder for every URL and tells the transcoder its length
pub struct FakeFetcher {
    transcoder: Arc<FakeTranscoder>,
    durations: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    poisoned: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(transcoder: Arc<FakeTranscoder>) -> Arc<Self> {
        Arc::new(Self {
            transcoder,
            durations: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            poisoned: Mutex::new(HashSet::new()),
            fetched: Mutex::new(Vec::new()),
        })
    }

    pub fn set_duration(&self, url: &str, duration: f64) {
        self.durations
            .lock()
            .unwrap()
            .insert(url.to_string(), duration);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    /// Download succeeds but every job reading the file fails
    pub fn poison(&self, url: &str) {
        self.poisoned.lock().unwrap().insert(url.to_string());
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            bail!("404 for {url}");
        }
        fs::write(dest, b"raw")?;
        let duration = self.durations.lock().unwrap().get(url).copied();
        self.transcoder.register(dest, duration, 1920, 1080);
        if self.poisoned.lock().unwrap().contains(url) {
            self.transcoder.fail_on_input(dest);
        }
        Ok(3)
    }
}

pub struct UppercaseTranslator;

#[async_trait]
impl Translator for UppercaseTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String> {
        Ok(text.to_uppercase())
    }
}

pub fn hit(url: &str, duration: Option<f64>) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        width: 1920,
        height: 1080,
        duration,
        tags: Vec::new(),
    }
}
