//! Drives the codec over a source tree or an explicit file list.
//!
//! Each run receives its own [`RunConfig`]; the pipeline keeps nothing between
//! runs. [`PackWorker`] serializes runs on a dedicated thread and reports
//! progress over a channel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::codec::{EncodeOutcome, EncryptionEvent, FileCodec};
use crate::error::{Error, Result};
use crate::keystore::KeyPair;
use crate::project::PACKED_DIR;

/// Configuration of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub force_build: bool,
}

/// Which files a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every file below the source root, except packed subtrees.
    Tree,
    /// Only these files; each must live under the source root.
    Files(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Encrypted { container: PathBuf },
    Skipped { container: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file results of one run, in visitation order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<FileResult>,
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn encrypted(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Encrypted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            FileOutcome::Failed { reason } => Some((r.source.as_path(), reason.as_str())),
            _ => None,
        })
    }
}

pub struct PackagePipeline<'k> {
    codec: FileCodec<'k>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'k> PackagePipeline<'k> {
    pub fn new(keys: &'k KeyPair) -> Self {
        Self {
            codec: FileCodec::new(keys),
            cancel: None,
        }
    }

    /// Stops the run before the next file once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Runs one batch. Files are processed sequentially and events are
    /// delivered synchronously, in visitation order, ending with `AllDone`.
    ///
    /// Per-file failures are recorded in the report; only an unusable source
    /// or destination root fails the whole run.
    pub fn run(
        &self,
        config: &RunConfig,
        selection: &Selection,
        on_event: &mut dyn FnMut(EncryptionEvent),
    ) -> Result<BatchReport> {
        info!(
            source = %config.source_root.display(),
            destination = %config.destination_root.display(),
            force = config.force_build,
            "starting pack run"
        );
        let started_at = Local::now();

        if matches!(selection, Selection::Tree) && !config.source_root.is_dir() {
            return Err(Error::not_found(
                &config.source_root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source root is not a directory"),
            ));
        }
        fs::create_dir_all(&config.destination_root)?;

        let mut results = Vec::new();
        let cancelled = match selection {
            Selection::Tree => {
                let destination = fs::canonicalize(&config.destination_root)?;
                if fs::canonicalize(&config.source_root)? == destination {
                    return Err(Error::Configuration(format!(
                        "destination root {} is the source root",
                        config.destination_root.display()
                    )));
                }
                self.run_tree(config, &destination, on_event, &mut results)
            }
            Selection::Files(files) => self.run_files(config, files, on_event, &mut results),
        };

        on_event(EncryptionEvent::AllDone);

        let report = BatchReport {
            results,
            cancelled,
            started_at,
            finished_at: Local::now(),
        };
        info!(
            encrypted = report.encrypted(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "pack run finished"
        );
        Ok(report)
    }

    fn run_tree(
        &self,
        config: &RunConfig,
        destination: &Path,
        on_event: &mut dyn FnMut(EncryptionEvent),
        results: &mut Vec<FileResult>,
    ) -> bool {
        let walker = WalkDir::new(&config.source_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded_dir(e, &config.source_root, destination));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let source = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %source.display(), error = %e, "cannot read directory entry");
                    results.push(FileResult {
                        source,
                        outcome: FileOutcome::Failed {
                            reason: e.to_string(),
                        },
                    });
                    continue;
                }
            };
            let file_type = entry.file_type();
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }
            if self.cancelled() {
                info!("pack run cancelled");
                return true;
            }
            // links to files are packed like the file itself; other links are not followed
            if file_type.is_symlink() && !entry.path().is_file() {
                warn!(path = %entry.path().display(), "symbolic link does not point to a file");
                results.push(FileResult {
                    source: entry.path().to_path_buf(),
                    outcome: FileOutcome::Failed {
                        reason: "symbolic link does not point to a file".into(),
                    },
                });
                continue;
            }

            let relative_dir = entry
                .path()
                .parent()
                .and_then(|p| p.strip_prefix(&config.source_root).ok())
                .unwrap_or(Path::new(""));
            let dest_folder = config.destination_root.join(relative_dir);

            results.push(self.process(entry.path(), &dest_folder, config.force_build, on_event));
        }

        false
    }

    fn run_files(
        &self,
        config: &RunConfig,
        files: &[PathBuf],
        on_event: &mut dyn FnMut(EncryptionEvent),
        results: &mut Vec<FileResult>,
    ) -> bool {
        for file in files {
            if self.cancelled() {
                info!("pack run cancelled");
                return true;
            }

            let Ok(relative) = file.strip_prefix(&config.source_root) else {
                warn!(file = %file.display(), "file is outside the source root");
                results.push(FileResult {
                    source: file.clone(),
                    outcome: FileOutcome::Failed {
                        reason: format!(
                            "not under source root {}",
                            config.source_root.display()
                        ),
                    },
                });
                continue;
            };
            let dest_folder = config
                .destination_root
                .join(relative.parent().unwrap_or(Path::new("")));

            results.push(self.process(file, &dest_folder, config.force_build, on_event));
        }

        false
    }

    fn process(
        &self,
        source: &Path,
        dest_folder: &Path,
        force_build: bool,
        on_event: &mut dyn FnMut(EncryptionEvent),
    ) -> FileResult {
        let outcome = match self.codec.encode(source, dest_folder, force_build, on_event) {
            Ok(EncodeOutcome::Encrypted(container)) => {
                debug!(file = %source.display(), container = %container.display(), "packed");
                FileOutcome::Encrypted { container }
            }
            Ok(EncodeOutcome::Skipped(container)) => {
                debug!(file = %source.display(), "up to date, skipped");
                FileOutcome::Skipped { container }
            }
            Err(e) => {
                warn!(file = %source.display(), error = %e, "failed to pack file");
                FileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        FileResult {
            source: source.to_path_buf(),
            outcome,
        }
    }
}

/// Directories never walked as source: any `Packed` segment below the root,
/// and the destination root itself, however it is spelled.
///
/// `destination` must already be canonical.
fn is_excluded_dir(entry: &DirEntry, source_root: &Path, destination: &Path) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let path = entry.path();
    let packed_segment = path
        .strip_prefix(source_root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str() == PACKED_DIR);

    packed_segment || fs::canonicalize(path).is_ok_and(|p| p == destination)
}

pub struct RunRequest {
    pub config: RunConfig,
    pub selection: Selection,
}

pub enum WorkerMessage {
    Event(EncryptionEvent),
    Finished(Result<BatchReport>),
}

/// A dedicated thread that owns the key pair and executes one run at a time.
pub struct PackWorker {
    requests: Option<Sender<RunRequest>>,
    messages: Receiver<WorkerMessage>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PackWorker {
    pub fn spawn(keys: KeyPair) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<RunRequest>();
        let (message_tx, message_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("assetpack-worker".into())
            .spawn(move || {
                let pipeline = PackagePipeline::new(&keys).with_cancel_flag(flag);
                for request in request_rx {
                    let result = pipeline.run(&request.config, &request.selection, &mut |event| {
                        let _ = message_tx.send(WorkerMessage::Event(event));
                    });
                    if message_tx.send(WorkerMessage::Finished(result)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            messages: message_rx,
            cancel,
            handle: Some(handle),
        })
    }

    /// Queues a run. Clears any earlier cancellation.
    pub fn submit(&self, request: RunRequest) -> Result<()> {
        self.cancel.store(false, Ordering::SeqCst);
        self.requests
            .as_ref()
            .and_then(|tx| tx.send(request).ok())
            .ok_or_else(|| Error::Configuration("pack worker has stopped".into()))
    }

    pub fn messages(&self) -> &Receiver<WorkerMessage> {
        &self.messages
    }

    /// Flag that cancels the current run before its next file.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Submits a run and drains its events until it finishes.
    pub fn run(
        &self,
        request: RunRequest,
        mut on_event: impl FnMut(&EncryptionEvent),
    ) -> Result<BatchReport> {
        self.submit(request)?;
        for message in &self.messages {
            match message {
                WorkerMessage::Event(event) => on_event(&event),
                WorkerMessage::Finished(result) => return result,
            }
        }
        Err(Error::Configuration("pack worker stopped mid-run".into()))
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PackWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EventKind;
    use tempfile::tempdir;

    fn write(path: &Path, data: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn sample_tree(root: &Path) {
        write(&root.join("sprite.png"), b"png bytes");
        write(&root.join("ui").join("menu.xml"), b"<Menu icon=\"/Data/ui/icon.ico\"/>\n");
        write(&root.join("sfx").join("hit.wav"), b"wav bytes");
        write(&root.join("Packed").join("stale.img"), b"already packed");
    }

    fn config(root: &Path, force: bool) -> RunConfig {
        RunConfig {
            source_root: root.to_path_buf(),
            destination_root: root.join("Packed"),
            force_build: force,
        }
    }

    fn run_collect(
        keys: &KeyPair,
        cfg: &RunConfig,
        selection: &Selection,
    ) -> (BatchReport, Vec<EncryptionEvent>) {
        let mut events = Vec::new();
        let report = PackagePipeline::new(keys)
            .run(cfg, selection, &mut |e| events.push(e))
            .unwrap();
        (report, events)
    }

    #[test]
    fn tree_run_mirrors_structure() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        let keys = KeyPair::generate("Game").unwrap();

        let (report, events) = run_collect(&keys, &config(&root, false), &Selection::Tree);

        assert_eq!(report.encrypted(), 3);
        assert_eq!(report.failed(), 0);
        assert!(!report.cancelled);
        assert!(root.join("Packed").join("sprite.img").is_file());
        assert!(root.join("Packed").join("ui").join("menu.cfg").is_file());
        assert!(root.join("Packed").join("sfx").join("hit.snd").is_file());
        assert!(!root.join("Packed").join("Packed").exists());

        assert_eq!(events.last(), Some(&EncryptionEvent::AllDone));
        let all_done = events.iter().filter(|e| e.kind() == EventKind::AllDone).count();
        assert_eq!(all_done, 1);
    }

    #[test]
    fn packed_subtrees_are_never_encoded() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        write(&root.join("levels").join("Packed").join("old.png"), b"old");
        let keys = KeyPair::generate("Game").unwrap();

        let (report, events) = run_collect(&keys, &config(&root, true), &Selection::Tree);

        let touched_packed = events
            .iter()
            .filter_map(EncryptionEvent::path)
            .chain(report.results.iter().map(|r| r.source.as_path()))
            .any(|p| p.components().any(|c| c.as_os_str() == PACKED_DIR));
        assert!(!touched_packed);
    }

    #[test]
    fn destination_inside_source_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        let keys = KeyPair::generate("Game").unwrap();
        let cfg = RunConfig {
            source_root: root.clone(),
            destination_root: root.join("out"),
            force_build: false,
        };

        run_collect(&keys, &cfg, &Selection::Tree);
        let (report, _) = run_collect(&keys, &cfg, &Selection::Tree);

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn events_follow_visitation_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        write(&root.join("b.txt"), b"b");
        let keys = KeyPair::generate("Game").unwrap();

        let (_, events) = run_collect(&keys, &config(&root, false), &Selection::Tree);

        assert_eq!(
            events,
            vec![
                EncryptionEvent::Encrypting(root.join("a.png")),
                EncryptionEvent::FileDone(root.join("a.png")),
                EncryptionEvent::FileDone(root.join("b.txt")),
                EncryptionEvent::AllDone,
            ]
        );
    }

    #[test]
    fn second_run_skips_everything() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        let keys = KeyPair::generate("Game").unwrap();
        let cfg = config(&root, false);

        run_collect(&keys, &cfg, &Selection::Tree);
        let sprite = fs::read(root.join("Packed").join("sprite.img")).unwrap();
        let (report, events) = run_collect(&keys, &cfg, &Selection::Tree);

        assert_eq!(report.skipped(), 3);
        assert_eq!(report.encrypted(), 0);
        assert!(events
            .iter()
            .all(|e| matches!(e.kind(), EventKind::Skipped | EventKind::AllDone)));
        assert_eq!(fs::read(root.join("Packed").join("sprite.img")).unwrap(), sprite);
    }

    #[test]
    fn file_list_mode_derives_destination_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        let keys = KeyPair::generate("Game").unwrap();

        let selection = Selection::Files(vec![
            root.join("sfx").join("hit.wav"),
            root.join("missing.png"),
            dir.path().join("elsewhere.png"),
        ]);
        let (report, events) = run_collect(&keys, &config(&root, false), &selection);

        assert!(root.join("Packed").join("sfx").join("hit.snd").is_file());
        assert!(!root.join("Packed").join("sprite.img").exists());
        assert_eq!(report.encrypted(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(events.last(), Some(&EncryptionEvent::AllDone));
        let all_done = events.iter().filter(|e| e.kind() == EventKind::AllDone).count();
        assert_eq!(all_done, 1);
    }

    #[test]
    fn missing_source_root_fails_the_run() {
        let dir = tempdir().unwrap();
        let keys = KeyPair::generate("Game").unwrap();
        let cfg = config(&dir.path().join("nope"), false);

        let result = PackagePipeline::new(&keys).run(&cfg, &Selection::Tree, &mut |_| {});
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn cancelled_run_stops_before_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        let keys = KeyPair::generate("Game").unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let mut events = Vec::new();
        let report = PackagePipeline::new(&keys)
            .with_cancel_flag(flag)
            .run(&config(&root, false), &Selection::Tree, &mut |e| events.push(e))
            .unwrap();

        assert!(report.cancelled);
        assert!(report.results.is_empty());
        assert_eq!(events, vec![EncryptionEvent::AllDone]);
    }

    #[test]
    fn cancellation_is_checked_between_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        write(&root.join("b.png"), b"b");
        write(&root.join("c.png"), b"c");
        let keys = KeyPair::generate("Game").unwrap();

        let flag = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&flag);
        let mut events = Vec::new();
        let report = PackagePipeline::new(&keys)
            .with_cancel_flag(flag)
            .run(&config(&root, false), &Selection::Tree, &mut |e| {
                if e.kind() == EventKind::FileDone {
                    trigger.store(true, Ordering::SeqCst);
                }
                events.push(e);
            })
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.encrypted(), 1);
        assert!(root.join("Packed").join("a.img").is_file());
        assert!(!root.join("Packed").join("b.img").exists());
        assert!(!root.join("Packed").join("c.img").exists());
        assert_eq!(
            events,
            vec![
                EncryptionEvent::Encrypting(root.join("a.png")),
                EncryptionEvent::FileDone(root.join("a.png")),
                EncryptionEvent::AllDone,
            ]
        );
    }

    #[test]
    fn cancellation_is_checked_between_listed_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        write(&root.join("b.png"), b"b");
        let keys = KeyPair::generate("Game").unwrap();

        let flag = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&flag);
        let selection = Selection::Files(vec![root.join("a.png"), root.join("b.png")]);
        let mut all_done = 0;
        let report = PackagePipeline::new(&keys)
            .with_cancel_flag(flag)
            .run(&config(&root, false), &selection, &mut |e| match e.kind() {
                EventKind::FileDone => trigger.store(true, Ordering::SeqCst),
                EventKind::AllDone => all_done += 1,
                _ => {}
            })
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.results.len(), 1);
        assert!(!root.join("Packed").join("b.img").exists());
        assert_eq!(all_done, 1);
    }

    #[test]
    fn destination_spelled_differently_is_still_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        fs::create_dir_all(root.join("sub")).unwrap();
        let keys = KeyPair::generate("Game").unwrap();
        let cfg = RunConfig {
            source_root: root.clone(),
            destination_root: root.join("sub").join("..").join("out"),
            force_build: false,
        };

        let (first, _) = run_collect(&keys, &cfg, &Selection::Tree);
        let (second, _) = run_collect(&keys, &cfg, &Selection::Tree);

        assert_eq!(first.encrypted(), 1);
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.skipped(), 1);
        assert!(root.join("out").join("a.img").is_file());
        assert!(!root.join("out").join("out").exists());
    }

    #[test]
    fn destination_equal_to_source_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        write(&root.join("a.png"), b"a");
        let keys = KeyPair::generate("Game").unwrap();
        let cfg = RunConfig {
            source_root: root.clone(),
            destination_root: root.join("."),
            force_build: false,
        };

        let result = PackagePipeline::new(&keys).run(&cfg, &Selection::Tree, &mut |_| {});
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(!root.join("a.img").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_packed_and_other_links_reported() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        let shared = dir.path().join("shared");
        write(&root.join("a.png"), b"a");
        write(&shared.join("logo.png"), b"logo");
        symlink(shared.join("logo.png"), root.join("logo.png")).unwrap();
        symlink(&shared, root.join("linked_dir")).unwrap();
        let keys = KeyPair::generate("Game").unwrap();

        let (report, _) = run_collect(&keys, &config(&root, false), &Selection::Tree);

        assert_eq!(report.encrypted(), 2);
        assert!(root.join("Packed").join("logo.img").is_file());
        let failures: Vec<_> = report.failures().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(failures, vec![root.join("linked_dir")]);

        let plain = FileCodec::new(&keys)
            .decode(&root.join("Packed").join("logo.img"), false)
            .unwrap();
        assert_eq!(plain, b"logo");
    }

    #[test]
    fn report_serializes_outcomes() {
        let report = BatchReport {
            results: vec![FileResult {
                source: PathBuf::from("a.png"),
                outcome: FileOutcome::Failed {
                    reason: "boom".into(),
                },
            }],
            cancelled: false,
            started_at: Local::now(),
            finished_at: Local::now(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["status"], "failed");
        assert_eq!(json["results"][0]["reason"], "boom");
        assert_eq!(json["results"][0]["source"], "a.png");
    }

    #[test]
    fn worker_runs_requests_and_streams_events() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("assets");
        sample_tree(&root);
        let keys = KeyPair::generate("Game").unwrap();

        let worker = PackWorker::spawn(keys.clone()).unwrap();
        let mut events = Vec::new();
        let report = worker
            .run(
                RunRequest {
                    config: config(&root, false),
                    selection: Selection::Tree,
                },
                |e| events.push(e.clone()),
            )
            .unwrap();
        assert_eq!(report.encrypted(), 3);
        assert_eq!(events.last(), Some(&EncryptionEvent::AllDone));

        let again = worker
            .run(
                RunRequest {
                    config: config(&root, false),
                    selection: Selection::Tree,
                },
                |_| {},
            )
            .unwrap();
        assert_eq!(again.skipped(), 3);
        worker.shutdown();

        let codec = FileCodec::new(&keys);
        let plain = codec
            .decode(&root.join("Packed").join("ui").join("menu.cfg"), true)
            .unwrap();
        assert_eq!(plain, b"<Menu icon=\"/Data/Packed/ui/icon.icn\"/>\n\0");
    }
}
