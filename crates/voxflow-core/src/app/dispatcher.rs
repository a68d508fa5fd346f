//! Dispatcher - the polling loop that turns descriptor files into worker
//! pool submissions.
//!
//! Each scan lists the watched directory, claims files not already active,
//! and hands them to the bounded pool. A saturated pool just drops the claim
//! so the file is retried on the next cycle. A failing scan backs off at
//! [`SCAN_ERROR_BACKOFF_FACTOR`] times the normal interval and keeps going;
//! nothing a single task does can stop the loop.

use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::app::active_set::ActiveTaskSet;
use crate::app::config::ServiceConfig;
use crate::app::worker::TaskRunner;
use crate::domain::TaskError;
use crate::ports::Clock;
use crate::store::DescriptorStore;

/// Multiplier applied to the poll interval after a scan-step error.
pub const SCAN_ERROR_BACKOFF_FACTOR: u32 = 5;

pub struct Dispatcher {
    store: Arc<DescriptorStore>,
    runner: Arc<TaskRunner>,
    active: ActiveTaskSet,
    clock: Arc<dyn Clock>,
    config: Arc<ServiceConfig>,
    pool: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<DescriptorStore>,
        runner: Arc<TaskRunner>,
        clock: Arc<dyn Clock>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.worker_count));
        Self {
            store,
            runner,
            active: ActiveTaskSet::new(),
            clock,
            config,
            pool,
        }
    }

    pub fn active_tasks(&self) -> &ActiveTaskSet {
        &self.active
    }

    /// One discovery cycle: claim new descriptors and submit them to the
    /// pool. Returns how many were submitted.
    pub fn scan_once(&self, tasks: &mut JoinSet<()>) -> Result<usize, TaskError> {
        let files = self.store.list()?;
        let mut submitted = 0;
        for file in files {
            // Atomic check-and-insert; a file another worker holds is
            // rediscovered here and ignored.
            let Some(claim) = self.active.claim(&file) else {
                continue;
            };
            let Ok(permit) = Arc::clone(&self.pool).try_acquire_owned() else {
                // Pool saturated: release the claim so the next scan retries.
                drop(claim);
                debug!(descriptor = %file.display(), "worker pool saturated, deferring");
                break;
            };
            let runner = Arc::clone(&self.runner);
            tasks.spawn(async move {
                let _permit = permit;
                runner.run(claim.path()).await;
                drop(claim);
            });
            submitted += 1;
        }
        Ok(submitted)
    }

    /// Poll until `shutdown` flips, then drain in-flight workers.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.config.poll_interval();
        let mut tasks = JoinSet::new();
        info!(
            directory = %self.store.tasks_dir().display(),
            interval_secs = interval.as_secs(),
            workers = self.config.worker_count,
            "dispatcher started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.scan_once(&mut tasks) {
                Ok(submitted) => {
                    if submitted > 0 {
                        debug!(submitted, "submitted descriptors to worker pool");
                    }
                    interval
                }
                Err(e) => {
                    error!(error = %e, "scan failed, backing off");
                    interval * SCAN_ERROR_BACKOFF_FACTOR
                }
            };

            // Reap finished workers so the join set stays small.
            while tasks.try_join_next().is_some() {}

            tokio::select! {
                _ = shutdown.changed() => {}
                _ = self.clock.sleep(delay) => {}
            }
        }

        info!(in_flight = tasks.len(), "dispatcher stopping, draining workers");
        while tasks.join_next().await.is_some() {}
        info!("dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tokio::sync::Semaphore;

    use super::*;
    use crate::impls::{JsonVolumeStore, StubSegmenter};
    use crate::ports::{Segmenter, SystemClock, VolumeStore};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<DescriptorStore>,
        stub: Arc<StubSegmenter>,
        dispatcher: Dispatcher,
        input_file: PathBuf,
        output_dir: PathBuf,
    }

    fn fixture(worker_count: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            DescriptorStore::open(dir.path().join("tasks"), dir.path().join("taskshistory"))
                .unwrap(),
        );
        let input_file = dir.path().join("scan.nii.gz");
        fs::write(&input_file, "image bytes").unwrap();
        let output_dir = dir.path().join("out");
        let stub = Arc::new(StubSegmenter::new([2, 1, 1]));
        let config = Arc::new(ServiceConfig {
            worker_count,
            ..ServiceConfig::default()
        });
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&store),
            Arc::clone(&stub) as Arc<dyn Segmenter>,
            Arc::new(JsonVolumeStore),
            Arc::new(SystemClock),
            Arc::clone(&config),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            runner,
            Arc::new(SystemClock),
            config,
        );
        Fixture {
            _dir: dir,
            store,
            stub,
            dispatcher,
            input_file,
            output_dir,
        }
    }

    fn write_full_descriptor(f: &Fixture, name: &str) -> PathBuf {
        let body = serde_json::json!({
            "task_id": name,
            "input_file": f.input_file,
            "output_directory": f.output_dir,
            "segmentation_type": "full",
        });
        let path = f.store.tasks_dir().join(format!("{name}.tsk"));
        fs::write(&path, serde_json::to_vec(&body).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn scan_submits_and_worker_completes() {
        let f = fixture(5);
        write_full_descriptor(&f, "t1");

        let mut tasks = JoinSet::new();
        let submitted = f.dispatcher.scan_once(&mut tasks).unwrap();
        assert_eq!(submitted, 1);
        while tasks.join_next().await.is_some() {}

        assert_eq!(f.stub.full_calls(), 1);
        assert!(f.store.archive_dir().join("t1.tsk").exists());
        assert!(f.dispatcher.active_tasks().is_empty());
        let mask = JsonVolumeStore
            .load(&f.output_dir.join(crate::app::config::MASK_FILE_NAME))
            .unwrap();
        assert!(mask.is_some());
    }

    #[tokio::test]
    async fn active_descriptor_is_not_submitted_twice() {
        let f = fixture(5);
        let gate = Arc::new(Semaphore::new(0));
        f.stub.set_gate(Arc::clone(&gate));
        write_full_descriptor(&f, "t1");

        let mut tasks = JoinSet::new();
        assert_eq!(f.dispatcher.scan_once(&mut tasks).unwrap(), 1);
        tokio::task::yield_now().await;

        // Rediscovery while the worker is blocked inside the engine.
        assert_eq!(f.dispatcher.scan_once(&mut tasks).unwrap(), 0);
        assert_eq!(f.dispatcher.active_tasks().len(), 1);

        gate.add_permits(10);
        while tasks.join_next().await.is_some() {}
        assert_eq!(f.stub.full_calls(), 1);
    }

    #[tokio::test]
    async fn saturated_pool_defers_and_releases_claim() {
        let f = fixture(1);
        let gate = Arc::new(Semaphore::new(0));
        f.stub.set_gate(Arc::clone(&gate));
        write_full_descriptor(&f, "a");
        write_full_descriptor(&f, "b");

        let mut tasks = JoinSet::new();
        assert_eq!(f.dispatcher.scan_once(&mut tasks).unwrap(), 1);
        // The deferred descriptor must not stay claimed.
        assert_eq!(f.dispatcher.active_tasks().len(), 1);

        gate.add_permits(1);
        tasks.join_next().await;

        // Next cycle picks up the deferred file.
        assert_eq!(f.dispatcher.scan_once(&mut tasks).unwrap(), 1);
        gate.add_permits(10);
        while tasks.join_next().await.is_some() {}
        assert_eq!(f.stub.full_calls(), 2);
    }

    #[tokio::test]
    async fn scan_error_is_reported_not_fatal() {
        let f = fixture(5);
        fs::remove_dir_all(f.store.tasks_dir()).unwrap();
        let mut tasks = JoinSet::new();
        assert!(f.dispatcher.scan_once(&mut tasks).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_drains_in_flight_workers_on_shutdown() {
        let f = fixture(5);
        write_full_descriptor(&f, "t1");
        let (tx, rx) = watch::channel(false);

        let dispatcher = f.dispatcher;
        let handle = tokio::spawn(async move {
            dispatcher.run(rx).await;
        });

        // Give the loop a few virtual poll cycles, then stop it.
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(f.stub.full_calls(), 1);
        assert!(f.store.archive_dir().join("t1.tsk").exists());
    }
}
