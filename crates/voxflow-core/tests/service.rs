//! End-to-end service scenarios: descriptor in, archived descriptor plus
//! result record out, with the engine scripted.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;

use voxflow_core::app::{Dispatcher, MASK_FILE_NAME, ServiceConfig, TaskRunner};
use voxflow_core::domain::{ResultRecord, RoiRegistry};
use voxflow_core::impls::{JsonVolumeStore, StubSegmenter};
use voxflow_core::ports::{Segmenter, SystemClock, VolumeStore};
use voxflow_core::store::{DescriptorStore, RegistryStore};

struct Service {
    _dir: tempfile::TempDir,
    store: Arc<DescriptorStore>,
    stub: Arc<StubSegmenter>,
    dispatcher: Dispatcher,
    input_file: PathBuf,
    output_dir: PathBuf,
}

fn service(stub: StubSegmenter) -> Service {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        DescriptorStore::open(dir.path().join("tasks"), dir.path().join("taskshistory")).unwrap(),
    );
    let input_file = dir.path().join("scan.nii.gz");
    fs::write(&input_file, "image bytes").unwrap();
    let output_dir = dir.path().join("out");
    let stub = Arc::new(stub);
    let config = Arc::new(ServiceConfig::default());
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
    Service {
        _dir: dir,
        store,
        stub,
        dispatcher,
        input_file,
        output_dir,
    }
}

impl Service {
    fn drop_descriptor(&self, name: &str, body: serde_json::Value) -> PathBuf {
        let path = self.store.tasks_dir().join(format!("{name}.tsk"));
        fs::write(&path, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
        path
    }

    fn point_descriptor(&self, name: &str, prompts: serde_json::Value) -> PathBuf {
        self.drop_descriptor(
            name,
            serde_json::json!({
                "task_id": name,
                "input_file": self.input_file,
                "output_directory": self.output_dir,
                "segmentation_type": "point",
                "segmentation_prompts": prompts,
            }),
        )
    }

    async fn run_cycle(&self) -> usize {
        let mut tasks = JoinSet::new();
        let submitted = self.dispatcher.scan_once(&mut tasks).unwrap();
        while tasks.join_next().await.is_some() {}
        submitted
    }

    fn record(&self, name: &str) -> ResultRecord {
        let path = self.store.archive_dir().join(format!("{name}_result.json"));
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }
}

#[tokio::test]
async fn full_descriptor_end_to_end() {
    let s = service(StubSegmenter::new([2, 2, 1]));
    let descriptor = s.drop_descriptor(
        "full-1",
        serde_json::json!({
            "task_id": "full-1",
            "input_file": s.input_file,
            "output_directory": s.output_dir,
            "segmentation_type": "full",
        }),
    );

    assert_eq!(s.run_cycle().await, 1);

    let record = s.record("full-1");
    assert!(record.success);
    let mask = record.output_mask.expect("mask path populated");
    assert!(mask.exists());
    assert!(record.output_labels.is_none());
    assert!(!descriptor.exists());
    assert!(s.store.archive_dir().join("full-1.tsk").exists());
}

#[tokio::test]
async fn resubmitting_unchanged_descriptor_is_a_no_op() {
    let s = service(
        StubSegmenter::new([3, 1, 1])
            .with_point_field(2, vec![0.9, 0.0, 0.0])
            .with_point_field(4, vec![0.0, 0.9, 0.0]),
    );
    let prompts = serde_json::json!([
        {
            "target_output_label": 2,
            "display_name": "lesion A",
            "positive_points": [[0.0, 0.0, 0.0]],
            "physical_center_of_box": [10.0, 0.0, 0.0]
        },
        {
            "target_output_label": 4,
            "display_name": "lesion B",
            "positive_points": [[1.0, 0.0, 0.0]],
            "physical_center_of_box": [20.0, 0.0, 0.0]
        }
    ]);

    s.point_descriptor("first", prompts.clone());
    s.run_cycle().await;
    assert_eq!(s.stub.point_calls(), 2);

    let mask_path = s.output_dir.join(MASK_FILE_NAME);
    let registry_path = RegistryStore::path_for(&s.output_dir);
    let mask_before = fs::read(&mask_path).unwrap();
    let registry_before = fs::read(&registry_path).unwrap();

    s.point_descriptor("second", prompts);
    s.run_cycle().await;

    assert_eq!(s.stub.point_calls(), 2, "second submission must not hit the engine");
    assert_eq!(fs::read(&mask_path).unwrap(), mask_before);
    assert_eq!(fs::read(&registry_path).unwrap(), registry_before);
    assert!(s.record("second").success);
}

#[tokio::test]
async fn moved_prompt_recomputes_only_that_label() {
    let s = service(
        StubSegmenter::new([3, 1, 1])
            .with_point_field(2, vec![0.9, 0.0, 0.0])
            .with_point_field(4, vec![0.0, 0.9, 0.0]),
    );
    let original = serde_json::json!([
        {"target_output_label": 2, "positive_points": [[0.0,0.0,0.0]], "physical_center_of_box": [10.0,0.0,0.0]},
        {"target_output_label": 4, "positive_points": [[1.0,0.0,0.0]], "physical_center_of_box": [20.0,0.0,0.0]}
    ]);
    s.point_descriptor("seed", original);
    s.run_cycle().await;
    assert_eq!(s.stub.point_calls(), 2);

    // Label 4 moved; label 2 stayed put.
    let moved = serde_json::json!([
        {"target_output_label": 2, "positive_points": [[0.0,0.0,0.0]], "physical_center_of_box": [10.0,0.0,0.0]},
        {"target_output_label": 4, "positive_points": [[2.0,0.0,0.0]], "physical_center_of_box": [25.0,0.0,0.0]}
    ]);
    s.point_descriptor("moved", moved);
    s.run_cycle().await;

    assert_eq!(s.stub.point_calls(), 3);
    // Label 2's voxels survive the partial recompute.
    let volume = JsonVolumeStore
        .load(&s.output_dir.join(MASK_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(volume.count(2), 1);
    assert_eq!(volume.count(4), 1);
}

#[tokio::test]
async fn empty_prompt_points_fail_validation_without_engine_call() {
    let s = service(StubSegmenter::new([2, 1, 1]));
    s.point_descriptor(
        "invalid",
        serde_json::json!([{
            "target_output_label": 3,
            "positive_points": [],
            "negative_points": []
        }]),
    );

    s.run_cycle().await;

    let record = s.record("invalid");
    assert!(!record.success);
    assert!(record.message.starts_with("Validation Failed:"));
    assert!(
        s.store
            .archive_dir()
            .join("failed_validation_invalid.tsk")
            .exists()
    );
    assert_eq!(s.stub.point_calls(), 0);
    assert_eq!(s.stub.full_calls(), 0);
}

#[tokio::test]
async fn descriptor_left_behind_after_crash_is_reprocessed() {
    let first = service(StubSegmenter::new([2, 1, 1]));
    let descriptor = first.drop_descriptor(
        "orphan",
        serde_json::json!({
            "task_id": "orphan",
            "input_file": first.input_file,
            "output_directory": first.output_dir,
            "segmentation_type": "full",
        }),
    );
    // Simulated crash: the process dies before the worker ran; the active
    // set is process-local so nothing remembers the claim.
    assert!(descriptor.exists());

    let stub = Arc::new(StubSegmenter::new([2, 1, 1]));
    let config = Arc::new(ServiceConfig::default());
    let store = Arc::new(
        DescriptorStore::open(first.store.tasks_dir(), first.store.archive_dir()).unwrap(),
    );
    let runner = Arc::new(TaskRunner::new(
        Arc::clone(&store),
        Arc::clone(&stub) as Arc<dyn Segmenter>,
        Arc::new(JsonVolumeStore),
        Arc::new(SystemClock),
        Arc::clone(&config),
    ));
    let restarted = Dispatcher::new(Arc::clone(&store), runner, Arc::new(SystemClock), config);

    let mut tasks = JoinSet::new();
    assert_eq!(restarted.scan_once(&mut tasks).unwrap(), 1);
    while tasks.join_next().await.is_some() {}

    assert_eq!(stub.full_calls(), 1);
    assert!(!descriptor.exists());
    assert!(store.archive_dir().join("orphan.tsk").exists());
}

#[tokio::test(start_paused = true)]
async fn service_loop_processes_and_shuts_down_cleanly() {
    let s = service(StubSegmenter::new([2, 1, 1]));
    s.drop_descriptor(
        "loop-1",
        serde_json::json!({
            "task_id": "loop-1",
            "input_file": s.input_file,
            "output_directory": s.output_dir,
            "segmentation_type": "full",
        }),
    );

    let (tx, rx) = watch::channel(false);
    let dispatcher = s.dispatcher;
    let handle = tokio::spawn(async move { dispatcher.run(rx).await });

    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(s.stub.full_calls(), 1);
    let registry_missing = !RegistryStore::path_for(&s.output_dir).exists();
    assert!(registry_missing, "full tasks write no registry");
    let record: ResultRecord = serde_json::from_slice(
        &fs::read(s.store.archive_dir().join("loop-1_result.json")).unwrap(),
    )
    .unwrap();
    assert!(record.success);
}

#[tokio::test]
async fn label_shrink_clears_stale_voxels_across_runs() {
    let s = service(
        StubSegmenter::new([3, 1, 1]).with_point_field(6, vec![0.9, 0.9, 0.0]),
    );
    s.point_descriptor(
        "wide",
        serde_json::json!([{
            "target_output_label": 6,
            "positive_points": [[0.0,0.0,0.0]],
            "physical_center_of_box": [1.0,0.0,0.0]
        }]),
    );
    s.run_cycle().await;
    let volume = JsonVolumeStore
        .load(&s.output_dir.join(MASK_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(volume.count(6), 2);

    // The region shrank; the moved center forces a recompute.
    let registry: RoiRegistry = serde_json::from_slice(
        &fs::read(RegistryStore::path_for(&s.output_dir)).unwrap(),
    )
    .unwrap();
    assert_eq!(registry.len(), 1);

    // A second service instance with the region re-scripted smaller.
    let s2 = service(StubSegmenter::new([3, 1, 1]).with_point_field(6, vec![0.0, 0.0, 0.9]));
    // Seed the second service's output directory with the first run's state.
    fs::create_dir_all(&s2.output_dir).unwrap();
    fs::copy(
        s.output_dir.join(MASK_FILE_NAME),
        s2.output_dir.join(MASK_FILE_NAME),
    )
    .unwrap();
    fs::copy(
        RegistryStore::path_for(&s.output_dir),
        RegistryStore::path_for(&s2.output_dir),
    )
    .unwrap();

    s2.point_descriptor(
        "shrunk",
        serde_json::json!([{
            "target_output_label": 6,
            "positive_points": [[2.0,0.0,0.0]],
            "physical_center_of_box": [2.0,0.0,0.0]
        }]),
    );
    s2.run_cycle().await;

    let volume = JsonVolumeStore
        .load(&s2.output_dir.join(MASK_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(volume.count(6), 1, "stale voxels must be cleared");
    assert_eq!(volume.voxels(), &[0, 0, 6]);
}
