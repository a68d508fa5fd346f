//! voxflow-core
//!
//! Orchestration core for the voxflow segmentation service: it watches a
//! directory for task descriptor files, dispatches them to a bounded worker
//! pool, invokes an external volumetric segmentation engine, and merges
//! per-label results into one persisted multi-label volume plus its ROI
//! registry.
//!
//! # Module layout
//! - **domain**: descriptors, volumes, ROI records, outcomes, errors
//! - **ports**: abstraction layer (Segmenter, VolumeStore, Clock)
//! - **impls**: shipped adapters plus the scripted test engine
//! - **store**: filesystem stores (descriptors, registry, result records)
//! - **validate / merge / reconcile**: the merge-consistency protocol
//! - **app**: config, claim tracking, task runner, polling dispatcher

pub mod app;
pub mod domain;
pub mod impls;
pub mod merge;
pub mod ports;
pub mod reconcile;
pub mod store;
pub mod validate;
