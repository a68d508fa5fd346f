//! Port implementations.
//!
//! `HttpSegmenter` and `JsonVolumeStore` are the shipped adapters;
//! `StubSegmenter` is the scripted engine used by tests and local
//! development.

pub mod http_segmenter;
pub mod json_volume;
pub mod stub_segmenter;

pub use self::http_segmenter::HttpSegmenter;
pub use self::json_volume::JsonVolumeStore;
pub use self::stub_segmenter::StubSegmenter;
