//! Reply generation port and the backends that need no network.

pub mod backend;
pub mod box_backend;
pub mod fallback;
pub mod offline;

pub use backend::InferenceBackend;
pub use box_backend::BoxInferenceBackend;
pub use fallback::FallbackBackend;
pub use offline::OfflineResponder;
