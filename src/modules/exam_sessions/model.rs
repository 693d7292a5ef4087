pub use examtrack_models::exam_sessions::*;
