pub use examtrack_models::attendance::*;
