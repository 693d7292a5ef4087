pub use examtrack_models::students::*;
