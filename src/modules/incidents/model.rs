pub use examtrack_models::incidents::*;
