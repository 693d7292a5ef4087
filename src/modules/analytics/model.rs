pub use examtrack_models::analytics::*;
