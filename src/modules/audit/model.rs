pub use examtrack_models::audit::*;
