pub use examtrack_models::users::*;
