pub use examtrack_models::batch_transfers::*;
