pub use examtrack_models::auth::*;
pub use examtrack_models::users::ChangePasswordDto;
