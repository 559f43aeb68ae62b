mod error;
mod metadata;
mod validate;

pub use error::{MetadataError, Result};
pub use metadata::{Maintainer, Metadata};
pub use validate::{is_valid_email, validate};

/// Longest email address accepted for a maintainer
pub const MAX_EMAIL_LEN: usize = 254;
