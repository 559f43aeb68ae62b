use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Cannot parse metadata payload: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{}", .0.join("-"))]
    Invalid(Vec<String>),
}

impl MetadataError {
    /// Individual validation problems, empty for parse failures
    pub fn problems(&self) -> &[String] {
        match self {
            MetadataError::Invalid(problems) => problems,
            MetadataError::Parse(_) => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
