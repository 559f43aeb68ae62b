use crate::Result;
use serde::{Deserialize, Serialize};

/// A person responsible for an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Maintainer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Maintainer {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Application metadata record as submitted by clients
///
/// Missing fields deserialize to empty values so that validation can report
/// every problem at once instead of failing on the first absent key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,

    /// Unique per record, used as the storage key
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub company: String,

    #[serde(default)]
    pub website: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub license: String,

    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    #[serde(default)]
    pub description: String,
}

impl Metadata {
    /// Parse a YAML payload. JSON payloads are accepted as well since they
    /// are valid YAML documents.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Whether any maintainer has the given name
    pub fn has_maintainer_name(&self, name: &str) -> bool {
        self.maintainers.iter().any(|m| m.name == name)
    }

    /// Whether any maintainer has the given email
    pub fn has_maintainer_email(&self, email: &str) -> bool {
        self.maintainers.iter().any(|m| m.email == email)
    }
}
