//! Compose definitions shipped to each host.
//!
//! The deployment only needs a file name and the service name derived from
//! it, but a broken file is caught locally before any host is touched.

use crate::error::{
    BadComposeNameSnafu, ComposeError, NoServicesSnafu, ParseComposeSnafu, ReadComposeSnafu,
};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, ensure};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ComposeDocument {
    #[serde(default)]
    services: BTreeMap<String, serde_yaml::Value>,
}

/// A validated compose file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeFile {
    pub path: PathBuf,
    /// File name as placed in the remote working directory
    pub file_name: String,
    /// `fluence.yml` -> `fluence`
    pub service: String,
}

impl ComposeFile {
    pub fn parse(path: &Path, content: &str) -> Result<Self, ComposeError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context(BadComposeNameSnafu { path })?
            .to_string();
        let service = file_name
            .strip_suffix(".yml")
            .or_else(|| file_name.strip_suffix(".yaml"))
            .unwrap_or(&file_name)
            .to_string();

        let document: ComposeDocument =
            serde_yaml::from_str(content).context(ParseComposeSnafu { path })?;
        ensure!(!document.services.is_empty(), NoServicesSnafu { path });

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            service,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let content = std::fs::read_to_string(path).context(ReadComposeSnafu { path })?;
        Self::parse(path, &content)
    }
}
