//! Definition loading abstraction
//!
//! Application definitions, dataset include files and default-config files
//! are all read through a [`DefinitionLoader`] so the pipeline never touches
//! a file system directly.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::error::{ErrorCode, Result, SubmitError};

/// Reads definition documents by URI
#[async_trait]
pub trait DefinitionLoader: Send + Sync {
    /// Read the whole document at `uri`
    async fn read(&self, uri: &str) -> Result<String>;

    /// Whether a document exists at `uri`
    async fn exists(&self, uri: &str) -> Result<bool>;
}

/// Loader backed by the local file system.
///
/// `file://` and `hdfs://host/...` URIs, as well as plain paths, are mapped
/// onto a root directory. Paths escaping the root are rejected.
#[derive(Debug, Clone)]
pub struct FsDefinitionLoader {
    root: PathBuf,
}

impl FsDefinitionLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a definition URI
    pub fn local_path(&self, uri: &str) -> Result<PathBuf> {
        let path = uri_path(uri)?;
        let mut local = self.root.clone();
        for component in Path::new(&path).components() {
            match component {
                Component::Normal(part) => local.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(SubmitError::definition_read(
                        ErrorCode::DEFINITION_INVALID_URI,
                        "path escapes the definition root",
                        uri,
                    ))
                }
            }
        }
        Ok(local)
    }
}

/// Path part of a definition URI
pub fn uri_path(uri: &str) -> Result<String> {
    let invalid = |message: String| {
        SubmitError::definition_read(ErrorCode::DEFINITION_INVALID_URI, message, uri)
    };

    if uri.trim().is_empty() {
        return Err(invalid("empty definition path".to_string()));
    }

    match Url::parse(uri) {
        Ok(url) => match url.scheme() {
            "file" | "hdfs" => Ok(url.path().to_string()),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(uri.to_string()),
        Err(e) => Err(invalid(format!("malformed URI: {}", e)).with_source(e)),
    }
}

#[async_trait]
impl DefinitionLoader for FsDefinitionLoader {
    async fn read(&self, uri: &str) -> Result<String> {
        let path = self.local_path(uri)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            SubmitError::definition_read(ErrorCode::DEFINITION_READ_FAILED, e.to_string(), uri)
                .with_source(e)
        })
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        let path = self.local_path(uri)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_path_schemes() {
        assert_eq!(uri_path("hdfs://nn:8020/apps/c.xml").unwrap(), "/apps/c.xml");
        assert_eq!(uri_path("file:///tmp/c.xml").unwrap(), "/tmp/c.xml");
        assert_eq!(uri_path("apps/c.xml").unwrap(), "apps/c.xml");

        let err = uri_path("s3://bucket/c.xml").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DEFINITION_INVALID_URI);
        assert!(uri_path("").is_err());
    }

    #[test]
    fn test_local_path_stays_under_root() {
        let loader = FsDefinitionLoader::new("/srv/defs");
        assert_eq!(
            loader.local_path("hdfs://nn/apps/c.xml").unwrap(),
            PathBuf::from("/srv/defs/apps/c.xml")
        );
        assert!(loader.local_path("/apps/../../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_read_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apps")).unwrap();
        std::fs::write(dir.path().join("apps/c.xml"), "<x/>").unwrap();

        let loader = FsDefinitionLoader::new(dir.path());
        assert_eq!(loader.read("hdfs://nn/apps/c.xml").await.unwrap(), "<x/>");
        assert!(loader.exists("/apps/c.xml").await.unwrap());
        assert!(!loader.exists("/apps/other.xml").await.unwrap());

        let err = loader.read("/apps/other.xml").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DEFINITION_READ_FAILED);
    }
}
