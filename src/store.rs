use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Probe method declared on a site.
///
/// Anything that is not one of the known names is kept verbatim so it
/// survives a save, and is probed as plain HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    #[default]
    Http,
    Https,
    Tcp,
    Ping,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Http => "http",
            Method::Https => "https",
            Method::Tcp => "tcp",
            Method::Ping => "ping",
            Method::Other(raw) => raw,
        }
    }
}

impl From<String> for Method {
    fn from(value: String) -> Self {
        match value.as_str() {
            "http" => Method::Http,
            "https" => Method::Https,
            "tcp" => Method::Tcp,
            "ping" => Method::Ping,
            _ => Method::Other(value),
        }
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        match method {
            Method::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub id: String,
    /// Host, `host:port` or full URL, depending on `method`.
    #[serde(rename = "url")]
    pub target: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub method: Method,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    /// e.g. `socks5://127.0.0.1:1080`
    #[serde(default)]
    pub url: String,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// JSON file holding the site list and the proxy configuration.
///
/// Every mutation rewrites the whole file while the write lock is held, so
/// concurrent writers land on disk in the same order they were applied.
pub struct Store {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl Store {
    /// Loads `path`, creating it with an empty document if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Store file {} not found, creating it", path.display());
                let data = StoreData::default();
                write_file(&path, &data).await?;
                data
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read store file {}", path.display()));
            }
        };

        debug!("Loaded {} sites from {}", data.sites.len(), path.display());
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn sites(&self) -> Vec<Site> {
        self.data.read().await.sites.clone()
    }

    pub async fn proxy(&self) -> ProxyConfig {
        self.data.read().await.proxy.clone()
    }

    /// Sites and proxy read under one guard, for use across a whole batch.
    pub async fn snapshot(&self) -> (Vec<Site>, ProxyConfig) {
        let data = self.data.read().await;
        (data.sites.clone(), data.proxy.clone())
    }

    /// Appends `site` unless another site already uses its ID.
    pub async fn add_site(&self, site: Site) -> Result<AddOutcome> {
        let mut data = self.data.write().await;
        if data.sites.iter().any(|s| s.id == site.id) {
            return Ok(AddOutcome::DuplicateId);
        }
        let mut staged = data.clone();
        staged.sites.push(site);
        self.commit(&mut data, staged).await?;
        Ok(AddOutcome::Added)
    }

    /// Replaces the site with the same ID. Returns `false` if there was none.
    pub async fn update_site(&self, updated: Site) -> Result<bool> {
        let mut data = self.data.write().await;
        let Some(idx) = data.sites.iter().position(|s| s.id == updated.id) else {
            return Ok(false);
        };
        let mut staged = data.clone();
        staged.sites[idx] = updated;
        self.commit(&mut data, staged).await?;
        Ok(true)
    }

    pub async fn remove_site(&self, id: &str) -> Result<()> {
        let mut data = self.data.write().await;
        let mut staged = data.clone();
        staged.sites.retain(|s| s.id != id);
        self.commit(&mut data, staged).await
    }

    pub async fn update_proxy(&self, proxy: ProxyConfig) -> Result<()> {
        let mut data = self.data.write().await;
        let mut staged = data.clone();
        staged.proxy = proxy;
        self.commit(&mut data, staged).await
    }

    /// Persists `staged` and only then makes it visible. On a failed write
    /// the in-memory document is left untouched.
    async fn commit(&self, current: &mut StoreData, staged: StoreData) -> Result<()> {
        write_file(&self.path, &staged).await?;
        *current = staged;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    DuplicateId,
}

async fn write_file(path: &Path, data: &StoreData) -> Result<()> {
    let content = serde_json::to_string_pretty(data)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write store file {}", path.display()))
}
