//! Venue directory
//!
//! Read-only source of retreat venues. The outreach core only consumes it to
//! build contact lists and to give the generator some context per venue.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::OutreachResult;
use crate::models::Venue;

const VENUES_FILENAME: &str = "venues.json";

/// Venue lookup port
#[async_trait]
pub trait VenueDirectory: Send + Sync {
    /// Every known venue, in directory order
    async fn all(&self) -> OutreachResult<Vec<Venue>>;

    /// Single venue by id
    async fn get(&self, id: &str) -> OutreachResult<Option<Venue>> {
        Ok(self.all().await?.into_iter().find(|v| v.id == id))
    }
}

/// Venues read from `venues.json`
#[derive(Debug, Clone)]
pub struct JsonVenueDirectory {
    path: PathBuf,
}

impl JsonVenueDirectory {
    /// Directory backed by `<data_dir>/venues.json`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(VENUES_FILENAME),
        }
    }
}

#[async_trait]
impl VenueDirectory for JsonVenueDirectory {
    async fn all(&self) -> OutreachResult<Vec<Venue>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "venue directory missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(venues) => Ok(venues),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "venue directory unparseable");
                Ok(Vec::new())
            }
        }
    }
}

/// In-memory venue directory (for testing)
#[derive(Debug, Clone, Default)]
pub struct InMemoryVenueDirectory {
    venues: Vec<Venue>,
}

impl InMemoryVenueDirectory {
    /// Directory over a fixed list
    pub fn new(venues: Vec<Venue>) -> Self {
        Self { venues }
    }
}

#[async_trait]
impl VenueDirectory for InMemoryVenueDirectory {
    async fn all(&self) -> OutreachResult<Vec<Venue>> {
        Ok(self.venues.clone())
    }
}
