use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::clients::OrderFeed;
use crate::error::FeedError;
use crate::models::{FeedEntry, OrderTicket};

/// Reads the ticket feed JSON file written by the ordering-platform refresher.
#[derive(Debug, Clone)]
pub struct FileOrderFeed {
    path: PathBuf,
}

impl FileOrderFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OrderFeed for FileOrderFeed {
    async fn fetch_tickets(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(OrderTicket::parse_feed(&text)?)
    }
}

/// Writes a ticket snapshot in the same format `FileOrderFeed` reads.
pub async fn write_snapshot(path: &Path, tickets: &[OrderTicket]) -> Result<(), FeedError> {
    let text = serde_json::to_string_pretty(tickets)?;
    tokio::fs::write(path, text).await?;
    Ok(())
}
