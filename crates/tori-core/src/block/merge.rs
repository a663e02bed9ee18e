use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{save_block, DataBlock, FileBlock};
use crate::error::Error;

/// Wrap the blocks in a DataBlock stamped with the current time. Blocks are
/// kept as given; duplicate ids are not folded together.
pub fn merge_blocks(blocks: Vec<FileBlock>) -> Result<DataBlock, Error> {
    if blocks.is_empty() {
        return Err(Error::EmptyInput);
    }
    debug!("Merged {} FileBlocks into one DataBlock", blocks.len());
    Ok(DataBlock {
        updated_at: Some(Utc::now()),
        blocks,
    })
}

/// Overwrite the artifact at `path`. No existence check, no backup.
pub fn persist_data_block(data_block: &DataBlock, path: &Path) -> Result<(), Error> {
    save_block(path, data_block)?;
    info!(
        "Saved DataBlock with {} blocks to {}",
        data_block.blocks.len(),
        path.display()
    );
    Ok(())
}

/// Decide what a client holding `client_updated_at` should receive.
///
/// - no client time, or client older than server: the full block
/// - same time: `None`, nothing to send
/// - client newer than server: [`Error::ClientAheadOfServer`]
pub fn resolve_freshness(
    server: DataBlock,
    client_updated_at: Option<DateTime<Utc>>,
) -> Result<Option<DataBlock>, Error> {
    let server_time = server.updated_at.ok_or(Error::MissingVersion)?;

    let Some(client_time) = client_updated_at else {
        return Ok(Some(server));
    };

    if client_time < server_time {
        Ok(Some(server))
    } else if client_time == server_time {
        Ok(None)
    } else {
        Err(Error::ClientAheadOfServer {
            client: client_time,
            server: server_time,
        })
    }
}

/// Write a DataBlock as indented JSON, for people rather than programs.
pub fn save_data_block_text(path: &Path, data_block: &DataBlock) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(data_block)?;
    fs::write(path, text)?;
    Ok(())
}
