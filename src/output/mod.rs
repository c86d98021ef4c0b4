//! Output artifact handling

use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::error::ApexResult;

/// Timestamp-based default filename for an assembled video
pub fn default_output_name() -> String {
    format!("apex-clip-{}.mp4", Utc::now().timestamp_millis())
}

/// Write the assembled artifact to disk
pub async fn write_artifact(path: &Path, data: &[u8]) -> ApexResult<()> {
    tokio::fs::write(path, data).await?;
    info!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}
