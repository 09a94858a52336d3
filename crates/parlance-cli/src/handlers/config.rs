//! Config command handler.

use anyhow::Result;

use crate::bootstrap::CliConfig;

/// Print the effective playback configuration (file values merged over
/// defaults) as pretty JSON.
pub fn execute(config: &CliConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.playback)?);
    Ok(())
}
