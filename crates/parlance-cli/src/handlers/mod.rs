//! Command handlers.
//!
//! Handlers parse CLI-specific input, call into `parlance-core` and format
//! output for the terminal. They never construct an audio sink themselves;
//! that happens in [`crate::bootstrap`].

pub mod config;
pub mod inspect;
pub mod play;

use tokio::io::AsyncRead;

/// Input argument meaning "read from stdin".
pub const STDIN: &str = "-";

/// Open a response file, or stdin for `-`.
pub async fn open_input(input: &str) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if input == STDIN {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(input).await?;
    Ok(Box::new(file))
}
