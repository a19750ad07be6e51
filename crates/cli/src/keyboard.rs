//! Keyboard input source: stdin lines become input events.

use sentia_core::input::InputEvent;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Read stdin on a background task, one event per non-empty line.
///
/// The channel closes at end of input.
pub fn spawn_stdin() -> mpsc::Receiver<io::Result<InputEvent>> {
    spawn_reader(BufReader::new(io::stdin()))
}

/// Read lines from any buffered reader.
pub fn spawn_reader<R>(reader: R) -> mpsc::Receiver<io::Result<InputEvent>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if tx.send(Ok(InputEvent::keyboard(&line))).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF (Ctrl+D)
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });

    rx
}
