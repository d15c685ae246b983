use bytes::BytesMut;
use tracing::info;

use crate::client::Backend;

/// JPEG start-of-image sequence; each occurrence in the multipart stream
/// marks one detection frame.
const SOI: [u8; 3] = [0xff, 0xd8, 0xff];

/// Counts frame starts across chunk boundaries. Only the last two bytes of
/// each chunk are carried over, just enough for a marker split between
/// reads.
struct FrameCounter {
    tail: BytesMut,
    frames: u64,
}

impl FrameCounter {
    fn new() -> Self {
        Self {
            tail: BytesMut::new(),
            frames: 0,
        }
    }

    fn push(&mut self, chunk: &[u8]) -> u64 {
        self.tail.extend_from_slice(chunk);
        let found = self
            .tail
            .windows(SOI.len())
            .filter(|window| *window == SOI)
            .count() as u64;
        self.frames += found;

        if self.tail.len() > SOI.len() - 1 {
            let keep_from = self.tail.len() - (SOI.len() - 1);
            self.tail = self.tail.split_off(keep_from);
        }
        found
    }
}

/// Follows the continuous detection stream after a successful upload,
/// reporting received frames until the stream ends or Ctrl-C detaches.
/// The terminal stand-in for the page's self-refreshing image element.
pub async fn follow(client: &Backend) -> anyhow::Result<()> {
    let mut resp = client.feed().await?;
    info!("attached to detection stream");

    let mut counter = FrameCounter::new();
    loop {
        tokio::select! {
            chunk = resp.chunk() => {
                match chunk? {
                    Some(data) => {
                        let before = counter.frames;
                        counter.push(&data);
                        if before == 0 && counter.frames > 0 {
                            info!("stream live, first frame received");
                        } else if counter.frames / 25 > before / 25 {
                            info!("{} frames received", counter.frames);
                        }
                    }
                    None => {
                        info!("stream ended after {} frames", counter.frames);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("detached after {} frames", counter.frames);
                break;
            }
        }
    }
    Ok(())
}
