//! Notification printer: one JSON object per line.

use rowmark_core::Notification;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Write every notification received on `rx` to `writer` until all senders
/// are gone. Returns the number of lines written.
pub async fn write_notifications<W>(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    mut writer: W,
) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(notification) = rx.recv().await {
        let mut line = serde_json::to_vec(&notification)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        written += 1;
    }
    writer.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowmark_core::ProgressUpdate;

    #[tokio::test]
    async fn prints_json_lines() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Notification::from(ProgressUpdate {
            stream_id: "o".into(),
            progress_fraction: 0.25,
            active_item_names: vec!["x".into()],
        }))
        .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let n = write_notifications(rx, &mut out).await.unwrap();
        assert_eq!(n, 1);

        let text = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["type"], "progressState");
        assert_eq!(value["activeItemNames"][0], "x");
    }
}
