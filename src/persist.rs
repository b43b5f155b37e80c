use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;

/// Raw-envelope store: one pretty-printed JSON file per inbound message.
/// File names combine device id and a millisecond timestamp, so concurrent
/// writes for different messages never collide on a path.
pub struct RawStore {
    data_dir: PathBuf,
}

impl RawStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub async fn store(&self, device_id: &str, raw: &serde_json::Value) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.data_dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self.data_dir.join(format!("{}_{}.json", device_id, timestamp));
        fs::write(&path, serde_json::to_vec_pretty(raw)?).await?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_dir;

    #[tokio::test]
    async fn writes_one_file_per_message() {
        let dir = temp_dir("raw-store");
        let store = RawStore::new(&dir);
        let raw = serde_json::json!({"end_device_ids": {"device_id": "sensor-1"}});

        let first = store.store("sensor-1", &raw).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.store("sensor-1", &raw).await.unwrap();

        assert!(first.exists());
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sensor-1_"));
        assert_ne!(first, second);

        let contents = std::fs::read_to_string(&first).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, raw);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
