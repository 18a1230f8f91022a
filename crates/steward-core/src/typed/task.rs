//! Task trait - kind 文字列と payload 型の対応付け
//!
//! # 学習ポイント
//! - Associated Constants (`const KIND`)
//! - properties（map<string,string>）から構造体への decode

use serde::de::DeserializeOwned;

use crate::domain::errors::HandlerError;
use crate::domain::task::TaskRecord;

/// Task は kind と payload 型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Deserialize)]
/// struct DropTableCleanup {
///     location: String,
/// }
///
/// impl Task for DropTableCleanup {
///     const KIND: &'static str = "table_cleanup";
/// }
/// ```
///
/// Properties are stored as strings, so payload fields decode from strings.
pub trait Task: DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    /// Decode the record's properties into the payload type.
    fn decode(record: &TaskRecord) -> Result<Self, HandlerError> {
        let value = serde_json::to_value(&record.properties)
            .map_err(|e| HandlerError::Decode(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| HandlerError::Decode(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde::Deserialize;

    use super::Task;

    #[derive(Debug, Clone, Deserialize)]
    pub struct CleanupTask {
        pub location: String,
    }

    impl Task for CleanupTask {
        const KIND: &'static str = "table_cleanup";
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ManifestTask {
        pub manifest: String,
        #[serde(default)]
        pub snapshot: Option<String>,
    }

    impl Task for ManifestTask {
        const KIND: &'static str = "manifest_cleanup";
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{CleanupTask, ManifestTask};
    use super::*;
    use crate::domain::ids::TaskId;
    use crate::domain::task::TaskKind;
    use chrono::Utc;

    #[test]
    fn decodes_properties_into_payload() {
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new(ManifestTask::KIND), Utc::now())
            .with_property("manifest", "m-1.avro");

        let task = ManifestTask::decode(&record).unwrap();
        assert_eq!(task.manifest, "m-1.avro");
        assert_eq!(task.snapshot, None);
    }

    #[test]
    fn missing_field_is_decode_error() {
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new(CleanupTask::KIND), Utc::now());

        assert!(matches!(
            CleanupTask::decode(&record),
            Err(HandlerError::Decode(_))
        ));
    }
}
