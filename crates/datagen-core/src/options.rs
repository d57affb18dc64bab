//! Typed generation options and sink-addressing names.
//!
//! Options are written as a free-form mapping in the model file and
//! coerced here into typed values. Every key has a default, so sinks can
//! always ask for a value.

use crate::schema::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Well-known keys of the `table_names` mapping.
///
/// The mapping itself stays open: sinks look up whatever key they need and
/// unknown keys are carried through untouched.
pub mod table_names {
    pub const LOCAL_FILE_PATH: &str = "local_file_path";
    pub const LOCAL_FILE_NAME: &str = "local_file_name";
    pub const HDFS_FILE_PATH: &str = "hdfs_file_path";
    pub const HDFS_FILE_NAME: &str = "hdfs_file_name";
    pub const KAFKA_TOPIC: &str = "kafka_topic";
    pub const HIVE_DATABASE: &str = "hive_database";
    pub const HIVE_TABLE_NAME: &str = "hive_table_name";
    pub const KUDU_TABLE_NAME: &str = "kudu_table_name";
    pub const S3_BUCKET: &str = "s3_bucket";
    pub const S3_DIRECTORY: &str = "s3_directory";
    pub const SOLR_COLLECTION: &str = "solr_collection";
}

/// Value of a generation option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Integer(i) => write!(f, "{i}"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionType {
    Bool,
    Integer,
    Text,
}

/// Known generation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKey {
    OneFilePerIteration,
    CsvHeader,
    DeletePrevious,
    KafkaMsgKey,
    KafkaMessageType,
    KafkaAcksConfig,
    KafkaRetriesConfig,
    KafkaPartitionsNumber,
    KafkaReplicationFactor,
    HdfsReplicationFactor,
    OzoneReplicationFactor,
    HiveThreadNumber,
    HiveTableType,
    HiveTableFormat,
    HiveOnHdfs,
    HiveTezQueueName,
    HiveTablePartitionsCols,
    HiveTableBucketsCols,
    HiveTableBucketsNumber,
    SolrShards,
    SolrReplicas,
    KuduReplicas,
    KuduBuckets,
    KuduBuffer,
    KuduFlush,
    ParquetPageSize,
    ParquetRowGroupSize,
    ParquetDictionaryPageSize,
    ParquetDictionaryEncoding,
}

impl OptionKey {
    pub const ALL: [OptionKey; 29] = [
        OptionKey::OneFilePerIteration,
        OptionKey::CsvHeader,
        OptionKey::DeletePrevious,
        OptionKey::KafkaMsgKey,
        OptionKey::KafkaMessageType,
        OptionKey::KafkaAcksConfig,
        OptionKey::KafkaRetriesConfig,
        OptionKey::KafkaPartitionsNumber,
        OptionKey::KafkaReplicationFactor,
        OptionKey::HdfsReplicationFactor,
        OptionKey::OzoneReplicationFactor,
        OptionKey::HiveThreadNumber,
        OptionKey::HiveTableType,
        OptionKey::HiveTableFormat,
        OptionKey::HiveOnHdfs,
        OptionKey::HiveTezQueueName,
        OptionKey::HiveTablePartitionsCols,
        OptionKey::HiveTableBucketsCols,
        OptionKey::HiveTableBucketsNumber,
        OptionKey::SolrShards,
        OptionKey::SolrReplicas,
        OptionKey::KuduReplicas,
        OptionKey::KuduBuckets,
        OptionKey::KuduBuffer,
        OptionKey::KuduFlush,
        OptionKey::ParquetPageSize,
        OptionKey::ParquetRowGroupSize,
        OptionKey::ParquetDictionaryPageSize,
        OptionKey::ParquetDictionaryEncoding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::OneFilePerIteration => "one_file_per_iteration",
            OptionKey::CsvHeader => "csv_header",
            OptionKey::DeletePrevious => "delete_previous",
            OptionKey::KafkaMsgKey => "kafka_msg_key",
            OptionKey::KafkaMessageType => "kafka_message_type",
            OptionKey::KafkaAcksConfig => "kafka_acks_config",
            OptionKey::KafkaRetriesConfig => "kafka_retries_config",
            OptionKey::KafkaPartitionsNumber => "kafka_partitions_number",
            OptionKey::KafkaReplicationFactor => "kafka_replication_factor",
            OptionKey::HdfsReplicationFactor => "hdfs_replication_factor",
            OptionKey::OzoneReplicationFactor => "ozone_replication_factor",
            OptionKey::HiveThreadNumber => "hive_thread_number",
            OptionKey::HiveTableType => "hive_table_type",
            OptionKey::HiveTableFormat => "hive_table_format",
            OptionKey::HiveOnHdfs => "hive_on_hdfs",
            OptionKey::HiveTezQueueName => "hive_tez_queue_name",
            OptionKey::HiveTablePartitionsCols => "hive_table_partitions_cols",
            OptionKey::HiveTableBucketsCols => "hive_table_buckets_cols",
            OptionKey::HiveTableBucketsNumber => "hive_table_buckets_number",
            OptionKey::SolrShards => "solr_shards",
            OptionKey::SolrReplicas => "solr_replicas",
            OptionKey::KuduReplicas => "kudu_replicas",
            OptionKey::KuduBuckets => "kudu_buckets",
            OptionKey::KuduBuffer => "kudu_buffer",
            OptionKey::KuduFlush => "kudu_flush",
            OptionKey::ParquetPageSize => "parquet_page_size",
            OptionKey::ParquetRowGroupSize => "parquet_row_group_size",
            OptionKey::ParquetDictionaryPageSize => "parquet_dictionary_page_size",
            OptionKey::ParquetDictionaryEncoding => "parquet_dictionary_encoding",
        }
    }

    fn value_type(&self) -> OptionType {
        match self {
            OptionKey::OneFilePerIteration
            | OptionKey::CsvHeader
            | OptionKey::DeletePrevious
            | OptionKey::HiveOnHdfs
            | OptionKey::ParquetDictionaryEncoding => OptionType::Bool,
            OptionKey::KafkaRetriesConfig
            | OptionKey::KafkaPartitionsNumber
            | OptionKey::KafkaReplicationFactor
            | OptionKey::HdfsReplicationFactor
            | OptionKey::OzoneReplicationFactor
            | OptionKey::HiveThreadNumber
            | OptionKey::HiveTableBucketsNumber
            | OptionKey::SolrShards
            | OptionKey::SolrReplicas
            | OptionKey::KuduReplicas
            | OptionKey::KuduBuckets
            | OptionKey::KuduBuffer
            | OptionKey::ParquetPageSize
            | OptionKey::ParquetRowGroupSize
            | OptionKey::ParquetDictionaryPageSize => OptionType::Integer,
            OptionKey::KafkaMsgKey
            | OptionKey::KafkaMessageType
            | OptionKey::KafkaAcksConfig
            | OptionKey::HiveTableType
            | OptionKey::HiveTableFormat
            | OptionKey::HiveTezQueueName
            | OptionKey::HiveTablePartitionsCols
            | OptionKey::HiveTableBucketsCols
            | OptionKey::KuduFlush => OptionType::Text,
        }
    }

    /// Value used when the model does not set this option.
    pub fn default_value(&self) -> OptionValue {
        use OptionValue::{Bool, Integer, Text};
        match self {
            OptionKey::OneFilePerIteration
            | OptionKey::CsvHeader
            | OptionKey::HiveOnHdfs
            | OptionKey::ParquetDictionaryEncoding => Bool(true),
            OptionKey::DeletePrevious => Bool(false),
            OptionKey::SolrShards
            | OptionKey::SolrReplicas
            | OptionKey::KuduReplicas
            | OptionKey::HiveThreadNumber
            | OptionKey::KafkaReplicationFactor => Integer(1),
            OptionKey::KafkaRetriesConfig
            | OptionKey::KafkaPartitionsNumber
            | OptionKey::OzoneReplicationFactor
            | OptionKey::HdfsReplicationFactor => Integer(3),
            OptionKey::HiveTableBucketsNumber | OptionKey::KuduBuckets => Integer(32),
            OptionKey::KuduBuffer => Integer(100_001),
            OptionKey::ParquetPageSize | OptionKey::ParquetDictionaryPageSize => {
                Integer(1_048_576)
            }
            OptionKey::ParquetRowGroupSize => Integer(134_217_728),
            OptionKey::KafkaMsgKey => Text(String::new()),
            OptionKey::KafkaMessageType => Text("json".to_string()),
            OptionKey::KafkaAcksConfig => Text("all".to_string()),
            OptionKey::HiveTableType => Text("external".to_string()),
            OptionKey::HiveTableFormat => Text("orc".to_string()),
            OptionKey::HiveTezQueueName => Text("root.default".to_string()),
            OptionKey::HiveTablePartitionsCols | OptionKey::HiveTableBucketsCols => {
                Text(String::new())
            }
            OptionKey::KuduFlush => Text("MANUAL_FLUSH".to_string()),
        }
    }

    fn coerce(&self, raw: &OptionValue) -> Option<OptionValue> {
        match (self.value_type(), raw) {
            (OptionType::Bool, OptionValue::Bool(b)) => Some(OptionValue::Bool(*b)),
            (OptionType::Bool, OptionValue::Text(s)) => {
                s.trim().to_ascii_lowercase().parse().ok().map(OptionValue::Bool)
            }
            (OptionType::Integer, OptionValue::Integer(i)) => Some(OptionValue::Integer(*i)),
            (OptionType::Integer, OptionValue::Text(s)) => {
                s.trim().parse().ok().map(OptionValue::Integer)
            }
            (OptionType::Text, other) => Some(OptionValue::Text(other.to_string())),
            _ => None,
        }
    }
}

impl FromStr for OptionKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        OptionKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or(())
    }
}

/// Typed options of a model, with defaults for every key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOptions {
    values: BTreeMap<OptionKey, OptionValue>,
}

impl ModelOptions {
    /// Coerce the raw `options` mapping of a model file.
    ///
    /// Unknown keys are skipped with a warning; a value that cannot be
    /// coerced to the key's type is a schema error.
    pub fn from_raw(raw: &BTreeMap<String, OptionValue>) -> Result<Self, SchemaError> {
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let Ok(key) = name.parse::<OptionKey>() else {
                warn!("Ignoring unknown model option '{name}'");
                continue;
            };
            let typed = key.coerce(value).ok_or_else(|| SchemaError::InvalidOption {
                option: name.clone(),
                value: value.to_string(),
            })?;
            values.insert(key, typed);
        }
        Ok(Self { values })
    }

    pub fn set(&mut self, key: OptionKey, value: OptionValue) {
        self.values.insert(key, value);
    }

    /// Value explicitly set in the model, if any.
    pub fn get_explicit(&self, key: OptionKey) -> Option<&OptionValue> {
        self.values.get(&key)
    }

    pub fn get_or_default(&self, key: OptionKey) -> OptionValue {
        self.values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.default_value())
    }

    pub fn get_bool(&self, key: OptionKey) -> bool {
        match self.get_or_default(key) {
            OptionValue::Bool(b) => b,
            _ => false,
        }
    }

    pub fn get_int(&self, key: OptionKey) -> i64 {
        match self.get_or_default(key) {
            OptionValue::Integer(i) => i,
            _ => 0,
        }
    }

    pub fn get_text(&self, key: OptionKey) -> String {
        self.get_or_default(key).to_string()
    }

    /// Options explicitly set, keyed by their file name.
    pub fn to_raw(&self) -> BTreeMap<String, OptionValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, OptionValue)]) -> BTreeMap<String, OptionValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let options = ModelOptions::default();
        assert!(options.get_bool(OptionKey::OneFilePerIteration));
        assert!(options.get_bool(OptionKey::CsvHeader));
        assert!(!options.get_bool(OptionKey::DeletePrevious));
        assert_eq!(options.get_int(OptionKey::KafkaPartitionsNumber), 3);
        assert_eq!(options.get_text(OptionKey::KafkaMessageType), "json");
    }

    #[test]
    fn test_coercion_from_text_and_case_insensitive_keys() {
        let options = ModelOptions::from_raw(&raw(&[
            ("CSV_HEADER", OptionValue::Text("false".into())),
            ("kudu_buckets", OptionValue::Text("8".into())),
            ("kafka_message_type", OptionValue::Integer(5)),
        ]))
        .unwrap();
        assert!(!options.get_bool(OptionKey::CsvHeader));
        assert_eq!(options.get_int(OptionKey::KuduBuckets), 8);
        assert_eq!(options.get_text(OptionKey::KafkaMessageType), "5");
    }

    #[test]
    fn test_wrong_type_is_schema_error() {
        let result = ModelOptions::from_raw(&raw(&[(
            "delete_previous",
            OptionValue::Integer(2),
        )]));
        assert!(matches!(result, Err(SchemaError::InvalidOption { .. })));
    }

    #[test]
    fn test_unknown_option_is_ignored() {
        let options =
            ModelOptions::from_raw(&raw(&[("not_an_option", OptionValue::Bool(true))])).unwrap();
        assert!(options.to_raw().is_empty());
    }
}
