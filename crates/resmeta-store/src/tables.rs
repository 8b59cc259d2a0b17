//! Redb table definitions for persistent metadata storage.

use redb::TableDefinition;

// Key: record id (UUIDv7 string, so key order is creation order), Value: JSON-encoded MetadataRecord
pub const METADATA: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");
// Key: MetadataKey::index_key(), Value: record id
pub const METADATA_KEYS: TableDefinition<&str, &str> = TableDefinition::new("metadata_keys");
