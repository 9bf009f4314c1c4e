use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate an entry id of the form `<prefix>_<YYYYMMDD>_<8 hex chars>`.
///
/// Ids are assigned once at insertion time and never reused; the uuid
/// fragment keeps same-day entries distinct.
pub fn generate_entry_id(prefix: &str, now: DateTime<Utc>) -> String {
    let fragment = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", now.format("%Y%m%d"), &fragment[..8])
}
