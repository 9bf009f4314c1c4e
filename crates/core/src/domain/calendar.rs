use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub id: String,
    pub title: String,
    #[serde(default = "default_item_type")]
    pub item_type: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_item_type() -> String {
    "event".to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default)]
    pub scheduled_items: Vec<ScheduledItem>,
}

impl Calendar {
    /// Items overlapping the optional range, ascending by start time.
    pub fn items_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<ScheduledItem> {
        let mut items: Vec<ScheduledItem> = self
            .scheduled_items
            .iter()
            .filter(|item| {
                from.map_or(true, |from| item.start_time >= from)
                    && to.map_or(true, |to| item.start_time <= to)
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| item.start_time);
        items
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Calendar, ScheduledItem};

    fn item(id: &str, hour: u32) -> ScheduledItem {
        ScheduledItem {
            id: id.to_string(),
            title: format!("session {id}"),
            item_type: "workout".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 4, 2, hour, 0, 0).unwrap(),
            end_time: None,
            notes: None,
        }
    }

    #[test]
    fn range_filter_sorts_ascending() {
        let calendar = Calendar { scheduled_items: vec![item("b", 18), item("a", 7)] };
        let items = calendar.items_in_range(None, None);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[1].id, "b");
    }

    #[test]
    fn range_filter_is_inclusive() {
        let calendar = Calendar { scheduled_items: vec![item("a", 7), item("b", 18)] };
        let from = Utc.with_ymd_and_hms(2026, 4, 2, 7, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        let items = calendar.items_in_range(Some(from), Some(to));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
    }
}
