use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::mapping::{ColumnMapping, IdSequence, TableMapping};

/// A tracked storm.
/// Maps to the `storms` table; `id` comes from the `storms_id_generator` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Storm {
    id: Option<i64>,
    start_date: String,
    end_date: String,
    start_location: String,
    end_location: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    storm_type: String,
    intensity: i32,
}

/// Storm payload for creation (no generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStorm {
    pub start_date: String,
    pub end_date: String,
    pub start_location: String,
    pub end_location: String,
    #[serde(rename = "type")]
    pub storm_type: String,
    pub intensity: i32,
}

impl Storm {
    pub const MAPPING: TableMapping = TableMapping {
        table: "storms",
        id_column: "id",
        sequence: IdSequence {
            name: "storms_id_generator",
            start: 10,
            increment: 1,
        },
        columns: &[
            ColumnMapping::text("start_date"),
            ColumnMapping::text("end_date"),
            ColumnMapping::text("start_location"),
            ColumnMapping::text("end_location"),
            ColumnMapping::text("type"),
            ColumnMapping::integer("intensity"),
        ],
    };

    /// Build an unsaved storm; the id is assigned on first save
    pub fn new(
        start_date: impl Into<String>,
        end_date: impl Into<String>,
        start_location: impl Into<String>,
        end_location: impl Into<String>,
        storm_type: impl Into<String>,
        intensity: i32,
    ) -> Self {
        Self {
            id: None,
            start_date: start_date.into(),
            end_date: end_date.into(),
            start_location: start_location.into(),
            end_location: end_location.into(),
            storm_type: storm_type.into(),
            intensity,
        }
    }

    /// Copy of this storm carrying a store-assigned id
    pub(crate) fn with_id(&self, id: i64) -> Self {
        Self {
            id: Some(id),
            ..self.clone()
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    pub fn end_date(&self) -> &str {
        &self.end_date
    }

    pub fn start_location(&self) -> &str {
        &self.start_location
    }

    pub fn end_location(&self) -> &str {
        &self.end_location
    }

    pub fn storm_type(&self) -> &str {
        &self.storm_type
    }

    pub fn intensity(&self) -> i32 {
        self.intensity
    }
}

impl From<NewStorm> for Storm {
    fn from(new_storm: NewStorm) -> Self {
        Storm::new(
            new_storm.start_date,
            new_storm.end_date,
            new_storm.start_location,
            new_storm.end_location,
            new_storm.storm_type,
            new_storm.intensity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knoxville() -> Storm {
        Storm::new(
            "03-17-2019",
            "03-20-2019",
            "South Atlantic",
            "Knoxville, Tennessee",
            "Tropical Depression",
            3,
        )
    }

    #[test]
    fn test_new_storm_has_no_id() {
        let storm = knoxville();
        assert!(storm.is_new());
        assert_eq!(storm.id(), None);
        assert_eq!(storm.storm_type(), "Tropical Depression");
        assert_eq!(storm.intensity(), 3);
    }

    #[test]
    fn test_with_id_keeps_fields() {
        let storm = knoxville();
        let saved = storm.with_id(12);
        assert_eq!(saved.id(), Some(12));
        assert_eq!(saved.start_location(), storm.start_location());
        assert_eq!(saved.end_location(), "Knoxville, Tennessee");
        assert!(storm.is_new());
    }

    #[test]
    fn test_serializes_type_field_name() {
        let json = serde_json::to_value(knoxville().with_id(12)).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["type"], "Tropical Depression");
        assert!(json.get("storm_type").is_none());
    }

    #[test]
    fn test_new_storm_conversion() {
        let payload: NewStorm = serde_json::from_value(serde_json::json!({
            "start_date": "03-17-2019",
            "end_date": "03-20-2019",
            "start_location": "South Atlantic",
            "end_location": "Knoxville, Tennessee",
            "type": "Tropical Depression",
            "intensity": 3
        }))
        .unwrap();
        assert_eq!(Storm::from(payload), knoxville());
    }

    #[test]
    fn test_mapping_matches_table() {
        assert_eq!(Storm::MAPPING.table, "storms");
        assert_eq!(Storm::MAPPING.sequence.start, 10);
        assert_eq!(Storm::MAPPING.columns.len(), 6);
    }
}
