use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::fields::{lenient_uuid, wide_int};
use crate::codec::Record;
use crate::domain::errors::{CodecError, CodecResult};

/// A player profile keyed by the player's UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub uuid: Uuid,

    #[serde(default)]
    pub pvp_enabled: bool,

    pub first_seen: DateTime<Utc>,

    /// Accumulated play time in milliseconds
    #[serde(default, with = "wide_int")]
    pub play_time_ms: i64,

    #[serde(default, with = "lenient_uuid")]
    pub last_opponent: Option<Uuid>,

    /// Epoch millis until which the player counts as in combat; never persisted
    #[serde(skip)]
    pub combat_tagged_until: Option<i64>,
}

impl Profile {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            pvp_enabled: false,
            first_seen: Utc::now(),
            play_time_ms: 0,
            last_opponent: None,
            combat_tagged_until: None,
        }
    }

    pub fn toggle_pvp(&mut self) -> bool {
        self.pvp_enabled = !self.pvp_enabled;
        self.pvp_enabled
    }
}

impl Record for Profile {
    fn post_process(&mut self) -> CodecResult<()> {
        if self.uuid.is_nil() {
            return Err(CodecError::PostProcess(
                "profile has a nil uuid".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RecordCodec;
    use serde_json::json;

    #[test]
    fn test_profile_document_shape() {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.play_time_ms = 9_007_199_254_740_993;
        profile.combat_tagged_until = Some(10);

        let doc = RecordCodec::new().encode(&profile).unwrap();
        assert_eq!(doc["play_time_ms"], json!("9007199254740993"));
        assert_eq!(doc["uuid"], json!(profile.uuid.to_string()));
        assert!(!doc.contains_key("combat_tagged_until"));
    }

    #[test]
    fn test_nil_uuid_rejected_on_decode() {
        let doc = RecordCodec::new().encode(&Profile::new(Uuid::nil())).unwrap();
        assert!(RecordCodec::new().decode::<Profile>(doc).is_err());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let doc = json!({
            "uuid": Uuid::new_v4().to_string(),
            "first_seen": "2024-01-01T00:00:00Z"
        });
        let serde_json::Value::Object(doc) = doc else {
            panic!("expected object");
        };
        let profile: Profile = RecordCodec::new().decode(doc).unwrap();
        assert!(!profile.pvp_enabled);
        assert_eq!(profile.play_time_ms, 0);
        assert_eq!(profile.last_opponent, None);
    }
}
