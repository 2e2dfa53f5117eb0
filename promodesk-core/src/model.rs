// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::{
    chunk::{Chunk, ordinal_label},
    list::Item,
    time::to_iso,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ActionStatus {
    Editable,
    Pending,
    Accepted,
    Declined,
}

/// Identities come as strings or as numbers depending on the endpoint.
fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(i64),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl Item for Shop {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn with_id(&self, id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brandmaster {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Item for Brandmaster {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn with_id(&self, id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_action: Option<String>,
    pub id_shop: String,
    pub since_system: String,
    pub until_system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
}

impl CreateAction {
    /// One creation request per chunk, labelled with its 1-based ordinal.
    pub fn from_chunk(id_shop: &str, ordinal: usize, name: &str, c: &Chunk) -> Self {
        Self {
            id_action: None,
            id_shop: id_shop.to_string(),
            since_system: to_iso(&c.since),
            until_system: to_iso(&c.until),
            action_name: Some(ordinal_label(ordinal, name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub id_action: String,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chunk::TimeInterval, time::combine_date_time};
    use std::str::FromStr;

    #[test]
    fn status_wire_format() {
        let s = StatusChange {
            id_action: "17".to_string(),
            status: ActionStatus::Accepted,
        };
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            r#"{"idAction":"17","status":"ACCEPTED"}"#
        );
        assert_eq!(ActionStatus::from_str("declined").unwrap(), ActionStatus::Declined);
        assert_eq!(ActionStatus::Editable.to_string(), "EDITABLE");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let shops: Vec<Shop> =
            serde_json::from_str(r#"[{"id": 3, "name": "Lidl"}, {"id": "a7", "name": "Biedronka", "city": "Kraków"}]"#)
                .unwrap();
        assert_eq!(shops[0].id, "3");
        assert_eq!(shops[1].id, "a7");
        assert_eq!(shops[1].city.as_deref(), Some("Kraków"));

        let bm: Brandmaster =
            serde_json::from_str(r#"{"firstName": "Anna", "lastName": "Nowak", "email": "a@n.pl"}"#).unwrap();
        assert_eq!(bm.id, "");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn create_action_from_chunk() {
        let since = combine_date_time(Some("2025-03-10"), Some("08:00")).unwrap();
        let until = combine_date_time(Some("2025-03-10"), Some("12:00")).unwrap();
        let i = TimeInterval::new(since, until).unwrap();
        let c = crate::chunk::chunk(&i, 4.0).unwrap().remove(0);

        let r = CreateAction::from_chunk("5", 1, "Degustacja", &c);
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({
                "idShop": "5",
                "sinceSystem": "2025-03-10T07:00:00.000Z",
                "untilSystem": "2025-03-10T11:00:00.000Z",
                "actionName": "[1] Degustacja",
            })
        );
    }
}
