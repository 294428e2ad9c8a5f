//! Catalog payloads

use serde::{Deserialize, Serialize};

use super::money::Money;
use super::ExtraFields;

/// A catalog entry (item, variation, category, tax, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_data: Option<CatalogItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_variation_data: Option<CatalogItemVariation>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<CatalogObject>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItemVariation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_money: Option<Money>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Query parameters for listing the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCatalogRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Comma-separated object types, e.g. `ITEM,CATEGORY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListCatalogResponse {
    #[serde(default)]
    pub objects: Vec<CatalogObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveCatalogObjectResponse {
    pub object: CatalogObject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_objects: Vec<CatalogObject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates unknown provider fields survive deserialization.
    #[test]
    fn test_preserves_unknown_fields() {
        let json = serde_json::json!({
            "type": "ITEM",
            "id": "ITEM_1",
            "version": 3,
            "present_at_all_locations": true,
            "item_data": {
                "name": "Burrito",
                "product_type": "REGULAR",
                "variations": [{
                    "type": "ITEM_VARIATION",
                    "id": "VAR_1",
                    "item_variation_data": {
                        "item_id": "ITEM_1",
                        "price_money": {"amount": 1150, "currency": "USD"}
                    }
                }]
            }
        });

        let object: CatalogObject = serde_json::from_value(json.clone()).unwrap();
        let item = object.item_data.as_ref().unwrap();
        assert_eq!(item.name.as_deref(), Some("Burrito"));
        assert_eq!(
            item.variations[0].item_variation_data.as_ref().unwrap().price_money,
            Some(Money::new(1150, "USD"))
        );
        assert_eq!(object.extra["present_at_all_locations"], serde_json::json!(true));

        assert_eq!(serde_json::to_value(&object).unwrap(), json);
    }
}
