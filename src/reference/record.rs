use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A stored inventory record, serialized the way resource modules return it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub in_stock: bool,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create request body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Update request body. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(Vec<FieldError>),
}

impl Validation {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "is required".to_string(),
        });
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError {
            field: "name",
            message: format!("must be at most {} characters", MAX_NAME_LEN),
        });
    }
    if name.contains('<') || name.contains('>') {
        errors.push(FieldError {
            field: "name",
            message: "must not contain markup".to_string(),
        });
    }
}

fn check_description(description: &str, errors: &mut Vec<FieldError>) {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        errors.push(FieldError {
            field: "description",
            message: format!("must be at most {} characters", MAX_DESCRIPTION_LEN),
        });
    }
}

fn check_price(price: f64, errors: &mut Vec<FieldError>) {
    if !price.is_finite() || price < 0.0 {
        errors.push(FieldError {
            field: "price",
            message: "must be a non-negative number".to_string(),
        });
    }
}

fn check_quantity(quantity: i64, errors: &mut Vec<FieldError>) {
    if quantity < 0 {
        errors.push(FieldError {
            field: "quantity",
            message: "must be non-negative".to_string(),
        });
    }
}

impl NewItem {
    pub fn validate(&self) -> Validation {
        let mut errors = Vec::new();
        check_name(&self.name, &mut errors);
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }
        check_price(self.price, &mut errors);
        if let Some(quantity) = self.quantity {
            check_quantity(quantity, &mut errors);
        }
        Validation::from_errors(errors)
    }
}

impl ItemPatch {
    pub fn validate(&self) -> Validation {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }
        if let Some(price) = self.price {
            check_price(price, &mut errors);
        }
        if let Some(quantity) = self.quantity {
            check_quantity(quantity, &mut errors);
        }
        Validation::from_errors(errors)
    }

    /// Apply the provided fields to `item`, leaving every other field as is.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(in_stock) = self.in_stock {
            item.in_stock = in_stock;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
    }
}

/// Ids are 24 hex characters, like document-store object ids.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_item(value: serde_json::Value) -> NewItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_new_item() {
        let item = new_item(json!({
            "name": "Test Item",
            "description": "Automated test item",
            "price": 9.99,
            "inStock": true,
            "quantity": 10
        }));
        assert!(item.validate().is_valid());
        assert_eq!(item.in_stock, Some(true));
    }

    #[test]
    fn test_empty_name_invalid() {
        let item = new_item(json!({ "name": "   ", "price": 10 }));
        match item.validate() {
            Validation::Invalid(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "name");
            }
            Validation::Valid => panic!("empty name accepted"),
        }
    }

    #[test]
    fn test_negative_price_invalid() {
        let item = new_item(json!({ "name": "Test", "price": -5 }));
        assert!(!item.validate().is_valid());
    }

    #[test]
    fn test_markup_in_name_invalid() {
        let item = new_item(json!({ "name": "<script>alert(1)</script>", "price": 10 }));
        assert!(!item.validate().is_valid());
    }

    #[test]
    fn test_collects_every_field_error() {
        let item = new_item(json!({ "name": "", "price": -1, "quantity": -3 }));
        match item.validate() {
            Validation::Invalid(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["name", "price", "quantity"]);
            }
            Validation::Valid => panic!("invalid item accepted"),
        }
    }

    #[test]
    fn test_missing_price_is_parse_error() {
        assert!(serde_json::from_value::<NewItem>(json!({ "name": "Test" })).is_err());
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let now = Utc::now();
        let mut item = Item {
            id: "0123456789abcdef01234567".to_string(),
            name: "Test Item".to_string(),
            description: Some("desc".to_string()),
            price: 9.99,
            in_stock: true,
            quantity: 10,
            created_at: now,
            updated_at: now,
        };
        let patch: ItemPatch =
            serde_json::from_value(json!({ "price": 19.99, "quantity": 5 })).unwrap();
        assert!(patch.validate().is_valid());
        patch.apply_to(&mut item);

        assert_eq!(item.name, "Test Item");
        assert_eq!(item.description.as_deref(), Some("desc"));
        assert_eq!(item.price, 19.99);
        assert_eq!(item.quantity, 5);
        assert!(item.in_stock);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        assert!(serde_json::from_value::<ItemPatch>(json!({ "_id": "x" })).is_err());
    }

    #[test]
    fn test_patch_validates_present_fields() {
        let patch: ItemPatch = serde_json::from_value(json!({ "price": -1 })).unwrap();
        assert!(!patch.validate().is_valid());
        assert!(ItemPatch::default().validate().is_valid());
    }

    #[test]
    fn test_item_serializes_with_underscore_id() {
        let now = Utc::now();
        let item = Item {
            id: "0123456789abcdef01234567".to_string(),
            name: "Kiwi".to_string(),
            description: None,
            price: 1.5,
            in_stock: false,
            quantity: 0,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["_id"], "0123456789abcdef01234567");
        assert_eq!(value["inStock"], false);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("0123456789abcdef01234567"));
        assert!(is_valid_id("0123456789ABCDEF01234567"));
        assert!(!is_valid_id("not-a-valid-id"));
        assert!(!is_valid_id("0123456789abcdef0123456"));
        assert!(!is_valid_id("0123456789abcdef0123456g"));
    }
}
