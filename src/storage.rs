use crate::inventory::Inventory;
use thiserror::Error;
use tracing::debug;

const STORAGE_UNIT_NAME: &str = "Storage Unit";
const QUANTITY_PREFIX: &str = "Number of Items: ";
/// Index of the description line that carries the item count of a storage unit.
/// Other item types are not guaranteed to have this many lines.
const QUANTITY_LINE: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no storage unit found with name {0}")]
    NotFound(String),
    /// The storage unit exists but its item count can't be read from the
    /// repurposed description line. This is an upstream data-contract
    /// violation, kept distinct from [`ResolveError::NotFound`] so callers
    /// don't feed a bogus quantity into capacity arithmetic.
    #[error("storage unit {name} has a malformed item count: {raw:?}")]
    MalformedQuantity { name: String, raw: String },
}

/// A storage unit as derived from the current inventory snapshot.
///
/// Rebuilt on every lookup, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUnit {
    /// The game coordinator object id, used for all casket operations.
    pub id: u64,
    pub current_quantity: u32,
}

/// Looks up a storage unit by its user-assigned name tag.
///
/// The inventory service encodes the name tag as the first fraud warning of
/// the storage unit description, in the form `Name Tag: ''<name>''`. The match
/// is exact, case-sensitive and without any quote normalization.
pub fn resolve_storage_unit(inventory: &Inventory, name: &str) -> Result<StorageUnit, ResolveError> {
    let name_tag = format!("Name Tag: ''{name}''");
    let description = inventory
        .descriptions
        .iter()
        .filter(|description| description.name == STORAGE_UNIT_NAME)
        .find(|description| description.fraud_warnings.first() == Some(&name_tag))
        .ok_or_else(|| ResolveError::NotFound(name.into()))?;
    let asset = inventory
        .assets
        .iter()
        .find(|asset| asset.class_id == description.class_id)
        .ok_or_else(|| ResolveError::NotFound(name.into()))?;

    let raw_quantity = description
        .descriptions
        .get(QUANTITY_LINE)
        .map(|line| line.value.as_str())
        .unwrap_or_default();
    let current_quantity = raw_quantity
        .strip_prefix(QUANTITY_PREFIX)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ResolveError::MalformedQuantity {
            name: name.into(),
            raw: raw_quantity.into(),
        })?;

    debug!(name, id = asset.asset_id, current_quantity, "resolved storage unit");
    Ok(StorageUnit {
        id: asset.asset_id,
        current_quantity,
    })
}

/// Returns the asset ids of all items with the given display name that aren't
/// currently stored in any casket, in snapshot order.
///
/// Items inside a storage unit are excluded even when the caller targets a
/// different unit, so a transfer never tries to re-add an already stored item.
pub fn loose_asset_ids(inventory: &Inventory, name: &str) -> Vec<u64> {
    let Some(description) = inventory
        .descriptions
        .iter()
        .find(|description| description.name == name)
    else {
        return Vec::new();
    };
    inventory
        .assets
        .iter()
        .filter(|asset| asset.class_id == description.class_id && asset.casket_id.is_none())
        .map(|asset| asset.asset_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{Asset, DescriptionLine, ItemDescription};

    fn asset(asset_id: u64, class_id: &str, casket_id: Option<&str>) -> Asset {
        Asset {
            asset_id,
            class_id: class_id.into(),
            casket_id: casket_id.map(String::from),
        }
    }

    fn storage_unit_description(class_id: &str, tag: &str, count_line: &str) -> ItemDescription {
        ItemDescription {
            class_id: class_id.into(),
            name: STORAGE_UNIT_NAME.into(),
            fraud_warnings: vec![format!("Name Tag: ''{tag}''")],
            descriptions: vec![
                DescriptionLine {
                    value: String::new(),
                },
                DescriptionLine {
                    value: "I am always with you now".into(),
                },
                DescriptionLine {
                    value: count_line.into(),
                },
            ],
        }
    }

    fn item_description(class_id: &str, name: &str) -> ItemDescription {
        ItemDescription {
            class_id: class_id.into(),
            name: name.into(),
            fraud_warnings: Vec::new(),
            descriptions: Vec::new(),
        }
    }

    fn fixture() -> Inventory {
        Inventory {
            assets: vec![
                asset(100, "unit-class", None),
                asset(200, "knife-class", None),
                asset(201, "knife-class", Some("100")),
                asset(202, "knife-class", None),
            ],
            descriptions: vec![
                storage_unit_description("unit-class", "Knives", "Number of Items: 998"),
                item_description("knife-class", "★ Karambit | Fade (Factory New)"),
            ],
        }
    }

    #[test]
    fn resolves_unit_by_name_tag() {
        let unit = resolve_storage_unit(&fixture(), "Knives").unwrap();
        assert_eq!(
            unit,
            StorageUnit {
                id: 100,
                current_quantity: 998
            }
        );
    }

    #[test]
    fn unknown_name_tag_is_not_found() {
        assert_eq!(
            resolve_storage_unit(&fixture(), "Gloves"),
            Err(ResolveError::NotFound("Gloves".into()))
        );
    }

    #[test]
    fn name_tag_match_is_case_sensitive() {
        assert_eq!(
            resolve_storage_unit(&fixture(), "knives"),
            Err(ResolveError::NotFound("knives".into()))
        );
    }

    #[test]
    fn malformed_quantity_is_not_treated_as_not_found() {
        let mut inventory = fixture();
        inventory.descriptions[0].descriptions[2].value = "998 items".into();
        assert_eq!(
            resolve_storage_unit(&inventory, "Knives"),
            Err(ResolveError::MalformedQuantity {
                name: "Knives".into(),
                raw: "998 items".into()
            })
        );
    }

    #[test]
    fn missing_quantity_line_is_malformed() {
        let mut inventory = fixture();
        inventory.descriptions[0].descriptions.truncate(1);
        assert!(matches!(
            resolve_storage_unit(&inventory, "Knives"),
            Err(ResolveError::MalformedQuantity { .. })
        ));
    }

    #[test]
    fn matches_loose_assets_in_snapshot_order() {
        assert_eq!(
            loose_asset_ids(&fixture(), "★ Karambit | Fade (Factory New)"),
            vec![200, 202]
        );
    }

    #[test]
    fn stored_assets_are_excluded_regardless_of_order() {
        let mut inventory = fixture();
        inventory.assets = vec![
            asset(201, "knife-class", Some("100")),
            asset(202, "knife-class", None),
            asset(203, "knife-class", Some("999")),
            asset(200, "knife-class", None),
        ];
        assert_eq!(
            loose_asset_ids(&inventory, "★ Karambit | Fade (Factory New)"),
            vec![202, 200]
        );
    }

    #[test]
    fn unknown_item_name_matches_nothing() {
        assert!(loose_asset_ids(&fixture(), "AWP | Dragon Lore").is_empty());
    }
}
