#![allow(dead_code, missing_docs)]

use fabric_contract_types::{type_is_valid, ContractType, TypeInfo, TypeKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize, ContractType)]
pub struct Audit {
    pub created_by: String,
    #[serde(rename = "createdAt")]
    #[metadata(name = "createdAt", optional)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, ContractType)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub tracking_id: String,
    #[metadata(name = "weightKg")]
    pub weight_kg: u32,
    #[serde(rename = "to")]
    pub destination_address: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize, ContractType)]
pub struct Asset {
    #[serde(rename = "ID")]
    pub id: String,
    pub size: u32,
    #[serde(flatten)]
    pub audit: Audit,
    #[serde(skip)]
    pub scratch: String,
    #[metadata(skip)]
    pub colour: String,
    pub parts: Vec<Asset>,
    secret: String,
}

#[derive(ContractType)]
pub struct Node {
    pub value: i32,
    pub next: Option<Box<Node>>,
}

#[derive(Serialize, ContractType)]
pub struct Leaky {
    #[serde(rename = "leak")]
    hidden: String,
}

fn fields(info: &TypeInfo) -> Vec<&'static str> {
    let TypeKind::Struct(structure) = &info.kind else {
        panic!("{info} is not a struct");
    };
    structure
        .serialized_fields()
        .iter()
        .map(|field| field.property_name())
        .collect()
}

#[test]
fn serialized_fields_follow_annotations() {
    assert_eq!(
        fields(&Asset::type_info()),
        ["ID", "size", "created_by", "createdAt", "parts"]
    );
}

#[test]
fn optional_annotation_survives_flattening() {
    let TypeKind::Struct(structure) = Asset::type_info().kind else {
        panic!("struct expected");
    };
    let required = structure
        .serialized_fields()
        .into_iter()
        .filter(|field| field.is_required())
        .map(|field| field.property_name())
        .collect::<Vec<_>>();
    assert_eq!(required, ["ID", "size", "created_by", "parts"]);
}

#[test]
fn derived_structs_are_valid() {
    assert!(type_is_valid(&Asset::type_info(), &[], false).is_ok());
    assert!(type_is_valid(&Node::type_info(), &[], false).is_ok());
}

#[test]
fn module_path_feeds_component_key() {
    let info = Audit::type_info();
    assert_eq!(info.module, "derive");
    assert_eq!(info.component_key(), "derive.Audit");
}

#[test]
fn annotated_private_field_is_rejected() {
    assert_eq!(
        type_is_valid(&Leaky::type_info(), &[], false)
            .unwrap_err()
            .to_string(),
        "Field hidden of Leaky is private and cannot carry a serialization name"
    );
}

#[test]
fn serde_and_descriptor_agree_on_names() {
    let asset = Asset {
        id: "A1".to_owned(),
        size: 3,
        secret: "kept".to_owned(),
        ..Asset::default()
    };
    let json = serde_json::to_value(&asset).unwrap();
    assert_eq!(json["ID"], "A1");
    assert_eq!(json["created_by"], "");
    assert!(json.get("scratch").is_none());
}

#[test]
fn rename_all_feeds_property_names() {
    assert_eq!(
        fields(&Shipment::type_info()),
        ["trackingId", "weightKg", "to"]
    );

    let json = serde_json::to_value(Shipment::default()).unwrap();
    let mut keys = json.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
    keys.sort();
    assert_eq!(keys, ["to", "trackingId", "weightKg"]);
}

#[test]
fn metadata_names_match_serialized_names() {
    let json = serde_json::to_value(Asset::default()).unwrap();
    for name in fields(&Asset::type_info()) {
        assert!(json.get(name).is_some(), "{name} is not serialized");
    }
}
