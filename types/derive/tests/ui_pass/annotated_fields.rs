use fabric_contract_types::{ContractType, TypeKind};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, ContractType)]
pub struct Asset {
    #[serde(rename = "ID")]
    #[metadata(name = "ID")]
    pub id: String,
    #[serde(rename = "appraisedValue")]
    pub appraised_value: u32,
    #[metadata(optional)]
    pub owner: Option<String>,
    #[serde(skip)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    internal: i64,
}

fn main() {
    let TypeKind::Struct(info) = Asset::type_info().kind else {
        panic!("struct expected");
    };
    assert_eq!(info.fields.len(), 6);
}
