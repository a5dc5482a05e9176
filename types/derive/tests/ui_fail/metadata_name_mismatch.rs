use fabric_contract_types::ContractType;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, ContractType)]
pub struct Keyed {
    #[metadata(name = "ID")]
    pub id: String,
}

fn main() {}
