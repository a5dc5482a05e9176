use fabric_contract_types::ContractType;

#[derive(ContractType)]
pub struct Wrapper(pub String);

fn main() {}
