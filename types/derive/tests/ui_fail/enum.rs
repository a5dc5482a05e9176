use fabric_contract_types::ContractType;

#[derive(ContractType)]
pub enum Colour {
    Red,
    Blue,
}

fn main() {}
