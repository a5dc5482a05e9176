use fabric_contract_types::ContractType;

#[derive(ContractType)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub bookmark: String,
}

fn main() {
    assert_eq!(<Page<u8>>::type_info().name, "Page<uint8>");
}
