#![allow(missing_docs)]
use fabric_contract_logger::{init_global, Config, Level};

#[test]
fn setting_logger_twice_fails() {
    let cfg = Config::default();

    let first = init_global(&cfg, false);
    assert!(first.is_ok());

    let second = init_global(&cfg, false);
    assert_eq!(second.unwrap_err().to_string(), "Logger is already set.");

    first.unwrap().reload_level(Level::TRACE).unwrap();
}

#[test]
fn install_panic_hook_multiple_times_works() {
    fabric_contract_logger::install_panic_hook().unwrap();
    fabric_contract_logger::install_panic_hook().unwrap();
}
