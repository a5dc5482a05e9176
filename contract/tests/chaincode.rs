#![allow(missing_docs)]
mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{call, fail, init, invoke, MockStub};
use fabric_contract::{
    context::transaction_context_methods,
    metadata::{MemoryFileSystem, ParameterMetadata, ReturnMetadata},
    parameter::Normalize,
    prelude::*,
    RegistrationError, SerializerError,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ContractType)]
pub struct Asset {
    #[serde(rename = "ID")]
    pub id: String,
    pub size: u32,
}

struct GoodContract;

impl GoodContract {
    fn returns_string(&self) -> String {
        "Some string".to_owned()
    }

    fn returns_error(&self) -> Result<(), String> {
        Err("Some error".to_owned())
    }

    fn returns_nothing(&self) {}

    fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    fn echo(&self, text: String) -> String {
        text
    }

    fn grow(&self, mut asset: Asset, by: u32) -> Asset {
        asset.size += by;
        asset
    }

    fn later(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at + chrono::Duration::hours(1)
    }

    fn who_am_i(&self, ctx: TransactionContext) -> Result<String, StubError> {
        let identity = ctx
            .get_client_identity()
            .ok_or_else(|| StubError("no identity".to_owned()))?;
        identity.get_msp_id()
    }

    fn tx_id(&self, ctx: Box<dyn TransactionContextInterface>) -> String {
        ctx.get_stub().map(|stub| stub.get_tx_id()).unwrap_or_default()
    }
}

impl Contract for GoodContract {
    fn name(&self) -> String {
        "goodContract".to_owned()
    }

    fn evaluate_functions(&self) -> Vec<String> {
        vec!["ReturnsString".to_owned()]
    }

    fn transactions(transactions: &mut Transactions<Self>) {
        transactions
            .add("ReturnsString", Self::returns_string)
            .add("ReturnsError", Self::returns_error)
            .add("ReturnsNothing", Self::returns_nothing)
            .add("Add", Self::add)
            .add("Echo", Self::echo)
            .add("Grow", Self::grow)
            .add("Later", Self::later)
            .add("WhoAmI", Self::who_am_i)
            .add("TxId", Self::tx_id);
    }
}

struct OtherContract;

impl Contract for OtherContract {
    fn transactions(transactions: &mut Transactions<Self>) {
        transactions.add("Hello", |_: &Self| "hello from other".to_owned());
    }
}

fn chaincode() -> ContractChaincode {
    fabric_contract_logger::test_logger();

    let mut chaincode = ContractChaincode::new();
    chaincode.add_contract(GoodContract).unwrap();
    chaincode.add_contract(OtherContract).unwrap();
    chaincode
}

#[test]
fn calls_named_contract_function() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "goodContract:ReturnsString", &[]), "Some string");
    assert_eq!(call(&chaincode, "OtherContract:Hello", &[]), "hello from other");
}

#[test]
fn unnamed_contract_means_the_default_one() {
    let chaincode = chaincode();
    assert_eq!(chaincode.default_contract(), Some("goodContract"));
    assert_eq!(call(&chaincode, "ReturnsString", &[]), "Some string");
}

#[test]
fn lower_case_first_letter_falls_back_to_exported_name() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "goodContract:returnsString", &[]), "Some string");
    assert_eq!(
        fail(&chaincode, "goodContract:returnsstring", &[]),
        "Function returnsstring not found in contract goodContract"
    );
}

#[test]
fn nothing_returned_gives_empty_payload() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "goodContract:ReturnsNothing", &[]), "");
}

#[test]
fn returned_error_fails_the_request() {
    let chaincode = chaincode();
    assert_eq!(fail(&chaincode, "goodContract:ReturnsError", &[]), "Some error");
}

#[test]
fn bad_routing_is_reported() {
    let chaincode = chaincode();
    assert_eq!(
        fail(&chaincode, "somebadname:somebadfunctionname", &[]),
        "Contract not found with name somebadname"
    );
    assert_eq!(fail(&chaincode, "goodContract:", &[]), "Blank function name passed");
    assert_eq!(
        fail(&chaincode, "goodContract:Missing", &[]),
        "Function Missing not found in contract goodContract"
    );
}

#[test]
fn last_colon_splits_contract_from_function() {
    let chaincode = chaincode();
    assert_eq!(
        fail(&chaincode, "org:example:ReturnsString", &[]),
        "Contract not found with name org:example"
    );
}

#[test]
fn arguments_are_converted() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "Add", &["40", "2"]), "42");
    assert_eq!(call(&chaincode, "Echo", &["some text"]), "some text");
    assert_eq!(
        call(&chaincode, "Grow", &[r#"{"ID":"asset1","size":2}"#, "3"]),
        r#"{"ID":"asset1","size":5}"#
    );
    assert_eq!(
        call(&chaincode, "Later", &["2024-01-02T03:04:05+02:00"]),
        "2024-01-02T02:04:05Z"
    );
}

#[test]
fn extra_arguments_are_ignored() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "Echo", &["first", "second"]), "first");
}

#[test]
fn argument_errors_name_the_parameter() {
    let chaincode = chaincode();
    assert_eq!(
        fail(&chaincode, "Add", &["1"]),
        "Incorrect number of params. Expected 2, received 1"
    );
    assert_eq!(
        fail(&chaincode, "Add", &["a", "1"]),
        "Error managing parameter param0. Conversion error. cannot convert passed value a to int64"
    );
    assert_eq!(
        fail(&chaincode, "Grow", &["[]", "1"]),
        "Error managing parameter param0. Conversion error. Value [] was not passed in expected format Asset"
    );
    assert!(fail(&chaincode, "Grow", &[r#"{"ID":"asset1"}"#, "1"])
        .starts_with("Error managing parameter param0. "));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ContractType)]
pub struct Note {
    #[serde(rename = "ID")]
    #[metadata(name = "ID")]
    pub id: String,
    pub text: String,
    #[metadata(optional)]
    pub tag: Option<String>,
}

struct Journal;

impl Journal {
    fn put(&self, note: Note) -> Note {
        note
    }

    fn draft(&self, id: String) -> Note {
        Note {
            id,
            text: "draft".to_owned(),
            tag: None,
        }
    }

    fn retag(&self, tag: Option<String>) -> Option<String> {
        tag.map(|tag| tag.to_uppercase())
    }

    fn ratio(&self) -> f32 {
        0.1
    }
}

impl Contract for Journal {
    fn transactions(transactions: &mut Transactions<Self>) {
        transactions
            .add("Put", Self::put)
            .add("Draft", Self::draft)
            .add("Retag", Self::retag)
            .add("Ratio", Self::ratio);
    }
}

fn journal() -> ContractChaincode {
    fabric_contract_logger::test_logger();

    let mut chaincode = ContractChaincode::new();
    chaincode.add_contract(Journal).unwrap();
    chaincode
}

#[test]
fn unset_optional_fields_pass_the_schema() {
    let chaincode = journal();
    assert_eq!(
        call(&chaincode, "Put", &[r#"{"ID":"n1","text":"hi"}"#]),
        r#"{"ID":"n1","tag":null,"text":"hi"}"#
    );
    assert_eq!(
        call(&chaincode, "Put", &[r#"{"ID":"n1","text":"hi","tag":null}"#]),
        r#"{"ID":"n1","tag":null,"text":"hi"}"#
    );
    assert_eq!(
        call(&chaincode, "Put", &[r#"{"ID":"n1","text":"hi","tag":"red"}"#]),
        r#"{"ID":"n1","tag":"red","text":"hi"}"#
    );
    assert_eq!(
        call(&chaincode, "Draft", &["n2"]),
        r#"{"ID":"n2","tag":null,"text":"draft"}"#
    );
}

#[test]
fn optional_arguments_and_results() {
    let chaincode = journal();
    assert_eq!(call(&chaincode, "Retag", &[r#""red""#]), "RED");
    assert_eq!(call(&chaincode, "Retag", &["null"]), "");
}

#[test]
fn metadata_named_fields_use_their_name_on_the_wire() {
    let chaincode = journal();
    let metadata = chaincode.metadata().unwrap();
    let note = &metadata.components.schemas["chaincode.Note"];
    assert_eq!(note.required, ["ID", "text"]);

    let err = fail(&chaincode, "Put", &[r#"{"id":"n1","text":"hi"}"#]);
    assert!(err.starts_with("Error managing parameter param0. "), "{err}");
}

#[test]
fn float32_results_are_not_widened() {
    let chaincode = journal();
    assert_eq!(call(&chaincode, "Ratio", &[]), "0.1");
}

#[test]
fn context_is_prepared_from_the_stub() {
    let chaincode = chaincode();
    assert_eq!(call(&chaincode, "WhoAmI", &[]), "Org1MSP");
    assert_eq!(call(&chaincode, "TxId", &[]), "tx1");
}

#[test]
fn client_identity_failure_fails_the_request() {
    let chaincode = chaincode();
    let response = invoke(
        &chaincode,
        MockStub::request("WhoAmI", &[]).failing_identity("bad creator"),
    );
    assert_eq!(response.status, Response::ERROR);
    assert_eq!(response.message, "bad creator");
}

#[test]
fn init_without_function_succeeds() {
    let chaincode = chaincode();
    let response = init(&chaincode, MockStub::request("", &[]));
    assert!(response.is_ok());
    assert_eq!(response.payload, b"Default initiator successful.");

    let response = init(&chaincode, MockStub::request("ReturnsString", &[]));
    assert_eq!(response.payload, b"Some string");
}

#[test]
fn system_contract_serves_metadata() {
    let chaincode = chaincode();
    let payload = call(&chaincode, "org.hyperledger.fabric:GetMetadata", &[]);
    let document: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(document["info"]["title"], "undefined");
    assert_eq!(document["contracts"]["goodContract"]["default"], true);
    assert_eq!(
        document["contracts"]["org.hyperledger.fabric"]["transactions"][0]["name"],
        "GetMetadata"
    );
    assert_eq!(
        fail(&chaincode, "org.hyperledger.fabric:GetSomething", &[]),
        "Function GetSomething not found in contract org.hyperledger.fabric"
    );
}

#[test]
fn contract_names_are_unique() {
    let mut chaincode = chaincode();
    assert_eq!(
        chaincode.add_contract(GoodContract).unwrap_err(),
        RegistrationError::Duplicate("goodContract".to_owned())
    );
    assert_eq!(
        chaincode.add_contract(OtherContract).unwrap_err().to_string(),
        "multiple contracts being merged into chaincode with name OtherContract"
    );
}

struct NothingLeft;

impl Contract for NothingLeft {
    fn ignored_functions(&self) -> Vec<String> {
        vec!["Hidden".to_owned()]
    }

    fn transactions(transactions: &mut Transactions<Self>) {
        transactions.add("Hidden", |_: &Self| {});
    }
}

#[test]
fn contract_needs_a_transaction() {
    let err = ContractChaincode::new().add_contract(NothingLeft).unwrap_err();
    assert_eq!(
        err.to_string(),
        "contracts are required to have at least 1 (non-ignored) public method. Contract NothingLeft has none. Method names that have been ignored: EvaluateFunctions, IgnoredFunctions, Info, Name, Transactions and Hidden"
    );
}

#[test]
fn default_contract_can_be_changed() {
    let mut chaincode = chaincode();
    chaincode.set_default_contract("OtherContract").unwrap();
    assert_eq!(call(&chaincode, "Hello", &[]), "hello from other");

    assert_eq!(
        chaincode.set_default_contract("org.hyperledger.fabric").unwrap_err(),
        RegistrationError::SystemDefault
    );
    assert_eq!(
        chaincode.set_default_contract("Nope").unwrap_err(),
        RegistrationError::UnknownDefault("Nope".to_owned())
    );
    assert_eq!(chaincode.default_contract(), Some("OtherContract"));
}

#[test]
fn chaincode_without_contracts_has_no_default() {
    let chaincode = ContractChaincode::new();
    assert_eq!(chaincode.contract_names().collect::<Vec<_>>(), ["org.hyperledger.fabric"]);
    assert_eq!(
        fail(&chaincode, "ReturnsString", &[]),
        "Contract not found with name "
    );
}

const METADATA_FILE: &str = r#"{
    "info": { "title": "assets", "version": "1.0.0" },
    "contracts": {
        "goodContract": {
            "name": "goodContract",
            "transactions": [
                {
                    "name": "Add",
                    "parameters": [
                        { "name": "first", "schema": { "type": "integer", "maximum": 10 } },
                        { "name": "second", "schema": { "type": "integer" } }
                    ],
                    "returns": { "type": "integer" }
                },
                {
                    "name": "Echo",
                    "parameters": [
                        { "name": "text", "schema": { "type": "string" } }
                    ]
                }
            ]
        }
    }
}"#;

fn with_metadata_file(document: &str) -> ContractChaincode {
    chaincode().with_file_system(
        MemoryFileSystem::new("/cc").with_file("/cc/META-INF/metadata.json", document),
    )
}

#[test]
fn metadata_file_takes_precedence() {
    let chaincode = with_metadata_file(METADATA_FILE);
    let metadata = chaincode.metadata().unwrap();
    assert_eq!(metadata.info.as_ref().unwrap().title, "assets");
    assert_eq!(metadata.contracts.keys().collect::<Vec<_>>(), ["goodContract"]);

    assert_eq!(call(&chaincode, "Add", &["4", "5"]), "9");
}

#[test]
fn metadata_file_schemas_validate_arguments() {
    let chaincode = with_metadata_file(METADATA_FILE);
    assert!(fail(&chaincode, "Add", &["11", "5"])
        .starts_with("Error managing parameter first. Value did not match schema:\n"));
}

#[test]
fn metadata_file_must_describe_every_parameter() {
    let document = METADATA_FILE.replace(
        r#"{ "name": "text", "schema": { "type": "string" } }"#,
        "",
    );
    let chaincode = with_metadata_file(&document);
    assert_eq!(
        fail(&chaincode, "Echo", &["text"]),
        "Incorrect number of params in supplementary metadata. Expected 1, received 0"
    );
}

#[test]
fn metadata_breaking_the_schema_fails_every_request() {
    let document = METADATA_FILE.replace(r#"{ "type": "string" }"#, "true");
    let chaincode = with_metadata_file(&document);
    assert!(chaincode
        .metadata()
        .unwrap_err()
        .to_string()
        .starts_with("cannot use metadata. Metadata did not match schema:\n"));
    assert!(fail(&chaincode, "Add", &["1", "2"]).starts_with("cannot use metadata."));
}

#[test]
fn metadata_location_is_configurable() {
    let config = fabric_contract_config::metadata::Config {
        root: Some("/srv/chaincode".into()),
        file_name: "assets.json".to_owned(),
        ..fabric_contract_config::metadata::Config::default()
    };
    let chaincode = chaincode()
        .with_metadata_config(config)
        .with_file_system(
            MemoryFileSystem::new("/cc")
                .with_file("/cc/META-INF/metadata.json", "not json")
                .with_file("/srv/chaincode/contract-metadata/assets.json", METADATA_FILE),
        );
    assert_eq!(chaincode.metadata().unwrap().info.as_ref().unwrap().title, "assets");
}

#[test]
fn unreadable_metadata_file_fails_requests() {
    let chaincode = with_metadata_file("not json");
    assert!(fail(&chaincode, "Add", &["1", "2"])
        .starts_with("failed to parse metadata file /cc/META-INF/metadata.json"));
}

/// Upper cases string arguments and tags results
#[derive(Debug, Clone, Copy)]
struct ShoutingSerializer;

impl TransactionSerializer for ShoutingSerializer {
    fn from_string(
        &self,
        raw: &str,
        _ty: &TypeInfo,
        _normalize: Normalize,
        _metadata: Option<&ParameterMetadata>,
    ) -> Result<Value, SerializerError> {
        Ok(Value::String(raw.to_uppercase()))
    }

    fn to_string(
        &self,
        value: &Value,
        _ty: &TypeInfo,
        _metadata: Option<&ReturnMetadata>,
    ) -> Result<String, SerializerError> {
        Ok(format!("shouted:{}", value.as_str().unwrap_or_default()))
    }
}

#[test]
fn custom_serializer_converts_both_ways() {
    let chaincode = chaincode().with_serializer(ShoutingSerializer);
    assert_eq!(call(&chaincode, "Echo", &["hello"]), "shouted:HELLO");
}

/// Context recording which handlers ran
#[derive(Clone, Default)]
pub struct AuditContext {
    inner: TransactionContext,
}

impl TransactionContextInterface for AuditContext {
    fn get_stub(&self) -> Option<&dyn ChaincodeStub> {
        self.inner.get_stub()
    }

    fn get_client_identity(&self) -> Option<&dyn ClientIdentity> {
        self.inner.get_client_identity()
    }
}

impl SettableTransactionContext for AuditContext {
    fn set_stub(&mut self, stub: Arc<dyn ChaincodeStub>) {
        self.inner.set_stub(stub);
    }

    fn set_client_identity(&mut self, identity: Arc<dyn ClientIdentity>) {
        self.inner.set_client_identity(identity);
    }

    fn context_type() -> TypeInfo {
        TypeInfo::of::<Self>("AuditContext", TypeKind::Unsupported)
            .in_module(module_path!())
            .with_methods(transaction_context_methods())
    }
}

fabric_contract::context_parameter!(AuditContext);

#[derive(Default)]
struct HookedContract {
    calls: Arc<Mutex<Vec<String>>>,
    fail_before: bool,
    fail_after: bool,
}

impl HookedContract {
    fn record(&self, entry: impl Into<String>) {
        self.calls.lock().push(entry.into());
    }

    fn before(&self, ctx: AuditContext) -> Result<(), String> {
        let tx_id = ctx.get_stub().map(|stub| stub.get_tx_id()).unwrap_or_default();
        self.record(format!("before {tx_id}"));
        if self.fail_before {
            return Err("before failed".to_owned());
        }
        Ok(())
    }

    fn after(&self, _ctx: AuditContext, output: TransactionOutput) -> Result<(), String> {
        self.record(format!("after {output}"));
        if self.fail_after {
            return Err("after failed".to_owned());
        }
        Ok(())
    }

    fn unknown(&self) -> String {
        self.record("unknown");
        "handled by unknown".to_owned()
    }

    fn named(&self, name: String) -> String {
        self.record("named");
        format!("named {name}")
    }

    fn silent(&self, _ctx: AuditContext) {
        self.record("silent");
    }

    fn broken(&self) -> Result<String, String> {
        self.record("broken");
        Err("broken failed".to_owned())
    }
}

impl Contract<AuditContext> for HookedContract {
    fn transactions(transactions: &mut Transactions<Self, AuditContext>) {
        transactions
            .add("Named", Self::named)
            .add("Silent", Self::silent)
            .add("Broken", Self::broken)
            .before_transaction(Self::before)
            .after_transaction(Self::after)
            .unknown_transaction(Self::unknown);
    }
}

fn hooked(contract: HookedContract) -> (ContractChaincode, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::clone(&contract.calls);
    let mut chaincode = ContractChaincode::new();
    chaincode.add_contract(contract).unwrap();
    (chaincode, calls)
}

#[test]
fn handlers_run_around_the_transaction() {
    let (chaincode, calls) = hooked(HookedContract::default());
    assert_eq!(call(&chaincode, "Named", &["x"]), "named x");
    assert_eq!(*calls.lock(), ["before tx1", "named", "after named x"]);
}

#[test]
fn after_handler_sees_undefined_when_nothing_returned() {
    let (chaincode, calls) = hooked(HookedContract::default());
    assert_eq!(call(&chaincode, "Silent", &[]), "");
    assert_eq!(*calls.lock(), ["before tx1", "silent", "after undefined"]);
}

#[test]
fn unknown_handler_replaces_missing_transactions() {
    let (chaincode, calls) = hooked(HookedContract::default());
    assert_eq!(call(&chaincode, "Missing", &[]), "handled by unknown");
    assert_eq!(
        *calls.lock(),
        ["before tx1", "unknown", "after handled by unknown"]
    );
}

#[test]
fn failing_before_handler_stops_the_request() {
    let (chaincode, calls) = hooked(HookedContract {
        fail_before: true,
        ..HookedContract::default()
    });
    assert_eq!(fail(&chaincode, "Named", &["x"]), "before failed");
    assert_eq!(*calls.lock(), ["before tx1"]);
}

#[test]
fn failed_transaction_skips_the_after_handler() {
    let (chaincode, calls) = hooked(HookedContract::default());
    assert_eq!(fail(&chaincode, "Broken", &[]), "broken failed");
    assert_eq!(*calls.lock(), ["before tx1", "broken"]);
}

#[test]
fn after_handler_error_fails_a_successful_transaction() {
    let (chaincode, calls) = hooked(HookedContract {
        fail_after: true,
        ..HookedContract::default()
    });
    assert_eq!(fail(&chaincode, "Named", &["x"]), "after failed");
    assert_eq!(fail(&chaincode, "Broken", &[]), "broken failed");
    assert_eq!(
        *calls.lock(),
        ["before tx1", "named", "after named x", "before tx1", "broken"]
    );
}

#[test]
fn parameter_errors_skip_the_after_handler() {
    let (chaincode, calls) = hooked(HookedContract::default());
    assert_eq!(
        fail(&chaincode, "Named", &[]),
        "Incorrect number of params. Expected 1, received 0"
    );
    assert_eq!(*calls.lock(), ["before tx1"]);
}

struct MisplacedContext;

impl Contract for MisplacedContext {
    fn transactions(transactions: &mut Transactions<Self>) {
        transactions.add("Tx", |_: &Self, _: String, _: TransactionContext| {});
    }
}

struct BadAfter;

impl Contract for BadAfter {
    fn transactions(transactions: &mut Transactions<Self>) {
        transactions
            .add("Tx", |_: &Self| {})
            .after_transaction(|_: &Self, _: String| {});
    }
}

#[test]
fn invalid_signatures_are_rejected_on_registration() {
    let mut chaincode = ContractChaincode::new();
    assert_eq!(
        chaincode.add_contract(MisplacedContext).unwrap_err().to_string(),
        "Functions requiring the TransactionContext must require it as the first parameter. Tx takes it in as parameter 1"
    );
    assert_eq!(
        chaincode.add_contract(BadAfter).unwrap_err().to_string(),
        "After transaction must take type interface{} as their only non-context param"
    );
    assert_eq!(chaincode.default_contract(), None);
}
