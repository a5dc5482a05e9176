#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use fabric_contract::prelude::*;
use parking_lot::Mutex;

/// In-memory ledger answering a single request
#[derive(Default)]
pub struct MockStub {
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: String,
    pub state: Mutex<BTreeMap<String, Vec<u8>>>,
    pub private: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    pub identity_error: Option<String>,
}

impl MockStub {
    pub fn request(function: &str, args: &[&str]) -> Self {
        Self {
            function: function.to_owned(),
            args: args.iter().map(|&arg| arg.to_owned()).collect(),
            tx_id: "tx1".to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_identity(mut self, message: &str) -> Self {
        self.identity_error = Some(message.to_owned());
        self
    }
}

impl ChaincodeStub for MockStub {
    fn get_function_and_parameters(&self) -> (String, Vec<String>) {
        (self.function.clone(), self.args.clone())
    }

    fn get_tx_id(&self) -> String {
        self.tx_id.clone()
    }

    fn get_channel_id(&self) -> String {
        "mychannel".to_owned()
    }

    fn get_creator(&self) -> Result<Vec<u8>, StubError> {
        Ok(b"creator".to_vec())
    }

    fn get_transient(&self) -> Result<HashMap<String, Vec<u8>>, StubError> {
        Ok(HashMap::new())
    }

    fn client_identity(&self) -> Result<Arc<dyn ClientIdentity>, StubError> {
        match &self.identity_error {
            Some(message) => Err(StubError(message.clone())),
            None => Ok(Arc::new(MockIdentity)),
        }
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StubError> {
        Ok(self.state.lock().get(key).cloned())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StubError> {
        self.state.lock().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn del_state(&self, key: &str) -> Result<(), StubError> {
        self.state.lock().remove(key);
        Ok(())
    }

    fn get_private_data(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StubError> {
        Ok(self
            .private
            .lock()
            .get(&(collection.to_owned(), key.to_owned()))
            .cloned())
    }

    fn put_private_data(&self, collection: &str, key: &str, value: &[u8]) -> Result<(), StubError> {
        self.private
            .lock()
            .insert((collection.to_owned(), key.to_owned()), value.to_vec());
        Ok(())
    }

    fn del_private_data(&self, collection: &str, key: &str) -> Result<(), StubError> {
        self.private
            .lock()
            .remove(&(collection.to_owned(), key.to_owned()));
        Ok(())
    }
}

pub struct MockIdentity;

impl ClientIdentity for MockIdentity {
    fn get_id(&self) -> Result<String, StubError> {
        Ok("x509::CN=user1".to_owned())
    }

    fn get_msp_id(&self) -> Result<String, StubError> {
        Ok("Org1MSP".to_owned())
    }

    fn get_attribute_value(&self, name: &str) -> Result<Option<String>, StubError> {
        Ok((name == "role").then(|| "admin".to_owned()))
    }
}

pub fn invoke(chaincode: &ContractChaincode, stub: MockStub) -> Response {
    let stub: Arc<dyn ChaincodeStub> = Arc::new(stub);
    chaincode.invoke(stub)
}

pub fn init(chaincode: &ContractChaincode, stub: MockStub) -> Response {
    let stub: Arc<dyn ChaincodeStub> = Arc::new(stub);
    chaincode.init(stub)
}

/// Invoke `function` and return the payload, panicking on failure
pub fn call(chaincode: &ContractChaincode, function: &str, args: &[&str]) -> String {
    let response = invoke(chaincode, MockStub::request(function, args));
    assert!(response.is_ok(), "{function} failed: {}", response.message);
    String::from_utf8(response.payload).expect("payload should be UTF-8")
}

/// Invoke `function` and return the error message, panicking on success
pub fn fail(chaincode: &ContractChaincode, function: &str, args: &[&str]) -> String {
    let response = invoke(chaincode, MockStub::request(function, args));
    assert_eq!(response.status, Response::ERROR, "{function} should fail");
    response.message
}
