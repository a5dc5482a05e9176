//! Contracts exposed as chaincode transactions.
//!
//! A [`ContractChaincode`] holds user contracts and routes each request
//! (`contract:Function` plus string arguments) to the matching transaction.
//! Arguments are converted and validated from their string form, results are
//! converted back, and the whole chaincode is described by a metadata
//! document served through the system contract.
//!
//! ```
//! use fabric_contract::prelude::*;
//!
//! struct Assets;
//!
//! impl Assets {
//!     fn read(&self, ctx: TransactionContext, id: String) -> Result<String, StubError> {
//!         let stub = ctx.get_stub().ok_or_else(|| StubError("no stub".to_owned()))?;
//!         let value = stub.get_state(&id)?.unwrap_or_default();
//!         Ok(String::from_utf8_lossy(&value).into_owned())
//!     }
//! }
//!
//! impl Contract for Assets {
//!     fn evaluate_functions(&self) -> Vec<String> {
//!         vec!["Read".to_owned()]
//!     }
//!
//!     fn transactions(transactions: &mut Transactions<Self>) {
//!         transactions.add("Read", Self::read);
//!     }
//! }
//!
//! let mut chaincode = ContractChaincode::new();
//! chaincode.add_contract(Assets).unwrap();
//! let metadata = chaincode.reflect_metadata().unwrap();
//! assert_eq!(metadata.contracts["Assets"].transactions[0].tag, ["evaluate", "EVALUATE"]);
//! ```

pub mod chaincode;
pub mod context;
pub mod contract;
pub mod function;
pub mod handler;
pub mod ledger;
pub mod parameter;
pub mod serializer;
pub mod system;

pub use chaincode::{Chaincode, ContractChaincode, InvokeError, MetadataBuildError, Response};
pub use context::{
    ChaincodeStub, ClientIdentity, SettableTransactionContext, StubError, TransactionContext,
    TransactionContextInterface,
};
pub use contract::{Contract, RegistrationError, Transactions};
pub use fabric_contract_metadata as metadata;
pub use fabric_contract_types as types;
pub use function::{CallType, Handler, ParseError, Signature, SignatureParser};
pub use handler::{HandlerError, TransactionHandlerKind};
pub use ledger::{Collection, Ledger, LedgerError, WORLD_STATE_IDENTIFIER};
pub use parameter::{Argument, ArgumentError, Parameter, TransactionOutput};
pub use serializer::{JsonSerializer, SerializerError, TransactionSerializer};
pub use system::SYSTEM_CONTRACT_NAME;

pub mod prelude {
    //! Re-exports of what contracts and their hosts use.

    pub use fabric_contract_types::prelude::*;

    pub use super::{
        Chaincode, ChaincodeStub, ClientIdentity, Contract, ContractChaincode, Ledger, Response,
        SettableTransactionContext, StubError, TransactionContext, TransactionContextInterface,
        TransactionOutput, TransactionSerializer, Transactions,
    };
}
