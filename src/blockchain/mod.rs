pub mod abi;
pub mod block_resolver;
pub mod contracts;
pub mod ethereum_client;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod reader;

pub use abi::{BatchOutput, CallOutput, ContractCall, ViewMethod};
pub use block_resolver::{BlockRef, BlockResolver, RpcBlockResolver};
pub use ethereum_client::EthereumClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryChain;
pub use reader::{ContractReader, RpcContractReader};
