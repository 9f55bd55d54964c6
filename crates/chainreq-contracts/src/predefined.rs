//! Calls and events of the fixed contracts used by send, lock and
//! multi-send requests: ERC20 tokens, the disperse contract and the lock contract.

use alloy::sol;
use alloy::sol_types::SolCall;
use chainreq_types::{Address, Bytes, ContractEvent, EventParameter, U256};

sol! {
	/// ERC20 transfer from the caller.
	function transfer(address to, uint256 amount) external returns (bool);

	/// ERC20 allowance grant.
	function approve(address spender, uint256 amount) external returns (bool);

	/// Sends native currency to every recipient.
	function disperseEther(address[] recipients, uint256[] values) external payable;

	/// Transfers tokens from the sender to every recipient.
	function disperseToken(address token, address[] recipients, uint256[] values) external;

	/// Locks `amount` of `tokenAddress` for `duration` seconds.
	function lock(
		address tokenAddress,
		uint256 amount,
		uint256 duration,
		string info,
		address unlockPrivilegeWallet
	) external;
}

pub fn transfer_call_data(to: Address, amount: U256) -> Bytes {
	transferCall { to, amount }.abi_encode().into()
}

pub fn approve_call_data(spender: Address, amount: U256) -> Bytes {
	approveCall { spender, amount }.abi_encode().into()
}

pub fn disperse_ether_call_data(recipients: Vec<Address>, values: Vec<U256>) -> Bytes {
	disperseEtherCall { recipients, values }.abi_encode().into()
}

pub fn disperse_token_call_data(token: Address, recipients: Vec<Address>, values: Vec<U256>) -> Bytes {
	disperseTokenCall {
		token,
		recipients,
		values,
	}
	.abi_encode()
	.into()
}

/// Lock call data. `info` carries the request id; nobody may unlock early.
pub fn lock_call_data(token: Address, amount: U256, duration: u64, info: String) -> Bytes {
	lockCall {
		tokenAddress: token,
		amount,
		duration: U256::from(duration),
		info,
		unlockPrivilegeWallet: Address::ZERO,
	}
	.abi_encode()
	.into()
}

fn address_parameter(name: &str, indexed: bool) -> EventParameter {
	EventParameter {
		name: name.to_string(),
		description: String::new(),
		indexed,
		solidity_name: name.to_string(),
		solidity_type: "address".to_string(),
		recommended_types: vec![],
		parameters: None,
		hints: None,
	}
}

fn amount_parameter(name: &str) -> EventParameter {
	EventParameter {
		solidity_type: "uint256".to_string(),
		..address_parameter(name, false)
	}
}

/// ERC20 `Transfer(address indexed from, address indexed to, uint256 value)`.
pub fn transfer_event() -> ContractEvent {
	ContractEvent {
		name: "Transfer".to_string(),
		description: "Tokens moved between accounts".to_string(),
		solidity_name: "Transfer".to_string(),
		signature: "Transfer(address,address,uint256)".to_string(),
		inputs: vec![
			address_parameter("from", true),
			address_parameter("to", true),
			amount_parameter("value"),
		],
	}
}

/// ERC20 `Approval(address indexed owner, address indexed spender, uint256 value)`.
pub fn approval_event() -> ContractEvent {
	ContractEvent {
		name: "Approval".to_string(),
		description: "Allowance granted to a spender".to_string(),
		solidity_name: "Approval".to_string(),
		signature: "Approval(address,address,uint256)".to_string(),
		inputs: vec![
			address_parameter("owner", true),
			address_parameter("spender", true),
			amount_parameter("value"),
		],
	}
}
