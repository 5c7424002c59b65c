//! An execution backend that deploys and calls contracts over JSON-RPC

use std::path::PathBuf;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt},
    json_abi::Function,
    network::TransactionBuilder,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, TxHash};
use itertools::Itertools;
use migration_core::{
    backend::{BackendError, ExecutionBackend},
    environment::NetworkConfig,
    linker::LinkBindings,
    types::{BootstrapAction, Token},
};
use tracing::{debug, info};

use crate::{artifacts::Artifact, errors::ScriptError, utils::expand_env_vars};

impl From<ScriptError> for BackendError {
    fn from(e: ScriptError) -> Self {
        BackendError::new(e.to_string())
    }
}

/// Deploys compiled artifacts and sends transactions from a single signer
pub struct RpcBackend {
    /// The signing provider transactions are sent through
    provider: DynProvider,
    /// The address of the only account the provider signs for
    deployer: Address,
    /// The directory compilation artifacts are read from
    artifacts_dir: PathBuf,
    /// The gas limit set on every transaction, estimated when unset
    gas_limit: Option<u64>,
    /// The number of confirmations to wait for on every transaction
    confirmations: u64,
}

impl RpcBackend {
    /// Connect to the network, checking its chain id when the config pins one
    pub async fn connect(
        network: &NetworkConfig,
        signer: PrivateKeySigner,
        artifacts_dir: PathBuf,
    ) -> Result<Self, ScriptError> {
        let rpc_url = expand_env_vars(&network.rpc_url)?;
        let url =
            Url::parse(&rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        let deployer = signer.address();
        let provider = DynProvider::new(ProviderBuilder::new().wallet(signer).connect_http(url));

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        if let Some(expected) = network.network_id {
            if chain_id != expected {
                return Err(ScriptError::ClientInitialization(format!(
                    "connected to chain {chain_id}, expected {expected}"
                )));
            }
        }

        info!(chain_id, %deployer, "connected to network");
        Ok(Self {
            provider,
            deployer,
            artifacts_dir,
            gas_limit: network.gas_limit,
            confirmations: network.confirmations,
        })
    }

    /// Send a transaction and wait for its confirmed, successful receipt
    async fn send(&self, tx: TransactionRequest) -> Result<TransactionReceipt, BackendError> {
        let tx = match self.gas_limit {
            Some(gas) => tx.with_gas_limit(gas),
            None => tx,
        };

        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| BackendError::new(e.to_string()))?
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;

        if !receipt.status() {
            return Err(BackendError::new(format!(
                "transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(receipt)
    }
}

impl ExecutionBackend for RpcBackend {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[Token],
        links: &LinkBindings,
    ) -> Result<Address, BackendError> {
        let mut code = Artifact::load(&self.artifacts_dir, artifact)?.linked_bytecode(links)?;
        code.extend(encode_constructor_args(args)?);
        debug!(artifact, bytes = code.len(), "sending deployment");

        let receipt = self
            .send(TransactionRequest::default().with_deploy_code(code))
            .await?;
        receipt.contract_address.ok_or_else(|| {
            BackendError::new(format!(
                "no contract address in receipt {}",
                receipt.transaction_hash
            ))
        })
    }

    async fn call(
        &self,
        address: Address,
        method: &str,
        args: &[Token],
        sender: Option<Address>,
    ) -> Result<TxHash, BackendError> {
        if let Some(sender) = sender.filter(|sender| *sender != self.deployer) {
            return Err(ScriptError::UnsupportedSender(format!(
                "{method} on {address} from {sender}, only {} can sign",
                self.deployer
            ))
            .into());
        }

        let input = encode_call(method, args)?;
        let tx = TransactionRequest::default()
            .with_to(address)
            .with_input(input)
            .with_from(self.deployer);

        let receipt = self.send(tx).await?;
        Ok(receipt.transaction_hash)
    }
}

/// Check that every bootstrap action can be signed by `deployer`, the only
/// account the backend holds a key for
pub fn check_senders(deployer: Address, actions: &[BootstrapAction]) -> Result<(), ScriptError> {
    for action in actions {
        if let Some(sender) = action.sender.filter(|sender| *sender != deployer) {
            return Err(ScriptError::UnsupportedSender(format!(
                "{} is sent from {sender}, only {deployer} can sign",
                action.label()
            )));
        }
    }

    Ok(())
}

// ------------
// | Encoding |
// ------------

/// Parse each token's value as its declared Solidity type
fn coerce_tokens(tokens: &[Token]) -> Result<Vec<DynSolValue>, ScriptError> {
    tokens
        .iter()
        .map(|token| {
            let ty = DynSolType::parse(&token.ty)
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            ty.coerce_str(&token.value).map_err(|e| {
                ScriptError::CalldataConstruction(format!(
                    "`{}` as {}: {e}",
                    token.value, token.ty
                ))
            })
        })
        .collect()
}

/// ABI encode constructor arguments, to be appended to creation bytecode
pub fn encode_constructor_args(tokens: &[Token]) -> Result<Vec<u8>, ScriptError> {
    Ok(DynSolValue::Tuple(coerce_tokens(tokens)?).abi_encode_params())
}

/// Calldata for calling `method` with the given arguments, the signature is
/// taken from the arguments' types
pub fn encode_call(method: &str, tokens: &[Token]) -> Result<Vec<u8>, ScriptError> {
    let signature = format!("{method}({})", tokens.iter().map(|t| t.ty.as_str()).join(","));
    let function = Function::parse(&signature)
        .map_err(|e| ScriptError::CalldataConstruction(format!("{signature}: {e}")))?;

    function
        .abi_encode_input(&coerce_tokens(tokens)?)
        .map_err(|e| ScriptError::CalldataConstruction(format!("{signature}: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use migration_core::types::{BootstrapAction, ModuleId, Token};

    use super::{check_senders, encode_call, encode_constructor_args};
    use crate::errors::ScriptError;

    fn token(ty: &str, value: &str) -> Token {
        Token {
            ty: ty.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_encode_erc20_constructor() {
        let args = vec![
            token("string", "FarmCoin"),
            token("string", "FC"),
            token("uint256", "1000000000000000000000000000000"),
            token("uint8", "8"),
        ];

        // Four head words, then a length and a data word for each string
        let encoded = encode_constructor_args(&args).unwrap();
        assert_eq!(encoded.len(), 32 * 8);
        assert_eq!(encoded[32 * 4 - 1], 8);
    }

    #[test]
    fn test_encode_no_constructor_args() {
        assert!(encode_constructor_args(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_encode_transfer_call() {
        let farm = Address::repeat_byte(0xfa);
        let calldata = encode_call(
            "transfer",
            &[Token::address(farm), token("uint256", "500000")],
        )
        .unwrap();

        assert_eq!(&calldata[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(calldata.len(), 4 + 32 * 2);
        assert_eq!(&calldata[16..36], farm.as_slice());
    }

    #[test]
    fn test_encode_invalid_value() {
        let err = encode_call("transfer", &[token("uint256", "lots")]).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(_)));
    }

    #[test]
    fn test_check_senders() {
        let deployer = Address::repeat_byte(0xde);
        let action = |sender: Option<Address>| BootstrapAction {
            target: ModuleId::new("ERC20"),
            method: "transfer".to_string(),
            args: vec![],
            sender,
        };

        check_senders(deployer, &[action(None), action(Some(deployer))]).unwrap();

        let foreign = Address::repeat_byte(0x0f);
        match check_senders(deployer, &[action(None), action(Some(foreign))]) {
            Err(ScriptError::UnsupportedSender(msg)) => assert!(msg.contains("ERC20.transfer")),
            other => panic!("expected an unsupported sender, got {other:?}"),
        }
    }
}
