//! Neutral action schema used by wallet selectors
//!
//! Actions arrive as `{"type": "...", "params": {...}}` and are mapped 1:1
//! onto chain-native actions by [`create_action`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{U128, U64};
use crate::near::{self, NearError, PublicKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    CreateAccount,
    DeployContract(DeployContractParams),
    FunctionCall(FunctionCallParams),
    Transfer(TransferParams),
    Stake(StakeParams),
    AddKey(AddKeyParams),
    DeleteKey(DeleteKeyParams),
    DeleteAccount(DeleteAccountParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployContractParams {
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallParams {
    pub method_name: String,
    pub args: FunctionCallArgs,
    pub gas: U64,
    pub deposit: U128,
}

/// Function call arguments
///
/// JSON arguments are serialized to bytes when the action is converted.
/// Raw bytes can only be built from Rust; anything deserialized is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionCallArgs {
    Json(Value),
    Raw(Vec<u8>),
}

impl FunctionCallArgs {
    pub fn to_bytes(&self) -> Result<Vec<u8>, NearError> {
        match self {
            FunctionCallArgs::Json(value) => {
                serde_json::to_vec(value).map_err(|e| NearError::Encoding(e.to_string()))
            }
            FunctionCallArgs::Raw(bytes) => Ok(bytes.clone()),
        }
    }
}

impl Serialize for FunctionCallArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FunctionCallArgs::Json(value) => value.serialize(serializer),
            FunctionCallArgs::Raw(bytes) => bytes.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FunctionCallArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FunctionCallArgs::Json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub deposit: U128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeParams {
    pub stake: U128,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeyParams {
    pub public_key: String,
    pub access_key: AddKeyAccessKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddKeyAccessKey {
    pub permission: AddKeyPermission,
}

/// `"FullAccess"` or a function-call restriction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddKeyPermission {
    FullAccess(FullAccess),
    FunctionCall(FunctionCallPermissionParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullAccess {
    FullAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallPermissionParams {
    pub receiver_id: String,
    #[serde(default)]
    pub allowance: Option<U128>,
    #[serde(default)]
    pub method_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeyParams {
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountParams {
    pub beneficiary_id: String,
}

/// Map a neutral action onto its chain-native form
pub fn create_action(action: &Action) -> Result<near::Action, NearError> {
    let converted = match action {
        Action::CreateAccount => near::Action::CreateAccount(near::CreateAccountAction {}),
        Action::DeployContract(params) => near::Action::DeployContract(near::DeployContractAction {
            code: params.code.clone(),
        }),
        Action::FunctionCall(params) => near::Action::FunctionCall(near::FunctionCallAction {
            method_name: params.method_name.clone(),
            args: params.args.to_bytes()?,
            gas: params.gas.0,
            deposit: params.deposit.0,
        }),
        Action::Transfer(params) => near::Action::Transfer(near::TransferAction {
            deposit: params.deposit.0,
        }),
        Action::Stake(params) => near::Action::Stake(near::StakeAction {
            stake: params.stake.0,
            public_key: params.public_key.parse()?,
        }),
        Action::AddKey(params) => near::Action::AddKey(near::AddKeyAction {
            public_key: params.public_key.parse()?,
            access_key: match &params.access_key.permission {
                AddKeyPermission::FullAccess(_) => near::AccessKey::full_access(),
                AddKeyPermission::FunctionCall(permission) => near::AccessKey::function_call(
                    permission.receiver_id.clone(),
                    permission.method_names.clone().unwrap_or_default(),
                    permission.allowance.map(|a| a.0),
                ),
            },
        }),
        Action::DeleteKey(params) => near::Action::DeleteKey(near::DeleteKeyAction {
            public_key: params.public_key.parse::<PublicKey>()?,
        }),
        Action::DeleteAccount(params) => near::Action::DeleteAccount(near::DeleteAccountAction {
            beneficiary_id: params.beneficiary_id.clone(),
        }),
    };

    Ok(converted)
}

/// Convert a list of actions, preserving order
pub fn create_actions(actions: &[Action]) -> Result<Vec<near::Action>, NearError> {
    actions.iter().map(create_action).collect()
}
