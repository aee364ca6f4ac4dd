//! Access-key validation gate used before sign-in

use tracing::debug;

use super::WalletError;
use crate::near::{AccessKeyView, NetworkError, NetworkProvider};

/// Look up the access key for `account_id`/`public_key` and require full access.
///
/// Returns `Ok(None)` when the key is not registered with the account; every
/// other lookup failure is returned unchanged.
pub async fn validate_access_key(
    network: &dyn NetworkProvider,
    account_id: &str,
    public_key: &str,
) -> Result<Option<AccessKeyView>, WalletError> {
    debug!("validateAccessKey account_id={} public_key={}", account_id, public_key);

    match network.view_access_key(account_id, public_key).await {
        Ok(access_key) => {
            debug!("validateAccessKey:accessKey {:?}", access_key);

            if !access_key.permission.is_full_access() {
                return Err(WalletError::InvalidPermission);
            }

            Ok(Some(access_key))
        }
        Err(NetworkError::AccessKeyDoesNotExist { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
