// src/backend/adapter/wallet_adapter.rs
// Policy checks against an externally-custodied wallet canister.

use crate::error::LegacyError;
use candid::Principal;

/// What the custodied variant needs to know about the owner's wallet before
/// trusting it: whether the engine's policy module is enabled, and what
/// guard (if any) the wallet currently carries.
#[allow(async_fn_in_trait)]
pub trait WalletPolicyClient {
    async fn module_enabled(
        &self,
        wallet: &Principal,
        module: &Principal,
    ) -> Result<bool, LegacyError>;
    async fn current_guard(&self, wallet: &Principal) -> Result<Option<Principal>, LegacyError>;
}

/// Production client calling the wallet canister's policy interface.
#[derive(Clone, Copy, Default)]
pub struct CanisterWalletClient;

impl WalletPolicyClient for CanisterWalletClient {
    async fn module_enabled(
        &self,
        wallet: &Principal,
        module: &Principal,
    ) -> Result<bool, LegacyError> {
        let (enabled,): (bool,) = ic_cdk::call(*wallet, "is_module_enabled", (*module,))
            .await
            .map_err(|(code, msg)| {
                LegacyError::InternalError(format!(
                    "is_module_enabled failed: {:?} - {}",
                    code, msg
                ))
            })?;
        Ok(enabled)
    }

    async fn current_guard(&self, wallet: &Principal) -> Result<Option<Principal>, LegacyError> {
        let (guard,): (Option<Principal>,) = ic_cdk::call(*wallet, "get_guard", ())
            .await
            .map_err(|(code, msg)| {
                LegacyError::InternalError(format!("get_guard failed: {:?} - {}", code, msg))
            })?;
        Ok(guard)
    }
}
