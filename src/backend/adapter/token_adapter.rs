// src/backend/adapter/token_adapter.rs
// Asset movement: native ledger plus external ICRC token ledgers.

use crate::error::LegacyError;
use crate::models::common::{AssetId, PrincipalId};
use crate::storage::settings::get_settings;
use candid::{CandidType, Nat, Principal};
use ic_ledger_types::{
    account_balance, transfer, AccountBalanceArgs, AccountIdentifier, Memo, Tokens, TransferArgs,
    DEFAULT_FEE, DEFAULT_SUBACCOUNT,
};
use serde::Deserialize;

/// Everything the engine needs from token ledgers. Services stay generic
/// over this so the claim paths run natively under test.
#[allow(async_fn_in_trait)]
pub trait TokenClient {
    async fn balance_of(&self, asset: &AssetId, account: &PrincipalId)
        -> Result<u128, LegacyError>;
    async fn allowance(
        &self,
        asset: &AssetId,
        owner: &PrincipalId,
        spender: &PrincipalId,
    ) -> Result<u128, LegacyError>;
    async fn transfer(
        &self,
        asset: &AssetId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), LegacyError>;
    async fn transfer_from(
        &self,
        asset: &AssetId,
        from: &PrincipalId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), LegacyError>;
}

// ICRC-1/2 wire types, inlined; only the fields the engine sends.

#[derive(CandidType, Deserialize, Clone, Debug)]
struct IcrcAccount {
    owner: Principal,
    subaccount: Option<[u8; 32]>,
}

#[derive(CandidType, Deserialize)]
struct Icrc1TransferArg {
    from_subaccount: Option<[u8; 32]>,
    to: IcrcAccount,
    amount: Nat,
    fee: Option<Nat>,
    memo: Option<Vec<u8>>,
    created_at_time: Option<u64>,
}

#[derive(CandidType, Deserialize)]
struct Icrc2TransferFromArgs {
    spender_subaccount: Option<[u8; 32]>,
    from: IcrcAccount,
    to: IcrcAccount,
    amount: Nat,
    fee: Option<Nat>,
    memo: Option<Vec<u8>>,
    created_at_time: Option<u64>,
}

#[derive(CandidType, Deserialize)]
struct Icrc2AllowanceArgs {
    account: IcrcAccount,
    spender: IcrcAccount,
}

#[derive(CandidType, Deserialize)]
struct Icrc2Allowance {
    allowance: Nat,
    expires_at: Option<u64>,
}

fn icrc_account(owner: &Principal) -> IcrcAccount {
    IcrcAccount { owner: *owner, subaccount: None }
}

fn nat_to_u128(value: &Nat) -> u128 {
    // Ledger balances fit u128; anything larger is clamped rather than
    // trapped on.
    let mut out: u128 = 0;
    for digit in value.0.to_u64_digits().iter().rev() {
        if out > u128::MAX >> 64 {
            return u128::MAX;
        }
        out = (out << 64) | *digit as u128;
    }
    out
}

/// Which ledger canister an asset resolves to. Native goes through the
/// configured ledger; tokens are their own canister.
fn ledger_of(asset: &AssetId) -> Principal {
    match asset {
        AssetId::Native => get_settings().native_ledger,
        AssetId::Token(p) => *p,
    }
}

/// Production client: the native ledger through ic-ledger-types, token
/// ledgers and allowance pulls through ICRC-1/2 calls.
#[derive(Clone, Copy, Default)]
pub struct LedgerTokenClient;

impl TokenClient for LedgerTokenClient {
    async fn balance_of(
        &self,
        asset: &AssetId,
        account: &PrincipalId,
    ) -> Result<u128, LegacyError> {
        match asset {
            AssetId::Native => {
                let args = AccountBalanceArgs {
                    account: AccountIdentifier::new(account, &DEFAULT_SUBACCOUNT),
                };
                let tokens = account_balance(get_settings().native_ledger, args)
                    .await
                    .map_err(|(code, msg)| {
                        LegacyError::TransferFailed(format!(
                            "account_balance failed: {:?} - {}",
                            code, msg
                        ))
                    })?;
                Ok(tokens.e8s() as u128)
            }
            AssetId::Token(ledger) => {
                let (balance,): (Nat,) =
                    ic_cdk::call(*ledger, "icrc1_balance_of", (icrc_account(account),))
                        .await
                        .map_err(|(code, msg)| {
                            LegacyError::TransferFailed(format!(
                                "icrc1_balance_of failed: {:?} - {}",
                                code, msg
                            ))
                        })?;
                Ok(nat_to_u128(&balance))
            }
        }
    }

    async fn allowance(
        &self,
        asset: &AssetId,
        owner: &PrincipalId,
        spender: &PrincipalId,
    ) -> Result<u128, LegacyError> {
        let args = Icrc2AllowanceArgs {
            account: icrc_account(owner),
            spender: icrc_account(spender),
        };
        let (allowance,): (Icrc2Allowance,) =
            ic_cdk::call(ledger_of(asset), "icrc2_allowance", (args,))
                .await
                .map_err(|(code, msg)| {
                    LegacyError::TransferFailed(format!(
                        "icrc2_allowance failed: {:?} - {}",
                        code, msg
                    ))
                })?;
        Ok(nat_to_u128(&allowance.allowance))
    }

    async fn transfer(
        &self,
        asset: &AssetId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), LegacyError> {
        match asset {
            AssetId::Native => {
                let args = TransferArgs {
                    memo: Memo(0),
                    amount: Tokens::from_e8s(amount as u64),
                    fee: DEFAULT_FEE,
                    from_subaccount: None,
                    to: AccountIdentifier::new(to, &DEFAULT_SUBACCOUNT),
                    created_at_time: None,
                };
                transfer(get_settings().native_ledger, args)
                    .await
                    .map_err(|(code, msg)| {
                        LegacyError::TransferFailed(format!(
                            "ledger transfer failed: {:?} - {}",
                            code, msg
                        ))
                    })?
                    .map_err(|e| LegacyError::TransferFailed(format!("ledger rejected: {:?}", e)))?;
                Ok(())
            }
            AssetId::Token(ledger) => {
                let args = Icrc1TransferArg {
                    from_subaccount: None,
                    to: icrc_account(to),
                    amount: Nat::from(amount),
                    fee: None,
                    memo: None,
                    created_at_time: None,
                };
                let (result,): (Result<Nat, Icrc1TransferError>,) =
                    ic_cdk::call(*ledger, "icrc1_transfer", (args,))
                        .await
                        .map_err(|(code, msg)| {
                            LegacyError::TransferFailed(format!(
                                "icrc1_transfer failed: {:?} - {}",
                                code, msg
                            ))
                        })?;
                result
                    .map(|_| ())
                    .map_err(|e| LegacyError::TransferFailed(format!("ledger rejected: {:?}", e)))
            }
        }
    }

    async fn transfer_from(
        &self,
        asset: &AssetId,
        from: &PrincipalId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), LegacyError> {
        let args = Icrc2TransferFromArgs {
            spender_subaccount: None,
            from: icrc_account(from),
            to: icrc_account(to),
            amount: Nat::from(amount),
            fee: None,
            memo: None,
            created_at_time: None,
        };
        let (result,): (Result<Nat, Icrc2TransferFromError>,) =
            ic_cdk::call(ledger_of(asset), "icrc2_transfer_from", (args,))
                .await
                .map_err(|(code, msg)| {
                    LegacyError::TransferFailed(format!(
                        "icrc2_transfer_from failed: {:?} - {}",
                        code, msg
                    ))
                })?;
        result
            .map(|_| ())
            .map_err(|e| LegacyError::TransferFailed(format!("ledger rejected: {:?}", e)))
    }
}

// Ledger-side rejection reasons, carried verbatim into TransferFailed text.

#[derive(CandidType, Deserialize, Debug)]
enum Icrc1TransferError {
    BadFee { expected_fee: Nat },
    BadBurn { min_burn_amount: Nat },
    InsufficientFunds { balance: Nat },
    TooOld,
    CreatedInFuture { ledger_time: u64 },
    Duplicate { duplicate_of: Nat },
    TemporarilyUnavailable,
    GenericError { error_code: Nat, message: String },
}

#[derive(CandidType, Deserialize, Debug)]
enum Icrc2TransferFromError {
    BadFee { expected_fee: Nat },
    BadBurn { min_burn_amount: Nat },
    InsufficientFunds { balance: Nat },
    InsufficientAllowance { allowance: Nat },
    TooOld,
    CreatedInFuture { ledger_time: u64 },
    Duplicate { duplicate_of: Nat },
    TemporarilyUnavailable,
    GenericError { error_code: Nat, message: String },
}
