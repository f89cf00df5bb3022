// src/backend/adapter/mod.rs
// Seams to the outside world: token ledgers, mail relay, custody wallets.

pub mod mail_adapter;
pub mod token_adapter;
pub mod wallet_adapter;

pub use mail_adapter::MailClient;
pub use token_adapter::TokenClient;
pub use wallet_adapter::WalletPolicyClient;

#[cfg(test)]
pub mod mock {
    use super::{MailClient, TokenClient, WalletPolicyClient};
    use crate::error::LegacyError;
    use crate::models::common::{AssetId, PrincipalId};
    use candid::Principal;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Suspends exactly once, so a test can interleave a second in-flight
    /// call at the await point the way the IC interleaves messages while an
    /// inter-canister call is outstanding.
    pub fn yield_now() -> impl Future<Output = ()> {
        struct YieldNow(bool);
        impl Future for YieldNow {
            type Output = ();
            fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
                if self.0 {
                    Poll::Ready(())
                } else {
                    self.0 = true;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
        }
        YieldNow(false)
    }

    /// Polls two futures alternately to completion, interleaving them at
    /// every suspension point.
    pub fn drive_pair<A: Future, B: Future>(a: A, b: B) -> (A::Output, B::Output) {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        futures::pin_mut!(a, b);
        let mut out_a = None;
        let mut out_b = None;
        for _ in 0..64 {
            if out_a.is_none() {
                if let Poll::Ready(v) = a.as_mut().poll(&mut cx) {
                    out_a = Some(v);
                }
            }
            if out_b.is_none() {
                if let Poll::Ready(v) = b.as_mut().poll(&mut cx) {
                    out_b = Some(v);
                }
            }
            if out_a.is_some() && out_b.is_some() {
                break;
            }
        }
        (out_a.expect("first future never finished"), out_b.expect("second future never finished"))
    }

    /// In-memory ledger bank shared by the service tests. Single threaded,
    /// mirroring canister execution.
    #[derive(Default)]
    pub struct MockBank {
        pub balances: RefCell<BTreeMap<(AssetId, PrincipalId), u128>>,
        pub allowances: RefCell<BTreeMap<(AssetId, PrincipalId, PrincipalId), u128>>,
        pub transfers: RefCell<Vec<(AssetId, PrincipalId, u128)>>,
        /// When set, every transfer call fails with this message.
        pub fail_transfers: RefCell<Option<String>>,
    }

    impl MockBank {
        pub fn set_balance(&self, asset: AssetId, account: PrincipalId, amount: u128) {
            self.balances.borrow_mut().insert((asset, account), amount);
        }

        pub fn set_allowance(
            &self,
            asset: AssetId,
            owner: PrincipalId,
            spender: PrincipalId,
            amount: u128,
        ) {
            self.allowances.borrow_mut().insert((asset, owner, spender), amount);
        }

        pub fn balance(&self, asset: &AssetId, account: &PrincipalId) -> u128 {
            self.balances
                .borrow()
                .get(&(asset.clone(), *account))
                .copied()
                .unwrap_or(0)
        }
    }

    impl TokenClient for MockBank {
        async fn balance_of(
            &self,
            asset: &AssetId,
            account: &PrincipalId,
        ) -> Result<u128, LegacyError> {
            Ok(self.balance(asset, account))
        }

        async fn allowance(
            &self,
            asset: &AssetId,
            owner: &PrincipalId,
            spender: &PrincipalId,
        ) -> Result<u128, LegacyError> {
            Ok(self
                .allowances
                .borrow()
                .get(&(asset.clone(), *owner, *spender))
                .copied()
                .unwrap_or(0))
        }

        async fn transfer(
            &self,
            asset: &AssetId,
            to: &PrincipalId,
            amount: u128,
        ) -> Result<(), LegacyError> {
            if let Some(msg) = self.fail_transfers.borrow().clone() {
                return Err(LegacyError::TransferFailed(msg));
            }
            *self
                .balances
                .borrow_mut()
                .entry((asset.clone(), *to))
                .or_insert(0) += amount;
            self.transfers.borrow_mut().push((asset.clone(), *to, amount));
            Ok(())
        }

        async fn transfer_from(
            &self,
            asset: &AssetId,
            from: &PrincipalId,
            to: &PrincipalId,
            amount: u128,
        ) -> Result<(), LegacyError> {
            if let Some(msg) = self.fail_transfers.borrow().clone() {
                return Err(LegacyError::TransferFailed(msg));
            }
            {
                let mut allowances = self.allowances.borrow_mut();
                let key = allowances
                    .keys()
                    .find(|k| k.0 == *asset && k.1 == *from)
                    .cloned();
                let key = key.ok_or_else(|| {
                    LegacyError::TransferFailed("no allowance".to_string())
                })?;
                let allowed = allowances.get_mut(&key).expect("allowance entry present");
                if *allowed < amount {
                    return Err(LegacyError::TransferFailed(
                        "insufficient allowance".to_string(),
                    ));
                }
                *allowed -= amount;
            }
            let mut balances = self.balances.borrow_mut();
            let from_balance = balances.entry((asset.clone(), *from)).or_insert(0);
            if *from_balance < amount {
                return Err(LegacyError::TransferFailed("insufficient funds".to_string()));
            }
            *from_balance -= amount;
            *balances.entry((asset.clone(), *to)).or_insert(0) += amount;
            drop(balances);
            self.transfers.borrow_mut().push((asset.clone(), *to, amount));
            Ok(())
        }
    }

    /// Bank wrapper whose transfer calls suspend once before delegating,
    /// exposing the await points money moves across.
    pub struct SlowBank<'a> {
        pub inner: &'a MockBank,
    }

    impl TokenClient for SlowBank<'_> {
        async fn balance_of(
            &self,
            asset: &AssetId,
            account: &PrincipalId,
        ) -> Result<u128, LegacyError> {
            self.inner.balance_of(asset, account).await
        }

        async fn allowance(
            &self,
            asset: &AssetId,
            owner: &PrincipalId,
            spender: &PrincipalId,
        ) -> Result<u128, LegacyError> {
            self.inner.allowance(asset, owner, spender).await
        }

        async fn transfer(
            &self,
            asset: &AssetId,
            to: &PrincipalId,
            amount: u128,
        ) -> Result<(), LegacyError> {
            yield_now().await;
            self.inner.transfer(asset, to, amount).await
        }

        async fn transfer_from(
            &self,
            asset: &AssetId,
            from: &PrincipalId,
            to: &PrincipalId,
            amount: u128,
        ) -> Result<(), LegacyError> {
            yield_now().await;
            self.inner.transfer_from(asset, from, to, amount).await
        }
    }

    /// Mail sink capturing everything the keeper asks to send.
    #[derive(Default)]
    pub struct MockMailer {
        pub sent: RefCell<Vec<(String, String)>>,
    }

    impl MailClient for MockMailer {
        async fn send(
            &self,
            to_email: &str,
            subject: &str,
            _body: &str,
        ) -> Result<(), LegacyError> {
            self.sent
                .borrow_mut()
                .push((to_email.to_string(), subject.to_string()));
            Ok(())
        }
    }

    /// Wallet policy stub with per-wallet module and guard state.
    #[derive(Default)]
    pub struct MockWallet {
        pub modules_enabled: RefCell<BTreeMap<Principal, bool>>,
        pub guards: RefCell<BTreeMap<Principal, Principal>>,
    }

    impl WalletPolicyClient for MockWallet {
        async fn module_enabled(
            &self,
            wallet: &Principal,
            _module: &Principal,
        ) -> Result<bool, LegacyError> {
            Ok(self.modules_enabled.borrow().get(wallet).copied().unwrap_or(false))
        }

        async fn current_guard(
            &self,
            wallet: &Principal,
        ) -> Result<Option<Principal>, LegacyError> {
            Ok(self.guards.borrow().get(wallet).copied())
        }
    }

    /// Wallet wrapper whose policy lookup suspends once before delegating.
    pub struct SlowWallet<'a> {
        pub inner: &'a MockWallet,
    }

    impl WalletPolicyClient for SlowWallet<'_> {
        async fn module_enabled(
            &self,
            wallet: &Principal,
            module: &Principal,
        ) -> Result<bool, LegacyError> {
            yield_now().await;
            self.inner.module_enabled(wallet, module).await
        }

        async fn current_guard(
            &self,
            wallet: &Principal,
        ) -> Result<Option<Principal>, LegacyError> {
            self.inner.current_guard(wallet).await
        }
    }
}
