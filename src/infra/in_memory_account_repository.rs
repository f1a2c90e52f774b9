use crate::domain::{Account, AccountRepository};
use futures::{stream, Stream};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};
use thiserror::Error;

/// Non-durable [AccountRepository] backed by an ordered map, used to drive the API in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountRepository {
    state: Arc<RwLock<State>>,
    failing: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i32,
    accounts: BTreeMap<i32, Account>,
}

#[derive(Debug, Error)]
#[error("storage unavailable")]
pub struct InMemoryError;

impl InMemoryAccountRepository {
    /// Let all subsequent operations fail with [InMemoryError].
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), InMemoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(InMemoryError)
        } else {
            Ok(())
        }
    }
}

impl AccountRepository for InMemoryAccountRepository {
    type Error = InMemoryError;

    async fn accounts(
        &self,
    ) -> Result<impl Stream<Item = Result<Account, Self::Error>> + Send, Self::Error> {
        self.check()?;
        let accounts = self
            .state
            .read()
            .map_err(|_| InMemoryError)?
            .accounts
            .values()
            .cloned()
            .collect::<Vec<_>>();
        Ok(stream::iter(accounts.into_iter().map(Ok)))
    }

    async fn account_by_id(&self, id: i32) -> Result<Option<Account>, Self::Error> {
        self.check()?;
        let state = self.state.read().map_err(|_| InMemoryError)?;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn create_account(&self, mut account: Account) -> Result<Account, Self::Error> {
        self.check()?;
        let mut state = self.state.write().map_err(|_| InMemoryError)?;
        state.next_id += 1;
        account.id = state.next_id;
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn delete_account(&self, id: i32) -> Result<(), Self::Error> {
        self.check()?;
        let mut state = self.state.write().map_err(|_| InMemoryError)?;
        state.accounts.remove(&id);
        Ok(())
    }

    async fn update_account(&self, _account: Account) -> Result<(), Self::Error> {
        self.check()
    }
}
