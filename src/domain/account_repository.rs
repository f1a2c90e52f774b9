use crate::domain::Account;
use futures::Stream;
use std::error::Error as StdError;

#[trait_variant::make(Send)]
pub trait AccountRepository
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn accounts(
        &self,
    ) -> Result<impl Stream<Item = Result<Account, Self::Error>> + Send, Self::Error>;

    async fn account_by_id(&self, id: i32) -> Result<Option<Account>, Self::Error>;

    /// Persist the given account and return it with its storage-assigned ID.
    async fn create_account(&self, account: Account) -> Result<Account, Self::Error>;

    /// Deleting a nonexistent account is not an error.
    async fn delete_account(&self, id: i32) -> Result<(), Self::Error>;

    /// Accounts are never mutated, hence this does nothing.
    async fn update_account(&self, account: Account) -> Result<(), Self::Error>;
}
