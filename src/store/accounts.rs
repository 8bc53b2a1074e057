//! Account operations

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, AccountKind, Money};

use super::Ledger;

impl Ledger {
    /// Create a new active account
    pub fn add_account(
        &mut self,
        name: impl Into<String>,
        kind: AccountKind,
        currency: impl Into<String>,
    ) -> LedgerResult<Account> {
        let account = Account::new(name, kind, currency);
        account
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let mut staged = self.snapshot.clone();
        staged.accounts.push(account.clone());
        self.commit(staged)?;
        Ok(account)
    }

    /// Rename an account
    pub fn rename_account(
        &mut self,
        id: AccountId,
        name: impl Into<String>,
    ) -> LedgerResult<()> {
        let name = name.into();
        let mut staged = self.snapshot.clone();
        let account = staged
            .account_mut(id)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        account.name = name;
        account.updated_at = chrono::Utc::now();
        account
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        self.commit(staged)?;
        Ok(())
    }

    /// Deactivate an account. History referencing it stays valid; the
    /// account just stops accepting new transactions.
    pub fn deactivate_account(&mut self, id: AccountId) -> LedgerResult<()> {
        let mut staged = self.snapshot.clone();
        staged
            .account_mut(id)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?
            .deactivate();
        self.commit(staged)?;
        Ok(())
    }

    /// Reactivate a previously deactivated account
    pub fn reactivate_account(&mut self, id: AccountId) -> LedgerResult<()> {
        let mut staged = self.snapshot.clone();
        staged
            .account_mut(id)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?
            .reactivate();
        self.commit(staged)?;
        Ok(())
    }

    /// The cached balance of an account
    pub fn account_balance(&self, id: AccountId) -> LedgerResult<Money> {
        self.snapshot
            .account(id)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))
    }
}
