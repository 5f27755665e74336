//! Token transfer sink.
//!
//! Payouts (claims, refunds, sweeps) hand the actual token movement to a
//! [`TokenSink`] collaborator.  A transfer either fully succeeds or the
//! whole operation aborts — ledger state is only committed after the sink
//! returns `Ok`.

use {
    crate::error::{IncentiveError, Result},
    solana_pubkey::Pubkey,
    std::collections::HashMap,
};

/// Outbound token transfers.  Assumed atomic: `Err` must leave the token
/// state untouched.
pub trait TokenSink {
    fn transfer(&mut self, token: &Pubkey, to: &Pubkey, amount: u128) -> Result<()>;
}

/// In-memory token ledger.
///
/// Reference sink for tests and simulations: per-token balances with an
/// explicit ledger account that payouts draw from, failing on insufficient
/// funds like a real vault would.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenLedger {
    /// (token, holder) → balance.
    balances: HashMap<(Pubkey, Pubkey), u128>,
    /// The account payouts draw from.
    vault: Pubkey,
}

impl MemoryTokenLedger {
    pub fn new(vault: Pubkey) -> Self {
        Self {
            balances: HashMap::new(),
            vault,
        }
    }

    pub fn vault(&self) -> Pubkey {
        self.vault
    }

    pub fn balance_of(&self, token: &Pubkey, holder: &Pubkey) -> u128 {
        *self.balances.get(&(*token, *holder)).unwrap_or(&0)
    }

    /// Credit `holder` out of thin air (test/deposit fixture).
    pub fn mint(&mut self, token: &Pubkey, holder: &Pubkey, amount: u128) {
        *self.balances.entry((*token, *holder)).or_default() += amount;
    }

    /// Move a deposit from `from` into the vault.
    pub fn deposit_to_vault(&mut self, token: &Pubkey, from: &Pubkey, amount: u128) -> Result<()> {
        let from_balance = self.balances.entry((*token, *from)).or_default();
        if *from_balance < amount {
            return Err(IncentiveError::TransferFailed);
        }
        *from_balance -= amount;
        let vault = self.vault;
        *self.balances.entry((*token, vault)).or_default() += amount;
        Ok(())
    }
}

impl TokenSink for MemoryTokenLedger {
    fn transfer(&mut self, token: &Pubkey, to: &Pubkey, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let vault = self.vault;
        let vault_balance = self.balances.entry((*token, vault)).or_default();
        if *vault_balance < amount {
            return Err(IncentiveError::TransferFailed);
        }
        *vault_balance -= amount;
        *self.balances.entry((*token, *to)).or_default() += amount;
        Ok(())
    }
}
