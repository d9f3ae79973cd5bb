use containers::{Address, Wei};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("{account} holds {balance}, cannot debit {amount}")]
    InsufficientBalance {
        account: Address,
        balance: Wei,
        amount: Wei,
    },
    #[error("crediting {amount} to {account} overflows")]
    Overflow { account: Address, amount: Wei },
}

/// Balance-keeping contract that requests move value in and out of.
///
/// Root-chain handlers only go through this seam, so any ledger (a token
/// contract binding, a test double) can back a mapped contract.
pub trait AssetContract: fmt::Debug + Send {
    fn balance_of(&self, account: &Address) -> Wei;
    fn debit(&mut self, account: &Address, amount: Wei) -> Result<(), AssetError>;
    fn credit(&mut self, account: &Address, amount: Wei) -> Result<(), AssetError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    balances: HashMap<Address, Wei>,
}

impl InMemoryLedger {
    pub fn with_balances(balances: impl IntoIterator<Item = (Address, Wei)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    pub fn total_supply(&self) -> Wei {
        self.balances.values().sum()
    }
}

impl AssetContract for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn debit(&mut self, account: &Address, amount: Wei) -> Result<(), AssetError> {
        let balance = self.balance_of(account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(AssetError::InsufficientBalance {
                account: *account,
                balance,
                amount,
            })?;
        self.balances.insert(*account, remaining);
        Ok(())
    }

    fn credit(&mut self, account: &Address, amount: Wei) -> Result<(), AssetError> {
        let updated = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(AssetError::Overflow {
                account: *account,
                amount,
            })?;
        self.balances.insert(*account, updated);
        Ok(())
    }
}

/// Root-chain contract paired with its child-chain counterpart.
#[derive(Debug)]
pub struct MappedContract {
    pub child_address: Address,
    pub contract: Box<dyn AssetContract>,
}

/// Requestable contracts known to the root chain, keyed by root address.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    contracts: BTreeMap<Address, MappedContract>,
}

impl AssetRegistry {
    /// Maps `root` to `child`, replacing an earlier mapping of `root`.
    pub fn map(&mut self, root: Address, child: Address, contract: Box<dyn AssetContract>) {
        self.contracts.insert(
            root,
            MappedContract {
                child_address: child,
                contract,
            },
        );
    }

    pub fn is_mapped(&self, root: &Address) -> bool {
        self.contracts.contains_key(root)
    }

    pub fn child_of(&self, root: &Address) -> Option<Address> {
        self.contracts.get(root).map(|mapped| mapped.child_address)
    }

    pub fn get(&self, root: &Address) -> Option<&dyn AssetContract> {
        self.contracts.get(root).map(|mapped| mapped.contract.as_ref())
    }

    pub fn get_mut(&mut self, root: &Address) -> Option<&mut (dyn AssetContract + 'static)> {
        self.contracts
            .get_mut(root)
            .map(|mapped| mapped.contract.as_mut())
    }

    pub fn balance_of(&self, root: &Address, account: &Address) -> Wei {
        self.get(root)
            .map(|contract| contract.balance_of(account))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
