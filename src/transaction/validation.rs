/// Schema checks for transactions, separated from type definitions
use crate::error::LedgerError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Checks the constraints serde cannot express on its own.
    ///
    /// This is a shape check only: ids, addresses and signatures are taken
    /// as delivered by the Ledger Service.
    pub fn validate_schema(&self) -> Result<(), LedgerError> {
        if !self.amount.is_finite() {
            return Err(LedgerError::MalformedInput(format!(
                "Transaction {} has a non-finite amount",
                self.id
            )));
        }

        if self.amount < 0.0 {
            return Err(LedgerError::MalformedInput(format!(
                "Transaction {} has a negative amount ({})",
                self.id, self.amount
            )));
        }

        Ok(())
    }
}
