//! Validation utilities

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: Amount) -> LedgerResult<()> {
    if amount == 0 {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that the ids echoed inside a metadata payload match the slot it
/// is written to
pub fn validate_metadata_key(
    class_id: ClassId,
    metadata_id: MetadataId,
    metadata: &ClassMetadata,
) -> LedgerResult<()> {
    if metadata.class_id != class_id {
        return Err(LedgerError::Validation(format!(
            "Metadata payload names class {}, call targets class {}",
            metadata.class_id, class_id
        )));
    }

    if metadata.metadata_id != metadata_id {
        return Err(LedgerError::Validation(format!(
            "Metadata payload names slot {}, call targets slot {}",
            metadata.metadata_id, metadata_id
        )));
    }

    Ok(())
}

/// Validate that an address can receive balances or a role
pub fn validate_recipient(address: &Address) -> LedgerResult<()> {
    if address.is_zero() {
        return Err(LedgerError::Validation(
            "Recipient cannot be the zero address".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a balance movement has two distinct parties
pub fn validate_distinct_parties(from: &Address, to: &Address) -> LedgerResult<()> {
    if from == to {
        return Err(LedgerError::Validation(format!(
            "Source and destination are both {}",
            from
        )));
    }
    Ok(())
}

/// Validate the caller supplied by the substrate for a write
pub fn validate_caller(caller: &Address) -> LedgerResult<()> {
    if caller.is_zero() {
        return Err(LedgerError::Authorization(
            "Writes require a non-zero caller address".to_string(),
        ));
    }
    Ok(())
}
