//! Balance tracking per owner, class and sub id

use std::sync::Arc;
use tracing::debug;

use crate::ledger::PendingState;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::*;

/// Balance ledger: issuance, movement and destruction of class balances
pub struct BalanceLedger {
    policy: Arc<dyn AuthorizationPolicy>,
}

impl BalanceLedger {
    /// Create a new balance ledger gated by `policy`
    pub fn new(policy: Arc<dyn AuthorizationPolicy>) -> Self {
        Self { policy }
    }

    pub async fn balance_of<S: LedgerStorage>(
        &self,
        storage: &S,
        owner: &Address,
        class_id: ClassId,
        sub_id: SubId,
    ) -> LedgerResult<Amount> {
        storage
            .get_balance(&BalanceKey::new(*owner, class_id, sub_id))
            .await
    }

    pub async fn total_supply<S: LedgerStorage>(
        &self,
        storage: &S,
        class_id: ClassId,
        sub_id: SubId,
    ) -> LedgerResult<Amount> {
        storage.get_total_supply(class_id, sub_id).await
    }

    pub async fn is_approved_for<S: LedgerStorage>(
        &self,
        storage: &S,
        owner: &Address,
        operator: &Address,
    ) -> LedgerResult<bool> {
        storage.is_approved_for(owner, operator).await
    }

    /// Create new balance for `to`; restricted by the policy's issue rule
    pub async fn issue<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<()> {
        validate_positive_amount(amount)?;
        validate_recipient(&to)?;

        let manager = state.class_manager(class_id).await?;
        self.policy
            .authorize_issue(caller, class_id, manager.as_ref())?;

        let supply = state.total_supply(class_id, sub_id).await?;
        let new_supply = supply.checked_add(amount).ok_or_else(|| {
            LedgerError::Overflow(format!(
                "total supply of class {} sub id {} exceeds range",
                class_id, sub_id
            ))
        })?;

        Self::credit(state, BalanceKey::new(to, class_id, sub_id), amount).await?;
        state.put_total_supply(class_id, sub_id, new_supply);
        state.emit(LedgerEvent::Issued {
            to,
            class_id,
            sub_id,
            amount,
        });
        Ok(())
    }

    /// Move the caller's own balance to `to`
    pub async fn transfer<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.transfer_from(state, caller, *caller, to, class_id, sub_id, amount)
            .await
    }

    /// Move balance of `from` to `to`; `caller` must be `from` or an approved operator
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer_from<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        from: Address,
        to: Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<()> {
        validate_positive_amount(amount)?;
        validate_recipient(&to)?;
        validate_distinct_parties(&from, &to)?;

        let approved = *caller != from && state.approval(&from, caller).await?;
        self.policy.authorize_transfer(caller, &from, approved)?;

        Self::debit(state, BalanceKey::new(from, class_id, sub_id), amount).await?;
        Self::credit(state, BalanceKey::new(to, class_id, sub_id), amount).await?;
        state.emit(LedgerEvent::Transferred {
            operator: *caller,
            from,
            to,
            class_id,
            sub_id,
            amount,
        });
        Ok(())
    }

    /// Destroy the caller's own balance
    pub async fn burn<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        class_id: ClassId,
        sub_id: SubId,
        amount: Amount,
    ) -> LedgerResult<()> {
        validate_positive_amount(amount)?;

        Self::debit(state, BalanceKey::new(*caller, class_id, sub_id), amount).await?;

        let supply = state.total_supply(class_id, sub_id).await?;
        // Supply covers every balance, so a successful debit implies supply >= amount
        let new_supply = supply.checked_sub(amount).ok_or_else(|| {
            LedgerError::Overflow(format!(
                "total supply of class {} sub id {} below burned amount",
                class_id, sub_id
            ))
        })?;
        state.put_total_supply(class_id, sub_id, new_supply);
        state.emit(LedgerEvent::Burned {
            owner: *caller,
            class_id,
            sub_id,
            amount,
        });
        Ok(())
    }

    /// Grant or revoke `operator`'s right to move all of the caller's balances
    pub async fn set_approval_for<S: LedgerStorage>(
        &self,
        state: &mut PendingState<'_, S>,
        caller: &Address,
        operator: Address,
        approved: bool,
    ) -> LedgerResult<()> {
        validate_recipient(&operator)?;
        validate_distinct_parties(caller, &operator)?;

        state.put_approval(*caller, operator, approved);
        state.emit(LedgerEvent::ApprovalSet {
            owner: *caller,
            operator,
            approved,
        });
        Ok(())
    }

    async fn debit<S: LedgerStorage>(
        state: &mut PendingState<'_, S>,
        key: BalanceKey,
        amount: Amount,
    ) -> LedgerResult<()> {
        let available = state.balance(&key).await?;
        if available < amount {
            debug!(owner = %key.owner, available = %available, requested = %amount, "debit rejected");
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        state.put_balance(key, available - amount);
        Ok(())
    }

    async fn credit<S: LedgerStorage>(
        state: &mut PendingState<'_, S>,
        key: BalanceKey,
        amount: Amount,
    ) -> LedgerResult<()> {
        let current = state.balance(&key).await?;
        let updated = current.checked_add(amount).ok_or_else(|| {
            LedgerError::Overflow(format!("balance of {} exceeds range", key.owner))
        })?;
        state.put_balance(key, updated);
        Ok(())
    }
}
