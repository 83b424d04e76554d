//! Per-request saga scratchpad.

use uuid::Uuid;

/// Tracks which forward steps have produced rollback-able artifacts during a
/// single `complete` invocation. Fields are set exactly once, strictly in the
/// order reservation → payment → order, and never revert.
#[derive(Debug, Default)]
pub struct SagaState {
    reservation_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    order: Option<(Uuid, String)>,
}

/// The inverse actions still owed when a saga fails.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompensationPlan {
    pub refund_payment: Option<Uuid>,
    pub release_reservation: Option<Uuid>,
}

impl SagaState {
    pub fn mark_reserved(&mut self, reservation_id: Uuid) {
        debug_assert!(self.reservation_id.is_none());
        self.reservation_id = Some(reservation_id);
    }

    pub fn mark_paid(&mut self, payment_id: Uuid) {
        debug_assert!(self.reservation_id.is_some());
        debug_assert!(self.payment_id.is_none());
        self.payment_id = Some(payment_id);
    }

    pub fn mark_order_created(&mut self, order_id: Uuid, order_number: String) {
        debug_assert!(self.payment_id.is_some());
        debug_assert!(self.order.is_none());
        self.order = Some((order_id, order_number));
    }

    pub fn reservation_id(&self) -> Option<Uuid> {
        self.reservation_id
    }

    pub fn payment_id(&self) -> Option<Uuid> {
        self.payment_id
    }

    pub fn order_id(&self) -> Option<Uuid> {
        self.order.as_ref().map(|(id, _)| *id)
    }

    /// Compensations owed in reverse chronological order. Once the order
    /// exists it owns both the payment and the reservation, so nothing is
    /// owed at all.
    pub fn owed_compensations(&self) -> CompensationPlan {
        if self.order.is_some() {
            return CompensationPlan::default();
        }
        CompensationPlan {
            refund_payment: self.payment_id,
            release_reservation: self.reservation_id,
        }
    }
}
