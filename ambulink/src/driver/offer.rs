//! The driver's pending offer.

use tracing::info;

use crate::model::CallOffer;

/// Holds at most one offer awaiting a decision.
///
/// A new offer replaces the pending one; the driver always decides on the
/// most recent proposal.
#[derive(Debug, Default)]
pub struct OfferSlot {
    pending: Option<CallOffer>,
}

impl OfferSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `offer`, returning the offer it superseded.
    pub fn offer(&mut self, offer: CallOffer) -> Option<CallOffer> {
        let superseded = self.pending.replace(offer);
        if let (Some(old), Some(new)) = (&superseded, &self.pending) {
            info!(
                superseded = %old.call_id,
                call_id = %new.call_id,
                "Pending offer superseded"
            );
        }
        superseded
    }

    pub fn pending(&self) -> Option<&CallOffer> {
        self.pending.as_ref()
    }

    /// Remove the pending offer if it is for `call_id`.
    pub fn take(&mut self, call_id: &str) -> Option<CallOffer> {
        if self.pending.as_ref().is_some_and(|o| o.call_id == call_id) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
