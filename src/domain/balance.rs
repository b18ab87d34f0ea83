//! Per-participant accounting.
//!
//! A [`Balance`] separates every source of earnings and costs so the effect
//! of the market on one cluster can be analysed afterwards. The [`Ledger`]
//! holds one balance per participant and is the only place money moves.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::trace;

use super::cluster::{Cluster, ClusterId};
use super::error::MarketError;
use super::money::Amount;

/// Everything one participant has paid, received and accrued.
///
/// `reputation` is a current-state value and gets overwritten on every bid;
/// all other monetary fields accumulate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    /// Bribes paid to other clusters.
    pub paid: Amount,
    /// Bribes received from other clusters.
    pub received: Amount,
    /// Capital currently locked to back the standing bid.
    pub capital_locked: Amount,
    /// Accumulated interest forgone on locked capital.
    pub capital_cost: Amount,
    /// Accumulated cost of placing bids.
    pub transaction_costs: Amount,
    /// Value of slots gained because of the market.
    pub extra_slot_earnings: Amount,
    /// Value of slots lost because of the market.
    pub extra_slot_costs: Amount,
    pub reputation: Amount,
    /// Copied from the cluster when it enters the market and on every bid.
    pub reputation_factor: Decimal,
    /// Whether the cluster ever placed a bid.
    pub participated: bool,
}

impl Balance {
    /// A zeroed balance for a cluster with the given reputation factor.
    #[must_use]
    pub fn new(reputation_factor: Decimal) -> Self {
        Self {
            paid: Amount::ZERO,
            received: Amount::ZERO,
            capital_locked: Amount::ZERO,
            capital_cost: Amount::ZERO,
            transaction_costs: Amount::ZERO,
            extra_slot_earnings: Amount::ZERO,
            extra_slot_costs: Amount::ZERO,
            reputation: Amount::ZERO,
            reputation_factor,
            participated: false,
        }
    }

    /// Cost of the current reputation, weighted by how much the cluster
    /// cares about it.
    #[must_use]
    pub fn reputation_cost(&self) -> Amount {
        self.reputation * self.reputation_factor
    }

    /// Net effect of the market on this participant. Positive for gains.
    ///
    /// A cluster that never bid can still end up negative here when one of
    /// its slots is taken away by the market.
    #[must_use]
    pub fn total_balance(&self) -> Amount {
        self.received - self.paid - self.capital_cost - self.transaction_costs
            + self.extra_slot_earnings
            - self.extra_slot_costs
            - self.reputation_cost()
    }

    /// Charge one period of interest on the locked capital.
    pub fn accrue_interest(&mut self, interest_rate: Decimal) {
        self.capital_cost += self.capital_locked * interest_rate;
    }

    /// Book a net change in slots worth `slot_value` each.
    pub fn apply_slot_delta(&mut self, delta: i64, slot_value: Amount) {
        let value = Decimal::from(delta.unsigned_abs()) * slot_value;
        if delta > 0 {
            self.extra_slot_earnings += value;
        } else if delta < 0 {
            self.extra_slot_costs += value;
        }
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::new(Decimal::ONE)
    }
}

/// Balance sheets for every participant of a market, indexed by cluster id.
#[derive(Debug, Clone)]
pub struct Ledger {
    sheets: Vec<Balance>,
}

impl Ledger {
    /// One zeroed balance per cluster, in the order given.
    ///
    /// `clusters` must be in canonical order so that a cluster's id is its
    /// position.
    #[must_use]
    pub fn new(clusters: &[Cluster]) -> Self {
        Self {
            sheets: clusters
                .iter()
                .map(|c| Balance::new(c.reputation_factor()))
                .collect(),
        }
    }

    /// Number of balance sheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Balance of one cluster.
    pub fn get(&self, cluster: ClusterId) -> Result<&Balance, MarketError> {
        self.sheets
            .get(cluster.index())
            .ok_or(MarketError::UnknownCluster {
                cluster,
                participants: self.sheets.len(),
            })
    }

    /// Mutable balance of one cluster.
    pub fn get_mut(&mut self, cluster: ClusterId) -> Result<&mut Balance, MarketError> {
        let participants = self.sheets.len();
        self.sheets
            .get_mut(cluster.index())
            .ok_or(MarketError::UnknownCluster {
                cluster,
                participants,
            })
    }

    /// Iterate over `(cluster id, balance)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &Balance)> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(i, b)| (ClusterId::new(i), b))
    }

    /// Transfer a bribe from `sender` to `receiver`.
    ///
    /// Both clusters must have participated and `amount` must be
    /// non-negative. A cluster may pay itself; the two bookings cancel out in
    /// its total balance.
    pub fn make_payment(
        &mut self,
        sender: &Cluster,
        receiver: &Cluster,
        amount: Amount,
    ) -> Result<(), MarketError> {
        let (from, to) = (sender.id(), receiver.id());
        if amount < Amount::ZERO {
            return Err(MarketError::NegativePayment {
                sender: from,
                receiver: to,
                amount,
            });
        }
        for party in [from, to] {
            if !self.get(party)?.participated {
                return Err(MarketError::NotParticipating {
                    sender: from,
                    receiver: to,
                    amount,
                    cluster: party,
                });
            }
        }

        self.get_mut(from)?.paid += amount;
        self.get_mut(to)?.received += amount;
        trace!(sender = %from, receiver = %to, %amount, "Payment booked");
        Ok(())
    }

    /// Charge one period of interest on every balance sheet.
    pub fn accrue_interest(&mut self, interest_rate: Decimal) {
        for sheet in &mut self.sheets {
            sheet.accrue_interest(interest_rate);
        }
    }

    /// Sum of all total balances.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.sheets.iter().map(Balance::total_balance).sum()
    }
}
