//! Commission distribution service
//!
//! Splits sale value between a seller and its upline. Two percentage
//! conventions coexist and must not be merged:
//! - `distribute_by_position`: caller fractions applied to the full sale,
//!   nearest sponsor first, taken as-is.
//! - `record_sale*`: the seller keeps `amount × rate`; the remaining pool is
//!   split across all uplines root first, with shares normalized to 1.

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{DomainError, Hierarchy, MemberStatus};

/// Weighting of the automatic upline split.
///
/// For `k` uplines the member at root-first position `i` gets weight
/// `(k - i)^exponent`; weights are normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingPolicy {
    pub exponent: f64,
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self { exponent: 0.5 }
    }
}

impl WeightingPolicy {
    pub fn new(exponent: f64) -> Self {
        Self { exponent }
    }

    /// Normalized shares for `k` uplines, farthest ancestor first.
    pub fn root_first_shares(&self, k: usize) -> Vec<f64> {
        let weights: Vec<f64> = (0..k)
            .map(|i| ((k - i) as f64).powf(self.exponent))
            .collect();
        normalize(&weights)
    }
}

/// Scale `values` so they sum to 1. Empty when the sum is not positive.
fn normalize(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum.is_nan() || sum <= 0.0 {
        return Vec::new();
    }
    values.iter().map(|v| v / sum).collect()
}

/// One upline credit produced by a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub member_id: String,
    pub name: String,
    /// Distance from the seller: 1 = immediate sponsor
    pub level: usize,
    /// Fraction applied (of the sale or of the pool, depending on the call)
    pub share: f64,
    pub amount: f64,
}

/// Result of a recorded sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleReceipt {
    pub seller_id: String,
    pub amount: f64,
    pub self_commission: f64,
    /// Pool handed to the upline: `amount × (1 - rate)`
    pub pool: f64,
    /// Credits in the order they were applied (root first)
    pub payouts: Vec<Payout>,
}

impl SaleReceipt {
    pub fn distributed(&self) -> f64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Outcome of a sale attempt. A non-active seller is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SaleOutcome {
    Recorded(SaleReceipt),
    SellerNotActive {
        seller_id: String,
        status: MemberStatus,
    },
}

impl SaleOutcome {
    pub fn receipt(&self) -> Option<&SaleReceipt> {
        match self {
            SaleOutcome::Recorded(receipt) => Some(receipt),
            SaleOutcome::SellerNotActive { .. } => None,
        }
    }
}

/// Computes and applies commissions on a [`Hierarchy`]. Holds no member state.
#[derive(Debug, Clone, Default)]
pub struct CommissionEngine {
    policy: WeightingPolicy,
}

impl CommissionEngine {
    pub fn new(policy: WeightingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WeightingPolicy {
        self.policy
    }

    /// Credit `sale_amount × percentages[i]` to the i-th upline, nearest first.
    ///
    /// Percentages are not normalized; extra entries beyond the upline count
    /// are ignored, and so are uplines beyond the percentage count.
    #[instrument(level = "debug", skip(self, hierarchy))]
    pub fn distribute_by_position(
        &self,
        hierarchy: &mut Hierarchy,
        seller_id: &str,
        sale_amount: f64,
        percentages: &[f64],
    ) -> ApplicationResult<Vec<Payout>> {
        let seller = hierarchy
            .index_of(seller_id)
            .ok_or_else(|| DomainError::MemberNotFound(seller_id.to_string()))?;
        let uplines = hierarchy.upline_indices(seller);

        let mut payouts = Vec::new();
        for (pos, (&up, &pct)) in uplines.iter().zip(percentages).enumerate() {
            let amount = sale_amount * pct;
            if let Some(payout) = credit(hierarchy, up, pos + 1, pct, amount) {
                debug!(
                    "level {} upline {} receives {:.2}",
                    payout.level, payout.member_id, amount
                );
                payouts.push(payout);
            }
        }
        Ok(payouts)
    }

    /// Record a sale and split the remainder with the weighting policy.
    #[instrument(level = "debug", skip(self, hierarchy))]
    pub fn record_sale(
        &self,
        hierarchy: &mut Hierarchy,
        seller_id: &str,
        amount: f64,
    ) -> ApplicationResult<SaleOutcome> {
        let policy = self.policy;
        self.record(hierarchy, seller_id, amount, |k| policy.root_first_shares(k))
    }

    /// Record a sale and split the remainder with caller percentages.
    ///
    /// Percentages are normalized by their own sum and applied root first;
    /// a non-positive sum distributes nothing.
    #[instrument(level = "debug", skip(self, hierarchy))]
    pub fn record_sale_with_percentages(
        &self,
        hierarchy: &mut Hierarchy,
        seller_id: &str,
        amount: f64,
        percentages: &[f64],
    ) -> ApplicationResult<SaleOutcome> {
        self.record(hierarchy, seller_id, amount, |_| normalize(percentages))
    }

    fn record<F>(
        &self,
        hierarchy: &mut Hierarchy,
        seller_id: &str,
        amount: f64,
        root_first_shares: F,
    ) -> ApplicationResult<SaleOutcome>
    where
        F: FnOnce(usize) -> Vec<f64>,
    {
        let seller = hierarchy
            .index_of(seller_id)
            .ok_or_else(|| DomainError::MemberNotFound(seller_id.to_string()))?;

        let Some(member) = hierarchy.get_mut(seller) else {
            return Err(DomainError::MemberNotFound(seller_id.to_string()).into());
        };
        if !member.is_active() {
            warn!(
                "cannot record sale: seller {} is {}",
                seller_id,
                member.status()
            );
            return Ok(SaleOutcome::SellerNotActive {
                seller_id: seller_id.to_string(),
                status: member.status(),
            });
        }

        let rate = member.commission_rate();
        let self_commission = amount * rate;
        member.add_own_sales(amount);
        member.credit(self_commission);
        info!(
            "seller {} receives own commission {:.2} ({:.2}%)",
            seller_id,
            self_commission,
            rate * 100.0
        );

        let uplines = hierarchy.upline_indices(seller);
        let pool = amount * (1.0 - rate);
        let mut payouts = Vec::new();
        if !uplines.is_empty() {
            let k = uplines.len();
            let shares = root_first_shares(k);
            for (pos, &share) in shares.iter().enumerate().take(k) {
                // uplines are nearest first; position 0 of the shares is the farthest
                let level = k - pos;
                let up = uplines[level - 1];
                if let Some(payout) = credit(hierarchy, up, level, share, pool * share) {
                    debug!(
                        "upline {} (level {}) receives {:.2}",
                        payout.member_id, level, payout.amount
                    );
                    payouts.push(payout);
                }
            }
        }

        Ok(SaleOutcome::Recorded(SaleReceipt {
            seller_id: seller_id.to_string(),
            amount,
            self_commission,
            pool,
            payouts,
        }))
    }
}

fn credit(
    hierarchy: &mut Hierarchy,
    idx: Index,
    level: usize,
    share: f64,
    amount: f64,
) -> Option<Payout> {
    let member = hierarchy.get_mut(idx)?;
    member.credit(amount);
    Some(Payout {
        member_id: member.id().to_string(),
        name: member.name().to_string(),
        level,
        share,
        amount,
    })
}
