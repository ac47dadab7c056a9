//! Profit distribution model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{fresh_id, Document};

/// Payment state of one partner's share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

/// One partner's cut of a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionShare {
    /// Identifier within the distribution (the partner name)
    pub id: String,
    pub name: String,
    /// Share of total profit, 0..=100
    pub percentage: f64,
    /// Amount owed for this distribution
    pub amount: f64,
    pub status: PayoutStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
}

impl DistributionShare {
    /// Update the payment state; `paid_date` is stamped only when fully paid.
    pub fn set_status(&mut self, status: PayoutStatus, now: DateTime<Utc>) {
        self.status = status;
        self.paid_date = match status {
            PayoutStatus::Paid => Some(now),
            PayoutStatus::Pending | PayoutStatus::Partial => None,
        };
    }
}

/// A snapshot of profit split between partners for a period.
///
/// The partner list and percentages are configuration supplied by the
/// caller, not business logic owned here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitDistribution {
    /// Unique identifier
    pub id: String,
    /// When the distribution was created
    pub date: DateTime<Utc>,
    /// Human-readable period label, e.g. "March 2024"
    pub period: String,
    pub total_profit: f64,
    pub items: Vec<DistributionShare>,
}

impl ProfitDistribution {
    /// Split `total_profit` across `(name, percentage)` partner pairs.
    #[must_use]
    pub fn new(
        period: impl Into<String>,
        total_profit: f64,
        partners: &[(String, f64)],
        now: DateTime<Utc>,
    ) -> Self {
        let items = partners
            .iter()
            .map(|(name, percentage)| DistributionShare {
                id: name.clone(),
                name: name.clone(),
                percentage: *percentage,
                amount: total_profit * percentage / 100.0,
                status: PayoutStatus::Pending,
                paid_date: None,
            })
            .collect();

        Self {
            id: fresh_id(),
            date: now,
            period: period.into(),
            total_profit,
            items,
        }
    }
}

impl Document for ProfitDistribution {
    const COLLECTION: &'static str = "profit_distributions";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
