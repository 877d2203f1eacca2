//! Logit Bertrand market model.
//!
//! Two firms sell differentiated products; consumers choose between them and
//! an outside (no-purchase) option according to a multinomial logit:
//!
//! ```text
//! u_i = (g - p_i) / μ
//! d_i = β · e^{u_i} / (e^{u_0} + e^{u_1} + 1)
//! π_i = (p_i - c_i) · d_i
//! share_i = d_i / (d_0 + d_1)
//! ```
//!
//! Market share is conditional on purchase; the no-purchase mass is reported
//! separately as [`MarketOutcome::outside_share`].

use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// Nash equilibrium price for the reference parameters.
pub const NASH_PRICE: f64 = 1.68;
/// Per-firm profit at the Nash equilibrium for the reference parameters.
pub const NASH_PROFIT: f64 = 27.7;
/// Joint-profit-maximizing (monopoly) price for the reference parameters.
pub const MONOPOLY_PRICE: f64 = 2.07;
/// Per-firm profit at the monopoly price for the reference parameters.
pub const MONOPOLY_PROFIT: f64 = 33.5;

/// Position of (π − π_Nash) between the Nash and monopoly benchmarks.
///
/// 0 is competitive, 1 is full collusion. Values outside [0, 1] are possible.
pub fn collusion_index(profit: f64) -> f64 {
    (profit - NASH_PROFIT) / (MONOPOLY_PROFIT - NASH_PROFIT)
}

/// One of the two competing firms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FirmId {
    #[serde(rename = "firm_0")]
    Firm0,
    #[serde(rename = "firm_1")]
    Firm1,
}

impl FirmId {
    pub const ALL: [FirmId; 2] = [FirmId::Firm0, FirmId::Firm1];

    pub fn index(self) -> usize {
        match self {
            FirmId::Firm0 => 0,
            FirmId::Firm1 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(FirmId::Firm0),
            1 => Some(FirmId::Firm1),
            _ => None,
        }
    }

    /// The other firm in the duopoly.
    pub fn competitor(self) -> Self {
        match self {
            FirmId::Firm0 => FirmId::Firm1,
            FirmId::Firm1 => FirmId::Firm0,
        }
    }
}

impl std::fmt::Display for FirmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "firm_{}", self.index())
    }
}

/// Fixed economic parameters of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParameters {
    /// Product quality `g`
    pub quality: f64,

    /// Substitutability `μ` (> 0); smaller means closer substitutes
    pub substitutability: f64,

    /// Consumer mass `β`
    pub beta: f64,

    /// Marginal cost `c_i` per firm, indexed by [`FirmId::index`]
    pub marginal_costs: [f64; 2],

    /// Lowest acceptable price
    pub min_price: f64,

    /// Highest acceptable price
    pub max_price: f64,
}

impl Default for MarketParameters {
    fn default() -> Self {
        Self {
            quality: 2.0,
            substitutability: 0.4,
            beta: 100.0,
            marginal_costs: [1.0, 1.0],
            min_price: 1.40,
            max_price: 2.20,
        }
    }
}

impl MarketParameters {
    pub fn marginal_cost(&self, firm: FirmId) -> f64 {
        self.marginal_costs[firm.index()]
    }

    /// Check the parameter invariants.
    ///
    /// Marginal cost must lie in `[0, max_price]`: the reference setup prices
    /// the floor above cost, so cost is not required to reach `min_price`.
    pub fn validate(&self) -> Result<(), MarketError> {
        let finite = [
            ("quality", self.quality),
            ("substitutability", self.substitutability),
            ("beta", self.beta),
            ("min_price", self.min_price),
            ("max_price", self.max_price),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(MarketError::InvalidParameter {
                    name,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }

        if self.substitutability <= 0.0 {
            return Err(MarketError::InvalidParameter {
                name: "substitutability",
                reason: format!("must be > 0, got {}", self.substitutability),
            });
        }

        if self.beta <= 0.0 {
            return Err(MarketError::InvalidParameter {
                name: "beta",
                reason: format!("must be > 0, got {}", self.beta),
            });
        }

        if self.min_price >= self.max_price {
            return Err(MarketError::InvalidParameter {
                name: "min_price",
                reason: format!(
                    "must be below max_price ({} >= {})",
                    self.min_price, self.max_price
                ),
            });
        }

        for cost in self.marginal_costs {
            if !cost.is_finite() || cost < 0.0 || cost > self.max_price {
                return Err(MarketError::InvalidParameter {
                    name: "marginal_costs",
                    reason: format!("{cost} is outside [0, {}]", self.max_price),
                });
            }
        }

        Ok(())
    }

    /// Reject a price outside `[min_price, max_price]`. Never clamps.
    pub fn validate_price(&self, firm: FirmId, price: f64) -> Result<(), MarketError> {
        if !price.is_finite() {
            return Err(MarketError::NonFinitePrice { firm, price });
        }
        if price < self.min_price || price > self.max_price {
            return Err(MarketError::PriceOutOfBounds {
                firm,
                price,
                min: self.min_price,
                max: self.max_price,
            });
        }
        Ok(())
    }
}

/// Demand, profit and share of one firm in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmOutcome {
    pub price: f64,
    pub demand: f64,
    pub profit: f64,
    /// Fraction of purchasing consumers, in [0, 1]
    pub market_share: f64,
}

/// Result of one market clearing, before it is stamped with a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketOutcome {
    pub firm_0: FirmOutcome,
    pub firm_1: FirmOutcome,
    /// Fraction of the consumer mass choosing not to buy
    pub outside_share: f64,
}

impl MarketOutcome {
    pub fn firm(&self, firm: FirmId) -> &FirmOutcome {
        match firm {
            FirmId::Firm0 => &self.firm_0,
            FirmId::Firm1 => &self.firm_1,
        }
    }
}

/// Outcome of one period: the canonical, unmasked record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodOutcome {
    pub period: u64,
    #[serde(flatten)]
    pub market: MarketOutcome,
}

impl PeriodOutcome {
    pub fn new(period: u64, market: MarketOutcome) -> Self {
        Self { period, market }
    }

    pub fn firm(&self, firm: FirmId) -> &FirmOutcome {
        self.market.firm(firm)
    }

    pub fn prices(&self) -> [f64; 2] {
        [self.market.firm_0.price, self.market.firm_1.price]
    }
}

/// Clear the market for a price pair indexed by [`FirmId::index`].
///
/// Exponents are shifted by their maximum (including the outside option's
/// zero) before exponentiating, so large `(g - p)/μ` cannot overflow.
pub fn compute_outcomes(
    prices: [f64; 2],
    params: &MarketParameters,
) -> Result<MarketOutcome, MarketError> {
    params.validate()?;
    for firm in FirmId::ALL {
        params.validate_price(firm, prices[firm.index()])?;
    }

    let utility = prices.map(|p| (params.quality - p) / params.substitutability);

    let shift = utility[0].max(utility[1]).max(0.0);
    let weights = utility.map(|u| (u - shift).exp());
    let outside_weight = (-shift).exp();
    let denominator = weights[0] + weights[1] + outside_weight;

    // Purchase-conditional shares use their own shift so that both firm
    // weights cannot underflow together.
    let firm_shift = utility[0].max(utility[1]);
    let share_weights = utility.map(|u| (u - firm_shift).exp());
    let share_total = share_weights[0] + share_weights[1];

    let mut firms = [FirmOutcome {
        price: 0.0,
        demand: 0.0,
        profit: 0.0,
        market_share: 0.0,
    }; 2];

    for firm in FirmId::ALL {
        let i = firm.index();
        let price = prices[i];
        let demand = params.beta * weights[i] / denominator;
        let profit = (price - params.marginal_cost(firm)) * demand;
        let market_share = share_weights[i] / share_total;

        if !demand.is_finite() || !profit.is_finite() || !market_share.is_finite() {
            return Err(MarketError::NonFiniteOutcome { firm });
        }

        firms[i] = FirmOutcome {
            price,
            demand,
            profit,
            market_share,
        };
    }

    Ok(MarketOutcome {
        firm_0: firms[0],
        firm_1: firms[1],
        outside_share: outside_weight / denominator,
    })
}
