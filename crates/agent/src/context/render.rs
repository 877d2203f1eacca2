//! Text rendering of the rolling windows for prompt construction.

use bertrand_core::agent::{MarketObservation, ReasoningEntry};

pub const NO_HISTORY: &str =
    "No historical data available yet. This is the beginning of the market.";

pub const NO_REASONING: &str = "No previous reasoning available. This is your first decision.";

const HISTORY_HEADER: &str =
    "Period | Your Price | Your Sales | Your Profit | Market Share | Competitor Price";

/// Render the market window as a table, one row per period, oldest first.
///
/// Market share is stored as a fraction and shown as a percentage.
pub fn render_history(history: &[MarketObservation]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }

    let mut out = String::with_capacity(96 * (history.len() + 2));
    out.push_str(HISTORY_HEADER);
    out.push('\n');
    out.push_str(&"-".repeat(HISTORY_HEADER.len()));

    for row in history {
        out.push('\n');
        out.push_str(&format!(
            "{:>6} | ${:>9.2} | {:>10.2} | ${:>10.2} | {:>11.2}% | ${:>15.2}",
            row.period,
            row.own_price,
            row.own_sales,
            row.own_profit,
            row.market_share * 100.0,
            row.competitor_price,
        ));
    }
    out
}

/// Render reasoning traces as `[Period t]` blocks, oldest first.
pub fn render_reasoning(reasoning: &[ReasoningEntry]) -> String {
    if reasoning.is_empty() {
        return NO_REASONING.to_string();
    }

    let separator = format!("\n\n{}\n\n", "=".repeat(80));
    reasoning
        .iter()
        .map(|entry| format!("[Period {}]\n{}", entry.period, entry.reasoning))
        .collect::<Vec<_>>()
        .join(&separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(period: u64) -> MarketObservation {
        MarketObservation {
            period,
            own_price: 1.8,
            own_sales: 38.456,
            own_profit: 30.7648,
            market_share: 0.5123,
            competitor_price: 1.75,
            competitor_share: 0.4877,
        }
    }

    #[test]
    fn table_has_header_rule_and_rows() {
        let text = render_history(&[observation(3), observation(4)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HISTORY_HEADER);
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].contains("$     1.80"));
        assert!(lines[2].contains("38.46"));
        assert!(lines[2].contains("51.23%"));
        assert!(lines[2].contains("1.75"));
    }

    #[test]
    fn table_never_shows_competitor_share_or_profit_columns() {
        let text = render_history(&[observation(0)]);
        assert!(!text.contains("48.77"));
        assert!(!text.to_lowercase().contains("competitor profit"));
    }

    #[test]
    fn reasoning_blocks_in_order() {
        let text = render_reasoning(&[
            ReasoningEntry {
                period: 7,
                reasoning: "hold".into(),
            },
            ReasoningEntry {
                period: 8,
                reasoning: "undercut slightly".into(),
            },
        ]);
        let first = text.find("[Period 7]\nhold").unwrap();
        let second = text.find("[Period 8]\nundercut slightly").unwrap();
        assert!(first < second);
        assert!(text.contains(&"=".repeat(80)));
    }

    #[test]
    fn single_reasoning_block_has_no_separator() {
        let text = render_reasoning(&[ReasoningEntry {
            period: 0,
            reasoning: "Initial random pricing.".into(),
        }]);
        assert_eq!(text, "[Period 0]\nInitial random pricing.");
    }

    #[test]
    fn placeholders_for_empty_windows() {
        assert_eq!(render_history(&[]), NO_HISTORY);
        assert_eq!(render_reasoning(&[]), NO_REASONING);
    }
}
