//! Linear demand and profit for the repeated pricing game.

/// Demand faced by a firm charging `own_price` when the other firms charge
/// `rest_mean` on average: `1 - p + (1 / (n (n - 1))) * rest_mean * n`.
///
/// `n_firms` must be at least two; this is checked when the simulation is
/// configured.
pub fn demand(own_price: f64, rest_mean: f64, n_firms: usize) -> f64 {
    debug_assert!(n_firms >= 2, "demand requires at least two firms");
    let n = n_firms as f64;
    1.0 - own_price + ((1.0 / n) / (n - 1.0)) * rest_mean * n
}

pub fn profit(own_price: f64, demand: f64) -> f64 {
    own_price * demand
}

/// Mean price over every firm in `row` except `firm`.
pub fn rest_of_market_mean(row: &[f64], firm: usize) -> f64 {
    let (sum, count) = row
        .iter()
        .enumerate()
        .filter(|(id, _)| *id != firm)
        .fold((0.0, 0usize), |(sum, count), (_, p)| (sum + p, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::agent_state::linspace;
    use float_eq::assert_float_eq;

    #[test]
    fn test_demand_duopoly() {
        // With two firms the rival's price enters one for one.
        assert_float_eq!(demand(0.5, 0.5, 2), 1.0, abs <= 1e-12);
        assert_float_eq!(demand(1.0, 0.0, 2), 0.0, abs <= 1e-12);
        assert_float_eq!(demand(0.2, 0.8, 2), 1.6, abs <= 1e-12);
    }

    #[test]
    fn test_demand_oligopoly() {
        // (1 / (n (n - 1))) * rest * n == rest / (n - 1)
        assert_float_eq!(demand(0.4, 0.6, 4), 1.0 - 0.4 + 0.6 / 3.0, abs <= 1e-12);
    }

    #[test]
    fn test_profit_is_price_times_demand() {
        for n in 2..6 {
            for p in linspace(0.0, 1.0, 21) {
                for r in linspace(0.0, 1.0, 11) {
                    let d = demand(p, r, n);
                    assert_eq!(profit(p, d), p * d);
                }
            }
        }
    }

    #[test]
    fn test_rest_of_market_mean() {
        let row = [0.2, 0.4, 0.9];
        assert_float_eq!(rest_of_market_mean(&row, 0), 0.65, abs <= 1e-12);
        assert_float_eq!(rest_of_market_mean(&row, 2), 0.3, abs <= 1e-12);
        assert_eq!(rest_of_market_mean(&[0.7], 0), 0.0);
    }
}
