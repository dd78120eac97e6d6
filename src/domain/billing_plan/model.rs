//! Billing plan domain entity

/// Price list applied to completed sessions
#[derive(Debug, Clone)]
pub struct BillingPlan {
    pub id: i32,
    pub name: String,
    /// Price per kWh (in smallest currency unit)
    pub price_per_kwh: i64,
    /// Price per minute (in smallest currency unit)
    pub price_per_minute: i64,
    pub is_active: bool,
}

impl BillingPlan {
    /// Cost of a session: energy component plus time component, rounded.
    pub fn calculate_cost(&self, energy_kwh: f64, duration_min: f64) -> i64 {
        let cost = energy_kwh * self.price_per_kwh as f64
            + duration_min * self.price_per_minute as f64;
        cost.round().max(0.0) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_combines_energy_and_time() {
        let plan = BillingPlan {
            id: 1,
            name: "Standard".into(),
            price_per_kwh: 3_500,
            price_per_minute: 100,
            is_active: true,
        };
        // 10 kWh * 3500 + 30 min * 100
        assert_eq!(plan.calculate_cost(10.0, 30.0), 38_000);
    }

    #[test]
    fn cost_is_rounded() {
        let plan = BillingPlan {
            id: 1,
            name: "Energy only".into(),
            price_per_kwh: 3_000,
            price_per_minute: 0,
            is_active: true,
        };
        assert_eq!(plan.calculate_cost(0.0367, 0.1), 110);
    }
}
