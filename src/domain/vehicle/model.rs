//! Vehicle domain entity

/// Electric vehicle registered by a driver
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    /// Usable battery capacity in kWh
    pub battery_capacity_kwh: f64,
    /// Maximum power the vehicle accepts in kW
    pub max_charging_power_kw: f64,
    /// Last known state of charge (%)
    pub current_soc_percent: i32,
}

impl Vehicle {
    /// Power actually delivered on a point with the given rating.
    pub fn effective_power_kw(&self, point_rated_kw: f64) -> f64 {
        point_rated_kw.min(self.max_charging_power_kw)
    }

    /// Energy (kWh) needed to go from `from_soc` to `to_soc`.
    pub fn energy_between(&self, from_soc: f64, to_soc: f64) -> f64 {
        ((to_soc - from_soc).max(0.0) / 100.0) * self.battery_capacity_kwh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car() -> Vehicle {
        Vehicle {
            id: 1,
            owner_id: 1,
            name: "Test".into(),
            battery_capacity_kwh: 60.0,
            max_charging_power_kw: 50.0,
            current_soc_percent: 40,
        }
    }

    #[test]
    fn effective_power_is_the_lower_rating() {
        let v = car();
        assert_eq!(v.effective_power_kw(150.0), 50.0);
        assert_eq!(v.effective_power_kw(22.0), 22.0);
    }

    #[test]
    fn energy_between_soc_levels() {
        let v = car();
        assert!((v.energy_between(40.0, 80.0) - 24.0).abs() < 1e-9);
        assert_eq!(v.energy_between(80.0, 40.0), 0.0);
    }
}
