use crate::errors::UnitConversionError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub const KWH_PER_THERM: f64 = 29.3001111;
pub const DAYS_PER_NORMAL_YEAR: u32 = 365;

/// Canonical label used for all cross-fuel aggregation output.
pub const CANONICAL_UNIT_LABEL: &str = "KWH";

/// Declared unit of an energy trace. All derivatives are reconciled to
/// kilowatt-hours (kWh-equivalent for non-electric fuels) before aggregation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyUnit {
    KilowattHour,
    Therm,
}

impl EnergyUnit {
    /// Multiplier taking a value in this unit to kWh.
    pub fn factor_to_kwh(&self) -> f64 {
        match self {
            EnergyUnit::KilowattHour => 1.0,
            EnergyUnit::Therm => KWH_PER_THERM,
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = UnitConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KWH" | "KILOWATT_HOUR" | "KILOWATT HOUR" => Ok(EnergyUnit::KilowattHour),
            "THM" | "THERM" => Ok(EnergyUnit::Therm),
            _ => Err(UnitConversionError {
                unit: s.to_string(),
            }),
        }
    }
}

impl Display for EnergyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnergyUnit::KilowattHour => write!(f, "KWH"),
            EnergyUnit::Therm => write!(f, "THERM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("kWh", EnergyUnit::KilowattHour)]
    #[case("KWH", EnergyUnit::KilowattHour)]
    #[case("therm", EnergyUnit::Therm)]
    #[case("THM", EnergyUnit::Therm)]
    fn should_parse_recognized_units(#[case] input: &str, #[case] expected: EnergyUnit) {
        assert_eq!(input.parse::<EnergyUnit>().unwrap(), expected);
    }

    #[rstest]
    fn should_reject_unrecognized_unit() {
        let err = "BTU_PER_FORTNIGHT".parse::<EnergyUnit>().unwrap_err();
        assert_eq!(err.unit, "BTU_PER_FORTNIGHT");
    }

    #[rstest]
    fn should_convert_therms_to_kwh_equivalent() {
        assert_eq!(EnergyUnit::Therm.factor_to_kwh(), KWH_PER_THERM);
        assert_eq!(EnergyUnit::KilowattHour.factor_to_kwh(), 1.0);
    }
}
