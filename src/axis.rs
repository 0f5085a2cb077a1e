//! Physical-quantity descriptors for table axes.
//!
//! Raw samples are converted to physical values as
//! `physical = raw * scale + offset`. Only temperature carries an offset
//! (stored values are tenths of a Kelvin).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical quantities a table axis or data block can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    EngineSpeed,
    ThrottlePosition,
    BoostPressure,
    AtmosphericPressure,
    Torque,
    InjectionQuantity,
    Temperature,
    CrankAngle,
    MeasuredAirflow,
    MeasuredPressure,
    PwmDuty,
    InjectionStart,
    InjectionDuration,
    BipResolution,
    TargetLambda,
    BatteryVoltage,
    /// No known meaning, maps to the neutral descriptor
    Unspecified,
}

impl Quantity {
    /// Every quantity with a registry entry.
    pub const ALL: [Quantity; 16] = [
        Quantity::EngineSpeed,
        Quantity::ThrottlePosition,
        Quantity::BoostPressure,
        Quantity::AtmosphericPressure,
        Quantity::Torque,
        Quantity::InjectionQuantity,
        Quantity::Temperature,
        Quantity::CrankAngle,
        Quantity::MeasuredAirflow,
        Quantity::MeasuredPressure,
        Quantity::PwmDuty,
        Quantity::InjectionStart,
        Quantity::InjectionDuration,
        Quantity::BipResolution,
        Quantity::TargetLambda,
        Quantity::BatteryVoltage,
    ];

    /// Look up the descriptor for this quantity.
    pub fn describe(self) -> AxisDescriptor {
        describe(self)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::EngineSpeed => "rpm",
            Quantity::ThrottlePosition => "pedal",
            Quantity::BoostPressure => "boost",
            Quantity::AtmosphericPressure => "atm",
            Quantity::Torque => "torque",
            Quantity::InjectionQuantity => "iq",
            Quantity::Temperature => "temperature",
            Quantity::CrankAngle => "angle",
            Quantity::MeasuredAirflow => "maf",
            Quantity::MeasuredPressure => "map",
            Quantity::PwmDuty => "pwm",
            Quantity::InjectionStart => "soi",
            Quantity::InjectionDuration => "doi",
            Quantity::BipResolution => "bip",
            Quantity::TargetLambda => "lambda",
            Quantity::BatteryVoltage => "battery",
            Quantity::Unspecified => "unspecified",
        };
        write!(f, "{}", name)
    }
}

/// Description, unit and linear conversion of one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    /// Human-readable description
    pub description: String,
    /// Unit string
    pub units: String,
    /// Multiplicative factor from raw sample to physical value
    pub scale: f64,
    /// Additive offset applied after scaling
    pub offset: f64,
}

impl AxisDescriptor {
    /// Create a descriptor without offset.
    pub fn new(description: &str, units: &str, scale: f64) -> Self {
        Self::with_offset(description, units, scale, 0.0)
    }

    /// Create a descriptor with an additive offset.
    pub fn with_offset(description: &str, units: &str, scale: f64, offset: f64) -> Self {
        Self {
            description: description.to_string(),
            units: units.to_string(),
            scale,
            offset,
        }
    }

    /// Empty description and units, identity conversion.
    pub fn neutral() -> Self {
        Self::new("", "", 1.0)
    }

    /// Whether this is the neutral descriptor.
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// Convert a raw sample to its physical value.
    pub fn to_physical(&self, raw: u16) -> f64 {
        f64::from(raw) * self.scale + self.offset
    }

    /// Convert a physical value to the raw sample domain.
    pub fn to_raw(&self, physical: f64) -> f64 {
        (physical - self.offset) / self.scale
    }
}

impl Default for AxisDescriptor {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Look up the registry entry for a quantity.
pub fn describe(quantity: Quantity) -> AxisDescriptor {
    match quantity {
        Quantity::EngineSpeed => AxisDescriptor::new("Engine speed (rpm)", "rpm", 1.0),
        Quantity::ThrottlePosition => AxisDescriptor::new("Throttle  position", "%", 0.01),
        Quantity::BoostPressure => {
            AxisDescriptor::new("Maximum boost pressure(mbar)", "mBar", 1.0)
        }
        Quantity::AtmosphericPressure => {
            AxisDescriptor::new("Atmospheric pressure (mbar)", "mBar", 1.0)
        }
        Quantity::Torque => AxisDescriptor::new("Torque (nM)", "nM", 0.1),
        Quantity::InjectionQuantity => {
            AxisDescriptor::new("Injection Quantity (mg/stroke)", "mg", 0.01)
        }
        Quantity::Temperature => {
            AxisDescriptor::with_offset("Temperature in Celsius Degree", "*C", 0.1, -273.1)
        }
        Quantity::CrankAngle => {
            AxisDescriptor::new("Crankshaft angle (crankshaft degrees)", "*", 0.0234375)
        }
        Quantity::MeasuredAirflow => AxisDescriptor::new("Measured Airflow (mg/s)", "mg/s", 0.1),
        Quantity::MeasuredPressure => {
            AxisDescriptor::new("Measured pressure (mbar)", "mBar", 1.0)
        }
        Quantity::PwmDuty => AxisDescriptor::new("PWM (%)", "%", 0.01),
        Quantity::InjectionStart => {
            AxisDescriptor::new("Start position (degrees BTDC)", "*", 0.0234375)
        }
        Quantity::InjectionDuration => {
            AxisDescriptor::new("Duration (crankshaft degrees)", "*", 0.0234375)
        }
        Quantity::BipResolution => {
            AxisDescriptor::new("Resolution of BIP calculations", "*", 0.000_244_140_6)
        }
        Quantity::TargetLambda => AxisDescriptor::new("Target Lambda (factor)", "", 0.001),
        Quantity::BatteryVoltage => {
            AxisDescriptor::new("Battery Voltage", "Volts", 0.020_314_760_508_3)
        }
        Quantity::Unspecified => AxisDescriptor::neutral(),
    }
}

/// Descriptors for every quantity, built once per run.
#[derive(Debug, Clone)]
pub struct AxisRegistry {
    entries: HashMap<Quantity, AxisDescriptor>,
}

impl AxisRegistry {
    /// Build the registry from [`describe`].
    pub fn new() -> Self {
        let entries = Quantity::ALL
            .into_iter()
            .chain([Quantity::Unspecified])
            .map(|q| (q, describe(q)))
            .collect();
        Self { entries }
    }

    /// Descriptor for a quantity.
    pub fn get(&self, quantity: Quantity) -> &AxisDescriptor {
        &self.entries[&quantity]
    }

    /// A physical value expressed in raw sample units of `quantity`.
    pub fn raw(&self, quantity: Quantity, physical: f64) -> f64 {
        self.get(quantity).to_raw(physical)
    }
}

impl Default for AxisRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_quantity_has_an_entry() {
        for quantity in Quantity::ALL {
            let descriptor = describe(quantity);
            assert!(!descriptor.description.is_empty(), "{quantity}");
            assert!(descriptor.scale > 0.0, "{quantity}");
        }
    }

    #[test]
    fn test_unspecified_is_neutral() {
        let descriptor = describe(Quantity::Unspecified);
        assert!(descriptor.is_neutral());
        assert_eq!(descriptor.scale, 1.0);
        assert_eq!(descriptor.offset, 0.0);
    }

    #[test]
    fn test_only_temperature_has_offset() {
        for quantity in Quantity::ALL {
            let descriptor = describe(quantity);
            if quantity == Quantity::Temperature {
                assert_eq!(descriptor.offset, -273.1);
            } else {
                assert_eq!(descriptor.offset, 0.0, "{quantity}");
            }
        }
    }

    #[test]
    fn test_temperature_conversion() {
        let tmp = describe(Quantity::Temperature);
        // 3731 tenths of a Kelvin
        assert!((tmp.to_physical(3731) - 100.0).abs() < 1e-6);
        assert!((tmp.to_raw(130.0) - 4031.0).abs() < 1e-6);
    }

    #[test]
    fn test_registry_matches_describe() {
        let registry = AxisRegistry::new();
        for quantity in Quantity::ALL {
            assert_eq!(registry.get(quantity), &describe(quantity));
        }
        assert!(registry.get(Quantity::Unspecified).is_neutral());
        assert!((registry.raw(Quantity::InjectionQuantity, 90.0) - 9000.0).abs() < 1e-6);
    }

    #[test]
    fn test_angle_scale() {
        let soi = describe(Quantity::InjectionStart);
        assert_eq!(soi.to_physical(128), 3.0);
    }
}
