//! The ordered classification rule table.
//!
//! Rules are evaluated top to bottom and the first rule whose shape (and
//! guard, when present) matches claims the symbol. A claiming rule then
//! checks its gate: when the gate fails the symbol stays generic and no
//! later rule is consulted. Several rules share shapes, so the order below
//! is part of the observable behavior.

use std::fmt;

use serde::Serialize;

use crate::axis::{AxisRegistry, Quantity, Quantity::*};
use crate::heuristics::sampling::{self, Plane};
use crate::types::{Shape, Symbol, SymbolCollection};

/// Identity assigned by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    /// Torque limit over rpm and atmospheric pressure
    TorqueLimiter,
    /// Requested torque over pedal position
    DriverWish,
    /// Torque to injection quantity conversion
    IqToTorque,
    /// Boost ceiling over atmospheric pressure
    BoostLimit,
    /// Target boost over injection quantity
    TurboBoost,
    /// Smoke limiter by target lambda
    IqLimitByLambda,
    /// Smoke limiter by airflow
    IqLimitByMaf,
    /// Injection limit by manifold pressure
    IqLimitByMap,
    /// Injection duration in crank degrees
    InjectorDuration,
    /// Boost control valve duty
    N75,
    /// Exhaust gas recirculation airflow target
    Egr,
    /// EGR switching hysteresis
    EgrHysteresis,
    /// Start of injection angle
    StartOfInjection,
    /// Injection quantity during cranking
    StartIq,
    /// BIP correction map
    BipMultipleCorrection,
    /// BIP basic curve
    BipBasicCharacteristic,
}

/// How a rule names the symbols it classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Same name for every match
    Fixed(&'static str),
    /// Prefix plus a two-digit counter per code bank
    Counted(&'static str),
}

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    /// The whole image
    pub data: &'a [u8],
    /// Symbol under test
    pub symbol: &'a Symbol,
    /// Collection the symbol belongs to
    pub symbols: &'a SymbolCollection,
    /// Axis descriptors for unit conversion
    pub registry: &'a AxisRegistry,
}

impl Probe<'_> {
    /// Largest sample of a plane.
    pub fn max(&self, plane: Plane) -> f64 {
        f64::from(sampling::max_value(self.data, self.symbol, plane))
    }

    /// Data block is entirely one value.
    pub fn is_flat(&self) -> bool {
        sampling::is_flat(self.data, self.symbol)
    }

    /// Data block holds something other than a single constant, and not all zero.
    pub fn is_populated(&self) -> bool {
        self.max(Plane::Z) != 0.0 && !self.is_flat()
    }

    /// Steps of a plane, in physical units of `quantity`, lie in `[min, max]`.
    pub fn steps_within(&self, plane: Plane, quantity: Quantity, min: f64, max: f64) -> bool {
        sampling::is_monotonic(
            self.data,
            self.symbol,
            plane,
            self.raw(quantity, min),
            self.raw(quantity, max),
        )
    }

    /// A physical value in raw units.
    pub fn raw(&self, quantity: Quantity, physical: f64) -> f64 {
        self.registry.raw(quantity, physical)
    }
}

/// Predicate over a probe.
pub type Predicate = fn(&Probe<'_>) -> bool;

/// One entry of the rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Identity assigned on success
    pub kind: MapKind,
    /// Shapes the rule claims
    pub shapes: &'static [Shape],
    /// Extra match condition; failing it lets later rules try
    pub guard: Option<Predicate>,
    /// Acceptance condition checked after the rule claimed the symbol
    pub gate: Option<Predicate>,
    /// Category
    pub category: &'static str,
    /// Subcategory
    pub subcategory: &'static str,
    /// Naming scheme
    pub naming: Naming,
    /// X-axis quantity
    pub x: Quantity,
    /// Y-axis quantity
    pub y: Quantity,
    /// Data quantity
    pub z: Quantity,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("shapes", &self.shapes)
            .field("guarded", &self.guard.is_some())
            .field("gated", &self.gate.is_some())
            .field("naming", &self.naming)
            .finish()
    }
}

impl Rule {
    /// Whether this rule claims the symbol.
    pub fn claims(&self, probe: &Probe<'_>) -> bool {
        self.shapes.contains(&probe.symbol.shape()) && self.guard.map_or(true, |g| g(probe))
    }

    /// Whether a claimed symbol passes the gate.
    pub fn accepts(&self, probe: &Probe<'_>) -> bool {
        self.gate.map_or(true, |g| g(probe))
    }
}

const fn shape(cols: usize, rows: usize) -> Shape {
    Shape::new(cols, rows)
}

fn no_wide_torque_limiter(p: &Probe<'_>) -> bool {
    !p.symbols.contains_shape(shape(4, 21))
}

fn boost_limit(p: &Probe<'_>) -> bool {
    let z = p.max(Plane::Z);
    p.is_populated()
        && z < p.raw(MeasuredPressure, 3000.0)
        && z > p.raw(MeasuredPressure, 1930.0)
}

fn turbo_boost(p: &Probe<'_>) -> bool {
    let z = p.max(Plane::Z);
    z < 3000.0 && z > p.raw(MeasuredPressure, 1930.0)
}

fn iq_limit_by_lambda(p: &Probe<'_>) -> bool {
    p.max(Plane::Z) < 3000.0
}

fn iq_limit_by_maf(p: &Probe<'_>) -> bool {
    p.max(Plane::Z) > 3000.0 && p.max(Plane::Y) > 6000.0
}

fn iq_limit_by_map(p: &Probe<'_>) -> bool {
    let y = p.max(Plane::Y);
    p.max(Plane::Z) > p.raw(InjectionQuantity, 30.0)
        && y > p.raw(MeasuredPressure, 1000.0)
        && y < p.raw(MeasuredPressure, 4001.0)
}

fn injector_duration(p: &Probe<'_>) -> bool {
    p.steps_within(Plane::Y, InjectionQuantity, 0.5, 10.0)
        && p.max(Plane::Y) < p.raw(InjectionQuantity, 90.0)
        && p.is_populated()
        && p.max(Plane::Z) > p.raw(InjectionDuration, 10.0)
}

fn egr(p: &Probe<'_>) -> bool {
    p.max(Plane::Z) < p.raw(MeasuredAirflow, 1500.0)
        && p.max(Plane::Y) < p.raw(InjectionQuantity, 50.0)
}

fn start_iq(p: &Probe<'_>) -> bool {
    p.max(Plane::X) < p.raw(Temperature, 130.0) && p.is_populated()
}

fn populated(p: &Probe<'_>) -> bool {
    p.is_populated()
}

/// The rule table, in evaluation order.
pub static RULES: [Rule; 18] = [
    Rule {
        kind: MapKind::TorqueLimiter,
        shapes: &[shape(4, 20)],
        guard: None,
        gate: None,
        category: "Torque",
        subcategory: "Limiters",
        naming: Naming::Fixed("Torque limiter"),
        x: EngineSpeed,
        y: AtmosphericPressure,
        z: Torque,
    },
    Rule {
        kind: MapKind::TorqueLimiter,
        shapes: &[shape(4, 21)],
        guard: None,
        gate: None,
        category: "Torque",
        subcategory: "Limiters",
        naming: Naming::Fixed("Torque limiter"),
        x: EngineSpeed,
        y: AtmosphericPressure,
        z: Torque,
    },
    Rule {
        kind: MapKind::TorqueLimiter,
        shapes: &[shape(3, 21)],
        guard: None,
        gate: Some(no_wide_torque_limiter),
        category: "Torque",
        subcategory: "Limiters",
        naming: Naming::Fixed("Torque limiter"),
        x: EngineSpeed,
        y: AtmosphericPressure,
        z: Torque,
    },
    Rule {
        kind: MapKind::DriverWish,
        shapes: &[shape(16, 8)],
        guard: None,
        gate: None,
        category: "Torque",
        subcategory: "Target torque",
        naming: Naming::Counted("Driver wish"),
        x: ThrottlePosition,
        y: EngineSpeed,
        z: Torque,
    },
    Rule {
        kind: MapKind::IqToTorque,
        shapes: &[shape(15, 16), shape(15, 18)],
        guard: None,
        gate: None,
        category: "Misc",
        subcategory: "Conversions/Linearizations",
        naming: Naming::Fixed("IQ to Torque conversion"),
        x: Torque,
        y: EngineSpeed,
        z: InjectionQuantity,
    },
    Rule {
        kind: MapKind::BoostLimit,
        shapes: &[shape(11, 10), shape(10, 10)],
        guard: None,
        gate: Some(boost_limit),
        category: "Turbo",
        subcategory: "Limiters",
        naming: Naming::Fixed("Boost limit map"),
        x: AtmosphericPressure,
        y: EngineSpeed,
        z: BoostPressure,
    },
    Rule {
        kind: MapKind::TurboBoost,
        shapes: &[shape(16, 10)],
        guard: None,
        gate: Some(turbo_boost),
        category: "Turbo",
        subcategory: "Target Boost",
        naming: Naming::Fixed("Turbo Boost"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: BoostPressure,
    },
    Rule {
        kind: MapKind::IqLimitByLambda,
        shapes: &[shape(16, 13)],
        guard: Some(iq_limit_by_lambda),
        gate: None,
        category: "Fuel",
        subcategory: "Limiters",
        naming: Naming::Fixed("IQ Limit by Lambda"),
        x: MeasuredAirflow,
        y: EngineSpeed,
        z: TargetLambda,
    },
    // x carries the full airflow descriptor, so its units read "mg/s" where
    // older tools printed the injection quantity unit "mg".
    Rule {
        kind: MapKind::IqLimitByMaf,
        shapes: &[shape(16, 13)],
        guard: Some(iq_limit_by_maf),
        gate: None,
        category: "Fuel",
        subcategory: "Limiters",
        naming: Naming::Fixed("IQ Limit by MAF"),
        x: MeasuredAirflow,
        y: EngineSpeed,
        z: InjectionQuantity,
    },
    Rule {
        kind: MapKind::IqLimitByMap,
        shapes: &[shape(16, 12), shape(16, 11)],
        guard: None,
        gate: Some(iq_limit_by_map),
        category: "Fuel",
        subcategory: "Limiters",
        naming: Naming::Fixed("IQ Limit by MAP"),
        x: MeasuredPressure,
        y: EngineSpeed,
        z: InjectionQuantity,
    },
    // 10x10 never reaches this rule: the boost limit rule claims it first.
    Rule {
        kind: MapKind::InjectorDuration,
        shapes: &[shape(10, 10), shape(19, 15)],
        guard: None,
        gate: Some(injector_duration),
        category: "Fuel",
        subcategory: "Injector duration",
        naming: Naming::Counted("Injector duration"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: InjectionDuration,
    },
    // Shadowed by the IQ limit rule for 16x11.
    Rule {
        kind: MapKind::N75,
        shapes: &[shape(16, 11)],
        guard: None,
        gate: None,
        category: "Turbo",
        subcategory: "N75",
        naming: Naming::Fixed("N75"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: PwmDuty,
    },
    Rule {
        kind: MapKind::Egr,
        shapes: &[shape(16, 13), shape(16, 14)],
        guard: None,
        gate: Some(egr),
        category: "Misc",
        subcategory: "EGR",
        naming: Naming::Fixed("EGR"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: MeasuredAirflow,
    },
    Rule {
        kind: MapKind::EgrHysteresis,
        shapes: &[shape(1, 20)],
        guard: None,
        gate: None,
        category: "Misc",
        subcategory: "EGR",
        naming: Naming::Fixed("EGR Hysteresis"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: MeasuredAirflow,
    },
    Rule {
        kind: MapKind::StartOfInjection,
        shapes: &[shape(14, 16)],
        guard: None,
        gate: None,
        category: "Fuel",
        subcategory: "SOI",
        naming: Naming::Fixed("Start of injection (SOI)"),
        x: InjectionQuantity,
        y: EngineSpeed,
        z: InjectionStart,
    },
    Rule {
        kind: MapKind::StartIq,
        shapes: &[shape(9, 9), shape(8, 9)],
        guard: None,
        gate: Some(start_iq),
        category: "Fuel",
        subcategory: "Start IQ",
        naming: Naming::Fixed("Start IQ"),
        x: Temperature,
        y: EngineSpeed,
        z: Torque,
    },
    Rule {
        kind: MapKind::BipMultipleCorrection,
        shapes: &[shape(10, 8)],
        guard: None,
        gate: Some(populated),
        category: "Fuel",
        subcategory: "Corrections",
        naming: Naming::Fixed("BIP Multiple Correction"),
        x: CrankAngle,
        y: EngineSpeed,
        z: BipResolution,
    },
    Rule {
        kind: MapKind::BipBasicCharacteristic,
        shapes: &[shape(1, 10)],
        guard: None,
        gate: None,
        category: "Fuel",
        subcategory: "Corrections",
        naming: Naming::Fixed("BIP Basic Characteristic"),
        x: CrankAngle,
        y: EngineSpeed,
        z: BipResolution,
    },
];
