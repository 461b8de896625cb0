use crate::device::{FrenchDrain, Soakwell, SoilParameters};
use crate::error::Result;
use crate::extension::{self, EmptyingTime, ExtensionOptions};
use crate::french_drain::{self, FrenchDrainPerformance, FrenchDrainResult};
use crate::mass_balance::{self, MassBalanceRecord};
use crate::scaling;
use crate::simulation::SimulationResult;
use crate::storm::StormScenario;

/// Outcome of one soakwell design under one storm.
#[derive(Debug, Clone, PartialEq)]
pub struct SoakwellAnalysis {
    pub storm: String,
    pub result: SimulationResult,
    pub mass_balance: MassBalanceRecord,
    pub emptying_time: EmptyingTime,
}

/// Simulates `units` identical soakwells through the storm and the
/// draining period after it, then audits the run.
pub fn analyze_soakwell(
    storm: &StormScenario,
    unit: &Soakwell,
    soil: &SoilParameters,
    units: usize,
    options: &ExtensionOptions,
) -> Result<SoakwellAnalysis> {
    let result = scaling::simulate_units(&storm.hydrograph, unit, soil, units, options)?;
    let mass_balance = mass_balance::audit(&result);
    let emptying_time = extension::emptying_time(&result);
    Ok(SoakwellAnalysis {
        storm: storm.name.clone(),
        result,
        mass_balance,
        emptying_time,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrenchDrainAnalysis {
    pub storm: String,
    pub result: FrenchDrainResult,
    pub mass_balance: MassBalanceRecord,
    pub performance: FrenchDrainPerformance,
}

pub fn analyze_french_drain(
    storm: &StormScenario,
    drain: &FrenchDrain,
    soil: &SoilParameters,
    options: &ExtensionOptions,
) -> Result<FrenchDrainAnalysis> {
    let extended = extension::extend(&storm.hydrograph, options);
    let result = french_drain::simulate(&extended, drain, soil)?;
    Ok(FrenchDrainAnalysis {
        storm: storm.name.clone(),
        mass_balance: result.mass_balance(),
        performance: result.performance(),
        result,
    })
}
