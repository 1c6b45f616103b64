//! Library of literature formation/dissociation rate constants for the
//! competing iron(III) ligands, plus the FeEDTA reference constants.
//!
//! Rates for enterobactin, ferrichrome and desferrioxamine B are taken from
//! Witter et al. (2000) and Boiteau et al. (2022); treat them as opaque
//! calibration data. Units: kf in 1/(M*hr), kd in 1/hr.

use crate::OdeSolvers::BDF_solver::SolverError;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use tabled::{Table, Tabled};
use thiserror::Error;

/// FeEDTA formation rate constant [1/(M*hr)]
pub const KF_EDTA: f64 = 7.2e4;
/// FeEDTA dissociation rate constant [1/hr]
pub const KD_EDTA: f64 = 3.6e-3;
/// Initial FeEDTA concentration [mol/L]
pub const FE_EDTA0: f64 = 100.0e-9;

/// error types for the chelation model
#[derive(Debug, Error)]
pub enum ChelationError {
    #[error("unrecognized ligand selector {0}: expected an integer between 1 and 5")]
    InvalidSelector(u32),
    #[error("invalid dose '{0}': expected a non-negative number in nmol/L")]
    InvalidDose(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("integration failed: {0}")]
    IntegrationFailure(#[from] SolverError),
    #[error("no trajectory available: call solve() first")]
    NotSolved,
}

/// Formation/dissociation rate constant pair for one ligand/source choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateConstants {
    /// formation rate [1/(M*hr)]
    pub kf: f64,
    /// dissociation rate [1/hr]
    pub kd: f64,
}

/// Enumeration of the competing ligand / literature source combinations.
///
/// Ferrichrome and desferrioxamine B appear twice: the two entries share the
/// formation rate but carry the dissociation rate of different sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Serialize, Deserialize)]
pub enum LigandId {
    Enterobactin,
    FerrichromeWitter,
    DesferrioxamineBWitter,
    FerrichromeBoiteau,
    DesferrioxamineBBoiteau,
}

impl LigandId {
    /// Maps the interactive selector (1-5) to a ligand.
    ///
    /// Any other value is an explicit [`ChelationError::InvalidSelector`];
    /// there is no default and no silent fallback.
    pub fn from_selector(selector: u32) -> Result<Self, ChelationError> {
        match selector {
            1 => Ok(LigandId::Enterobactin),
            2 => Ok(LigandId::FerrichromeWitter),
            3 => Ok(LigandId::DesferrioxamineBWitter),
            4 => Ok(LigandId::FerrichromeBoiteau),
            5 => Ok(LigandId::DesferrioxamineBBoiteau),
            other => Err(ChelationError::InvalidSelector(other)),
        }
    }

    pub fn selector(&self) -> u32 {
        match self {
            LigandId::Enterobactin => 1,
            LigandId::FerrichromeWitter => 2,
            LigandId::DesferrioxamineBWitter => 3,
            LigandId::FerrichromeBoiteau => 4,
            LigandId::DesferrioxamineBBoiteau => 5,
        }
    }

    pub fn rate_constants(&self) -> RateConstants {
        match self {
            LigandId::Enterobactin => RateConstants {
                kf: 3.6e9,
                kd: 5.7e-2,
            },
            LigandId::FerrichromeWitter => RateConstants {
                kf: 1.7e9,
                kd: 1.8e-4,
            },
            LigandId::DesferrioxamineBWitter => RateConstants {
                kf: 7.1e9,
                kd: 5.4e-3,
            },
            LigandId::FerrichromeBoiteau => RateConstants {
                kf: 1.7e9,
                kd: 3.6e-4,
            },
            LigandId::DesferrioxamineBBoiteau => RateConstants {
                kf: 7.1e9,
                kd: 1.3e-4,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LigandId::Enterobactin => "Enterobactin",
            LigandId::FerrichromeWitter => "Ferrichrome (Witter)",
            LigandId::DesferrioxamineBWitter => "Desferrioxamine B (Witter)",
            LigandId::FerrichromeBoiteau => "Ferrichrome (Boiteau)",
            LigandId::DesferrioxamineBBoiteau => "Desferrioxamine B (Boiteau)",
        }
    }

    pub fn pretty_print() {
        #[derive(Tabled)]
        struct LigandRow {
            selector: u32,
            ligand: &'static str,
            #[tabled(rename = "kf [1/(M*hr)]")]
            kf: String,
            #[tabled(rename = "kd [1/hr]")]
            kd: String,
        }

        let data: Vec<LigandRow> = LigandId::iter()
            .map(|lig| {
                let rc = lig.rate_constants();
                LigandRow {
                    selector: lig.selector(),
                    ligand: lig.label(),
                    kf: format!("{:.1e}", rc.kf),
                    kd: format!("{:.1e}", rc.kd),
                }
            })
            .collect();

        let mut binding = Table::new(data);
        let table = binding.with(tabled::settings::Style::rounded());
        println!("{}", table);
    }
}

/// Parses a user-supplied dose in nmol/L and converts it to mol/L.
///
/// Rejects anything that is not a finite non-negative real with
/// [`ChelationError::InvalidDose`].
pub fn dose_from_nanomolar(input: &str) -> Result<f64, ChelationError> {
    let trimmed = input.trim();
    let dose: f64 = trimmed
        .parse()
        .map_err(|_| ChelationError::InvalidDose(trimmed.to_string()))?;
    if !dose.is_finite() || dose < 0.0 {
        return Err(ChelationError::InvalidDose(trimmed.to_string()));
    }
    Ok(dose * 1.0e-9)
}

/////////////////////////////////////////TESTS/////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn all_selectors_resolve_to_positive_constants() {
        for selector in 1..=5u32 {
            let ligand = LigandId::from_selector(selector).unwrap();
            let rc = ligand.rate_constants();
            assert!(rc.kf > 0.0, "kf must be positive for {:?}", ligand);
            assert!(rc.kd > 0.0, "kd must be positive for {:?}", ligand);
            assert_eq!(ligand.selector(), selector);
            assert!(!ligand.label().is_empty());
        }
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        for selector in [0u32, 6, 7, 100] {
            let result = LigandId::from_selector(selector);
            assert!(matches!(
                result,
                Err(ChelationError::InvalidSelector(s)) if s == selector
            ));
        }
    }

    #[test]
    fn shared_formation_rates_between_sources() {
        // the two sources differ only in the dissociation rate
        assert_eq!(
            LigandId::FerrichromeWitter.rate_constants().kf,
            LigandId::FerrichromeBoiteau.rate_constants().kf
        );
        assert_eq!(
            LigandId::DesferrioxamineBWitter.rate_constants().kf,
            LigandId::DesferrioxamineBBoiteau.rate_constants().kf
        );
        assert_ne!(
            LigandId::FerrichromeWitter.rate_constants().kd,
            LigandId::FerrichromeBoiteau.rate_constants().kd
        );
    }

    #[test]
    fn enterobactin_literature_values() {
        let rc = LigandId::Enterobactin.rate_constants();
        assert_eq!(rc.kf, 3.6e9);
        assert_eq!(rc.kd, 5.7e-2);
    }

    #[test]
    fn dose_parsing_and_conversion() {
        // the conversion is a product, so it can land one ulp away from
        // the decimal literal; compare with a relative bound
        assert_relative_eq!(
            dose_from_nanomolar("50").unwrap(),
            50.0e-9,
            max_relative = 1e-15
        );
        assert_eq!(dose_from_nanomolar(" 0 \n").unwrap(), 0.0);
        assert_relative_eq!(
            dose_from_nanomolar("2.5").unwrap(),
            2.5e-9,
            max_relative = 1e-15
        );

        for bad in ["", "abc", "-1.0", "nan", "inf"] {
            assert!(
                matches!(dose_from_nanomolar(bad), Err(ChelationError::InvalidDose(_))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn iteration_covers_all_five_ligands() {
        let selectors: Vec<u32> = LigandId::iter().map(|l| l.selector()).collect();
        assert_eq!(selectors, vec![1, 2, 3, 4, 5]);
    }
}
