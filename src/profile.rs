/// Reaction inputs and the three-level energy profile derived from them.
///
/// The profile is a schematic: reactants sit at 0 kJ, the activated complex
/// sits 50 kJ above the larger of the two levels, and the products sit at ΔH.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Offset of the activated complex above |ΔH|.
pub const ACTIVATION_OFFSET: f64 = 50.0;

/// Largest accepted |ΔH|. Beyond this the chart's value span would overflow.
pub const MAX_DELTA_H: f64 = f64::MAX / 16.0;

pub const INVALID_DELTA_H_MESSAGE: &str = "Please enter a valid enthalpy change value.";

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("enthalpy change is empty")]
    Empty,
    #[error("enthalpy change {0:?} is not a number")]
    NotANumber(String),
    #[error("enthalpy change is not finite")]
    NotFinite,
    #[error("enthalpy change must be non-zero")]
    Zero,
    #[error("enthalpy change is too large to plot")]
    OutOfRange,
}

impl InputError {
    /// Message shown to the person filling in the form.
    pub fn user_message(&self) -> &'static str {
        INVALID_DELTA_H_MESSAGE
    }
}

/// Splits a comma-separated species list and trims every entry.
pub fn parse_species(list: &str) -> Vec<String> {
    list.split(',').map(|item| item.trim().to_string()).collect()
}

pub fn parse_delta_h(value: &str) -> Result<f64, InputError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InputError::Empty);
    }
    if !DECIMAL.is_match(value) {
        return Err(InputError::NotANumber(value.to_string()));
    }
    let parsed: f64 = value
        .parse()
        .map_err(|_| InputError::NotANumber(value.to_string()))?;
    if !parsed.is_finite() {
        return Err(InputError::NotFinite);
    }
    if parsed == 0.0 {
        return Err(InputError::Zero);
    }
    if parsed.abs() > MAX_DELTA_H {
        return Err(InputError::OutOfRange);
    }
    Ok(parsed)
}

/// Validated form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionInput {
    pub reactants: Vec<String>,
    pub products: Vec<String>,
    pub delta_h: f64,
}

impl ReactionInput {
    pub fn parse(reactants: &str, products: &str, delta_h: &str) -> Result<Self, InputError> {
        let delta_h = parse_delta_h(delta_h)?;
        Ok(ReactionInput {
            reactants: parse_species(reactants),
            products: parse_species(products),
            delta_h,
        })
    }

    pub fn profile(&self) -> EnergyProfile {
        EnergyProfile::derive(&self.reactants, &self.products, self.delta_h)
    }

    pub fn equation(&self) -> String {
        thermochemical_equation(&self.reactants, &self.products, self.delta_h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyProfile {
    pub reactants_label: String,
    pub products_label: String,
    pub reactant_energy: f64,
    pub activated_complex_energy: f64,
    pub product_energy: f64,
    pub is_endothermic: bool,
    /// Magnitude of the enthalpy change.
    pub delta_h: f64,
    /// Signed enthalpy change as entered.
    pub raw_delta_h: f64,
}

impl EnergyProfile {
    /// `delta_h` must already be finite and non-zero.
    pub fn derive<S: AsRef<str>>(reactants: &[S], products: &[S], delta_h: f64) -> Self {
        let is_endothermic = delta_h > 0.0;
        let magnitude = delta_h.abs();
        EnergyProfile {
            reactants_label: join_species(reactants),
            products_label: join_species(products),
            reactant_energy: 0.0,
            activated_complex_energy: magnitude + ACTIVATION_OFFSET,
            product_energy: if is_endothermic { delta_h } else { -magnitude },
            is_endothermic,
            delta_h: magnitude,
            raw_delta_h: delta_h,
        }
    }

    pub fn activation_energy(&self) -> f64 {
        self.activated_complex_energy - self.reactant_energy
    }

    pub fn series_label(&self) -> String {
        let kind = if self.is_endothermic {
            "Endothermic"
        } else {
            "Exothermic"
        };
        format!("Enthalpy Diagram ({kind})")
    }

    /// Energies in plotting order: reactants, activated complex, products.
    pub fn energies(&self) -> [f64; 3] {
        [
            self.reactant_energy,
            self.activated_complex_energy,
            self.product_energy,
        ]
    }
}

fn join_species<S: AsRef<str>>(species: &[S]) -> String {
    species
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Shortest round-trip decimal, switching to exponent form (`1e+308`,
/// `1.5e-7`) outside `[1e-6, 1e21)` the way browsers print numbers.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || !value.is_finite() || (1e-6..1e21).contains(&magnitude) {
        return format!("{}", if value == 0.0 { 0.0 } else { value });
    }
    let exp_form = format!("{value:e}");
    match exp_form.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exp_form,
    }
}

pub fn thermochemical_equation<S: AsRef<str>>(reactants: &[S], products: &[S], delta_h: f64) -> String {
    format!(
        "{} → {}  ΔH = {} kJ",
        join_species(reactants),
        join_species(products),
        format_number(delta_h)
    )
}
