/// Boltzmann constant in kcal/K.
pub const BOLTZMANN_KCAL: f64 = 1.380_649e-23 / 4184.0;

/// Avogadro's number.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// 0 degrees Celsius in Kelvin.
pub const ZERO_C_IN_KELVIN: f64 = 273.15;

/// Folding temperature in degrees Celsius.
pub const FOLD_TEMPERATURE_C: f64 = 37.0;

/// Thermal energy kB * NA * T at the folding temperature, in kcal/mol.
pub const RT: f64 = BOLTZMANN_KCAL * AVOGADRO * (ZERO_C_IN_KELVIN + FOLD_TEMPERATURE_C);

/// Minimum sequence length accepted by the engine.
///
/// Shorter sequences cannot host a single admissible base pair.
pub const MIN_SEQUENCE_LENGTH: usize = 7;

/// Minimum index distance between the two bases of a pair.
pub const MIN_PAIR_SPAN: usize = 4;

/// A pair may only open at position i when i + MIN_TAIL_SPAN <= n.
pub const MIN_TAIL_SPAN: usize = 7;

/// Loop sizes above this use logarithmic length extrapolation instead of
/// the tabulated free energies.
pub const MAX_TABULATED_LOOP: usize = 30;

/// Number of tabulated pair types (AU, UA, CG, GC, GU, UG).
pub const NUM_PAIR_TYPES: usize = 6;

/// Number of concrete bases (A, C, G, U).
pub const NUM_BASES: usize = 4;

/// Posterior probabilities below this are omitted from the diagnostic
/// rendering of the base-pair probability matrix.
pub const PB_PRINT_FLOOR: f64 = 5e-10;

/// Decision-variable assignments above this are read as 1.
pub const ASSIGNMENT_CUTOFF: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rt_matches_gas_constant_at_310_kelvin() {
        // R * 310.15 K in kcal/mol
        assert!((RT - 0.616_32).abs() < 1e-3);
    }
}
