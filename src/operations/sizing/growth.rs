use crate::kernel::FieldIndex;

/// Closed-form size laws over a distance `d` to a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthLaw {
    /// `m/r + m(1 - 1/r)(d/x_chord)^n`: size `m/r` on a wing edge, back to
    /// `m` one refinement length away.
    EdgeRefinement {
        mesh_size: f64,
        refine: f64,
        x_chord: f64,
        power: f64,
    },
    /// `near + (far - near)(d/length)^n`: growth from a surface out to the far field.
    PowerGrowth {
        near_size: f64,
        far_size: f64,
        length: f64,
        power: f64,
    },
}

impl GrowthLaw {
    /// The engine expression, reading the distance from field `distance`.
    #[must_use]
    pub fn expression(&self, distance: FieldIndex) -> String {
        match *self {
            GrowthLaw::EdgeRefinement {
                mesh_size: m,
                refine: r,
                x_chord,
                power,
            } => format!("({m}/{r}) + {m}*(1-(1/{r}))*(F{distance}/{x_chord})^{power}"),
            GrowthLaw::PowerGrowth {
                near_size,
                far_size,
                length,
                power,
            } => format!(
                "{near_size} + ({far_size} - {near_size})*(F{distance}/{length})^{power}"
            ),
        }
    }

    /// Size at distance `d`.
    #[must_use]
    pub fn evaluate(&self, d: f64) -> f64 {
        match *self {
            GrowthLaw::EdgeRefinement {
                mesh_size: m,
                refine: r,
                x_chord,
                power,
            } => m / r + m * (1.0 - 1.0 / r) * (d / x_chord).powf(power),
            GrowthLaw::PowerGrowth {
                near_size,
                far_size,
                length,
                power,
            } => near_size + (far_size - near_size) * (d / length).powf(power),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn edge_refinement_spans_refined_to_nominal() {
        let law = GrowthLaw::EdgeRefinement {
            mesh_size: 0.2,
            refine: 4.0,
            x_chord: 0.5,
            power: 2.0,
        };
        assert_relative_eq!(law.evaluate(0.0), 0.05, epsilon = 1e-12);
        assert_relative_eq!(law.evaluate(0.5), 0.2, epsilon = 1e-12);
        assert_eq!(law.expression(3), "(0.2/4) + 0.2*(1-(1/4))*(F3/0.5)^2");
    }

    #[test]
    fn power_growth_reaches_far_size_at_length() {
        let law = GrowthLaw::PowerGrowth {
            near_size: 0.2,
            far_size: 12.0,
            length: 10.0,
            power: 1.5,
        };
        assert_relative_eq!(law.evaluate(0.0), 0.2, epsilon = 1e-12);
        assert_relative_eq!(law.evaluate(10.0), 12.0, epsilon = 1e-12);
        assert_eq!(law.expression(7), "0.2 + (12 - 0.2)*(F7/10)^1.5");
    }
}
