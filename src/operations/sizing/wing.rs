use tracing::{info, warn};

use crate::error::{GeometryError, Result, TopologyError};
use crate::kernel::{FieldIndex, Session};
use crate::math::{Point3, TOLERANCE};
use crate::topology::{Dim, DimTag, Part, Tag, WingSection};

use super::primitives::{analytic_field, distance_field, restrict_field, threshold_field};
use super::{FieldSet, GrowthLaw};

/// Refinement factors above this are reported as excessive.
pub const MAX_REFINE: f64 = 20.0;

/// Leading/trailing-edge refinement settings for one wing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRefinement {
    /// Nominal wing mesh size `m`.
    pub mesh_size: f64,
    /// Refinement factor `r`: the edge size is `m / r`.
    pub refine: f64,
    /// Refinement length as a fraction of the section's mean chord.
    pub chord_percent: f64,
    /// Exponent `n` of the growth law.
    pub power: f64,
    /// Raise `r` on thin truncated trailing edges.
    pub adapt_truncated: bool,
}

impl EdgeRefinement {
    #[must_use]
    pub const fn new(mesh_size: f64, refine: f64) -> Self {
        Self {
            mesh_size,
            refine,
            chord_percent: 0.25,
            power: 2.0,
            adapt_truncated: true,
        }
    }

    #[must_use]
    pub const fn with_chord_percent(mut self, chord_percent: f64) -> Self {
        self.chord_percent = chord_percent;
        self
    }

    #[must_use]
    pub const fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    #[must_use]
    pub const fn with_truncation_adapt(mut self, adapt: bool) -> Self {
        self.adapt_truncated = adapt;
        self
    }
}

/// What was built for one wing section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRefinement {
    /// Refinement factor used for this section.
    pub refine: f64,
    /// Trailing-edge thickness, for truncated sections.
    pub te_thickness: Option<f64>,
    /// Restrict fields registered for this section.
    pub leaves: Vec<FieldIndex>,
}

/// Outcome of [`refine_wing_section`] for one wing part.
#[derive(Debug, Clone, PartialEq)]
pub struct WingRefinementReport {
    pub uid: String,
    /// Refinement factor asked for.
    pub requested: f64,
    /// Largest factor used across sections.
    pub effective: f64,
    pub sections: Vec<SectionRefinement>,
}

impl WingRefinementReport {
    /// `true` when a truncated trailing edge raised the factor.
    #[must_use]
    pub fn adjusted(&self) -> bool {
        (self.effective - self.requested).abs() > TOLERANCE
    }

    /// Wing mesh size that would bring the factor back to [`MAX_REFINE`],
    /// when it is exceeded.
    #[must_use]
    pub fn suggested_mesh_size(&self, mesh_size: f64) -> Option<f64> {
        (self.effective > MAX_REFINE + TOLERANCE)
            .then(|| mesh_size * MAX_REFINE / self.effective)
    }
}

/// Smallest of the three pairwise distances between `points`.
#[must_use]
pub fn min_pairwise_distance(points: &[Point3; 3]) -> f64 {
    let [a, b, c] = points;
    nalgebra::distance(a, b)
        .min(nalgebra::distance(a, c))
        .min(nalgebra::distance(b, c))
}

/// Refinement factor for a truncated trailing edge of thickness `thickness`.
///
/// When `mesh_size / thickness` exceeds `refine`, the edge would be
/// resolved by less than one element, so the factor becomes
/// `2 * mesh_size / thickness`. Otherwise `refine` is returned unchanged.
#[must_use]
pub fn truncation_refine(mesh_size: f64, thickness: f64, refine: f64) -> f64 {
    if mesh_size / thickness > refine {
        2.0 * mesh_size / thickness
    } else {
        refine
    }
}

fn trailing_edge_thickness<S>(session: &S, wing: &Part, section: &WingSection) -> Result<f64>
where
    S: Session + ?Sized,
{
    let mut centers = [Point3::origin(); 3];
    for (center, &curve) in centers.iter_mut().zip(&section.trailing_edge) {
        *center = session.center_of_mass(DimTag::curve(curve))?;
    }
    let thickness = min_pairwise_distance(&centers);
    if thickness <= TOLERANCE {
        return Err(GeometryError::DegenerateTrailingEdge {
            part: wing.uid.clone(),
            thickness,
        }
        .into());
    }
    Ok(thickness)
}

/// Builds the edge refinement fields of every section of a wing.
///
/// Per section: a growth law from `m / r` on the leading and trailing edge
/// curves up to `m` one refinement length away, restricted to the aircraft
/// surfaces and then to the fluid volume; and a uniform band at `m`
/// restricted to the wing's own surfaces. Sections keep their own factor;
/// a thin truncated trailing edge only raises the factor of its section.
///
/// # Errors
///
/// Returns an error if a section has a trailing edge of other than one or
/// three curves, a degenerate chord or thickness, or if a field cannot be
/// built.
pub fn refine_wing_section<S>(
    session: &mut S,
    fields: &mut FieldSet,
    wing: &Part,
    aircraft_surfaces: &[Tag],
    domain_volumes: &[Tag],
    params: &EdgeRefinement,
) -> Result<WingRefinementReport>
where
    S: Session + ?Sized,
{
    info!("Set mesh refinement of {}", wing.uid);
    let m = params.mesh_size;
    let wing_surfaces = wing.surface_tags();
    let mut sections = Vec::with_capacity(wing.wing_sections.len());

    for section in &wing.wing_sections {
        let te_thickness = match section.trailing_edge.len() {
            _ if section.is_truncated() => Some(trailing_edge_thickness(session, wing, section)?),
            1 => None,
            count => {
                return Err(TopologyError::UnsupportedTrailingEdge {
                    part: wing.uid.clone(),
                    count,
                }
                .into())
            }
        };
        let refine = match te_thickness {
            Some(t) if params.adapt_truncated => truncation_refine(m, t, params.refine),
            _ => params.refine,
        };

        let x_chord = params.chord_percent * section.mean_chord;
        if x_chord <= TOLERANCE {
            return Err(GeometryError::Degenerate(format!(
                "refinement length {x_chord} of a section of {}",
                wing.uid
            ))
            .into());
        }
        let curves = section.edge_curves();

        let distance = distance_field(session, fields, Dim::Curve, &curves)?;
        let law = GrowthLaw::EdgeRefinement {
            mesh_size: m,
            refine,
            x_chord,
            power: params.power,
        };
        let edge = analytic_field(session, fields, &law.expression(distance))?;
        let on_aircraft = restrict_field(session, fields, Dim::Surface, aircraft_surfaces, None)?;
        let in_domain =
            restrict_field(session, fields, Dim::Volume, domain_volumes, Some(edge))?;

        let distance = distance_field(session, fields, Dim::Curve, &curves)?;
        threshold_field(session, fields, distance, m, m)?;
        let on_wing = restrict_field(session, fields, Dim::Surface, &wing_surfaces, None)?;

        sections.push(SectionRefinement {
            refine,
            te_thickness,
            leaves: vec![on_aircraft, in_domain, on_wing],
        });
    }

    let effective = sections
        .iter()
        .map(|s| s.refine)
        .fold(params.refine, f64::max);
    let report = WingRefinementReport {
        uid: wing.uid.clone(),
        requested: params.refine,
        effective,
        sections,
    };

    if report.adjusted() {
        info!(
            "{} is truncated: refinement factor increased from {} to {:.2}",
            wing.uid, params.refine, effective
        );
    }
    if let Some(suggested) = report.suggested_mesh_size(m) {
        warn!("Refinement factor {effective:.2} of {} is high", wing.uid);
        warn!("Consider reducing the wing mesh size from {m} to {suggested:.2e}");
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::AeroDomainError;
    use crate::kernel::memory::MemorySession;
    use crate::kernel::FieldKind;
    use crate::topology::PartType;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    /// Wing part with one section; trailing-edge curves are short segments
    /// centered at the given x positions.
    fn wing_with_trailing_edge(session: &mut MemorySession, te_x: &[f64]) -> Part {
        let model = session.model_mut();
        let le = model.segment(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
        let te: Vec<Tag> = te_x
            .iter()
            .map(|&x| model.segment(p(x, 0.0, 1.0), p(x, 1.0, 1.0)))
            .collect();
        let skin = model.quad([
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ]);

        let mut wing = Part::new("wing", PartType::Wing);
        wing.entities.extend([DimTag::surface(skin)]);
        wing.wing_sections.push(WingSection::new(vec![le], te, 2.0));
        wing
    }

    #[test]
    fn blunt_trailing_edge_raises_refinement() {
        let centers = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.02, 0.0, 0.0)];
        let thickness = min_pairwise_distance(&centers);
        assert_relative_eq!(thickness, 0.02, epsilon = 1e-12);
        assert_relative_eq!(truncation_refine(0.2, thickness, 4.0), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn thick_trailing_edge_keeps_refinement() {
        assert_relative_eq!(truncation_refine(0.2, 0.1, 4.0), 4.0);
    }

    #[test]
    fn sharp_section_builds_three_leaves() {
        let mut session = MemorySession::new();
        let wing = wing_with_trailing_edge(&mut session, &[1.0]);
        let mut fields = FieldSet::new();

        let report = refine_wing_section(
            &mut session,
            &mut fields,
            &wing,
            &wing.surface_tags(),
            &[1],
            &EdgeRefinement::new(0.2, 4.0),
        )
        .unwrap();

        assert!(!report.adjusted());
        assert_eq!(fields.leaves().len(), 3);
        assert_eq!(fields.allocated(), 7);

        let (edge, record) = session.fields_of_kind(FieldKind::MathEval)[0];
        assert_eq!(record.strings["F"], "(0.2/4) + 0.2*(1-(1/4))*(F1/0.5)^2");
        let in_domain = session.field(report.sections[0].leaves[1]).unwrap();
        assert_relative_eq!(in_domain.numbers["InField"], f64::from(edge));
    }

    #[test]
    fn truncated_section_reports_effective_factor() {
        let mut session = MemorySession::new();
        let wing = wing_with_trailing_edge(&mut session, &[1.0, 1.02, 2.0]);
        let mut fields = FieldSet::new();

        let report = refine_wing_section(
            &mut session,
            &mut fields,
            &wing,
            &wing.surface_tags(),
            &[1],
            &EdgeRefinement::new(0.2, 4.0),
        )
        .unwrap();

        assert!(report.adjusted());
        assert_relative_eq!(report.effective, 20.0, epsilon = 1e-9);
        assert!(report.suggested_mesh_size(0.2).is_none());
        assert_relative_eq!(
            report.sections[0].te_thickness.unwrap(),
            0.02,
            epsilon = 1e-12
        );
    }

    #[test]
    fn suggestion_ignores_rounding_at_the_limit() {
        let report = |effective| WingRefinementReport {
            uid: "wing".to_owned(),
            requested: 4.0,
            effective,
            sections: Vec::new(),
        };
        assert!(report(19.999_999_999_999_98).suggested_mesh_size(0.2).is_none());
        assert!(report(20.000_000_000_000_02).suggested_mesh_size(0.2).is_none());
        assert_relative_eq!(report(40.0).suggested_mesh_size(0.2).unwrap(), 0.1);
    }

    #[test]
    fn disabled_adaptation_keeps_requested_factor() {
        let mut session = MemorySession::new();
        let wing = wing_with_trailing_edge(&mut session, &[1.0, 1.02, 2.0]);
        let mut fields = FieldSet::new();
        let params = EdgeRefinement::new(0.2, 4.0).with_truncation_adapt(false);

        let report =
            refine_wing_section(&mut session, &mut fields, &wing, &[], &[1], &params).unwrap();
        assert!(!report.adjusted());
    }

    #[test]
    fn two_curve_trailing_edge_is_rejected() {
        let mut session = MemorySession::new();
        let wing = wing_with_trailing_edge(&mut session, &[1.0, 1.5]);
        let mut fields = FieldSet::new();

        let err = refine_wing_section(
            &mut session,
            &mut fields,
            &wing,
            &[],
            &[1],
            &EdgeRefinement::new(0.2, 4.0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AeroDomainError::Topology(TopologyError::UnsupportedTrailingEdge { count: 2, .. })
        ));
    }
}
