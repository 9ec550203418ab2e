//! Grid-box fragment scenarios for the in-memory session.
//!
//! Parts are axis-aligned boxes. The fragment hook splits space on the grid
//! of all box faces (plus the symmetry plane), so every grid cell is owned
//! by the parts that contain it: cells inside two boxes are the overlap.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::path::PathBuf;
use std::rc::Rc;

use aerodomain::error::KernelError;
use aerodomain::kernel::memory::{on_plane, MemorySession, TopologyModel};
use aerodomain::kernel::FragmentOutput;
use aerodomain::math::{Point3, Vector3};
use aerodomain::pipeline::PartSource;
use aerodomain::topology::{Dim, DimTag, PartType, Tag};

pub fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

#[derive(Debug, Clone)]
pub struct BoxPart {
    pub uid: &'static str,
    pub part_type: PartType,
    pub min: Point3,
    pub max: Point3,
}

impl BoxPart {
    pub fn new(uid: &'static str, part_type: PartType, min: Point3, max: Point3) -> Self {
        Self {
            uid,
            part_type,
            min,
            max,
        }
    }

    fn contains(&self, q: &Point3) -> bool {
        (0..3).all(|i| q[i] > self.min[i] && q[i] < self.max[i])
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(format!("{}.brep", self.uid))
    }
}

/// What the fragment hook built, for assertions.
#[derive(Debug, Clone, Default)]
pub struct FragmentRecord {
    /// Cells claimed by more than one part.
    pub overlap_cells: BTreeSet<DimTag>,
    /// Cells on the kept side of the symmetry plane (all cells without symmetry).
    pub kept_cells: BTreeSet<DimTag>,
    pub symmetry_surface: Option<Tag>,
    pub farfield_surfaces: Vec<Tag>,
}

pub struct Scenario {
    pub session: MemorySession,
    pub sources: Vec<PartSource>,
    pub record: Rc<RefCell<FragmentRecord>>,
}

/// Two overlapping boxes: a fuselage `[0,3]^3` and a pylon standing in its
/// top face, overlapping it on `[1,2]x[1,2]x[2,3]`.
pub fn overlapping_pair() -> Vec<BoxPart> {
    vec![
        BoxPart::new("A", PartType::Fuselage, p(0.0, 0.0, 0.0), p(3.0, 3.0, 3.0)),
        BoxPart::new("B", PartType::Pylon, p(1.0, 1.0, 2.0), p(2.0, 2.0, 5.0)),
    ]
}

/// [`overlapping_pair`] plus a small part lying wholly below `y = 1.5`.
///
/// The bounding box is `[0,3]x[0,3]x[-2,5]`, so the model center and the
/// symmetry plane sit at `y = 1.5`, cutting the overlap in two.
pub fn pair_with_stray_part() -> Vec<BoxPart> {
    let mut parts = overlapping_pair();
    parts.push(BoxPart::new(
        "C",
        PartType::Other,
        p(0.25, 0.0, -2.0),
        p(0.75, 1.0, -1.0),
    ));
    parts
}

/// Routes library logs to the test output; `RUST_LOG` adds directives.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("aerodomain=info".parse().unwrap_or_default());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

/// Registers each box as an importable shape and installs the fragment hook.
///
/// With `symmetry_y`, the hook also splits cells at that plane and reports
/// the lower half as children of the trim tool.
pub fn scenario(parts: Vec<BoxPart>, symmetry_y: Option<f64>) -> Scenario {
    init_tracing();
    let mut session = MemorySession::new();
    let mut sources = Vec::new();
    for part in &parts {
        let (min, max) = (part.min, part.max);
        session.register_shape(part.path(), move |model: &mut TopologyModel| {
            vec![DimTag::volume(model.add_box(min, max))]
        });
        sources.push(PartSource::new(part.uid, part.path(), part.part_type));
    }

    let record = Rc::new(RefCell::new(FragmentRecord::default()));
    let hook_record = Rc::clone(&record);
    session.on_fragment(move |model, objects, tools| {
        let (output, built) = fragment_grid(model, objects, tools, &parts, symmetry_y)?;
        *hook_record.borrow_mut() = built;
        Ok(output)
    });

    Scenario {
        session,
        sources,
        record,
    }
}

fn grid(parts: &[BoxPart], axis: usize, split: Option<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = parts
        .iter()
        .flat_map(|b| [b.min[axis], b.max[axis]])
        .chain(split)
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    values
}

fn fragment_grid(
    model: &mut TopologyModel,
    objects: &[DimTag],
    tools: &[DimTag],
    parts: &[BoxPart],
    symmetry_y: Option<f64>,
) -> Result<(FragmentOutput, FragmentRecord), KernelError> {
    let sphere = objects[0];
    let sphere_surface = model.boundary_of(sphere)?[0];
    let poles: Vec<Point3> = model
        .points_of(DimTag::surface(sphere_surface))?
        .into_iter()
        .map(|t| model.coords(t).unwrap())
        .collect();
    let center = nalgebra::center(&poles[0], &poles[1]);
    let radius = nalgebra::distance(&poles[0], &poles[1]) / 2.0;

    model.remove(sphere, false)?;
    for tool in tools {
        model.remove(*tool, true)?;
    }

    let xs = grid(parts, 0, None);
    let ys = grid(parts, 1, symmetry_y);
    let zs = grid(parts, 2, None);

    let mut record = FragmentRecord::default();
    let mut part_children: Vec<Vec<DimTag>> = vec![Vec::new(); parts.len()];
    let mut cells: Vec<(Tag, Point3)> = Vec::new();
    for x in xs.windows(2) {
        for y in ys.windows(2) {
            for z in zs.windows(2) {
                let min = p(x[0], y[0], z[0]);
                let max = p(x[1], y[1], z[1]);
                let mid = nalgebra::center(&min, &max);
                let owners: Vec<usize> = (0..parts.len())
                    .filter(|&i| parts[i].contains(&mid))
                    .collect();
                if owners.is_empty() {
                    continue;
                }
                let cell = model.add_box(min, max);
                for &owner in &owners {
                    part_children[owner].push(DimTag::volume(cell));
                }
                if owners.len() > 1 {
                    record.overlap_cells.insert(DimTag::volume(cell));
                }
                cells.push((cell, mid));
            }
        }
    }

    let cell_tags: Vec<Tag> = cells.iter().map(|(t, _)| *t).collect();
    let exterior = model.exterior_faces(&cell_tags)?;
    let mut sphere_children = Vec::new();
    let mut trim_children = Vec::new();

    match symmetry_y {
        None => {
            let mut bounding = vec![sphere_surface];
            bounding.extend(&exterior);
            let fluid = model.add_volume(&bounding);
            sphere_children.push(DimTag::volume(fluid));
            record.kept_cells = cell_tags.iter().map(|&t| DimTag::volume(t)).collect();
            record.farfield_surfaces = vec![sphere_surface];
        }
        Some(y0) => {
            model.remove(DimTag::surface(sphere_surface), true)?;
            let rim_point = model.add_point(center + Vector3::x() * radius);
            let rim = model.add_curve(&[rim_point]);
            let upper_hemisphere = model.add_surface(&[rim], 2.0 * PI * radius * radius);
            let lower_hemisphere = model.add_surface(&[rim], 2.0 * PI * radius * radius);

            let origin = p(0.0, y0, 0.0);
            let normal = Vector3::y();
            let mut cut_faces = BTreeSet::new();
            for &(cell, _) in &cells {
                for &face in model.boundary_of(DimTag::volume(cell))? {
                    let com = model.center_of_mass(DimTag::surface(face))?;
                    if on_plane(&com, &origin, &normal) {
                        cut_faces.insert(face);
                    }
                }
            }
            let mut edge_uses: BTreeMap<Tag, usize> = BTreeMap::new();
            let mut cut_area = 0.0;
            for &face in &cut_faces {
                cut_area += model.area(face)?;
                for &edge in model.boundary_of(DimTag::surface(face))? {
                    *edge_uses.entry(edge).or_default() += 1;
                }
            }
            let mut symmetry_curves = vec![rim];
            symmetry_curves.extend(
                edge_uses
                    .into_iter()
                    .filter(|&(_, uses)| uses == 1)
                    .map(|(edge, _)| edge),
            );
            let symmetry =
                model.add_surface(&symmetry_curves, PI * radius * radius - cut_area);

            let mut upper = vec![upper_hemisphere, symmetry];
            let mut lower = vec![lower_hemisphere, symmetry];
            for &face in &exterior {
                let com = model.center_of_mass(DimTag::surface(face))?;
                if com.y > y0 {
                    upper.push(face);
                } else {
                    lower.push(face);
                }
            }
            let fluid_upper = model.add_volume(&upper);
            let fluid_lower = model.add_volume(&lower);
            sphere_children.extend([DimTag::volume(fluid_upper), DimTag::volume(fluid_lower)]);

            for &(cell, mid) in &cells {
                if mid.y > y0 {
                    record.kept_cells.insert(DimTag::volume(cell));
                } else {
                    trim_children.push(DimTag::volume(cell));
                }
            }
            trim_children.push(DimTag::volume(fluid_lower));
            record.symmetry_surface = Some(symmetry);
            record.farfield_surfaces = vec![upper_hemisphere];
        }
    }

    sphere_children.extend(cell_tags.iter().map(|&t| DimTag::volume(t)));
    let mut children = vec![sphere_children];
    children.extend(part_children);
    if tools.len() > parts.len() {
        children.push(trim_children);
    }
    let fragments = model
        .tags(Dim::Volume)
        .into_iter()
        .map(DimTag::volume)
        .collect();

    Ok((
        FragmentOutput {
            fragments,
            children,
        },
        record,
    ))
}
