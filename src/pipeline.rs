//! End-to-end meshing driver: import, reconcile, size and mesh.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::MeshingConfig;
use crate::error::{KernelError, Result};
use crate::kernel::{FieldIndex, GeometryKernel, Session};
use crate::operations::meshing::{apply_farfield_sizes, apply_part_sizes, quality_summary};
use crate::operations::reconcile::{ImportedPart, Reconcile};
use crate::operations::sizing::{
    min_field, refine_small_surfaces, refine_wing_section, set_farfield_mesh, set_fuselage_mesh,
    FieldSet, WingRefinementReport,
};
use crate::topology::{Dim, Part, PartType, Tag, WingSection};

/// File name of the written volume mesh.
pub const MESH_FILE_NAME: &str = "mesh.su2";
/// Extension of the part geometry files picked up by [`collect_part_sources`].
pub const PART_FILE_EXTENSION: &str = "brep";
/// Surface smoothing method applied before volume meshing.
pub const SMOOTHING_METHOD: &str = "Laplace2D";

/// Splits a wing into chordwise sections.
pub trait WingClassifier {
    /// Sections of `wing`, given every surviving part for context.
    ///
    /// # Errors
    ///
    /// Returns an error if the wing cannot be classified.
    fn classify(&self, wing: &Part, parts: &[Part]) -> Result<Vec<WingSection>>;
}

impl<F> WingClassifier for F
where
    F: Fn(&Part, &[Part]) -> Result<Vec<WingSection>>,
{
    fn classify(&self, wing: &Part, parts: &[Part]) -> Result<Vec<WingSection>> {
        self(wing, parts)
    }
}

/// Where a part's geometry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSource {
    pub uid: String,
    pub path: PathBuf,
    pub part_type: PartType,
}

impl PartSource {
    #[must_use]
    pub fn new(uid: impl Into<String>, path: impl Into<PathBuf>, part_type: PartType) -> Self {
        Self {
            uid: uid.into(),
            path: path.into(),
            part_type,
        }
    }
}

/// Lists the part files of a directory, sorted by file name.
///
/// Each part is named after its file stem; `resolver` maps that name to a
/// part type.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn collect_part_sources(
    dir: &Path,
    resolver: impl Fn(&str) -> PartType,
) -> Result<Vec<PartSource>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(KernelError::from)? {
        let path = entry.map_err(KernelError::from)?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == PART_FILE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| {
            let uid = path.file_stem()?.to_string_lossy().into_owned();
            let part_type = resolver(&uid);
            Some(PartSource {
                uid,
                path,
                part_type,
            })
        })
        .collect())
}

/// Imports each source and pairs it with the first solid it contains.
///
/// # Errors
///
/// Returns an error if a file cannot be imported or holds no solid.
pub fn import_parts<K>(kernel: &mut K, sources: &[PartSource]) -> Result<Vec<ImportedPart>>
where
    K: GeometryKernel + ?Sized,
{
    let mut imported = Vec::with_capacity(sources.len());
    for source in sources {
        let entities = kernel.import_shapes(&source.path)?;
        kernel.synchronize()?;
        let solid = entities
            .into_iter()
            .find(|e| e.dim == Dim::Volume)
            .ok_or_else(|| KernelError::Failed {
                operation: "importShapes",
                message: format!("{} contains no solid", source.path.display()),
            })?;
        imported.push(ImportedPart::new(
            Part::new(source.uid.clone(), source.part_type),
            solid,
        ));
        info!("Part {} imported", source.uid);
    }
    Ok(imported)
}

/// Result of [`generate_mesh`].
#[derive(Debug, Clone)]
pub struct MeshOutcome {
    pub mesh_path: PathBuf,
    /// Surviving parts with their owned entities and nominal sizes.
    pub parts: Vec<Part>,
    /// Parts dropped by the symmetry trim.
    pub dropped: Vec<String>,
    /// Element quality lines of the volume mesh.
    pub quality: Vec<String>,
    /// Under-resolved surfaces per part uid.
    pub flagged_surfaces: Vec<(String, Vec<Tag>)>,
    pub wing_reports: Vec<WingRefinementReport>,
    /// The minimum field, when sizing fields were built.
    pub background_field: Option<FieldIndex>,
}

/// Builds the fluid domain from part files and writes its volume mesh to
/// `output_dir`.
///
/// Parts are processed in `sources` order: on a point shared by several
/// parts, the last part's size wins.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any kernel,
/// reconciliation or sizing step fails. Nothing is retried.
pub fn generate_mesh<S, C>(
    session: &mut S,
    sources: &[PartSource],
    classifier: &C,
    config: &MeshingConfig,
    output_dir: &Path,
) -> Result<MeshOutcome>
where
    S: Session + ?Sized,
    C: WingClassifier + ?Sized,
{
    config.validate()?;
    info!("Importing {} parts", sources.len());
    let imported = import_parts(session, sources)?;

    let mut reconcile = Reconcile::new(config.farfield_factor);
    if config.symmetry {
        reconcile = reconcile.with_symmetry(config.normal());
    }
    let mut domain = reconcile.execute(session, imported)?;

    apply_part_sizes(session, &mut domain.parts, &config.region_sizes())?;
    apply_farfield_sizes(session, &domain, config.mesh_size_farfield)?;

    let mut fields = FieldSet::new();
    let mut wing_reports = Vec::new();
    let mut flagged_surfaces = Vec::new();

    if config.sizing_fields_enabled() {
        let volumes = domain.domain_volume_tags();
        let aircraft_surfaces = domain.aircraft_surface_tags();
        let length = domain.characteristic_length();
        let edge = config.edge_refinement();

        for index in 0..domain.parts.len() {
            match domain.parts[index].part_type {
                PartType::Wing => {
                    let sections = classifier.classify(&domain.parts[index], &domain.parts)?;
                    let wing = &mut domain.parts[index];
                    info!(
                        "Classification of {} done, {} section(s) found",
                        wing.uid,
                        sections.len()
                    );
                    wing.wing_sections = sections;
                    wing_reports.push(refine_wing_section(
                        session,
                        &mut fields,
                        wing,
                        &aircraft_surfaces,
                        &volumes,
                        &edge,
                    )?);
                }
                PartType::Fuselage => {
                    set_fuselage_mesh(session, &mut fields, &domain.parts[index])?;
                }
                _ => {}
            }
        }

        set_farfield_mesh(
            session,
            &mut fields,
            &domain.parts,
            &volumes,
            &config.farfield_growth(length),
        )?;

        if config.refine_small_surfaces {
            // Areas are measured on a surface mesh.
            session.generate(Dim::Curve)?;
            session.generate(Dim::Surface)?;
            let params = config.small_surface_refinement(length);
            for part in &domain.parts {
                let flagged = refine_small_surfaces(session, &mut fields, part, &volumes, &params)?;
                if !flagged.is_empty() {
                    flagged_surfaces.push((part.uid.clone(), flagged));
                }
            }
            session.clear_mesh()?;
        }

        min_field(session, &mut fields)?;
    }

    info!("Start of 2D surface meshing");
    session.synchronize()?;
    session.generate(Dim::Curve)?;
    session.generate(Dim::Surface)?;
    session.optimize(SMOOTHING_METHOD, config.smoothing_iterations)?;

    if config.open_gui {
        info!("Surface mesh ready, close the viewer to continue");
        session.run_gui()?;
    }

    info!("Start of 3D volume meshing");
    session.start_logger();
    session.generate(Dim::Volume)?;
    session.synchronize()?;

    let mesh_path = output_dir.join(MESH_FILE_NAME);
    session.write(&mesh_path)?;
    info!("Mesh written to {}", mesh_path.display());

    let quality = quality_summary(&session.log_lines());
    for line in &quality {
        info!("{line}");
    }

    if config.open_gui {
        info!("Volume mesh ready, close the viewer to continue");
        session.run_gui()?;
    }
    session.clear();

    Ok(MeshOutcome {
        mesh_path,
        parts: domain.parts,
        dropped: domain.dropped,
        quality,
        flagged_surfaces,
        wing_reports,
        background_field: fields.background(),
    })
}
