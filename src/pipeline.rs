//! End-to-end passes: ingest, convert and collect.
//!
//! Every pass is ingest (detect, traverse, standardize) followed by a
//! recreation step. Networks and stage materials are ingested in parallel
//! with rayon; stage edits happen one material at a time.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::config::Settings;
use crate::material::MaterialData;
use crate::network::{detect_material_type, NodeTraverser, NodeTree, OutputNodes, TraversalDump, VopNetwork};
use crate::recreate::{NodeRecreator, RecreatedNetwork, UsdMaterialRecreator};
use crate::standardize::NodeStandardizer;
use crate::taxonomy::{Renderer, SourceType};
use crate::usd::{
    detect_usd_material_type, reassign_bindings, sanitize_name, CollectMaterialBuilder, Prim, Stage,
    UsdShadersIngest, UsdTraverser,
};
use crate::util::{Error, Result};

/// Write a traversal into `<dump_dir>/<material>/` when dumps are enabled.
pub fn dump_traversal(
    settings: &Settings,
    material_name: &str,
    material_type: Renderer,
    node_tree: &NodeTree,
    output_nodes: &OutputNodes,
) -> Result<Option<PathBuf>> {
    if !settings.dump_intermediates {
        return Ok(None);
    }
    let dir = settings.dump_dir.join(sanitize_name(material_name));
    let dump = TraversalDump {
        material_type: Some(material_type),
        node_tree: node_tree.clone(),
        output_nodes: output_nodes.clone(),
    };
    dump.save(&dir)?;
    debug!("dumped traversal of '{}' to {}", material_name, dir.display());
    Ok(Some(dir))
}

// ============================================================================
// VOP networks
// ============================================================================

/// Detect, traverse and standardize a VOP network.
#[tracing::instrument(skip_all, fields(network = %network.path))]
pub fn ingest_network(network: &VopNetwork, settings: &Settings) -> Result<MaterialData> {
    let material_type =
        detect_material_type(network).ok_or_else(|| Error::UnknownMaterialType(network.path.clone()))?;
    info!("material type: {}", material_type.label());

    let (tree, outputs) = NodeTraverser::new(material_type).run(network)?;
    dump_traversal(settings, &network.name, material_type, &tree, &outputs)?;

    let mut material = NodeStandardizer::new(material_type, SourceType::HouVopNodes)
        .run(&tree, &outputs)
        .into_material(&network.name, material_type);
    material.material_path = Some(network.path.clone());
    Ok(material)
}

/// Standardize a traversal read back from disk.
pub fn ingest_dump(dump: &TraversalDump, name: &str, material_type: Renderer, source_type: SourceType) -> MaterialData {
    let material_type = dump.material_type.unwrap_or(material_type);
    NodeStandardizer::new(material_type, source_type)
        .run(&dump.node_tree, &dump.output_nodes)
        .into_material(name, material_type)
}

/// Ingest a network and recreate it for `target`.
pub fn convert_network(network: &VopNetwork, target: Renderer, settings: &Settings) -> Result<RecreatedNetwork> {
    let material = ingest_network(network, settings)?;
    NodeRecreator::new(&material, &settings.target_context, target).run()
}

/// Convert every network independently. One failure does not stop the rest.
#[tracing::instrument(skip_all, fields(count = networks.len(), target = %target))]
pub fn convert_selection(
    networks: &[VopNetwork],
    target: Renderer,
    settings: &Settings,
) -> Vec<(String, Result<RecreatedNetwork>)> {
    let results: Vec<_> = networks
        .par_iter()
        .map(|network| (network.path.clone(), convert_network(network, target, settings)))
        .collect();

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!("converted {}/{} network(s)", results.len() - failed, results.len());
    results
}

// ============================================================================
// USD stages
// ============================================================================

/// Ingest one material prim: traversal for its renderer plus the
/// UsdPreview texture set and bound prims.
pub fn ingest_usd_material(stage: &Stage, prim: &Prim, settings: &Settings) -> Result<MaterialData> {
    let material_type =
        detect_usd_material_type(prim).ok_or_else(|| Error::UnknownMaterialType(prim.path.clone()))?;
    let (tree, outputs) = UsdTraverser::new(stage, material_type).run(prim)?;
    dump_traversal(settings, prim.name(), material_type, &tree, &outputs)?;

    let mut material = NodeStandardizer::new(material_type, SourceType::UsdPrims)
        .run(&tree, &outputs)
        .into_material(prim.name(), material_type);
    let textures = UsdShadersIngest::new(stage).ingest_material(prim);
    material.material_path = Some(prim.path.clone());
    material.textures = textures.textures;
    material.assigned_prims = textures.assigned_prims;
    Ok(material)
}

/// Ingest every material prim on the stage in parallel.
#[tracing::instrument(skip_all)]
pub fn ingest_stage(stage: &Stage, settings: &Settings) -> Vec<(String, Result<MaterialData>)> {
    let materials = stage.prims_of_type("Material");
    debug!("found {} material prim(s)", materials.len());
    materials
        .par_iter()
        .map(|prim| (prim.path.clone(), ingest_usd_material(stage, prim, settings)))
        .collect()
}

/// A converted stage material.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertedMaterial {
    pub source_path: String,
    pub material_path: String,
    /// Prims whose binding moved to the new material.
    pub rebound: Vec<String>,
}

/// Outcome of a stage conversion.
#[derive(Debug, Default)]
pub struct StageReport {
    pub converted: Vec<ConvertedMaterial>,
    /// Source material path and why it was skipped.
    pub failures: Vec<(String, Error)>,
}

impl StageReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Recreate every material on the stage for `target` and rebind prims.
#[tracing::instrument(skip_all, fields(target = %target))]
pub fn convert_stage(stage: &mut Stage, target: Renderer, settings: &Settings) -> StageReport {
    let mut report = StageReport::default();
    for (source_path, ingested) in ingest_stage(stage, settings) {
        let _span = info_span!("material", path = %source_path).entered();
        let material = match ingested {
            Ok(material) => material,
            Err(err) => {
                warn!("skipping {}: {}", source_path, err);
                report.failures.push((source_path, err));
                continue;
            }
        };
        match recreate_on_stage(stage, &material, &source_path, target, settings) {
            Ok(converted) => report.converted.push(converted),
            Err(err) => {
                warn!("failed to recreate {}: {}", source_path, err);
                report.failures.push((source_path, err));
            }
        }
    }
    info!(
        "converted {} material(s), {} failure(s)",
        report.converted.len(),
        report.failures.len()
    );
    report
}

fn recreate_on_stage(
    stage: &mut Stage,
    material: &MaterialData,
    source_path: &str,
    target: Renderer,
    settings: &Settings,
) -> Result<ConvertedMaterial> {
    let recreated = UsdMaterialRecreator::new(stage, material, &settings.parent_scope, target).run()?;
    let rebound = if settings.reassign_prims {
        reassign_bindings(stage, source_path, &recreated.material_path)?
    } else {
        Vec::new()
    };
    Ok(ConvertedMaterial {
        source_path: source_path.to_string(),
        material_path: recreated.material_path,
        rebound,
    })
}

/// Build a collect material for every textured UsdPreview material.
///
/// Prims bound to the source material move to its collect material when
/// reassignment is enabled.
#[tracing::instrument(skip_all)]
pub fn collect_stage(stage: &mut Stage, settings: &Settings) -> Result<Vec<ConvertedMaterial>> {
    let options = settings.collect_options();
    let materials = UsdShadersIngest::new(stage).run();

    let mut collected = Vec::new();
    for material in materials.iter().filter(|m| !m.textures.is_empty()) {
        let Some(source_path) = material.material_path.clone() else {
            continue;
        };
        let material_path = CollectMaterialBuilder::new(stage, material, &options).run(&settings.parent_scope)?;
        let rebound = if settings.reassign_prims {
            reassign_bindings(stage, &source_path, &material_path)?
        } else {
            Vec::new()
        };
        collected.push(ConvertedMaterial {
            source_path,
            material_path,
            rebound,
        });
    }
    info!("created {} collect material(s)", collected.len());
    Ok(collected)
}
