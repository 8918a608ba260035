//! Integration tests for converting VOP network snapshots.

use material_processor::config::Settings;
use material_processor::network::{detect_material_type, TraversalDump, VopNetwork};
use material_processor::pipeline;
use material_processor::taxonomy::{GenericNodeType, Renderer, SourceType};

use tempfile::TempDir;

const ARNOLD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/arnold_materialbuilder1.json");
const MTLX_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/mtlx_subnet.json");

fn load(path: &str) -> VopNetwork {
    VopNetwork::load(path).expect("Failed to load network snapshot")
}

#[test]
fn test_detect_fixture_types() {
    assert_eq!(detect_material_type(&load(ARNOLD_PATH)), Some(Renderer::Arnold));
    assert_eq!(detect_material_type(&load(MTLX_PATH)), Some(Renderer::Mtlx));
}

#[test]
fn test_ingest_arnold_builder() {
    let material = pipeline::ingest_network(&load(ARNOLD_PATH), &Settings::default())
        .expect("Failed to ingest network");
    println!("{}", material);

    assert_eq!(material.material_name, "arnold_materialbuilder1");
    assert_eq!(material.material_type, Some(Renderer::Arnold));
    assert_eq!(material.node_count(), 6);

    let cc = material
        .find_node("/mat/arnold_materialbuilder1/color_correct1")
        .expect("color correct missing");
    assert_eq!(cc.node_type, Some(GenericNodeType::ColorCorrect));
    let hue = cc.param("hue").expect("hue_shift should standardize to hue");
    assert_eq!(hue.value.as_ref().and_then(|v| v.as_float()), Some(0.1));
}

#[test]
fn test_arnold_to_mtlx() {
    let result = pipeline::convert_network(&load(ARNOLD_PATH), Renderer::Mtlx, &Settings::default())
        .expect("Failed to convert");
    let net = &result.network;
    assert_eq!(net.path, "/mat/arnold_materialbuilder1_mtlx");
    assert_eq!(net.node_type, "subnet");

    let surf = result
        .node_for("/mat/arnold_materialbuilder1/standard_surface1")
        .expect("surface not recreated");
    assert_eq!(surf.name, "mtlxstandard_surface");
    let base = surf
        .inputs
        .iter()
        .find(|i| i.name.as_deref() == Some("base_color"))
        .expect("base_color not wired");
    assert_eq!(base.source, "color_correct1");

    let cc = net.node("color_correct1").expect("color correct missing");
    assert_eq!(cc.node_type, "mtlxcolorcorrect");
    assert_eq!(cc.parm("hue"), Some(&serde_json::json!(0.1)));

    // Range feeds roughness through its red channel.
    let split = net.node("range_rough_split_vec3").expect("split node missing");
    assert_eq!(split.node_type, "mtlxseparate3c");
    let rough = surf
        .inputs
        .iter()
        .find(|i| i.name.as_deref() == Some("specular_roughness"))
        .expect("roughness not wired");
    assert_eq!(rough.source, "range_rough_split_vec3");

    let connector = net.node("surface_output").expect("surface connector missing");
    assert_eq!(connector.inputs[0].source, "mtlxstandard_surface");
}

#[test]
fn test_mtlx_to_arnold() {
    let result = pipeline::convert_network(&load(MTLX_PATH), Renderer::Arnold, &Settings::default())
        .expect("Failed to convert");
    let net = &result.network;
    assert_eq!(net.node_type, "arnold_materialbuilder");

    let out = net.node("OUT_material").expect("output missing");
    assert_eq!(out.inputs[0].index, Some(0));

    let image = result.node_for("/mat/tiles/mtlximage1").expect("image not recreated");
    assert_eq!(image.node_type, "arnold::image");
    assert_eq!(image.parm("filename"), Some(&serde_json::json!("tiles_albedo.png")));
}

#[test]
fn test_selection_writes_snapshots() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let networks = vec![load(ARNOLD_PATH), load(MTLX_PATH)];
    let results = pipeline::convert_selection(&networks, Renderer::Redshift, &Settings::default());
    assert_eq!(results.len(), 2);

    for (source, result) in results {
        let recreated = result.unwrap_or_else(|e| panic!("{} failed: {}", source, e));
        let path = dir.path().join(format!("{}.json", recreated.network.name));
        recreated.network.save(&path).expect("Failed to save network");

        let reloaded = VopNetwork::load(&path).expect("Failed to reload network");
        assert_eq!(reloaded, recreated.network);
        assert_eq!(reloaded.node_type, "redshift_vopnet");
    }
}

#[test]
fn test_dump_and_reingest() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let settings = Settings {
        dump_intermediates: true,
        dump_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let material = pipeline::ingest_network(&load(ARNOLD_PATH), &settings).expect("Failed to ingest");

    let folder = dir.path().join("arnold_materialbuilder1");
    let dump = TraversalDump::load(
        folder.join("traversed_nodes_dict.json"),
        folder.join("output_nodes_dict.json"),
    )
    .expect("Failed to load dump");
    let again = pipeline::ingest_dump(&dump, &material.material_name, Renderer::Arnold, SourceType::HouVopNodes);
    assert_eq!(again.nodes, material.nodes);
}
