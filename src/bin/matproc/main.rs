//! matproc - convert material networks between renderers.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use material_processor::config::Settings;
use material_processor::network::{detect_material_type, TraversalDump, VopNetwork};
use material_processor::pipeline;
use material_processor::taxonomy::{Renderer, SourceType};
use material_processor::usd::{detect_usd_material_type, Stage, UsdShadersIngest};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_DATE: &str = env!("MATPROC_BUILD_DATE");
const BUILD_TIME: &str = env!("MATPROC_BUILD_TIME");

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    // Parse global flags
    let mut level = "info";
    let mut config: Option<PathBuf> = None;
    let mut filtered_args: Vec<String> = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-c" | "--config" => config = iter.next().map(PathBuf::from),
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if let Err(e) = run(filtered_args, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Install a fmt subscriber; `RUST_LOG` wins over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn run(mut args: Vec<String>, config: Option<PathBuf>) -> Result<()> {
    if args.is_empty() {
        print_help();
        return Ok(());
    }
    let mut settings = match &config {
        Some(path) => Settings::load_from(path).with_context(|| format!("loading settings {}", path.display()))?,
        None => Settings::load(),
    };

    let command = args.remove(0);
    match command.as_str() {
        "convert" | "c" => cmd_convert(args, &mut settings),
        "test" | "t" => cmd_test(args),
        "usd" | "u" => cmd_usd(args, &mut settings),
        "collect" => cmd_collect(args, &mut settings),
        "info" | "i" => {
            let Some(file) = args.first() else {
                bail!("missing file argument\nUsage: matproc info <file>");
            };
            cmd_info(Path::new(file), &settings)
        }
        "formats" | "f" => {
            cmd_formats();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("matproc {} (built {} {})", VERSION, BUILD_DATE, BUILD_TIME);
            Ok(())
        }
        other => {
            print_help();
            bail!("unknown command: {}", other)
        }
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Remove `name <value>` from `args`.
fn take_opt(args: &mut Vec<String>, names: &[&str]) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| names.contains(&a.as_str())) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} needs a value", args[pos]);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

/// Remove a boolean flag from `args`.
fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    let before = args.len();
    args.retain(|a| !names.contains(&a.as_str()));
    args.len() != before
}

fn take_target(args: &mut Vec<String>, settings: &Settings) -> Result<Renderer> {
    match take_opt(args, &["-t", "--target"])? {
        Some(key) => Ok(key.parse()?),
        None => Ok(settings.default_target),
    }
}

/// Record an input in the stored settings without persisting CLI overrides.
fn remember_input(path: &Path) {
    let mut stored = Settings::load();
    stored.add_recent(path.to_path_buf());
    stored.save();
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_convert(mut args: Vec<String>, settings: &mut Settings) -> Result<()> {
    let target = take_target(&mut args, settings)?;
    let out_dir = take_opt(&mut args, &["-o", "--output"])?.map(PathBuf::from);
    if take_flag(&mut args, &["--dump"]) {
        settings.dump_intermediates = true;
    }
    if args.is_empty() {
        bail!("missing network argument\nUsage: matproc convert <network.json>... [-t target] [-o dir]");
    }

    let mut networks = Vec::with_capacity(args.len());
    for file in &args {
        let network = VopNetwork::load(file).with_context(|| format!("loading network {}", file))?;
        networks.push(network);
        remember_input(Path::new(file));
    }

    let mut failed = 0;
    for (source, result) in pipeline::convert_selection(&networks, target, settings) {
        match result {
            Ok(recreated) => {
                let net = &recreated.network;
                let out = out_dir.clone().unwrap_or_else(|| PathBuf::from(".")).join(format!("{}.json", net.name));
                net.save(&out).with_context(|| format!("writing {}", out.display()))?;
                println!("{} -> {} ({} nodes) {}", source, net.path, net.nodes.len(), out.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", source, e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} network(s) failed", failed, networks.len());
    }
    Ok(())
}

fn cmd_test(mut args: Vec<String>) -> Result<()> {
    let material_type: Renderer = take_opt(&mut args, &["-f", "--from"])?
        .as_deref()
        .unwrap_or("arnold")
        .parse()?;
    let source_type: SourceType = take_opt(&mut args, &["-s", "--source"])?
        .as_deref()
        .unwrap_or("hou_vop_nodes")
        .parse()?;
    let name = take_opt(&mut args, &["-n", "--name"])?.unwrap_or_else(|| "test_material".to_string());
    let json = take_flag(&mut args, &["--json", "-j"]);
    let [tree, outputs] = args.as_slice() else {
        bail!("Usage: matproc test <tree.json> <outputs.json> [-f renderer] [-s source] [--json]");
    };

    let dump = TraversalDump::load(tree, outputs).context("loading traversal dump")?;
    let material = pipeline::ingest_dump(&dump, &name, material_type, source_type);
    if json {
        println!("{}", serde_json::to_string_pretty(&material)?);
    } else {
        print!("{}", material);
    }
    Ok(())
}

fn cmd_usd(mut args: Vec<String>, settings: &mut Settings) -> Result<()> {
    let target = take_target(&mut args, settings)?;
    if take_flag(&mut args, &["--no-reassign"]) {
        settings.reassign_prims = false;
    }
    if let Some(scope) = take_opt(&mut args, &["--scope"])? {
        settings.parent_scope = scope;
    }
    let [input, output] = args.as_slice() else {
        bail!("Usage: matproc usd <in.usda> <out.usda> [-t target] [--scope path] [--no-reassign]");
    };

    let mut stage = Stage::open(input).with_context(|| format!("opening {}", input))?;
    remember_input(Path::new(input));

    let report = pipeline::convert_stage(&mut stage, target, settings);
    for converted in &report.converted {
        println!(
            "{} -> {} ({} prim(s) rebound)",
            converted.source_path,
            converted.material_path,
            converted.rebound.len()
        );
    }
    for (path, e) in &report.failures {
        eprintln!("{}: {}", path, e);
    }
    stage.save(output).with_context(|| format!("writing {}", output))?;
    info!("wrote {}", output);
    Ok(())
}

fn cmd_collect(mut args: Vec<String>, settings: &mut Settings) -> Result<()> {
    let preview = take_flag(&mut args, &["--preview"]);
    let arnold = take_flag(&mut args, &["--arnold"]);
    let mtlx = take_flag(&mut args, &["--mtlx"]);
    if preview || arnold || mtlx {
        settings.collect_preview = preview;
        settings.collect_arnold = arnold;
        settings.collect_mtlx = mtlx;
    }
    if let Some(format) = take_opt(&mut args, &["--format"])? {
        settings.preview_texture_format = Some(format);
    }
    if take_flag(&mut args, &["--no-reassign"]) {
        settings.reassign_prims = false;
    }
    let [input, output] = args.as_slice() else {
        bail!("Usage: matproc collect <in.usda> <out.usda> [--preview] [--arnold] [--mtlx] [--format ext]");
    };

    let mut stage = Stage::open(input).with_context(|| format!("opening {}", input))?;
    remember_input(Path::new(input));
    for collected in pipeline::collect_stage(&mut stage, settings)? {
        println!("{} -> {}", collected.source_path, collected.material_path);
    }
    stage.save(output).with_context(|| format!("writing {}", output))?;
    Ok(())
}

fn cmd_info(path: &Path, settings: &Settings) -> Result<()> {
    let is_usda = path.extension().is_some_and(|e| e == "usda");
    if is_usda {
        let stage = Stage::open(path).with_context(|| format!("opening {}", path.display()))?;
        println!("Stage: {} ({} prims)", path.display(), stage.len());
        if let Some(default_prim) = &stage.default_prim {
            println!("Default prim: {}", default_prim);
        }
        let ingest = UsdShadersIngest::new(&stage);
        for prim in ingest.materials() {
            let material = ingest.ingest_material(prim);
            let kind = detect_usd_material_type(prim).map(|r| r.label()).unwrap_or("unknown");
            println!(
                "  {} [{}] {} texture(s), {} bound prim(s)",
                prim.path,
                kind,
                material.textures.len(),
                material.assigned_prims.len()
            );
        }
        return Ok(());
    }

    let network = VopNetwork::load(path).with_context(|| format!("loading {}", path.display()))?;
    let kind = detect_material_type(&network).map(|r| r.label()).unwrap_or("unknown");
    println!("Network: {} ({}, {} nodes)", network.path, kind, network.nodes.len());
    if detect_material_type(&network).is_some() {
        let material = pipeline::ingest_network(&network, settings)?;
        print!("{}", material);
    }
    Ok(())
}

fn cmd_formats() {
    println!("{:<26} LABEL", "KEY");
    for renderer in Renderer::ALL {
        println!("{:<26} {}", renderer.key(), renderer.label());
    }
}

fn print_help() {
    println!("matproc - material network converter");
    println!();
    println!("USAGE:");
    println!("    matproc [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    c, convert <network.json>... [-t target] [-o dir] [--dump]");
    println!("                                  Convert VOP network snapshots");
    println!("    t, test    <tree.json> <outputs.json> [-f renderer] [-s source] [--json]");
    println!("                                  Standardize a traversal dump and print it");
    println!("    u, usd     <in.usda> <out.usda> [-t target] [--scope path] [--no-reassign]");
    println!("                                  Convert every material on a stage");
    println!("    collect    <in.usda> <out.usda> [--preview] [--arnold] [--mtlx] [--format ext]");
    println!("                                  Build collect materials from texture sets");
    println!("    i, info    <file>             Show material type / stage materials");
    println!("    f, formats                    List renderer keys");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose     Debug output");
    println!("    -vv, --trace      Trace output");
    println!("    -q, --quiet       Errors only");
    println!("    -c, --config <f>  Settings file (default: user config dir)");
    println!("    -V, --version     Show version and build date");
}
