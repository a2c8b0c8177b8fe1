use anyhow::Result;
use colored::Colorize;
use log::warn;
use serde_json::Value;

use crate::config::cmd::ShowCmdArgs;
use crate::config::StoreConfig;
use crate::container::layer::align;
use crate::container::layout::ImageLayout;
use crate::subcmd::{open_source, Workspace};

pub struct ShowInfoCommand {}

impl ShowInfoCommand {
    pub fn show(show_args: &ShowCmdArgs) -> Result<()> {
        let config = StoreConfig::from(&show_args.store);
        let store = config.open();
        let workspace = Workspace::new(&config.work_dir);
        let (_scratch, layout) = open_source(&show_args.source, store.as_ref(), &workspace)?;
        print_image_detail(describe(&layout)?)?;
        Ok(())
    }
}

fn print_image_detail(info: ImageShowInfo) -> Result<()> {
    let manifest_pretty = serde_json::to_string_pretty(&info.manifest)?;
    let cmd = info.cmds.map(|v| format!("{:?}", v).green()).unwrap_or_else(|| "NONE".yellow());
    let vec = vec![
        ("MANIFEST_TYPE", info.manifest_type.green()),
        ("CONFIG", info.config_digest.green()),
        ("OS", info.os.map(|os| os.green()).unwrap_or_else(|| "NOT SET".yellow())),
        (
            "ARCH",
            info.arch.map(|arch| arch.green()).unwrap_or_else(|| "NOT SET".yellow()),
        ),
        ("CMD", cmd),
        ("LAYER_COUNT", info.layer_count.to_string().green()),
    ];
    println!("\n{}\n", "IMAGE DETAILS".cyan());
    for (name, value) in vec {
        println!("{:16}: {}", name.blue(), value);
    }
    println!("{:16}:", "HISTORY".blue());
    for entry in &info.history {
        let layer = match &entry.layer {
            Some(layer) => format!("{} {:>12}", layer.short_hash, layer.size).cyan(),
            None if entry.empty => format!("{:25}", "(empty)").yellow(),
            None => format!("{:25}", "(no layer)").red(),
        };
        let created_by = entry.created_by.as_deref().map(|c| c.green()).unwrap_or_else(|| "UNKNOWN".yellow());
        println!("  {}  {}", layer, created_by);
    }
    println!("\n{:16}:\n{}\n", "MANIFEST_RAW".blue(), manifest_pretty.green());
    Ok(())
}

/// Collects what `show` prints. History entries are paired with manifest
/// layers in order; a layout where the two do not line up is still shown.
fn describe(layout: &ImageLayout) -> Result<ImageShowInfo> {
    if let Err(e) = align(layout) {
        warn!("{}", e);
    }
    let mut layers = layout.manifest.layers.iter().map(|descriptor| LayerShowInfo {
        short_hash: descriptor.digest.trim_start_matches("sha256:").chars().take(12).collect(),
        size: descriptor.size,
    });
    let mut history = Vec::with_capacity(layout.config.history.len());
    for entry in &layout.config.history {
        let empty = entry.is_empty_layer();
        history.push(HistoryShowInfo {
            created_by: entry.created_by.clone(),
            layer: if empty { None } else { layers.next() },
            empty,
        });
    }
    // layers no history entry accounts for
    history.extend(layers.map(|layer| HistoryShowInfo {
        created_by: None,
        layer: Some(layer),
        empty: false,
    }));

    let cmds = layout
        .config
        .extra
        .get("config")
        .and_then(|c| c.get("Cmd"))
        .and_then(Value::as_array)
        .map(|cmd| cmd.iter().filter_map(Value::as_str).map(str::to_string).collect());
    Ok(ImageShowInfo {
        manifest_type: layout.manifest.manifest_type().to_string(),
        config_digest: layout.config_digest.to_string(),
        arch: layout.config.architecture().map(str::to_string),
        os: layout.config.os().map(str::to_string),
        cmds,
        layer_count: layout.manifest.layers.len(),
        history,
        manifest: serde_json::to_value(&layout.manifest)?,
    })
}

struct ImageShowInfo {
    manifest_type: String,
    config_digest: String,
    arch: Option<String>,
    os: Option<String>,
    cmds: Option<Vec<String>>,
    layer_count: usize,
    history: Vec<HistoryShowInfo>,
    manifest: Value,
}

struct HistoryShowInfo {
    created_by: Option<String>,
    layer: Option<LayerShowInfo>,
    empty: bool,
}

struct LayerShowInfo {
    short_hash: String,
    size: u64,
}
