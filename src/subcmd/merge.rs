use std::path::Path;

use anyhow::Result;
use log::info;

use crate::adapter::{ExternalStore, ResolvedImage};
use crate::config::cmd::MergeCmdArgs;
use crate::config::StoreConfig;
use crate::container::layer::align;
use crate::container::layout::{write_layout, ImageLayout};
use crate::container::rebuild::{rebuild, RebuiltImage};
use crate::error::{self, MixError};
use crate::select::merge::merge_select;
use crate::select::SourceLayers;
use crate::subcmd::{dump_layout, print_success, Recomposed, Workspace};

pub struct MergeCommand {}

impl MergeCommand {
    pub fn merge(merge_args: &MergeCmdArgs) -> Result<()> {
        let config = StoreConfig::from(&merge_args.store);
        let store = config.open();
        let workspace = Workspace::new(&config.work_dir);
        let summary = merge_images(store.as_ref(), &workspace, &merge_args.output_tag, &merge_args.images)?;
        print_success("Merge", &summary);
        Ok(())
    }
}

/// Resolves, dumps and merges `references` in order, then publishes the
/// result as `output_tag`. Every scratch directory is gone when this returns.
pub fn merge_images(
    store: &dyn ExternalStore,
    workspace: &Workspace,
    output_tag: &str,
    references: &[String],
) -> Result<Recomposed> {
    store.ensure_deps()?;
    let mut images = Vec::<ResolvedImage>::with_capacity(references.len());
    for reference in references {
        let image = store.resolve(reference)?;
        if images.iter().any(|seen| seen.id == image.id) {
            info!("{} resolves to an image already being merged, skip it", reference);
            continue;
        }
        images.push(image);
    }
    if images.is_empty() {
        return Err(MixError::NoImagesToMerge.into());
    }

    let mut scratch_dirs = Vec::with_capacity(images.len());
    let mut layouts = Vec::with_capacity(images.len());
    for image in &images {
        let (scratch, layout) = dump_layout(store, workspace, image)?;
        scratch_dirs.push(scratch);
        layouts.push(layout);
    }

    let output = workspace.scratch("output")?;
    let (image, layers) = merge_layouts(&layouts, output.path())?;
    store.publish(output.path(), output_tag)?;
    Ok(Recomposed {
        output_tag: output_tag.to_string(),
        layers,
        config_digest: image.config_blob.digest,
    })
}

/// Merges already loaded layouts into `output_dir`. The first layout is the
/// base: its config fields and version file carry over to the output.
pub fn merge_layouts(layouts: &[ImageLayout], output_dir: &Path) -> error::Result<(RebuiltImage, usize)> {
    let sources = layouts
        .iter()
        .enumerate()
        .map(|(position, layout)| {
            Ok(SourceLayers {
                position,
                records: align(layout)?,
            })
        })
        .collect::<error::Result<Vec<SourceLayers>>>()?;
    let selection = merge_select(&sources)?;
    info!("Merging {} layers from {} images", selection.layers.len(), layouts.len());

    let base = &layouts[selection.base];
    let image = rebuild(&base.config, &base.manifest, &selection.layers)?;
    write_layout(output_dir, &image, &selection.layers, &base.version_path())?;
    Ok((image, selection.layers.len()))
}
