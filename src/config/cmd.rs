use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Error;
use clap::Parser;

use crate::config::StoreKind;

#[derive(Parser)]
#[clap(about = "Merge and slice container images layer by layer", version)]
pub enum CmdArgs {
    /// Merge the unique layers of several images into a single image
    Merge(MergeCmdArgs),
    /// Keep the base layer and every layer whose build command matches a filter
    Slice(SliceCmdArgs),
    /// Show manifest, config and layer history of an image
    Show(ShowCmdArgs),
    /// Flatten the layers of an image into a root filesystem directory
    Unpack(UnpackCmdArgs),
}

#[derive(clap::Args, Clone, Debug)]
pub struct StoreArgs {
    /// Image store. 'docker' (docker daemon via skopeo) or 'dir:/path/to/store'
    #[clap(long, env = "LAYERMIX_STORE", default_value = "docker")]
    pub store: StoreKind,

    /// skopeo binary
    #[clap(long, env = "LAYERMIX_SKOPEO", default_value = "skopeo")]
    pub skopeo: String,

    /// docker binary
    #[clap(long, env = "LAYERMIX_DOCKER", default_value = "docker")]
    pub docker: String,

    /// Timeout in seconds for every external store command
    #[clap(long, env = "LAYERMIX_TIMEOUT", default_value = "600")]
    pub timeout: u64,

    /// Parent directory for scratch layouts. Defaults to the system temp dir
    #[clap(long, env = "LAYERMIX_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct MergeCmdArgs {
    /// Tag of the merged image
    pub output_tag: String,

    /// Source images, earlier images win on duplicate layers and config fields
    pub images: Vec<String>,

    #[clap(flatten)]
    pub store: StoreArgs,
}

#[derive(clap::Args)]
pub struct SliceCmdArgs {
    /// Tag of the sliced image
    pub output_tag: String,

    /// Image to slice
    pub input_tag: String,

    /// Keep layers whose build command contains this text. Repeatable
    #[clap(long = "filter", short)]
    pub filters: Vec<String>,

    #[clap(flatten)]
    pub store: StoreArgs,
}

#[derive(clap::Args)]
pub struct ShowCmdArgs {
    /// Image reference, or 'dir:/path/to/layout'
    pub source: ImageSource,

    #[clap(flatten)]
    pub store: StoreArgs,
}

#[derive(clap::Args)]
pub struct UnpackCmdArgs {
    /// Image reference, or 'dir:/path/to/layout'
    pub source: ImageSource,

    /// Directory to unpack into
    pub target: PathBuf,

    #[clap(flatten)]
    pub store: StoreArgs,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    Layout(PathBuf),
    Reference(String),
}

impl FromStr for ImageSource {
    type Err = Error;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        if let Some(path) = arg.strip_prefix("dir:") {
            if path.is_empty() {
                return Err(Error::msg("empty layout path"));
            }
            return Ok(ImageSource::Layout(PathBuf::from(path)));
        }
        let reference = arg.strip_prefix("docker-daemon:").unwrap_or(arg);
        if reference.is_empty() {
            return Err(Error::msg("empty image reference"));
        }
        Ok(ImageSource::Reference(reference.to_string()))
    }
}
