use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use tar::{Builder, EntryType, Header};

use crate::container::layout::{MANIFEST_FILE, VERSION_FILE};
use crate::util::sha::bytes_sha256;

pub const VERSION_TEXT: &str = "Directory Transport Version: 1.1\n";

enum Entry {
    Layer { created_by: String, blob: Vec<u8> },
    Empty(String),
}

/// Writes directory-transport layouts the way skopeo dumps them from a
/// daemon, with real tar blobs so digests and unpacking behave for real.
pub struct LayoutBuilder {
    architecture: String,
    entries: Vec<Entry>,
}

impl LayoutBuilder {
    pub fn new() -> LayoutBuilder {
        LayoutBuilder {
            architecture: "amd64".to_string(),
            entries: vec![],
        }
    }

    pub fn architecture(mut self, architecture: &str) -> LayoutBuilder {
        self.architecture = architecture.to_string();
        self
    }

    pub fn layer(mut self, created_by: &str, files: &[(&str, &str)]) -> LayoutBuilder {
        self.entries.push(Entry::Layer {
            created_by: created_by.to_string(),
            blob: tar_bytes(files),
        });
        self
    }

    pub fn gzip_layer(mut self, created_by: &str, files: &[(&str, &str)]) -> LayoutBuilder {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&tar_bytes(files)).unwrap();
        self.entries.push(Entry::Layer {
            created_by: created_by.to_string(),
            blob: encoder.finish().unwrap(),
        });
        self
    }

    pub fn symlink_layer(mut self, created_by: &str, link: &str, points_to: &str) -> LayoutBuilder {
        let mut builder = Builder::new(Vec::new());
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_mtime(0);
        builder.append_link(&mut header, link, points_to).unwrap();
        self.entries.push(Entry::Layer {
            created_by: created_by.to_string(),
            blob: builder.into_inner().unwrap(),
        });
        self
    }

    pub fn empty(mut self, created_by: &str) -> LayoutBuilder {
        self.entries.push(Entry::Empty(created_by.to_string()));
        self
    }

    pub fn write(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let mut history = Vec::<Value>::new();
        let mut layers = Vec::<Value>::new();
        let mut diff_ids = Vec::<Value>::new();
        for entry in &self.entries {
            match entry {
                Entry::Layer { created_by, blob } => {
                    let sha256 = bytes_sha256(blob);
                    fs::write(dir.join(&sha256), blob)?;
                    let digest = format!("sha256:{}", sha256);
                    layers.push(json!({
                        "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                        "size": blob.len(),
                        "digest": digest,
                    }));
                    diff_ids.push(json!(digest));
                    history.push(json!({"created": "2018-01-09T21:10:58Z", "created_by": created_by}));
                }
                Entry::Empty(created_by) => {
                    history.push(json!({
                        "created": "2018-01-09T21:10:58Z",
                        "created_by": created_by,
                        "empty_layer": true,
                    }));
                }
            }
        }
        let config = json!({
            "architecture": self.architecture,
            "config": {"Env": ["PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"], "Cmd": ["/bin/sh"]},
            "created": "2018-01-09T21:10:58Z",
            "history": history,
            "os": "linux",
            "rootfs": {"type": "layers", "diff_ids": diff_ids},
        });
        let config_json = serde_json::to_string(&config)?;
        let config_sha256 = bytes_sha256(config_json.as_bytes());
        fs::write(dir.join(&config_sha256), &config_json)?;
        let manifest = json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {
                "mediaType": "application/vnd.docker.container.image.v1+json",
                "size": config_json.len(),
                "digest": format!("sha256:{}", config_sha256),
            },
            "layers": layers,
        });
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_string(&manifest)?)?;
        fs::write(dir.join(VERSION_FILE), VERSION_TEXT)?;
        Ok(())
    }
}

pub fn tar_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}
