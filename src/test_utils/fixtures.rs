//! Test fixtures: zip archives and a launcher directory tree.

use crate::config::ConfigStore;
use crate::orchestrator::OrchestratorOptions;
use crate::release::{ReleaseDescriptor, VersionTag, artifact_file_name};
use crate::replace::{DisposalStrategy, SelfReplacer};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Clone, Debug)]
enum FixtureEntry {
    Dir(String),
    File {
        name: String,
        data: Vec<u8>,
        mode: Option<u32>,
    },
}

/// Builder for in-memory zip archives.
#[derive(Clone, Debug, Default)]
pub struct ZipFixture {
    entries: Vec<FixtureEntry>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory marker (`name` should end with `/`).
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(FixtureEntry::Dir(name.to_string()));
        self
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(FixtureEntry::File {
            name: name.to_string(),
            data: data.to_vec(),
            mode: None,
        });
        self
    }

    /// Adds a file with mode `0o755`.
    pub fn executable(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(FixtureEntry::File {
            name: name.to_string(),
            data: data.to_vec(),
            mode: Some(0o755),
        });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for entry in &self.entries {
            match entry {
                FixtureEntry::Dir(name) => writer.add_directory(name.as_str(), options).unwrap(),
                FixtureEntry::File {
                    name,
                    data,
                    mode,
                } => {
                    let options = match mode {
                        Some(mode) => options.unix_permissions(*mode),
                        None => options,
                    };
                    writer.start_file(name.as_str(), options).unwrap();
                    writer.write_all(data).unwrap();
                }
            }
        }
        writer.finish().unwrap().into_inner()
    }

    /// Writes the archive to `path` and returns it.
    pub fn write(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, self.to_bytes()).unwrap();
        path.to_path_buf()
    }
}

/// An installed application with the launcher one level down:
///
/// ```text
/// <root>/                 install dir
/// <root>/Launcher/app.exe running executable
/// <root>/Launcher/app.dll auxiliary file
/// <root>/Launcher/app.toml
/// <root>/Launcher/Temp    scratch dir
/// ```
pub struct AppTree {
    pub temp: TempDir,
}

impl AppTree {
    pub const SECTION: &'static str = "app";

    /// Creates the tree with `current_version` recorded in the config.
    pub fn new(current_version: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let tree = Self {
            temp,
        };
        fs::create_dir_all(tree.launcher_dir()).unwrap();
        fs::write(tree.exe(), "old exe").unwrap();
        fs::write(tree.dll(), "old dll").unwrap();
        fs::write(
            tree.config(),
            format!(
                "# launcher settings\n[app]\ncurrent_version = \"{current_version}\"\nlatest_version_uri = \"http://127.0.0.1:1/latest\"\nauxiliary_files = [\"app.dll\"]\nartifact_base_name = \"app\"\n"
            ),
        )
        .unwrap();
        tree
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn launcher_dir(&self) -> PathBuf {
        self.root().join("Launcher")
    }

    pub fn exe(&self) -> PathBuf {
        self.launcher_dir().join("app.exe")
    }

    pub fn dll(&self) -> PathBuf {
        self.launcher_dir().join("app.dll")
    }

    pub fn config(&self) -> PathBuf {
        self.launcher_dir().join("app.toml")
    }

    pub fn scratch(&self) -> PathBuf {
        self.launcher_dir().join("Temp")
    }

    pub fn replacer(&self, strategy: DisposalStrategy) -> SelfReplacer {
        SelfReplacer::new(vec![self.exe(), self.dll()], ".old", strategy, Duration::from_millis(10))
    }

    /// Options reading the current version from the config file.
    pub fn options(&self) -> OrchestratorOptions {
        OrchestratorOptions::new(self.recorded_version(), self.root(), self.scratch())
            .with_version_record(self.config(), Self::SECTION)
    }

    /// The version currently written in the config file.
    pub fn recorded_version(&self) -> String {
        let content = fs::read_to_string(self.config()).unwrap();
        ConfigStore::parse(self.config(), &content)
            .unwrap()
            .get(Self::SECTION, "current_version")
            .unwrap()
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// A release whose artifacts replace both launcher files.
    pub fn full_release(&self, tag: &str) -> ZipFixture {
        ZipFixture::new()
            .dir("Launcher/")
            .file("Launcher/app.exe", format!("exe {tag}").as_bytes())
            .file("Launcher/app.dll", format!("dll {tag}").as_bytes())
            .file("data/readme.txt", format!("readme {tag}").as_bytes())
    }
}

/// Descriptor for artifacts named by convention under `base_url`.
pub fn release_at(base_url: &str, tag: &str) -> ReleaseDescriptor {
    let base = base_url.trim_end_matches('/');
    ReleaseDescriptor {
        latest_version_tag: VersionTag::new(tag),
        clean_artifact_uri: format!("{base}/{}", artifact_file_name("app", tag, true)),
        patch_artifact_uri: format!("{base}/{}", artifact_file_name("app", tag, false)),
        notes_uri: Some(format!("{base}/notes/{tag}")),
    }
}
