//! Member file storage
//!
//! Reads and writes the member file through the [`FileSystem`] boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::persistence::{LoadReport, PersistenceCodec};
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::Hierarchy;
use crate::infrastructure::traits::FileSystem;

pub struct MemberStore {
    fs: Arc<dyn FileSystem>,
    codec: PersistenceCodec,
}

impl MemberStore {
    pub fn new(fs: Arc<dyn FileSystem>, codec: PersistenceCodec) -> Self {
        Self { fs, codec }
    }

    /// Load the member file. A missing file is an empty hierarchy.
    pub fn load(&self, path: &Path) -> ApplicationResult<(Hierarchy, LoadReport)> {
        if !self.fs.exists(path) {
            debug!("load: {} does not exist, starting empty", path.display());
            return Ok((Hierarchy::new(self.codec.topology()), LoadReport::default()));
        }
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read member file", path)?;
        let (hierarchy, report) = self.codec.deserialize_with_report(&text);
        info!("loaded {} members from {}", hierarchy.len(), path.display());
        Ok((hierarchy, report))
    }

    /// Write the member file, replacing any previous content.
    ///
    /// Content goes to a sibling temp file first and is renamed into place.
    pub fn save(&self, path: &Path, hierarchy: &Hierarchy) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;

        let tmp = temp_path(path);
        self.fs
            .write(&tmp, &self.codec.serialize(hierarchy))
            .with_path_context("write member file", &tmp)?;
        self.fs
            .rename(&tmp, path)
            .with_path_context("replace member file", path)?;
        info!("saved {} members to {}", hierarchy.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_data_file_when_building_temp_path_then_sibling_with_suffix() {
        assert_eq!(
            temp_path(Path::new("/data/members.tsv")),
            PathBuf::from("/data/members.tsv.tmp")
        );
    }
}
