use std::path::PathBuf;

use dotmatrix_core::SaveStore;

/// Battery RAM persistence backed by one `.sav` file per cartridge
/// identity, stored in the directory the ROM was loaded from.
pub struct FileSaveStore {
    directory: PathBuf,
}

impl FileSaveStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn save_path(&self, id: &str) -> PathBuf {
        // Identities come from ROM header bytes; keep the file name tame.
        let stem: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.directory.join(format!("{stem}.sav"))
    }
}

impl SaveStore for FileSaveStore {
    fn load(&mut self, id: &str) -> Option<Vec<u8>> {
        let path = self.save_path(id);
        match std::fs::read(&path) {
            Ok(data) => {
                log::info!("loaded save file {}", path.display());
                Some(data)
            }
            Err(_) => None,
        }
    }

    fn save(&mut self, id: &str, data: &[u8]) {
        let path = self.save_path(id);
        match std::fs::write(&path, data) {
            Ok(()) => log::debug!("wrote save file {}", path.display()),
            Err(err) => log::error!("failed to write {}: {err}", path.display()),
        }
    }
}
