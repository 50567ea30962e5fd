use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dotmatrix_common::app::App;
use dotmatrix_core::{EmulatorApp, SaveStore};
use dotmatrix_sdl2::{SdlContext, SdlInitInfo};

mod save;

use save::FileSaveStore;

/// Load the ROM at `rom_path` and run it in an SDL window until the user
/// closes it. Battery RAM persists as a `.sav` file next to the ROM.
pub fn run(rom_path: &str) -> Result<()> {
    let rom = std::fs::read(rom_path).with_context(|| format!("reading ROM {rom_path}"))?;
    log::info!("read {} bytes from '{}'", rom.len(), rom_path);

    let save_dir = Path::new(rom_path)
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let save_store: Box<dyn SaveStore> = Box::new(FileSaveStore::new(save_dir));

    let app = EmulatorApp::new(rom, save_store)?;

    let init_info = SdlInitInfo::builder()
        .width(app.width())
        .height(app.height())
        .scale(app.scale())
        .title(app.title())
        .build();
    SdlContext::run(init_info, app)?;
    Ok(())
}
