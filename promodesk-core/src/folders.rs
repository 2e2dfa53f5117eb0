// SPDX-License-Identifier: MIT

use std::{
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
};

pub fn state_folder(app_name: &str) -> std::io::Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|p| p.join("Library/Logs"))
    } else {
        dirs::state_dir().or_else(dirs::cache_dir)
    };

    let p = base
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "can't detect the state folder"))?
        .join(app_name);
    create_dir(&p)?;
    Ok(p)
}

pub fn log_folder(app_name: &str) -> std::io::Result<PathBuf> {
    state_folder(app_name)
}

pub fn config_folder(app_name: &str) -> std::io::Result<PathBuf> {
    let p = dirs::config_dir()
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "can't detect the config folder"))?
        .join(app_name);
    create_dir(&p)?;
    Ok(p)
}

pub fn create_dir(p: &Path) -> std::io::Result<()> {
    if let Err(e) = std::fs::create_dir_all(p)
        && e.kind() != ErrorKind::AlreadyExists
    {
        return Err(e);
    }

    Ok(())
}
