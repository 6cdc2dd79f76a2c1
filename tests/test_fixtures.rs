//! Test fixtures for webuiflasher testing
//!
//! Creates temporary workspaces with a sources.yaml manifest, a fetchdir with
//! downloaded firmware binaries, and local PlatformIO project skeletons.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temporary flashing workspace: manifest plus fetchdir
pub struct FlashingWorkspace {
    pub dir: TempDir,
}

impl FlashingWorkspace {
    /// Create a workspace with a two-entry manifest (one github, one local)
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let fetchdir = dir.path().join("tmpfw");
        fs::create_dir_all(&fetchdir)?;

        let manifest = format!(
            r#"fetchdir: {}
sources:
  - name: km271
    type: github
    platform: esp32
    repo: dewenni/ESP_Buderus_KM271
    asset: "*.factory.bin"
  - name: blinkenlights
    type: local
    platform: esp32
    path: {}
"#,
            fetchdir.display(),
            dir.path().join("blinkenlights").display(),
        );
        fs::write(dir.path().join("sources.yaml"), manifest)?;

        Ok(Self { dir })
    }

    pub fn manifest_path(&self) -> std::path::PathBuf {
        self.dir.path().join("sources.yaml")
    }

    pub fn fetchdir(&self) -> std::path::PathBuf {
        self.dir.path().join("tmpfw")
    }

    /// Pretend a firmware binary was downloaded
    #[allow(dead_code)]
    pub fn write_firmware(&self, name: &str, size: usize) -> std::io::Result<()> {
        fs::write(
            self.fetchdir().join(format!("{}.bin", name)),
            vec![0xE9; size],
        )
    }

    /// Record the downloaded release tag for a firmware
    #[allow(dead_code)]
    pub fn write_version(&self, name: &str, tag: &str) -> std::io::Result<()> {
        fs::write(self.fetchdir().join(format!("{}.version", name)), tag)
    }

    /// Create a minimal PlatformIO project tree for the local source
    #[allow(dead_code)]
    pub fn create_local_project(&self) -> std::io::Result<()> {
        let project = self.dir.path().join("blinkenlights");
        fs::create_dir_all(project.join("src"))?;
        fs::write(
            project.join("platformio.ini"),
            r#"[env:esp32dev]
platform = espressif32
board = esp32dev
framework = arduino
"#,
        )?;
        fs::write(
            project.join("src/main.cpp"),
            "#include <Arduino.h>\nvoid setup() {}\nvoid loop() {}\n",
        )?;
        Ok(())
    }

    /// Create build artifacts the way a finished pio run leaves them
    #[allow(dead_code)]
    pub fn create_build_artifacts(&self, env_name: &str, with_boot_app0: bool) -> std::io::Result<()> {
        let build = self
            .dir
            .path()
            .join("blinkenlights")
            .join(".pio")
            .join("build")
            .join(env_name);
        fs::create_dir_all(&build)?;
        fs::write(build.join("bootloader.bin"), vec![0u8; 128])?;
        fs::write(build.join("partitions.bin"), vec![0u8; 64])?;
        fs::write(build.join("firmware.bin"), vec![0u8; 1024])?;
        if with_boot_app0 {
            fs::write(build.join("boot_app0.bin"), vec![0u8; 32])?;
        }
        Ok(())
    }
}

/// Write a manifest with the given YAML body into a fresh temp dir
#[allow(dead_code)]
pub fn manifest_from_str(yaml: &str) -> std::io::Result<(TempDir, std::path::PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sources.yaml");
    fs::write(&path, yaml)?;
    Ok((dir, path))
}

#[allow(dead_code)]
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}
