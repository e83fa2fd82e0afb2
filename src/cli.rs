// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::app::LaunchOptions;
use crate::config::ControllerConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-base")]
#[command(about = "3D scene controller demo", long_about = None)]
pub struct Cli {
    /// JSON controller configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show the axes helper and the stats overlay
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Start with the orthographic camera
    #[arg(long, default_value = "false")]
    pub orthographic: bool,

    /// Request the GL backend instead of the primary backends
    #[arg(long = "gl", default_value = "false")]
    pub use_gl_fallback: bool,

    /// glTF/GLB model added to the scene
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Binary FBX model added to the scene
    #[arg(long)]
    pub fbx: Option<PathBuf>,

    /// Audio file played once loaded
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Log the object under the pointer on click
    #[arg(long, default_value = "false")]
    pub pick: bool,

    /// Run this many frames without a window and exit
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u64>,
}

impl Cli {
    /// Config file (or defaults) with the command-line switches applied
    pub fn controller_config(&self) -> crate::error::Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::from_json_file(path)?,
            None => ControllerConfig::default(),
        };
        config.debug |= self.debug;
        config.orthographic |= self.orthographic;
        Ok(config)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            use_gl_fallback: self.use_gl_fallback,
            model: self.model.clone(),
            fbx: self.fbx.clone(),
            audio: self.audio.clone(),
            pick: self.pick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["scene-base"]);
        assert!(!cli.debug);
        assert!(cli.headless.is_none());
        let config = cli.controller_config().unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_switches_override_config() {
        let cli = Cli::parse_from(["scene-base", "--debug", "--orthographic", "--gl", "--pick", "--headless", "3"]);
        let config = cli.controller_config().unwrap();
        assert!(config.debug);
        assert!(config.orthographic);
        assert_eq!(cli.headless, Some(3));
        let options = cli.launch_options();
        assert!(options.use_gl_fallback);
        assert!(options.pick);
    }

    #[test]
    fn test_asset_paths() {
        let cli = Cli::parse_from(["scene-base", "--model", "a.glb", "--fbx", "b.fbx", "--audio", "c.ogg"]);
        let options = cli.launch_options();
        assert_eq!(options.model, Some(PathBuf::from("a.glb")));
        assert_eq!(options.fbx, Some(PathBuf::from("b.fbx")));
        assert_eq!(options.audio, Some(PathBuf::from("c.ogg")));
    }
}
