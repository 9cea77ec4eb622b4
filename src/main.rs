use std::path::{Path, PathBuf};

use lumen::{AppConfig, Scene};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let config = AppConfig::new().models(paths);

    let scene = if !config.model_paths.is_empty() {
        Scene::from_paths(&config.model_paths)
    } else if Path::new("assets/indoor").is_dir() {
        Scene::indoor("assets")
    } else {
        log::info!("no models given and no assets/indoor directory, using primitive scene");
        Scene::primitives()
    };

    let scene = if scene.is_empty() {
        log::warn!("requested models produced no geometry, using primitive scene");
        Scene::primitives()
    } else {
        scene
    };

    lumen::run(config, scene)?;
    Ok(())
}
