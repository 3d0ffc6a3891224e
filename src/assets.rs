use crate::data::PieceKind;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const CAR_MODEL: &str = "models/Car.glb";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),
}

/// Texture maps expected in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSet {
    pub dir: String,
    pub maps: Vec<String>,
}

impl TextureSet {
    /// The full map set with the conventional file names.
    pub fn auto_named(dir: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            maps: ["texture", "normal", "rough", "ao", "gloss"]
                .iter()
                .map(|name| format!("{}.png", name))
                .collect(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.maps.iter().map(|map| Path::new(&self.dir).join(map))
    }
}

pub trait AssetLoader {
    fn load_model(&mut self, path: &str) -> Result<(), AssetError>;
    fn load_textures(&mut self, set: &TextureSet) -> Result<(), AssetError>;
}

/// Accepts every request without touching the filesystem.
#[derive(Debug, Default)]
pub struct NullAssetLoader;

impl AssetLoader for NullAssetLoader {
    fn load_model(&mut self, _path: &str) -> Result<(), AssetError> {
        Ok(())
    }

    fn load_textures(&mut self, _set: &TextureSet) -> Result<(), AssetError> {
        Ok(())
    }
}

/// Resolves requests against files under an asset root, remembering what it
/// has already found.
#[derive(Debug)]
pub struct DirAssetLoader {
    root: PathBuf,
    loaded: HashSet<PathBuf>,
}

impl DirAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: HashSet::new(),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    fn fetch(&mut self, relative: &Path) -> Result<(), AssetError> {
        let path = self.root.join(relative);
        if self.loaded.contains(&path) {
            return Ok(());
        }
        if !path.is_file() {
            return Err(AssetError::NotFound(path));
        }
        debug!("Loaded asset {}", path.display());
        self.loaded.insert(path);
        Ok(())
    }
}

impl AssetLoader for DirAssetLoader {
    fn load_model(&mut self, path: &str) -> Result<(), AssetError> {
        self.fetch(Path::new(path))
    }

    fn load_textures(&mut self, set: &TextureSet) -> Result<(), AssetError> {
        for path in set.paths() {
            self.fetch(&path)?;
        }
        Ok(())
    }
}

/// Ask for a piece's model and textures; failures are only logged.
pub fn request_piece_assets(loader: &mut dyn AssetLoader, kind: PieceKind) {
    if let Err(e) = loader.load_model(&kind.model_path()) {
        warn!("{} model unavailable: {}", kind, e);
    }
    if let Err(e) = loader.load_textures(&TextureSet::auto_named(kind.texture_dir())) {
        warn!("{} textures unavailable: {}", kind, e);
    }
}

pub fn request_car_assets(loader: &mut dyn AssetLoader) {
    if let Err(e) = loader.load_model(CAR_MODEL) {
        warn!("Car model unavailable: {}", e);
    }
}
