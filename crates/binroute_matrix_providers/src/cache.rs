use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use fxhash::FxHasher64;

use crate::{cost_matrix::CostMatrix, travel_matrix_provider::TravelMatrixProvider};

pub const CACHE_FOLDER_ENV_VAR: &str = "BINROUTE_CACHE_FOLDER";

pub trait MatricesCache: Send + Sync {
    fn get(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
    ) -> Result<Option<CostMatrix>, anyhow::Error>;

    fn put(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
        matrix: &CostMatrix,
    ) -> Result<(), anyhow::Error>;
}

pub struct NoCache;

impl MatricesCache for NoCache {
    fn get(
        &self,
        _points: &[geo_types::Point],
        _provider: &TravelMatrixProvider,
    ) -> Result<Option<CostMatrix>, anyhow::Error> {
        Ok(None)
    }

    fn put(
        &self,
        _points: &[geo_types::Point],
        _provider: &TravelMatrixProvider,
        _matrix: &CostMatrix,
    ) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// One JSON file per (points, provider) pair in a folder.
pub struct FileCache {
    folder: PathBuf,
}

impl FileCache {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let folder = folder.into();

        if !folder.is_dir() {
            return Err(anyhow::anyhow!(
                "Path {} is not a directory",
                folder.display()
            ));
        }

        Ok(Self { folder })
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let folder = std::env::var(CACHE_FOLDER_ENV_VAR)?;
        Self::new(folder)
    }

    fn file_path(&self, points: &[geo_types::Point], provider: &TravelMatrixProvider) -> PathBuf {
        self.folder.join(cache_filename(points, provider))
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

fn cache_filename(points: &[geo_types::Point], provider: &TravelMatrixProvider) -> String {
    let mut hasher = FxHasher64::default();

    points.len().hash(&mut hasher);
    for point in points {
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
    provider.hash(&mut hasher);

    format!("{:016x}.json", hasher.finish())
}

impl MatricesCache for FileCache {
    fn get(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
    ) -> Result<Option<CostMatrix>, anyhow::Error> {
        let file_path = self.file_path(points, provider);

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let matrix: CostMatrix = serde_json::from_reader(file)?;

        if matrix.num_locations() != points.len() {
            return Ok(None);
        }

        Ok(Some(matrix))
    }

    fn put(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
        matrix: &CostMatrix,
    ) -> Result<(), anyhow::Error> {
        let file = std::fs::File::create(self.file_path(points, provider))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, matrix)?;
        writer.flush()?;

        Ok(())
    }
}
