use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::core::catalog::MediaCatalog;
use crate::core::error::InsufficientMedia;
use crate::core::media::MediaFile;

/// Result of a draw. `warning` is set when the catalog could not fill
/// every requested slot; `files` is then shorter than requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub files: Vec<MediaFile>,
    pub warning: Option<InsufficientMedia>,
}

/// Picks working sets from a catalog. Without replacement inside one
/// draw, independent across draws.
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn draw(&mut self, catalog: &MediaCatalog, count: usize) -> Draw {
        let files: Vec<MediaFile> = catalog
            .files()
            .choose_multiple(&mut self.rng, count)
            .cloned()
            .collect();

        let warning = (files.len() < count).then(|| InsufficientMedia {
            requested: count,
            available: files.len(),
        });
        if let Some(warning) = &warning {
            log::warn!("{}", warning);
        }

        Draw { files, warning }
    }

    /// Like `draw`, but prefers files not in `exclude`. Falls back to the
    /// whole catalog when the fresh candidates run out.
    pub fn draw_excluding(&mut self, catalog: &MediaCatalog, count: usize, exclude: &[MediaFile]) -> Vec<MediaFile> {
        let mut fresh: Vec<&MediaFile> = catalog.files().iter().filter(|f| !exclude.contains(f)).collect();
        fresh.shuffle(&mut self.rng);
        let mut picked: Vec<MediaFile> = fresh.into_iter().take(count).cloned().collect();

        if picked.len() < count {
            let mut reused: Vec<&MediaFile> = catalog.files().iter().filter(|f| !picked.contains(f)).collect();
            reused.shuffle(&mut self.rng);
            let missing = count - picked.len();
            picked.extend(reused.into_iter().take(missing).cloned());
        }

        picked
    }

    /// The same file in every slot, for "play this video everywhere".
    pub fn select_one(file: &MediaFile, count: usize) -> Vec<MediaFile> {
        vec![file.clone(); count]
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
