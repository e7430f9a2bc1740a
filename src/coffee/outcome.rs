//! Outcome table: what each d20 roll brews.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Lowest and highest face of the die.
pub const MIN_ROLL: u8 = 1;
pub const MAX_ROLL: u8 = 20;

const CAPTIONS: [&str; MAX_ROLL as usize] = [
    "Burnt battery acid",
    "Cold and sour",
    "Instant regret",
    "Overbrewed sludge",
    "Watery disappointment",
    "Smells better than it tastes",
    "Vending machine sadness",
    "Bitter but tolerable",
    "Average brew",
    "Solid morning fuel",
    "Coffee shop standard",
    "Fair trade, full body",
    "Cold brew from Elven woods",
    "Magical morning blend",
    "Sipped with eyes closed",
    "Barista sang while making it",
    "Tastes like victory",
    "Masterwork espresso",
    "Divine roast",
    "COFFEE OF THE GODS",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("roll {0} is outside 1..=20")]
    OutOfRange(i64),

    #[error("roll {0} has an empty caption")]
    EmptyCaption(u8),

    #[error("image for roll {roll} not found at {}", path.display())]
    AssetMissing { roll: u8, path: PathBuf },
}

/// Immutable roll -> (caption, image) mapping, built once at startup.
#[derive(Debug, Clone)]
pub struct OutcomeTable {
    captions: [&'static str; MAX_ROLL as usize],
    images: Vec<PathBuf>,
}

impl OutcomeTable {
    /// Build the table with images resolved as `<dice_dir>/<roll>.png`.
    ///
    /// Fails if any caption is empty. Image files are not touched here,
    /// see [`OutcomeTable::verify_assets`].
    pub fn new(dice_dir: impl AsRef<Path>) -> Result<Self, OutcomeError> {
        Self::from_parts(CAPTIONS, dice_dir.as_ref())
    }

    fn from_parts(
        captions: [&'static str; MAX_ROLL as usize],
        dice_dir: &Path,
    ) -> Result<Self, OutcomeError> {
        if let Some(pos) = captions.iter().position(|c| c.trim().is_empty()) {
            return Err(OutcomeError::EmptyCaption(pos as u8 + MIN_ROLL));
        }

        let images = (MIN_ROLL..=MAX_ROLL)
            .map(|roll| dice_dir.join(format!("{roll}.png")))
            .collect();

        Ok(Self { captions, images })
    }

    /// Check that every image file exists on disk.
    pub fn verify_assets(&self) -> Result<(), OutcomeError> {
        for (idx, path) in self.images.iter().enumerate() {
            if !path.is_file() {
                return Err(OutcomeError::AssetMissing {
                    roll: idx as u8 + MIN_ROLL,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn caption_for(&self, roll: i64) -> Result<&'static str, OutcomeError> {
        Ok(self.captions[Self::index(roll)?])
    }

    pub fn image_for(&self, roll: i64) -> Result<&Path, OutcomeError> {
        Ok(&self.images[Self::index(roll)?])
    }

    fn index(roll: i64) -> Result<usize, OutcomeError> {
        if (MIN_ROLL as i64..=MAX_ROLL as i64).contains(&roll) {
            Ok((roll - MIN_ROLL as i64) as usize)
        } else {
            Err(OutcomeError::OutOfRange(roll))
        }
    }
}
