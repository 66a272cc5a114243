use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use unicode_normalization::UnicodeNormalization as _;

use crate::canvas::FontFace;
use crate::configuration::FontPaths;
use crate::error::ContextError;

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font.
    pub descent: i16,
    /// The number of units per em of the font.
    pub units_per_em: u16,
}

/// The (insofar) relevant metrics associated to a single glyph of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    /// The horizontal advance of the glyph.
    pub width: u32,
    /// The height of the glyph.
    pub height: u32,
}

/// A TTF font loaded in memory: the raw bytes (to be embedded in the PDF documents) together
/// with the parsed face (to measure and map the text). Cloning it is cheap.
#[derive(Clone, Debug)]
pub struct FontData {
    bytes: Arc<Vec<u8>>,
    face: Arc<OwnedFace>,
    units_per_em: u16,
}

impl FontData {
    /// Reads and parses the font at the given path.
    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(format!("Failed to read the font {:?}", font_path), &error)
        })?;
        FontData::from_bytes(font_bytes)
            .map_err(|error| error.within(format!("Failed to load the font {:?}", font_path)))
    }

    /// Constructs a font from the raw data of a TTF font file.
    pub fn from_bytes(font_bytes: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(font_bytes.clone(), 0)
            .map_err(|error| ContextError::with_error("Failed to parse font", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(FontData {
            bytes: Arc::new(font_bytes),
            face: Arc::new(face),
            units_per_em,
        })
    }

    /// The raw bytes of the font file.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Retrieve the underlying font face as a reference.
    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    /// Retrieve the font metrics from the associated font face.
    pub fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    /// Retrieve the glyph ID of a specific codepoint.
    pub fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// Retrieve the total number of glyphs present in the font face.
    pub fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    /// Retrieve the mapping between the glyph IDs and the characters they render, as read
    /// from the unicode subtables of the font.
    pub fn glyph_ids(&self) -> HashMap<u16, char> {
        let font_subtables = self.face().tables().cmap.map(|cmap| {
            cmap.subtables
                .into_iter()
                .filter(|font_subtable| font_subtable.is_unicode())
        });
        let Some(font_subtables) = font_subtables else {
            return HashMap::new();
        };

        let mut gid_to_codepoint_map = HashMap::with_capacity(self.glyph_count().into());
        for font_subtable in font_subtables {
            font_subtable.codepoints(|codepoint| {
                if let Ok(character) = char::try_from(codepoint) {
                    // Glyph 0 is the missing glyph, it never maps back to a character
                    if let Some(glyph_index) = font_subtable
                        .glyph_index(codepoint)
                        .filter(|index| index.0 > 0)
                    {
                        gid_to_codepoint_map
                            .entry(glyph_index.0)
                            .or_insert(character);
                    }
                }
            })
        }

        gid_to_codepoint_map
    }

    /// Attempt to calculate the metrics of a glyph from the associated glyph ID.
    pub fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);

        let width = self.face().glyph_hor_advance(glyph_id)? as u32;
        // The height is corrected by the descender (valid for horizontally-laid fonts only)
        let height = self
            .face()
            .glyph_bounding_box(glyph_id)
            .map(|bounding_box| bounding_box.y_max - bounding_box.y_min - self.face().descender())
            .unwrap_or(1000) as u32;

        Some(GlyphMetrics { width, height })
    }

    /// The glyphs the text is drawn with, after NFC normalization. Characters the font
    /// cannot render are skipped and logged.
    pub fn glyphs_for_text(&self, text: &str) -> Vec<u16> {
        let mut glyph_id_list = Vec::new();
        for character in text.nfc() {
            if character.is_control() {
                continue;
            }
            match self.glyph_id(character) {
                Some(glyph_id) => glyph_id_list.push(glyph_id),
                None => log::warn!("Unable to find the character {:?} in the font", character),
            }
        }
        glyph_id_list
    }

    /// The width in points of the text drawn at the given font size.
    pub fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        let advance: u32 = self
            .glyphs_for_text(text)
            .into_iter()
            .filter_map(|glyph_id| self.glyph_metrics(glyph_id))
            .map(|glyph_metrics| glyph_metrics.width)
            .sum();

        advance as f32 * font_size / f32::from(self.units_per_em.max(1))
    }
}

/// The three fonts an invoice is drawn with. They are loaded once when the run starts.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub regular: FontData,
    pub bold: FontData,
    pub serif: FontData,
}

impl FontSet {
    /// Loads every font of the configuration, failing on the first one which cannot be loaded.
    pub fn load(font_paths: &FontPaths) -> Result<Self, ContextError> {
        let font_set = FontSet {
            regular: FontData::from_path(&font_paths.regular)?,
            bold: FontData::from_path(&font_paths.bold)?,
            serif: FontData::from_path(&font_paths.serif)?,
        };
        log::debug!("Loaded the fonts {:?}", font_paths);

        Ok(font_set)
    }

    pub fn get(&self, font_face: FontFace) -> &FontData {
        match font_face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Serif => &self.serif,
        }
    }
}
