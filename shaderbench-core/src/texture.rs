//! The four fixed texture slots and the payload format they are persisted in.
//!
//! A payload is base64 encoded PNG data. An empty payload means the slot was cleared.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::TextureError;

/// Number of texture slots a shader can sample from.
pub const SLOT_COUNT: usize = 4;

/// Edge length of the black image a cleared slot holds.
pub const PLACEHOLDER_SIZE: u32 = 256;

/// One of the fixed sampler slots. The slot name doubles as the sampler uniform name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    Slot0,
    Slot1,
    Slot2,
    Slot3,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; SLOT_COUNT] = [
        TextureSlot::Slot0,
        TextureSlot::Slot1,
        TextureSlot::Slot2,
        TextureSlot::Slot3,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Texture unit the slot binds to.
    pub fn unit(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureSlot::Slot0 => "slot0",
            TextureSlot::Slot1 => "slot1",
            TextureSlot::Slot2 => "slot2",
            TextureSlot::Slot3 => "slot3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

impl std::fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TextureSlot {
    type Err = TextureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TextureError::UnknownSlot(s.to_string()))
    }
}

/// The solid black image a cleared slot is filled with.
pub fn placeholder_image() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        Rgba([0, 0, 0, 255]),
    ))
}

/// Encodes an image as a persisted payload.
pub fn encode_payload(image: &DynamicImage) -> Result<String, TextureError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(STANDARD.encode(bytes))
}

/// Decodes a persisted payload. An empty payload is a cleared slot.
pub fn decode_payload(payload: &str) -> Result<Option<DynamicImage>, TextureError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }
    let bytes = STANDARD.decode(payload)?;
    Ok(Some(image::load_from_memory(&bytes)?))
}

/// Decodes every known slot of a project's texture data in parallel. Entries whose key is not a
/// slot name are skipped.
pub fn decode_slots(
    data: &IndexMap<String, String>,
) -> Vec<(TextureSlot, Result<Option<DynamicImage>, TextureError>)> {
    let entries: Vec<(TextureSlot, &str)> = data
        .iter()
        .filter_map(|(name, payload)| {
            TextureSlot::from_name(name).map(|slot| (slot, payload.as_str()))
        })
        .collect();

    entries
        .into_par_iter()
        .map(|(slot, payload)| (slot, decode_payload(payload)))
        .collect()
}
