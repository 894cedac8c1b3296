//! Palette quantizer for lossy PNG output.
//!
//! Reduces a raster to a fixed colour budget and writes an 8-bit indexed PNG,
//! the "TinyPNG" trick: the container stays standard PNG but the pixel data
//! shrinks to one byte per pixel with far more repetition for deflate.
//!
//! - Rasters that already use ≤ `colors` distinct RGBA values get an exact
//!   palette, so the output is lossless.
//! - Everything else goes through NeuQuant (`color_quant`).
//!
//! Translucent palette entries are sorted to the front so the `tRNS` chunk
//! only has to list those.
//!
//! The quantizer is a process-wide singleton, created on first use by
//! [`quantizer`]. Later calls return the same instance; there is no teardown.

use super::raster::Raster;
use color_quant::NeuQuant;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// NeuQuant sampling factor: 1 = every pixel (slowest, best), 30 = fastest.
const DEFAULT_SAMPLE_FACTOR: i32 = 10;

static QUANTIZER: OnceLock<Quantizer> = OnceLock::new();
static INITIALIZATIONS: AtomicUsize = AtomicUsize::new(0);

/// The shared quantizer, initialised on first call.
pub fn quantizer() -> &'static Quantizer {
    QUANTIZER.get_or_init(|| {
        INITIALIZATIONS.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(sample_factor = DEFAULT_SAMPLE_FACTOR, "palette quantizer initialized");
        Quantizer::new(DEFAULT_SAMPLE_FACTOR)
    })
}

/// How many times the singleton has been constructed (0 or 1).
pub fn initializations() -> usize {
    INITIALIZATIONS.load(Ordering::Relaxed)
}

#[derive(Debug)]
pub struct Quantizer {
    sample_factor: i32,
}

/// A raster reduced to palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palettized {
    /// RGBA entries; translucent ones first.
    pub palette: Vec<[u8; 4]>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    /// Whether the palette reproduces the source exactly.
    pub exact: bool,
}

impl Quantizer {
    pub fn new(sample_factor: i32) -> Self {
        Self {
            sample_factor: sample_factor.clamp(1, 30),
        }
    }

    /// Map every pixel onto a palette of at most `colors` entries (2–256).
    pub fn quantize(&self, raster: &Raster, colors: usize) -> Palettized {
        let colors = colors.clamp(2, 256);
        let palettized = match exact_palette(raster.pixels(), colors) {
            Some(exact) => exact,
            None => self.neuquant(raster.pixels(), colors),
        };
        translucent_first(palettized)
    }

    /// Quantize and write the result as an indexed PNG.
    pub fn encode_png(&self, raster: &Raster, colors: usize) -> Result<Vec<u8>, png::EncodingError> {
        let palettized = self.quantize(raster, colors);
        tracing::debug!(
            width = raster.width(),
            height = raster.height(),
            palette = palettized.palette.len(),
            exact = palettized.exact,
            "writing indexed png"
        );
        write_indexed_png(raster.width(), raster.height(), &palettized)
    }

    fn neuquant(&self, pixels: &[u8], colors: usize) -> Palettized {
        let nq = NeuQuant::new(self.sample_factor, colors, pixels);
        let palette = nq
            .color_map_rgba()
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        let indices = pixels
            .chunks_exact(4)
            .map(|px| nq.index_of(px) as u8)
            .collect();
        Palettized {
            palette,
            indices,
            exact: false,
        }
    }
}

/// Build a palette from the distinct colours, or `None` if there are too many.
fn exact_palette(pixels: &[u8], colors: usize) -> Option<Palettized> {
    let mut lookup: HashMap<[u8; 4], u8> = HashMap::new();
    let mut palette = Vec::new();
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let rgba = [px[0], px[1], px[2], px[3]];
        let idx = match lookup.get(&rgba) {
            Some(&idx) => idx,
            None => {
                if palette.len() == colors {
                    return None;
                }
                let idx = palette.len() as u8;
                lookup.insert(rgba, idx);
                palette.push(rgba);
                idx
            }
        };
        indices.push(idx);
    }

    Some(Palettized {
        palette,
        indices,
        exact: true,
    })
}

/// Reorder so translucent entries come first; `tRNS` can then stop early.
fn translucent_first(mut p: Palettized) -> Palettized {
    let mut order: Vec<usize> = (0..p.palette.len()).collect();
    order.sort_by_key(|&i| p.palette[i][3] == u8::MAX);

    let mut remap = vec![0u8; p.palette.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new as u8;
    }

    p.palette = order.iter().map(|&old| p.palette[old]).collect();
    for idx in &mut p.indices {
        *idx = remap[*idx as usize];
    }
    p
}

fn write_indexed_png(
    width: u32,
    height: u32,
    palettized: &Palettized,
) -> Result<Vec<u8>, png::EncodingError> {
    let rgb: Vec<u8> = palettized
        .palette
        .iter()
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    let trns: Vec<u8> = palettized
        .palette
        .iter()
        .take_while(|c| c[3] != u8::MAX)
        .map(|c| c[3])
        .collect();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(rgb);
        if !trns.is_empty() {
            encoder.set_trns(trns);
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&palettized.indices)?;
        writer.finish()?;
    }
    Ok(out)
}
