//! Decoder: raw bytes with a declared type → a drawable source image.
//!
//! | Input | Crate / function |
//! |---|---|
//! | JPEG, PNG, WebP, GIF (first frame), BMP | `image::ImageReader` with the declared format, EXIF orientation applied |
//! | AVIF | `avif-parse` (container) + `rav1d` (AV1 decode) + YUV→RGB below, alpha item merged |
//! | SVG | `resvg::usvg` parse against the system fonts; stays vector until the resizer draws it |
//!
//! Bitmaps come out upright: a portrait photo stored sideways with an EXIF
//! orientation tag has its width and height swapped here, before any
//! dimension math runs.
//!
//! The caller has already filtered by declared MIME type, so no content
//! sniffing happens here: bytes that do not decode as the declared type are a
//! [`DecodeError`].
//!
//! A [`SourceImage`] is consumed by [`rasterize`](super::resize::rasterize),
//! so whatever the decoder allocated is gone before any encoder runs. The rav1d
//! context and picture are additionally held by [`Released`] guards so they are
//! freed on every early return.

use crate::format::InputFormat;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use rav1d::include::dav1d::picture::Dav1dPicture;
use resvg::usvg::{self, fontdb};
use std::io::Cursor;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("input is empty")]
    Empty,
    #[error("failed to decode {mime} input: {reason}")]
    Malformed { mime: &'static str, reason: String },
    #[error("decoded image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("failed to allocate a {width}x{height} raster")]
    Rasterize { width: u32, height: u32 },
}

impl DecodeError {
    fn malformed(input: InputFormat, reason: impl ToString) -> Self {
        DecodeError::Malformed {
            mime: input.mime(),
            reason: reason.to_string(),
        }
    }
}

/// A parsed SVG document and its intrinsic size in CSS pixels.
pub struct VectorImage {
    pub(crate) tree: usvg::Tree,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl VectorImage {
    /// Intrinsic size rounded up to whole pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width.ceil() as u32, self.height.ceil() as u32)
    }
}

/// A decoded input, before it has been drawn at its output size.
pub enum SourceImage {
    Bitmap(DynamicImage),
    Vector(VectorImage),
}

impl SourceImage {
    /// Intrinsic pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SourceImage::Bitmap(img) => (img.width(), img.height()),
            SourceImage::Vector(svg) => svg.dimensions(),
        }
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.dimensions();
        match self {
            SourceImage::Bitmap(_) => write!(f, "Bitmap({w}x{h})"),
            SourceImage::Vector(_) => write!(f, "Vector({w}x{h})"),
        }
    }
}

/// Decode `data` as the declared `input` type.
pub fn decode(data: &[u8], input: InputFormat) -> Result<SourceImage, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let source = match input {
        InputFormat::Avif => SourceImage::Bitmap(decode_avif(data)?),
        InputFormat::Svg => SourceImage::Vector(decode_svg(data)?),
        InputFormat::Jpeg => decode_bitmap(data, input, ImageFormat::Jpeg)?,
        InputFormat::Png => decode_bitmap(data, input, ImageFormat::Png)?,
        InputFormat::Webp => decode_bitmap(data, input, ImageFormat::WebP)?,
        InputFormat::Gif => decode_bitmap(data, input, ImageFormat::Gif)?,
        InputFormat::Bmp => decode_bitmap(data, input, ImageFormat::Bmp)?,
    };

    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroArea { width, height });
    }
    tracing::debug!(input = input.mime(), width, height, "decoded source image");
    Ok(source)
}

fn decode_bitmap(
    data: &[u8],
    input: InputFormat,
    format: ImageFormat,
) -> Result<SourceImage, DecodeError> {
    let malformed = |e: image::ImageError| DecodeError::malformed(input, e);

    let mut decoder = ImageReader::with_format(Cursor::new(data), format)
        .into_decoder()
        .map_err(malformed)?;
    // Unreadable metadata is not worth rejecting the pixels over.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(malformed)?;

    if orientation != Orientation::NoTransforms {
        tracing::debug!(?orientation, "applying EXIF orientation");
        img.apply_orientation(orientation);
    }
    Ok(SourceImage::Bitmap(img))
}

/// System fonts for SVG `<text>`, loaded once per process.
///
/// Generic families (`serif`, `sans-serif`, `monospace`) fall back to any
/// installed face when their usual defaults are missing, so text still
/// renders on minimal systems.
pub(crate) fn font_database() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();

            let fallback = db
                .faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
            if let Some(fallback) = fallback {
                let missing = |db: &fontdb::Database, family: fontdb::Family<'_>| {
                    db.query(&fontdb::Query {
                        families: &[family],
                        ..Default::default()
                    })
                    .is_none()
                };
                if missing(&db, fontdb::Family::Serif) {
                    db.set_serif_family(fallback.clone());
                }
                if missing(&db, fontdb::Family::SansSerif) {
                    db.set_sans_serif_family(fallback.clone());
                }
                if missing(&db, fontdb::Family::Monospace) {
                    db.set_monospace_family(fallback);
                }
            }

            tracing::debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

fn decode_svg(data: &[u8]) -> Result<VectorImage, DecodeError> {
    let options = usvg::Options {
        fontdb: font_database(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(data, &options)
        .map_err(|e| DecodeError::malformed(InputFormat::Svg, e))?;
    let size = tree.size();
    Ok(VectorImage {
        width: size.width(),
        height: size.height(),
        tree,
    })
}

/// Runs `release` on the wrapped value when dropped.
struct Released<T, F: FnMut(&mut T)> {
    value: T,
    release: F,
}

fn release_on_drop<T, F: FnMut(&mut T)>(value: T, release: F) -> Released<T, F> {
    Released { value, release }
}

impl<T, F: FnMut(&mut T)> Deref for Released<T, F> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, F: FnMut(&mut T)> DerefMut for Released<T, F> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T, F: FnMut(&mut T)> Drop for Released<T, F> {
    fn drop(&mut self) {
        (self.release)(&mut self.value);
    }
}

fn avif_error(reason: impl ToString) -> DecodeError {
    DecodeError::malformed(InputFormat::Avif, reason)
}

/// Decode an AVIF image with avif-parse (container) + rav1d (AV1 decode).
///
/// The `image` crate only decodes AVIF through the dav1d C library, so the
/// pure-Rust port is driven directly. The colour item and, when present, the
/// alpha auxiliary item are separate AV1 streams decoded one after the other.
fn decode_avif(data: &[u8]) -> Result<DynamicImage, DecodeError> {
    let avif =
        avif_parse::read_avif(&mut Cursor::new(data)).map_err(|e| avif_error(format!("{e:?}")))?;

    let (width, height, mut rgba) = decode_av1(&avif.primary_item, |pic| {
        let planes = YuvPlanes::from_picture(pic)?;
        Ok((planes.width, planes.height, planes.to_rgba()))
    })?;

    if let Some(alpha_item) = &avif.alpha_item {
        let (alpha_w, alpha_h, alpha) = decode_av1(alpha_item, |pic| {
            let planes = YuvPlanes::from_picture(pic)?;
            Ok((planes.width, planes.height, planes.luma()))
        })?;
        if (alpha_w, alpha_h) != (width, height) {
            return Err(avif_error(format!(
                "alpha plane is {alpha_w}x{alpha_h}, image is {width}x{height}"
            )));
        }
        merge_alpha(&mut rgba, &alpha, avif.premultiplied_alpha);
    }

    RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| avif_error("decoded plane size mismatch"))
}

/// Decode one AV1 still frame and hand the picture to `read`.
///
/// The picture's planes are only valid inside `read`; the context and picture
/// guards release them as soon as it returns, on success or error.
fn decode_av1<R>(
    av1_bytes: &[u8],
    read: impl FnOnce(&Dav1dPicture) -> Result<R, DecodeError>,
) -> Result<R, DecodeError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::src::lib::{
        dav1d_close, dav1d_data_create, dav1d_data_unref, dav1d_default_settings,
        dav1d_get_picture, dav1d_open, dav1d_picture_unref, dav1d_send_data,
    };
    use std::ptr::NonNull;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d_default_settings(NonNull::from(&mut settings).cast::<Dav1dSettings>()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(avif_error(format!("rav1d open failed ({})", rc.0)));
    }
    let ctx = release_on_drop(ctx, |ctx| unsafe {
        dav1d_close(NonNull::new(ctx));
    });

    let mut data = Dav1dData::default();
    let buf_ptr = unsafe { dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        return Err(avif_error("rav1d data_create failed"));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { dav1d_send_data(*ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe { dav1d_data_unref(NonNull::new(&mut data)) };
        return Err(avif_error(format!("rav1d send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d_get_picture(*ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        return Err(avif_error(format!("rav1d get_picture failed ({})", rc.0)));
    }
    let pic = release_on_drop(pic, |pic| unsafe {
        dav1d_picture_unref(NonNull::new(pic));
    });

    read(&*pic)
}

/// Write `alpha` into the alpha channel of `rgba`.
///
/// Premultiplied colour is divided back out, since everything downstream
/// works in straight alpha.
fn merge_alpha(rgba: &mut [u8], alpha: &[u8], premultiplied: bool) {
    for (px, &a) in rgba.chunks_exact_mut(4).zip(alpha) {
        px[3] = a;
        if premultiplied {
            for c in &mut px[..3] {
                *c = match a {
                    0 => 0,
                    _ => ((*c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8,
                };
            }
        }
    }
}

/// Borrowed YUV plane pointers from a rav1d picture.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Plane pointers into `pic`. They must not outlive the picture.
    fn from_picture(pic: &Dav1dPicture) -> Result<Self, DecodeError> {
        use rav1d::include::dav1d::headers::{
            DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
            DAV1D_PIXEL_LAYOUT_I444,
        };

        let plane = |idx: usize| {
            pic.data[idx]
                .map(|p| p.as_ptr() as *const u8)
                .ok_or_else(|| avif_error(format!("missing plane {idx}")))
        };
        let y_ptr = plane(0)?;
        let layout = pic.p.layout;

        let (u_ptr, v_ptr, uv_stride, ss_x, ss_y, monochrome) = match layout {
            DAV1D_PIXEL_LAYOUT_I400 => (y_ptr, y_ptr, 0, false, false, true),
            DAV1D_PIXEL_LAYOUT_I420 => (plane(1)?, plane(2)?, pic.stride[1], true, true, false),
            DAV1D_PIXEL_LAYOUT_I422 => (plane(1)?, plane(2)?, pic.stride[1], true, false, false),
            DAV1D_PIXEL_LAYOUT_I444 => (plane(1)?, plane(2)?, pic.stride[1], false, false, false),
            _ => return Err(avif_error(format!("unsupported pixel layout {layout}"))),
        };

        Ok(YuvPlanes {
            y_ptr,
            u_ptr,
            v_ptr,
            y_stride: pic.stride[0],
            uv_stride,
            width: pic.p.w as u32,
            height: pic.p.h as u32,
            bpc: pic.p.bpc as u32,
            ss_x,
            ss_y,
            monochrome,
        })
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn scale(&self) -> f32 {
        255.0 / ((1u32 << self.bpc) - 1) as f32
    }

    /// Convert to interleaved opaque RGBA8 using BT.601 coefficients.
    fn to_rgba(&self) -> Vec<u8> {
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = self.scale();

        let mut out = Vec::with_capacity(self.pixel_count() * 4);

        for row in 0..self.height {
            for col in 0..self.width {
                let y = sample(self.y_ptr, self.y_stride, col, row, self.bpc);

                let (r, g, b) = if self.monochrome {
                    let v = (y * scale).clamp(0.0, 255.0);
                    (v, v, v)
                } else {
                    let cx = if self.ss_x { col / 2 } else { col };
                    let cy = if self.ss_y { row / 2 } else { row };
                    let cb = sample(self.u_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                    let cr = sample(self.v_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                    (
                        ((y + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                };

                out.extend_from_slice(&[r as u8, g as u8, b as u8, u8::MAX]);
            }
        }

        out
    }

    /// The luma plane as 8-bit samples. Alpha items carry their values here.
    fn luma(&self) -> Vec<u8> {
        let scale = self.scale();
        let mut out = Vec::with_capacity(self.pixel_count());
        for row in 0..self.height {
            for col in 0..self.width {
                let y = sample(self.y_ptr, self.y_stride, col, row, self.bpc);
                out.push((y * scale).round().clamp(0.0, 255.0) as u8);
            }
        }
        out
    }
}

/// Read one sample from a plane; >8-bit depths are stored as u16.
#[inline]
fn sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { (ptr.offset(byte_offset) as *const u16).read_unaligned() }) as f32
    }
}
