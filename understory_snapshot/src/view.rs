// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Things that can be snapshotted.
//!
//! A [`View`] is a leaf visual element that can render itself into a
//! [`Bitmap`]. A [`ViewController`] owns a view and has to be told it is
//! appearing before that view is laid out. [`HasVisualRoot`] covers both: the
//! snapshot machinery only ever asks a subject for its visual root.

use std::fmt;

/// An RGBA8 bitmap, unpremultiplied, row-major with no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Wraps raw RGBA8 pixel data.
    ///
    /// Returns `None` if `pixels` is not exactly `width * height * 4` bytes.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).ok()?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Creates a bitmap filled with a single color.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgba.repeat(count),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA8 bytes.
    #[must_use]
    pub fn as_rgba8(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the bitmap and returns its RGBA8 bytes.
    #[must_use]
    pub fn into_rgba8(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrites the pixel at `(x, y)`. Out of bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// How a view is drawn into a bitmap.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderPath {
    /// Render the view's own layer tree.
    #[default]
    Layer,
    /// Draw the full view hierarchy as it would appear on screen. Slower, but
    /// picks up effects the layer path misses.
    ViewHierarchy,
}

impl RenderPath {
    /// Maps the `uses_alternate_render_path` flag to a render path.
    #[must_use]
    pub fn from_alternate(alternate: bool) -> Self {
        if alternate {
            Self::ViewHierarchy
        } else {
            Self::Layer
        }
    }
}

/// Error returned when a view cannot be rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Creates a render error with a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render failed: {}", self.message)
    }
}

impl core::error::Error for RenderError {}

/// A leaf visual element.
pub trait View {
    /// Renders the view into a bitmap.
    fn render(&self, path: RenderPath) -> Result<Bitmap, RenderError>;
}

/// A controller that owns a view and drives its appearance lifecycle.
pub trait ViewController {
    /// Called before the view appears (`appearing == true`) or disappears.
    fn begin_appearance_transition(&mut self, appearing: bool, animated: bool);

    /// Called once the transition started by
    /// [`begin_appearance_transition`](Self::begin_appearance_transition)
    /// has finished.
    fn end_appearance_transition(&mut self);

    /// The controller's root view.
    fn view(&self) -> &dyn View;
}

/// Anything with a renderable visual root.
pub trait HasVisualRoot {
    /// Returns the view to snapshot, doing whatever is needed to bring it
    /// into a laid-out state first.
    fn visual_root(&mut self) -> &dyn View;
}

impl<V: View> HasVisualRoot for V {
    fn visual_root(&mut self) -> &dyn View {
        self
    }
}

/// Adapts a [`ViewController`] for snapshotting.
///
/// Asking for the visual root runs an appearing transition, without
/// animation, so the controller lays its view out.
#[derive(Clone, Debug, Default)]
pub struct Presented<C>(pub C);

impl<C: ViewController> HasVisualRoot for Presented<C> {
    fn visual_root(&mut self) -> &dyn View {
        self.0.begin_appearance_transition(true, false);
        self.0.end_appearance_transition();
        self.0.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Swatch([u8; 4]);

    impl View for Swatch {
        fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
            Ok(Bitmap::solid(2, 2, self.0))
        }
    }

    #[derive(Default)]
    struct Screen {
        events: Vec<&'static str>,
        laid_out: Option<Swatch>,
    }

    impl ViewController for Screen {
        fn begin_appearance_transition(&mut self, appearing: bool, animated: bool) {
            assert!(appearing, "snapshots only present controllers");
            assert!(!animated, "snapshots never animate");
            self.events.push("will_appear");
        }

        fn end_appearance_transition(&mut self) {
            self.events.push("did_appear");
            self.laid_out = Some(Swatch([0, 0, 255, 255]));
        }

        fn view(&self) -> &dyn View {
            self.laid_out.as_ref().expect("view is laid out on appearance")
        }
    }

    #[test]
    fn bitmap_requires_exact_length() {
        assert!(Bitmap::from_rgba8(2, 1, vec![0; 8]).is_some());
        assert!(Bitmap::from_rgba8(2, 1, vec![0; 7]).is_none());
        assert!(Bitmap::from_rgba8(0, 0, Vec::new()).is_some());
    }

    #[test]
    fn bitmap_pixels() {
        let mut bitmap = Bitmap::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(bitmap.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(bitmap.pixel(3, 0), None);

        bitmap.set_pixel(1, 1, [9, 9, 9, 9]);
        assert_eq!(bitmap.pixel(1, 1), Some([9, 9, 9, 9]));
        assert_eq!(&bitmap.as_rgba8()[16..20], &[9, 9, 9, 9]);
    }

    #[test]
    fn view_is_its_own_root() {
        let mut swatch = Swatch([255, 0, 0, 255]);
        let bitmap = swatch.visual_root().render(RenderPath::Layer).unwrap();
        assert_eq!(bitmap.pixel(0, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn presented_controller_appears_before_render() {
        let mut presented = Presented(Screen::default());
        let bitmap = presented
            .visual_root()
            .render(RenderPath::ViewHierarchy)
            .unwrap();
        assert_eq!(bitmap.pixel(1, 1), Some([0, 0, 255, 255]));
        assert_eq!(presented.0.events, ["will_appear", "did_appear"]);
    }

    #[test]
    fn render_path_from_flag() {
        assert_eq!(RenderPath::from_alternate(false), RenderPath::Layer);
        assert_eq!(RenderPath::from_alternate(true), RenderPath::ViewHierarchy);
    }
}
