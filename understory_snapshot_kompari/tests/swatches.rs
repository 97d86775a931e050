// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Checks against the references committed under
//! `tests/ReferenceImages/swatches`.
//!
//! The run is configured from the environment: `cargo xtask snapshots test
//! --record` rewrites these references, and `cargo xtask snapshots report`
//! collects the rendered images of failed checks for review.

use understory_snapshot::{
    Bitmap, Presented, RenderError, RenderPath, SnapshotConfig, Snapshotter, View,
    ViewController, have_valid_snapshot,
};
use understory_snapshot_kompari::KompariComparator;

fn snapshotter() -> Snapshotter<KompariComparator> {
    let config = SnapshotConfig::from_env().expect("snapshot environment is valid");
    Snapshotter::new(config, KompariComparator::from_env())
}

struct Fill {
    width: u32,
    height: u32,
    color: [u8; 4],
}

impl View for Fill {
    fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
        Ok(Bitmap::solid(self.width, self.height, self.color))
    }
}

/// Alternating 2x2 cells, black in the top-left corner.
struct Checkerboard {
    size: u32,
}

impl View for Checkerboard {
    fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
        let mut bitmap = Bitmap::solid(self.size, self.size, [255, 255, 255, 255]);
        for y in 0..self.size {
            for x in 0..self.size {
                if (x / 2 + y / 2) % 2 == 0 {
                    bitmap.set_pixel(x, y, [0, 0, 0, 255]);
                }
            }
        }
        Ok(bitmap)
    }
}

/// A bordered card that only has a size once it has appeared.
#[derive(Default)]
struct CardController {
    card: Option<Card>,
}

struct Card {
    width: u32,
    height: u32,
}

impl View for Card {
    fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
        let mut bitmap = Bitmap::solid(self.width, self.height, [250, 250, 250, 255]);
        for x in 0..self.width {
            bitmap.set_pixel(x, 0, [40, 40, 40, 255]);
            bitmap.set_pixel(x, self.height - 1, [40, 40, 40, 255]);
        }
        for y in 0..self.height {
            bitmap.set_pixel(0, y, [40, 40, 40, 255]);
            bitmap.set_pixel(self.width - 1, y, [40, 40, 40, 255]);
        }
        Ok(bitmap)
    }
}

struct Unlaid;

impl View for Unlaid {
    fn render(&self, _path: RenderPath) -> Result<Bitmap, RenderError> {
        Err(RenderError::new("card has not appeared"))
    }
}

impl ViewController for CardController {
    fn begin_appearance_transition(&mut self, _appearing: bool, _animated: bool) {}

    fn end_appearance_transition(&mut self) {
        self.card = Some(Card {
            width: 12,
            height: 8,
        });
    }

    fn view(&self) -> &dyn View {
        if let Some(card) = &self.card {
            return card;
        }
        &Unlaid
    }
}

#[test]
fn blue_swatch() {
    let mut swatch = Fill {
        width: 8,
        height: 8,
        color: [0, 0, 255, 255],
    };
    snapshotter()
        .expect(&mut swatch)
        .to(have_valid_snapshot().named("blue swatch"));
}

#[test]
fn checkerboard() {
    snapshotter()
        .expect(&mut Checkerboard { size: 8 })
        .to(have_valid_snapshot().named("checkerboard"));
}

#[test]
fn presented_card() {
    snapshotter()
        .expect(&mut Presented(CardController::default()))
        .to(have_valid_snapshot().named("presented card"));
}
