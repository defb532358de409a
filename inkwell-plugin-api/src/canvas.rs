//! Fixed-size drawing surface handed to plugins
//!
//! [`Canvas`] owns an RGB image buffer pre-filled with white and implements
//! [`DrawTarget`], so plugins can use any `embedded-graphics` primitive, font
//! or image directly. Pixels outside the canvas are silently clipped.

use std::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::{Rgb, RgbImage};

use crate::types::Dimensions;

/// Background every canvas starts with
pub const BACKGROUND: Rgb888 = Rgb888::WHITE;

pub struct Canvas {
    dimensions: Dimensions,
    image: RgbImage,
}

impl Canvas {
    /// Create a white canvas of the given size
    pub fn new(dimensions: Dimensions) -> Self {
        let image = RgbImage::from_pixel(
            dimensions.width,
            dimensions.height,
            Rgb([BACKGROUND.r(), BACKGROUND.g(), BACKGROUND.b()]),
        );
        Self { dimensions, image }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Read a single pixel, `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let Rgb([r, g, b]) = *self.image.get_pixel(x, y);
        Some(Rgb888::new(r, g, b))
    }

    /// Borrow the underlying image buffer
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable access for plugins that prefer the `image` crate APIs
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.dimensions.width, self.dimensions.height)
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.dimensions.width && y < self.dimensions.height {
                self.image
                    .put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}
