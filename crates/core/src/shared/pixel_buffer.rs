use ndarray::{s, ArrayView3};

use crate::shared::error::BridgeError;

/// Bytes per pixel for every buffer crossing the boundary.
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte order of the colour components within one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgra,
    Rgba,
}

/// Colour matrix mapping (B, G, R, A) to (R, G, B, A), in the 4x5 row layout
/// of an Android `ColorMatrix` (the last column is the additive offset).
pub const BGRA_TO_RGBA_MATRIX: [[f32; 5]; 4] = [
    [0.0, 0.0, 1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 1.0, 0.0],
];

/// Source channel index for each output channel, derived from
/// [`BGRA_TO_RGBA_MATRIX`]. Applied per pixel without float math.
const BGRA_TO_RGBA_PERMUTATION: [usize; 4] = [2, 1, 0, 3];

/// A raw 4-byte-per-pixel bitmap handed across the boundary.
///
/// Row-major, tightly packed (stride = width * 4).
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl PixelBuffer {
    /// Wraps `data` after checking that it holds exactly `width * height` pixels.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self, BridgeError> {
        check_len(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Returns an RGBA copy of this buffer. RGBA input is returned unchanged.
    pub fn to_rgba(&self) -> PixelBuffer {
        match self.order {
            ChannelOrder::Rgba => self.clone(),
            ChannelOrder::Bgra => PixelBuffer {
                data: permute_channels(&self.data),
                width: self.width,
                height: self.height,
                order: ChannelOrder::Rgba,
            },
        }
    }

    /// `[H, W, 3]` view of the colour channels, alpha excluded.
    ///
    /// Channel order follows [`Self::order`]; callers that need RGB should
    /// convert first.
    pub fn color_view(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, BYTES_PER_PIXEL),
            &self.data,
        )
        .expect("PixelBuffer length is validated on construction")
        .slice_move(s![.., .., 0..3])
    }
}

/// Converts a tightly packed BGRA buffer into a new RGBA buffer.
///
/// Only the R and B bytes move; G and A pass through. Fails without producing
/// output when `data.len() != width * height * 4`.
pub fn bgra_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, BridgeError> {
    check_len(data.len(), width, height)?;
    Ok(permute_channels(data))
}

fn permute_channels(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(BYTES_PER_PIXEL) {
        out.extend(BGRA_TO_RGBA_PERMUTATION.iter().map(|&src| px[src]));
    }
    out
}

/// Dimensions whose byte count overflows `usize` can never match.
fn check_len(actual: usize, width: u32, height: u32) -> Result<(), BridgeError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL));
    match expected {
        Some(expected) if expected == actual => Ok(()),
        Some(expected) => Err(BridgeError::BufferConversion { expected, actual }),
        None => Err(BridgeError::BufferConversion {
            expected: usize::MAX,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn patterned_bgra(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let i = i as u8;
                [i, i.wrapping_add(50), i.wrapping_add(100), 200]
            })
            .collect()
    }

    #[test]
    fn test_matrix_matches_permutation() {
        for (out_ch, row) in BGRA_TO_RGBA_MATRIX.iter().enumerate() {
            let src = row[..4].iter().position(|&w| w == 1.0).unwrap();
            assert_eq!(BGRA_TO_RGBA_PERMUTATION[out_ch], src);
            assert_eq!(row[4], 0.0);
        }
    }

    #[test]
    fn test_single_pixel_swaps_red_and_blue() {
        let out = bgra_to_rgba(&[10, 20, 30, 40], 1, 1).unwrap();
        assert_eq!(out, vec![30, 20, 10, 40]);
    }

    #[rstest]
    #[case::square(4, 4)]
    #[case::wide(7, 2)]
    #[case::tall(1, 9)]
    fn test_every_pixel_swapped_green_alpha_kept(#[case] w: u32, #[case] h: u32) {
        let input = patterned_bgra(w, h);
        let out = bgra_to_rgba(&input, w, h).unwrap();

        assert_eq!(out.len(), input.len());
        for (src, dst) in input.chunks_exact(4).zip(out.chunks_exact(4)) {
            assert_eq!(dst[0], src[2], "red");
            assert_eq!(dst[1], src[1], "green");
            assert_eq!(dst[2], src[0], "blue");
            assert_eq!(dst[3], src[3], "alpha");
        }
    }

    #[test]
    fn test_empty_image_converts_to_empty() {
        assert!(bgra_to_rgba(&[], 0, 0).unwrap().is_empty());
    }

    #[rstest]
    #[case::short(15)]
    #[case::long(17)]
    #[case::empty(0)]
    fn test_wrong_length_is_rejected(#[case] len: usize) {
        let err = bgra_to_rgba(&vec![0u8; len], 2, 2).unwrap_err();
        match err {
            BridgeError::BufferConversion { expected, actual } => {
                assert_eq!(expected, 16);
                assert_eq!(actual, len);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_mismatched_length() {
        assert!(PixelBuffer::new(vec![0u8; 10], 2, 2, ChannelOrder::Bgra).is_err());
    }

    #[rstest]
    #[case(u32::MAX, u32::MAX)]
    #[case(u32::MAX, 2)]
    fn test_overflowing_dimensions_are_rejected(#[case] w: u32, #[case] h: u32) {
        let err = PixelBuffer::new(vec![0u8; 16], w, h, ChannelOrder::Bgra).unwrap_err();
        assert!(matches!(err, BridgeError::BufferConversion { actual: 16, .. }));
        assert!(bgra_to_rgba(&[0u8; 16], w, h).is_err());
    }

    #[test]
    fn test_to_rgba_converts_bgra_buffer() {
        let buf = PixelBuffer::new(vec![1, 2, 3, 4, 5, 6, 7, 8], 2, 1, ChannelOrder::Bgra).unwrap();
        let rgba = buf.to_rgba();
        assert_eq!(rgba.order(), ChannelOrder::Rgba);
        assert_eq!(rgba.data(), &[3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!((rgba.width(), rgba.height()), (2, 1));
    }

    #[test]
    fn test_to_rgba_is_identity_for_rgba() {
        let buf = PixelBuffer::new(vec![1, 2, 3, 4], 1, 1, ChannelOrder::Rgba).unwrap();
        assert_eq!(buf.to_rgba(), buf);
    }

    #[test]
    fn test_color_view_drops_alpha() {
        // 2x2 RGBA, pixel (row=1, col=0) is pure red
        let mut data = vec![0u8; 16];
        data[8] = 255;
        data[11] = 255;
        let buf = PixelBuffer::new(data, 2, 2, ChannelOrder::Rgba).unwrap();
        let view = buf.color_view();
        assert_eq!(view.shape(), &[2, 2, 3]);
        assert_eq!(view[[1, 0, 0]], 255);
        assert_eq!(view[[1, 0, 1]], 0);
        assert_eq!(view[[1, 0, 2]], 0);
    }
}
