//! Barcode extraction seam.
//!
//! Decoding images is done by an external library; the registry only needs
//! "bytes in, text out". Implement [`BarcodeDecoder`] over whatever decoder the
//! host application links.

use crate::errors::{Error, Result};

/// Something that can read the payload of the first barcode in an image.
pub trait BarcodeDecoder {
    /// Returns the payload of the first barcode found, or `None` if the image
    /// contains no barcode or the barcode carries no data.
    fn decode(&self, image: &[u8]) -> Option<String>;
}

/// Runs the decoder and turns "nothing found" into [`Error::BarcodeNotFound`].
///
/// Payloads that are empty after trimming count as not found.
pub fn extract_barcode<D>(decoder: &D, image: &[u8]) -> Result<String>
where
    D: BarcodeDecoder + ?Sized,
{
    decoder
        .decode(image)
        .map(|payload| payload.trim().to_string())
        .filter(|payload| !payload.is_empty())
        .ok_or(Error::BarcodeNotFound)
}
