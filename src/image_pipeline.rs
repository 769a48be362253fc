use std::io::Cursor;

use dicom::dictionary_std::tags;
use dicom::object::DefaultDicomObject;
use dicom::pixeldata::PixelDecoder;
use image::{ImageFormat, RgbaImage};

pub struct FrameImagePipeline;

impl FrameImagePipeline {
    /// Renders the first frame of the object's pixel data.
    ///
    /// Returns `Ok(None)` when the object carries no pixel data at all.
    /// Photometric interpretation, planar configuration and sample depth are
    /// handled by the pixel data decoder.
    pub fn render_first_frame(object: &DefaultDicomObject) -> Result<Option<RgbaImage>, String> {
        if object.element(tags::PIXEL_DATA).is_err() {
            return Ok(None);
        }

        let decoded = object
            .decode_pixel_data_frame(0)
            .map_err(|err| format!("Failed to decode pixel data: {err}"))?;

        if decoded.number_of_frames() == 0 {
            return Ok(None);
        }

        let image = decoded
            .to_dynamic_image(0)
            .map_err(|err| format!("Failed to convert frame to image: {err}"))?;
        Ok(Some(image.into_rgba8()))
    }

    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
