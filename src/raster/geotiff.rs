use super::{Data, DataReader, DataWriter, ReadError};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};

pub struct GeoTiffReader {
    pub file_name: String,
}

impl DataReader for GeoTiffReader {
    fn read_data(&self) -> Result<Data, ReadError> {
        let file = File::open(&self.file_name)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to open {}: {}", self.file_name, e)))?;

        let reader = BufReader::new(file);

        let mut decoder = Decoder::new(reader)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to decode TIFF: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to get dimensions: {}", e)))?;

        let image_data: Vec<f32> = match decoder
            .read_image()
            .map_err(|e| ReadError::GeoTiff(format!("Failed to read image: {}", e)))?
        {
            DecodingResult::U8(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::U32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I16(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::I32(data) => data.iter().map(|&x| x as f32).collect(),
            DecodingResult::F32(data) => data,
            DecodingResult::F64(data) => data.iter().map(|&x| x as f32).collect(),
            _ => return Err(ReadError::GeoTiff("Unsupported pixel format".to_string())),
        };

        let data = Data {
            width,
            height,
            buffer: image_data,
        };
        check_buffer(&data.buffer, width, height)?;
        Ok(data)
    }
}

/// Single band TIFF output, one file per product band
pub struct GeoTiffWriter {
    pub file_name: String,
}

impl GeoTiffWriter {
    fn encoder(&self) -> Result<TiffEncoder<BufWriter<File>>, ReadError> {
        let file = File::create(&self.file_name).map_err(|e| {
            ReadError::GeoTiff(format!("Failed to create {}: {}", self.file_name, e))
        })?;
        TiffEncoder::new(BufWriter::new(file))
            .map_err(|e| ReadError::GeoTiff(format!("Failed to start TIFF: {}", e)))
    }
}

impl DataWriter for GeoTiffWriter {
    fn write_f32(&self, data: &Data) -> Result<(), ReadError> {
        check_buffer(&data.buffer, data.width, data.height)?;
        self.encoder()?
            .write_image::<colortype::Gray32Float>(data.width, data.height, &data.buffer)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to write image: {}", e)))
    }

    fn write_u8(&self, width: u32, height: u32, buffer: &[u8]) -> Result<(), ReadError> {
        check_buffer(buffer, width, height)?;
        self.encoder()?
            .write_image::<colortype::Gray8>(width, height, buffer)
            .map_err(|e| ReadError::GeoTiff(format!("Failed to write image: {}", e)))
    }
}

fn check_buffer<T>(buffer: &[T], width: u32, height: u32) -> Result<(), ReadError> {
    if buffer.len() == width as usize * height as usize {
        Ok(())
    } else {
        Err(ReadError::BufferSize {
            width,
            height,
            found: buffer.len(),
        })
    }
}
