use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Target data holds {len} bytes, which is not a whole number of f32 values")]
    PartialValue { len: usize },
    #[error(
        "Target data holds {values} values, which is not a whole number of examples of size {example_size}"
    )]
    PartialExample { values: usize, example_size: usize },
    #[error("Example size must be positive")]
    ZeroExampleSize,
}

/// The batch of target grids an optimization or inference run produced.
///
/// This is the "top" output of the network: `num_examples` grids laid out back to back,
/// each `example_size` values long.
pub trait TargetSource {
    fn top_data(&self) -> &[f32];
    fn example_size(&self) -> usize;

    fn num_examples(&self) -> usize {
        match self.example_size() {
            0 => 0,
            size => self.top_data().len() / size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetBatch {
    data: Vec<f32>,
    example_size: usize,
}

impl TargetBatch {
    pub fn new(data: Vec<f32>, example_size: usize) -> Result<Self, TargetError> {
        if example_size == 0 {
            return Err(TargetError::ZeroExampleSize);
        }
        if data.len() % example_size != 0 {
            return Err(TargetError::PartialExample {
                values: data.len(),
                example_size,
            });
        }
        Ok(Self { data, example_size })
    }

    pub fn from_examples(examples: &[Vec<f32>], example_size: usize) -> Result<Self, TargetError> {
        let data: Vec<f32> = examples.iter().flatten().copied().collect();
        Self::new(data, example_size)
    }

    /// Reads a raw little-endian `f32` dump.
    pub fn read_from(reader: &mut impl Read, example_size: usize) -> Result<Self, TargetError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() % 4 != 0 {
            return Err(TargetError::PartialValue { len: bytes.len() });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(data, example_size)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P, example_size: usize) -> Result<Self, TargetError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader, example_size)
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), TargetError> {
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TargetError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn example(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.example_size)?;
        self.data.get(start..start + self.example_size)
    }
}

impl TargetSource for TargetBatch {
    fn top_data(&self) -> &[f32] {
        &self.data
    }

    fn example_size(&self) -> usize {
        self.example_size
    }
}
