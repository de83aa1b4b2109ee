//! Snapshot file layout.
//!
//! A file starts with the 8 byte magic `ODSNAP01` followed by a length
//! prefixed header. Each record is then stored as a little-endian `u64` byte
//! count followed by the bincode encoded record.

use {
    crate::error::{ConfigError, Error, Result},
    byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt},
    ndarray::Array3,
    serde::{Deserialize, Serialize},
    std::{
        fs::{self, File},
        io::{BufReader, Read, Write},
        path::{Path, PathBuf},
    },
};

pub const MAGIC: &[u8; 8] = b"ODSNAP01";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub fields: Vec<String>,
    /// Size of the grid the snapshots were taken on
    pub grid_size: (usize, usize, usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FieldRecord {
    pub shape: [usize; 3],
    /// Values in row-major order
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Record {
    pub iteration: u64,
    pub time: f64,
    pub fields: Vec<FieldRecord>,
}

pub(crate) fn write_chunk<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    writer.write_u64::<LittleEndian>(bytes.len() as u64)?;
    writer.write_all(&bytes)?;
    Ok(())
}

pub(crate) fn write_preamble<W: Write>(writer: &mut W, header: &SnapshotHeader) -> Result<()> {
    writer.write_all(MAGIC)?;
    write_chunk(writer, header)
}

/// Splits the next length prefixed chunk off the front of `buf`
fn next_chunk<'a>(buf: &mut &'a [u8], path: &Path) -> Result<&'a [u8]> {
    let invalid = |reason: &str| Error::InvalidSnapshot {
        path: path.display().to_string(),
        reason: reason.to_owned(),
    };

    let len = buf.read_u64::<LittleEndian>().map_err(|_| invalid("truncated length prefix"))?;
    if len > buf.len() as u64 {
        return Err(invalid("truncated record"));
    }
    let (chunk, rest) = buf.split_at(len as usize);
    *buf = rest;
    Ok(chunk)
}

fn read_preamble(buf: &mut &[u8], path: &Path) -> Result<SnapshotHeader> {
    let mut magic = [0u8; 8];
    if buf.read_exact(&mut magic).is_err() || &magic != MAGIC {
        return Err(Error::InvalidSnapshot {
            path: path.display().to_string(),
            reason: "missing ODSNAP01 magic".to_owned(),
        });
    }
    Ok(bincode::deserialize(next_chunk(buf, path)?)?)
}

/// Reads only the header of an existing snapshot file, leaving any records unread
pub(crate) fn read_header(path: &Path) -> Result<SnapshotHeader> {
    let invalid = |reason: &str| Error::InvalidSnapshot {
        path: path.display().to_string(),
        reason: reason.to_owned(),
    };

    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    if reader.read_exact(&mut magic).is_err() || &magic != MAGIC {
        return Err(invalid("missing ODSNAP01 magic"));
    }
    let len = reader
        .read_u64::<LittleEndian>()
        .map_err(|_| invalid("truncated length prefix"))?;
    if len > size.saturating_sub(16) {
        return Err(invalid("truncated record"));
    }

    let mut chunk = vec![0u8; len as usize];
    reader.read_exact(&mut chunk)?;
    Ok(bincode::deserialize(&chunk)?)
}

/// A snapshot file loaded into memory
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    path: PathBuf,
    header: SnapshotHeader,
    records: Vec<Record>,
}

impl SnapshotReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut buf = bytes.as_slice();

        let header = read_preamble(&mut buf, path)?;
        let mut records = vec![];
        while !buf.is_empty() {
            let record: Record = bincode::deserialize(next_chunk(&mut buf, path)?)?;
            if record.fields.len() != header.fields.len() {
                return Err(Error::InvalidSnapshot {
                    path: path.display().to_string(),
                    reason: format!(
                        "record at iteration {} holds {} fields, header lists {}",
                        record.iteration,
                        record.fields.len(),
                        header.fields.len()
                    ),
                });
            }
            records.push(record);
        }

        Ok(Self {
            path: path.to_owned(),
            header,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    pub fn fields(&self) -> &[String] {
        &self.header.fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    pub fn iterations(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.iteration).collect()
    }

    /// One line for the file followed by the range of every field per record
    pub fn summary(&self) -> String {
        let (nx, ny, nz) = self.header.grid_size;
        let mut lines = vec![format!(
            "{} records of [{}] on a {}×{}×{} grid",
            self.records.len(),
            self.header.fields.join(", "),
            nx,
            ny,
            nz
        )];

        for record in &self.records {
            let mut line = format!("iteration {}, t = {}:", record.iteration, record.time);
            for (name, field) in self.header.fields.iter().zip(&record.fields) {
                let (min, max) = field
                    .data
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                        (lo.min(x), hi.max(x))
                    });
                line.push_str(&format!(" {} in [{}, {}]", name, min, max));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    /// Values of `field` in the record at `index`
    pub fn read_field(&self, field: &str, index: usize) -> Result<Array3<f64>> {
        let position = self
            .header
            .fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| ConfigError::UnknownField(field.to_owned()))?;

        let record = self.records.get(index).ok_or(Error::NoSuchRecord {
            index,
            count: self.records.len(),
        })?;
        let FieldRecord { shape, data } = &record.fields[position];

        Array3::from_shape_vec((shape[0], shape[1], shape[2]), data.clone()).map_err(|e| {
            Error::InvalidSnapshot {
                path: self.path.display().to_string(),
                reason: format!("field {} at record {}: {}", field, index, e),
            }
        })
    }
}
