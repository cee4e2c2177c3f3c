use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::ArrayD;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use super::types::NpyError;

/// The magic bytes that identify NPY files
const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Matches the three fields of the NPY header dictionary
static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"'descr':\s*'([^']+)',\s*'fortran_order':\s*(True|False),\s*'shape':\s*\(([^)]*)\)",
    )
    .unwrap()
});

/// Checks if a file at the given path is an NPY file by verifying its magic bytes.
///
/// # Arguments
///
/// * `path` - Path to the file to check
///
/// # Returns
///
/// `true` if the file exists and starts with the NPY magic, `false` otherwise
pub fn is_npy_file<P: AsRef<Path>>(path: P) -> bool {
    if let Ok(mut file) = File::open(path) {
        let mut magic = [0u8; 6];
        if file.read_exact(&mut magic).is_ok() {
            return &magic == NPY_MAGIC;
        }
    }
    false
}

/// Reads an NPY file into an n-dimensional f32 array.
///
/// Supports version 1.x and 2.x headers with C-ordered little-endian `<f4`
/// or `<f8` payloads, which covers the network-output dumps StarDist demos
/// produce. `<f8` data is narrowed to f32. Fortran-ordered files and any
/// other dtype are rejected as unsupported.
pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>, NpyError> {
    let file = File::open(path.as_ref())?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != NPY_MAGIC {
        return Err(NpyError::InvalidFormat("Invalid magic bytes".into()));
    }

    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    // Version 1.x carries a 2-byte header length, 2.x a 4-byte one
    let (header_len, preamble_len) = match major {
        1 => (reader.read_u16::<LittleEndian>()? as usize, 10u64),
        2 => (reader.read_u32::<LittleEndian>()? as usize, 12u64),
        _ => {
            return Err(NpyError::Unsupported(format!(
                "NPY version {}.{}", major, minor
            )))
        }
    };

    // Header and shape fields are untrusted; bound every allocation they
    // drive against the actual file size
    if preamble_len + header_len as u64 > file_len {
        return Err(NpyError::InvalidFormat(format!(
            "Header length {} exceeds the file size {}", header_len, file_len
        )));
    }

    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes)?;
    let header = String::from_utf8(header_bytes)
        .map_err(|e| NpyError::InvalidFormat(format!("Invalid UTF-8 in header: {}", e)))?;

    let captures = HEADER_PATTERN
        .captures(&header)
        .ok_or_else(|| NpyError::InvalidFormat(format!("Unparseable header: {}", header.trim())))?;

    let descr = &captures[1];
    let fortran_order = &captures[2] == "True";
    let shape = parse_shape(&captures[3])?;

    if fortran_order {
        return Err(NpyError::Unsupported(
            "Fortran-ordered arrays are not supported".into(),
        ));
    }

    let element_size: u64 = match descr {
        "<f4" => 4,
        "<f8" => 8,
        other => {
            return Err(NpyError::Unsupported(format!("dtype {}", other)));
        }
    };
    let element_count = shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
        .ok_or_else(|| NpyError::InvalidFormat(format!("Shape overflows: {:?}", shape)))?;
    let payload_len = file_len - preamble_len - header_len as u64;
    let needed = (element_count as u64)
        .checked_mul(element_size)
        .ok_or_else(|| NpyError::InvalidFormat(format!("Shape overflows: {:?}", shape)))?;
    if needed > payload_len {
        return Err(NpyError::InvalidFormat(format!(
            "Shape {:?} needs {} bytes but only {} remain", shape, needed, payload_len
        )));
    }
    debug!("Reading NPY array: dtype {}, shape {:?}", descr, shape);

    let mut data = Vec::with_capacity(element_count);
    if element_size == 4 {
        for _ in 0..element_count {
            data.push(reader.read_f32::<LittleEndian>()?);
        }
    } else {
        for _ in 0..element_count {
            data.push(reader.read_f64::<LittleEndian>()? as f32);
        }
    }

    ArrayD::from_shape_vec(shape, data)
        .map_err(|e| NpyError::InvalidFormat(format!("Shape mismatch: {}", e)))
}

/// Parses the comma-separated dimension list of the header's shape tuple
fn parse_shape(raw: &str) -> Result<Vec<usize>, NpyError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| NpyError::InvalidFormat(format!("Invalid shape entry: {}", part)))
        })
        .collect()
}
