use {
    byteorder::{ByteOrder, LittleEndian},
    ndarray::{Array2, ArrayView2, ShapeBuilder},
    std::{
        fs::File,
        io::{self, prelude::*},
        path::Path,
    },
};

#[cfg(test)]
use ndarray::Array3;

/// Views a column-major (Fortran ordered) slice as a 2D array
pub fn view2d<T>(xs: &[T], x: usize, y: usize) -> Option<ArrayView2<T>> {
    ArrayView2::from_shape((x, y).strides((1, x)), xs).ok()
}

/// Reads an `.r8` file: one 8 byte pad followed by little endian `f64` values
pub fn read_r8<P: AsRef<Path>>(path: P) -> io::Result<Vec<f64>> {
    let mut f = File::open(path)?;
    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes)?;

    if bytes.len() % 8 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("length {} is not a multiple of 8 bytes", bytes.len()),
        ));
    }

    Ok(bytes
        .chunks(8)
        .skip(1)
        .map(LittleEndian::read_f64)
        .collect::<Vec<f64>>())
}

/// Writes values in the `.r8` layout read by [`read_r8`]
pub fn write_r8<P: AsRef<Path>>(path: P, data: &[f64]) -> io::Result<()> {
    let mut f = File::create(path)?;
    let mut buf = [0u8; 8];
    f.write_all(&buf)?;
    for x in data {
        LittleEndian::write_f64(&mut buf, *x);
        f.write_all(&buf)?;
    }
    Ok(())
}

/// Reads a horizontal (x, y) array stored in Fortran order in an `.r8` file
pub fn read_r8_2d<P: AsRef<Path>>(path: P, nx: usize, ny: usize) -> io::Result<Array2<f64>> {
    let xs = read_r8(path)?;
    let wrong_length = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected {} values, found {}", nx * ny, xs.len()),
        )
    };

    if xs.len() != nx * ny {
        return Err(wrong_length());
    }

    Ok(view2d(&xs, nx, ny).ok_or_else(wrong_length)?.to_owned())
}

#[cfg(test)]
pub(crate) fn assert_approx_eq_slice(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (i, e) in a.iter().enumerate() {
        approx::assert_abs_diff_eq!(*e, b[i], epsilon = 1.0E-13);
    }
}

#[cfg(test)]
pub(crate) fn ramp3d(nx: usize, ny: usize, nz: usize) -> Array3<f64> {
    Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
        (i + 10 * j + 100 * k) as f64 * 0.5
    })
}
