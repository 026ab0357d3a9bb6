//! Turning drained items into one request body.

use std::io::{self, Write};

use flate2::{Compression, write::GzEncoder};

/// Concatenate `items` in order into a single body.
pub fn concatenate<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let len = items.iter().map(|item| item.as_ref().len()).sum();
    let mut body = Vec::with_capacity(len);
    for item in items {
        body.extend_from_slice(item.as_ref());
    }
    body
}

/// Gzip `body` at the default compression level.
///
/// # Errors
///
/// Propagates failures from the encoder.
pub fn gzip(body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
