// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extended WKB polygon decoding.
//!
//! Geometry payload columns hold polygons in PostGIS-style extended WKB.
//! Both byte orders are accepted, as are the ISO (type + 1000) and EWKB
//! (high-bit flags) encodings of the Z/M dimensions and the optional
//! embedded SRID. M ordinates are read and discarded; 2D points get z = 0.

use crate::error::{Error, Result};

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// One ring as a closed coordinate sequence (first point repeated last,
/// as stored).
pub type Ring = Vec<[f64; 3]>;

/// Decode a polygon payload into its rings, exterior first.
pub fn decode_polygon(payload: &[u8]) -> Result<Vec<Ring>> {
    let mut reader = Reader::new(payload);

    let order = reader.read_u8()?;
    match order {
        0 => reader.little_endian = false,
        1 => reader.little_endian = true,
        other => return Err(Error::ByteOrder(other)),
    }

    let type_word = reader.read_u32()?;
    let code = type_word & !(EWKB_Z | EWKB_M | EWKB_SRID);

    // ISO encodes dimensionality in the thousands digit, EWKB in flag bits
    let base = code % 1000;
    if base != 3 {
        return Err(Error::UnsupportedType(type_word));
    }
    let iso_dim = code / 1000;
    let has_z = type_word & EWKB_Z != 0 || iso_dim == 1 || iso_dim == 3;
    let has_m = type_word & EWKB_M != 0 || iso_dim == 2 || iso_dim == 3;

    if type_word & EWKB_SRID != 0 {
        reader.read_u32()?;
    }

    let ring_count = reader.read_u32()? as usize;
    if ring_count == 0 {
        return Err(Error::EmptyPolygon);
    }

    let mut rings = Vec::with_capacity(ring_count);
    for _ in 0..ring_count {
        let point_count = reader.read_u32()? as usize;
        // Linear rings are closed, so anything below a triangle plus the
        // closing point cannot bound an area
        if point_count < 4 {
            return Err(Error::DegenerateRing(point_count));
        }

        let mut ring = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let x = reader.read_f64()?;
            let y = reader.read_f64()?;
            let z = if has_z { reader.read_f64()? } else { 0.0 };
            if has_m {
                reader.read_f64()?;
            }
            ring.push([x, y, z]);
        }
        rings.push(ring);
    }

    Ok(rings)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            little_endian: true,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: len - (self.buf.len() - self.pos),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(if self.little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an EWKB polygon (little endian, Z flag, optional SRID).
    fn encode_polygon_z(rings: &[Vec<[f64; 3]>], srid: Option<u32>) -> Vec<u8> {
        let mut buf = vec![1u8];
        let mut type_word = 3 | EWKB_Z;
        if srid.is_some() {
            type_word |= EWKB_SRID;
        }
        buf.extend_from_slice(&type_word.to_le_bytes());
        if let Some(srid) = srid {
            buf.extend_from_slice(&srid.to_le_bytes());
        }
        buf.extend_from_slice(&(rings.len() as u32).to_le_bytes());
        for ring in rings {
            buf.extend_from_slice(&(ring.len() as u32).to_le_bytes());
            for p in ring {
                for c in p {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unit_square() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn test_decode_polygon_z_with_srid() {
        let payload = encode_polygon_z(&[unit_square()], Some(25832));
        let rings = decode_polygon(&payload).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][2], [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_decode_polygon_with_hole() {
        let hole = vec![
            [0.2, 0.2, 0.0],
            [0.8, 0.2, 0.0],
            [0.8, 0.8, 0.0],
            [0.2, 0.8, 0.0],
            [0.2, 0.2, 0.0],
        ];
        let payload = encode_polygon_z(&[unit_square(), hole.clone()], None);
        let rings = decode_polygon(&payload).unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1], hole);
    }

    #[test]
    fn test_decode_iso_polygon_z_big_endian() {
        // Same square hand-encoded as ISO WKB (type 1003) in network order
        let mut buf = vec![0u8];
        buf.extend_from_slice(&1003u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&5u32.to_be_bytes());
        for p in unit_square() {
            for c in p {
                buf.extend_from_slice(&c.to_be_bytes());
            }
        }
        let rings = decode_polygon(&buf).unwrap();
        assert_eq!(rings[0], unit_square());
    }

    #[test]
    fn test_decode_2d_polygon_fills_zero_z() {
        // Plain 2D polygon, type 3, no flags
        let mut buf = vec![1u8];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)] {
            buf.extend_from_slice(&f64::to_le_bytes(x));
            buf.extend_from_slice(&f64::to_le_bytes(y));
        }
        let rings = decode_polygon(&buf).unwrap();
        assert!(rings[0].iter().all(|p| p[2] == 0.0));
    }

    #[test]
    fn test_truncated_payload_is_reported() {
        let mut payload = encode_polygon_z(&[unit_square()], None);
        payload.truncate(payload.len() - 3);
        assert!(matches!(
            decode_polygon(&payload),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_non_polygon_type_rejected() {
        // LineString Z
        let mut buf = vec![1u8];
        buf.extend_from_slice(&(2u32 | EWKB_Z).to_le_bytes());
        assert!(matches!(
            decode_polygon(&buf),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let triangle_open = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let payload = encode_polygon_z(&[triangle_open], None);
        assert!(matches!(
            decode_polygon(&payload),
            Err(Error::DegenerateRing(3))
        ));
    }
}
