// Helmet IMU - Payload Framer
//
// Wire format (all little-endian):
//   [sequence: u32]?  x0 y0 z0  x1 y1 z1 ...   (each axis i16)
//
// No compression or delta coding; the host gets full raw precision.

use crate::config::FrameLayout;
use crate::error::FrameError;
use crate::events::{Batch, Sample};

pub const SEQUENCE_LEN: usize = 4;
pub const SAMPLE_LEN: usize = 6;

/// Serialised batch, ready to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Arbitrary payload (e.g. a classifier label) sent through the same notifier.
impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Framer {
    layout: FrameLayout,
}

impl Framer {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    fn header_len(&self) -> usize {
        if self.layout.sequence_header {
            SEQUENCE_LEN
        } else {
            0
        }
    }

    /// Samples that fit in one frame.
    pub fn max_samples(&self) -> usize {
        self.layout.transfer_unit.saturating_sub(self.header_len()) / SAMPLE_LEN
    }

    /// Encode `samples`. `sequence` is ignored when the layout has no header.
    pub fn frame(&self, samples: &[Sample], sequence: Option<u32>) -> Result<Frame, FrameError> {
        let elements = samples.len() * 3;
        if let Some(declared) = self.layout.declared_elements {
            if declared != elements {
                return Err(FrameError::ElementCountMismatch {
                    declared,
                    actual: elements,
                });
            }
        }

        let size = self.header_len() + samples.len() * SAMPLE_LEN;
        if size > self.layout.transfer_unit {
            return Err(FrameError::PayloadTooLarge {
                size,
                limit: self.layout.transfer_unit,
            });
        }

        let mut buf = Vec::with_capacity(size);
        if self.layout.sequence_header {
            buf.extend_from_slice(&sequence.unwrap_or(0).to_le_bytes());
        }
        for s in samples {
            buf.extend_from_slice(&s.x.to_le_bytes());
            buf.extend_from_slice(&s.y.to_le_bytes());
            buf.extend_from_slice(&s.z.to_le_bytes());
        }
        Ok(Frame(buf))
    }

    /// Encode a whole batch, splitting it into as many frames as the
    /// transfer unit requires. Sequence numbers are consecutive from `first_seq`.
    pub fn frame_split(&self, batch: &Batch, first_seq: u32) -> Result<Vec<Frame>, FrameError> {
        let per_frame = self.max_samples();
        if per_frame == 0 {
            return Err(FrameError::PayloadTooLarge {
                size: self.header_len() + SAMPLE_LEN,
                limit: self.layout.transfer_unit,
            });
        }
        batch
            .samples()
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| self.frame(chunk, Some(first_seq.wrapping_add(i as u32))))
            .collect()
    }
}

/// Host-side inverse of [`Framer::frame`].
pub fn decode_frame(
    bytes: &[u8],
    layout: &FrameLayout,
) -> Result<(Option<u32>, Vec<[i16; 3]>), FrameError> {
    let (sequence, body) = if layout.sequence_header {
        if bytes.len() < SEQUENCE_LEN {
            return Err(FrameError::Truncated(bytes.len()));
        }
        let (head, body) = bytes.split_at(SEQUENCE_LEN);
        (Some(u32::from_le_bytes([head[0], head[1], head[2], head[3]])), body)
    } else {
        (None, bytes)
    };

    if body.len() % SAMPLE_LEN != 0 {
        return Err(FrameError::Truncated(bytes.len()));
    }
    let samples = body
        .chunks_exact(SAMPLE_LEN)
        .map(|c| {
            [
                i16::from_le_bytes([c[0], c[1]]),
                i16::from_le_bytes([c[2], c[3]]),
                i16::from_le_bytes([c[4], c[5]]),
            ]
        })
        .collect();
    Ok((sequence, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SampleTag;

    fn samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                tag: if i % 2 == 0 { SampleTag::Gyro } else { SampleTag::Accel },
                x: i as i16 * 7 - 100,
                y: -(i as i16),
                z: i16::MAX - i as i16,
            })
            .collect()
    }

    fn layout(transfer_unit: usize) -> FrameLayout {
        FrameLayout {
            sequence_header: true,
            declared_elements: None,
            transfer_unit,
        }
    }

    #[test]
    fn twenty_six_samples_with_header_is_160_bytes() {
        let frame = Framer::new(layout(509)).frame(&samples(26), Some(7)).unwrap();
        assert_eq!(frame.len(), 4 + 26 * 6);
        assert_eq!(frame.len(), 160);
        assert_eq!(&frame.as_bytes()[..4], &[7, 0, 0, 0]);
    }

    #[test]
    fn axis_bytes_are_little_endian() {
        let s = [Sample { tag: SampleTag::Accel, x: 0x0102, y: -1, z: 0 }];
        let frame = Framer::new(FrameLayout { sequence_header: false, ..layout(509) })
            .frame(&s, Some(99))
            .unwrap();
        assert_eq!(frame.as_bytes(), &[0x02, 0x01, 0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn decode_reproduces_samples_and_sequence() {
        let input = samples(52);
        let framer = Framer::new(layout(509));
        let frame = framer.frame(&input, Some(0xDEAD_BEEF)).unwrap();
        let (seq, decoded) = decode_frame(frame.as_bytes(), framer.layout()).unwrap();
        assert_eq!(seq, Some(0xDEAD_BEEF));
        let expected: Vec<[i16; 3]> = input.iter().map(|s| [s.x, s.y, s.z]).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn payload_too_large_exactly_at_limit() {
        // 4 + 6n <= 160  <=>  n <= 26
        let framer = Framer::new(layout(160));
        assert!(framer.frame(&samples(26), Some(0)).is_ok());
        assert_eq!(
            framer.frame(&samples(27), Some(0)).unwrap_err(),
            FrameError::PayloadTooLarge { size: 166, limit: 160 }
        );
    }

    #[test]
    fn declared_element_count_must_match() {
        let framer = Framer::new(FrameLayout {
            declared_elements: Some(156),
            ..layout(509)
        });
        assert!(framer.frame(&samples(52), None).is_ok());
        assert_eq!(
            framer.frame(&samples(53), None).unwrap_err(),
            FrameError::ElementCountMismatch { declared: 156, actual: 159 }
        );
    }

    #[test]
    fn split_uses_consecutive_sequences() {
        let framer = Framer::new(layout(64)); // 10 samples per frame
        assert_eq!(framer.max_samples(), 10);
        let batch = Batch::from(samples(25));
        let frames = framer.frame_split(&batch, 41).unwrap();
        assert_eq!(frames.len(), 3);

        let mut all = Vec::new();
        for (i, f) in frames.iter().enumerate() {
            let (seq, s) = decode_frame(f.as_bytes(), framer.layout()).unwrap();
            assert_eq!(seq, Some(41 + i as u32));
            all.extend(s);
        }
        assert_eq!(all.len(), 25);
        assert_eq!(all[24], [68, -24, i16::MAX - 24]);
    }

    #[test]
    fn decode_rejects_ragged_body() {
        let l = layout(509);
        assert_eq!(decode_frame(&[1, 2, 3], &l).unwrap_err(), FrameError::Truncated(3));
        assert_eq!(
            decode_frame(&[0, 0, 0, 0, 1, 2, 3], &l).unwrap_err(),
            FrameError::Truncated(7)
        );
    }
}
