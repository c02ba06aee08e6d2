//! Binary codec for worker messages.
//!
//! Payloads are little-endian on the wire. On little-endian targets encoding
//! is a straight reinterpretation of the element slice as bytes; decoding
//! copies into an aligned `Vec<T>` because a `Bytes` buffer carries no
//! alignment guarantee.

use bytemuck::{Pod, Zeroable};
use bytes::Bytes;

use foundation::bounds::Viewport;

use crate::message::{ElementType, EventKind, Message, Operation, RecordLayout, WorkerEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload length is not a whole number of elements.
    Misaligned { len: usize, element_size: usize },
    /// Payload length is not a whole number of records.
    PartialRecord {
        name: &'static str,
        len: usize,
        record_bytes: usize,
    },
    /// Fixed-size payload has the wrong size.
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Misaligned { len, element_size } => {
                write!(
                    f,
                    "payload of {len} bytes is not a multiple of the {element_size}-byte element size"
                )
            }
            CodecError::PartialRecord {
                name,
                len,
                record_bytes,
            } => write!(
                f,
                "{name}: payload of {len} bytes is not a multiple of the {record_bytes}-byte record"
            ),
            CodecError::LengthMismatch {
                name,
                expected,
                actual,
            } => write!(f, "{name}: expected {expected} bytes, got {actual}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Numeric element that can cross the worker boundary.
pub trait WireElement: Pod {
    const TYPE: ElementType;

    /// Reverses the byte order of the element.
    fn byte_swapped(self) -> Self;
}

macro_rules! wire_int {
    ($($t:ty => $tag:ident),* $(,)?) => {
        $(
            impl WireElement for $t {
                const TYPE: ElementType = ElementType::$tag;

                fn byte_swapped(self) -> Self {
                    <$t>::swap_bytes(self)
                }
            }
        )*
    };
}

wire_int!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
);

impl WireElement for f32 {
    const TYPE: ElementType = ElementType::F32;

    fn byte_swapped(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl WireElement for f64 {
    const TYPE: ElementType = ElementType::F64;

    fn byte_swapped(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

/// Serializes a numeric slice as little-endian bytes.
pub fn encode_slice<T: WireElement>(values: &[T]) -> Bytes {
    if cfg!(target_endian = "little") {
        return Bytes::copy_from_slice(bytemuck::cast_slice(values));
    }
    let swapped: Vec<T> = values.iter().map(|v| v.byte_swapped()).collect();
    Bytes::copy_from_slice(bytemuck::cast_slice(&swapped))
}

/// Reconstructs a numeric vector from little-endian bytes.
pub fn decode_slice<T: WireElement>(bytes: &[u8]) -> Result<Vec<T>, CodecError> {
    let element_size = std::mem::size_of::<T>();
    if bytes.len() % element_size != 0 {
        return Err(CodecError::Misaligned {
            len: bytes.len(),
            element_size,
        });
    }
    let mut out: Vec<T> = bytemuck::allocation::pod_collect_to_vec(bytes);
    if cfg!(target_endian = "big") {
        for v in &mut out {
            *v = v.byte_swapped();
        }
    }
    Ok(out)
}

fn validate(name: &'static str, layout: RecordLayout, len: usize) -> Result<(), CodecError> {
    let element_size = layout.element.size_bytes();
    if len % element_size != 0 {
        return Err(CodecError::Misaligned { len, element_size });
    }
    let record_bytes = layout.record_bytes();
    if let Some(records) = layout.exact_records {
        let expected = records * record_bytes;
        if len != expected {
            return Err(CodecError::LengthMismatch {
                name,
                expected,
                actual: len,
            });
        }
    }
    if len % record_bytes != 0 {
        return Err(CodecError::PartialRecord {
            name,
            len,
            record_bytes,
        });
    }
    Ok(())
}

impl Message {
    /// Wraps a numeric slice as a raw byte payload tagged with `operation`.
    pub fn encode<T: WireElement>(operation: Operation, values: &[T]) -> Self {
        Self {
            operation,
            payload: encode_slice(values),
        }
    }

    /// Tags an existing byte buffer without copying it.
    pub fn encode_bytes(operation: Operation, bytes: impl Into<Bytes>) -> Self {
        Self {
            operation,
            payload: bytes.into(),
        }
    }
}

/// Typed view of a decoded [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Winsize { width: f32, height: f32 },
    Viewport(Viewport),
    Data(Vec<[f32; 4]>),
    Monolith(Bytes),
}

/// Decodes a message according to its operation's record layout.
pub fn decode(message: &Message) -> Result<Payload, CodecError> {
    let op = message.operation;
    validate(op.name(), op.layout(), message.payload.len())?;
    match op {
        Operation::SetWinsize => {
            let v: Vec<f32> = decode_slice(&message.payload)?;
            Ok(Payload::Winsize {
                width: v[0],
                height: v[1],
            })
        }
        Operation::SetViewport => {
            let v: Vec<f32> = decode_slice(&message.payload)?;
            Ok(Payload::Viewport(Viewport::new(v[0], v[1], v[2], v[3])))
        }
        Operation::SetData => {
            let v: Vec<f32> = decode_slice(&message.payload)?;
            let bounds = v
                .chunks_exact(4)
                .map(|c| [c[0], c[1], c[2], c[3]])
                .collect();
            Ok(Payload::Data(bounds))
        }
        // Opaque blob: hand the same buffer on.
        Operation::SetMonolith => Ok(Payload::Monolith(message.payload.clone())),
    }
}

/// One culled circle.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Bubble {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Latest result produced by the worker. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBuffer {
    /// Flat `(x, y, radius)` triples.
    Bubbles(Vec<f32>),
    /// Flat index pairs.
    Collisions(Vec<u32>),
    Culled(Vec<u32>),
}

impl ResultBuffer {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Bubbles(_) => EventKind::Bubbles,
            Self::Collisions(_) => EventKind::Collisions,
            Self::Culled(_) => EventKind::Culled,
        }
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Bubbles(v) => v.len(),
            Self::Collisions(v) | Self::Culled(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_count(&self) -> usize {
        self.len() / self.kind().layout().fields
    }

    /// Bubble records. Empty for other kinds, or when the buffer does not
    /// hold a whole number of triples.
    pub fn bubbles(&self) -> &[Bubble] {
        match self {
            Self::Bubbles(v) => bytemuck::try_cast_slice(v).unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Index pairs. Empty for other kinds, or on an odd element count.
    pub fn pairs(&self) -> &[[u32; 2]] {
        match self {
            Self::Collisions(v) => bytemuck::try_cast_slice(v).unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Flat index list; for collisions this is the pairs laid end to end.
    pub fn indices(&self) -> &[u32] {
        match self {
            Self::Collisions(v) | Self::Culled(v) => v,
            Self::Bubbles(_) => &[],
        }
    }
}

/// Decodes a worker event into a result buffer.
pub fn decode_event(event: &WorkerEvent) -> Result<ResultBuffer, CodecError> {
    let kind = event.kind;
    validate(kind.name(), kind.layout(), event.payload.len())?;
    Ok(match kind {
        EventKind::Bubbles => ResultBuffer::Bubbles(decode_slice(&event.payload)?),
        EventKind::Collisions => ResultBuffer::Collisions(decode_slice(&event.payload)?),
        EventKind::Culled => ResultBuffer::Culled(decode_slice(&event.payload)?),
    })
}
