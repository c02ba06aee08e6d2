//! Message types for the main-thread ↔ compute-worker boundary.
//!
//! Every message is an operation tag plus a raw little-endian byte payload.
//! The payload layout is fixed per operation (see [`RecordLayout`]):
//!
//! | operation      | payload                                   |
//! |----------------|-------------------------------------------|
//! | `set_winsize`  | 2 × f32: width, height                    |
//! | `set_viewport` | 4 × f32: xmin, ymin, xmax, ymax           |
//! | `set_data`     | N × 4 × f32: per-entity bounds            |
//! | `set_monolith` | opaque bytes                              |
//!
//! | event        | payload                        |
//! |--------------|--------------------------------|
//! | `bubbles`    | N × 3 × f32: x, y, radius      |
//! | `collisions` | N × 2 × u32: index pairs       |
//! | `culled`     | N × u32: flat index list       |
//!
//! No request identifier is carried. A response is attributed to the most
//! recently sent request, which only holds while at most one request is in
//! flight.

use bytes::Bytes;

use foundation::bounds::Viewport;
use foundation::window::WindowSize;

use crate::codec::encode_slice;

/// Scalar type of a payload element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
}

impl ElementType {
    pub fn size_bytes(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

/// Fixed record layout of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub element: ElementType,
    /// Elements per record.
    pub fields: usize,
    /// `Some(n)` when the payload must hold exactly `n` records.
    pub exact_records: Option<usize>,
}

impl RecordLayout {
    const fn new(element: ElementType, fields: usize, exact_records: Option<usize>) -> Self {
        Self {
            element,
            fields,
            exact_records,
        }
    }

    pub fn record_bytes(&self) -> usize {
        self.element.size_bytes() * self.fields
    }
}

/// Main → worker operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetWinsize,
    SetViewport,
    SetData,
    SetMonolith,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::SetWinsize => "set_winsize",
            Self::SetViewport => "set_viewport",
            Self::SetData => "set_data",
            Self::SetMonolith => "set_monolith",
        }
    }

    pub fn layout(self) -> RecordLayout {
        match self {
            Self::SetWinsize => RecordLayout::new(ElementType::F32, 2, Some(1)),
            Self::SetViewport => RecordLayout::new(ElementType::F32, 4, Some(1)),
            Self::SetData => RecordLayout::new(ElementType::F32, 4, None),
            Self::SetMonolith => RecordLayout::new(ElementType::U8, 1, None),
        }
    }
}

/// Worker → main result events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Bubbles,
    Collisions,
    Culled,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bubbles => "bubbles",
            Self::Collisions => "collisions",
            Self::Culled => "culled",
        }
    }

    pub fn layout(self) -> RecordLayout {
        match self {
            Self::Bubbles => RecordLayout::new(ElementType::F32, 3, None),
            Self::Collisions => RecordLayout::new(ElementType::U32, 2, None),
            Self::Culled => RecordLayout::new(ElementType::U32, 1, None),
        }
    }
}

/// A tagged payload sent to the worker. The payload is moved, never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub operation: Operation,
    pub payload: Bytes,
}

impl Message {
    pub fn set_winsize(window: &WindowSize) -> Self {
        Self::encode(Operation::SetWinsize, &window.to_array())
    }

    pub fn set_viewport(viewport: &Viewport) -> Self {
        Self::encode(Operation::SetViewport, &viewport.to_array())
    }

    pub fn set_data(bounds: &[[f32; 4]]) -> Self {
        Self::encode(Operation::SetData, bytemuck::cast_slice::<[f32; 4], f32>(bounds))
    }

    /// Forwards an externally fetched blob verbatim.
    pub fn set_monolith(blob: impl Into<Bytes>) -> Self {
        Self::encode_bytes(Operation::SetMonolith, blob)
    }

    pub fn len_bytes(&self) -> usize {
        self.payload.len()
    }
}

/// A tagged result payload sent back by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub kind: EventKind,
    pub payload: Bytes,
}

impl WorkerEvent {
    pub fn bubbles(xyr: &[f32]) -> Self {
        Self {
            kind: EventKind::Bubbles,
            payload: encode_slice(xyr),
        }
    }

    pub fn collisions(pairs: &[[u32; 2]]) -> Self {
        Self {
            kind: EventKind::Collisions,
            payload: encode_slice(bytemuck::cast_slice::<[u32; 2], u32>(pairs)),
        }
    }

    pub fn culled(indices: &[u32]) -> Self {
        Self {
            kind: EventKind::Culled,
            payload: encode_slice(indices),
        }
    }
}
