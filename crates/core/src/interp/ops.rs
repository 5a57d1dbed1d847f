//! Content-stream operations.
//!
//! The closed set of drawing/text operations materialized by the
//! interpreter. Operators recognized for stack correctness only (colour,
//! shading, XObjects, inline images, marked content, compatibility)
//! consume their operands and produce nothing here.

/// A decoded content-stream operation with its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    // Graphics state
    SaveGraphicsState,
    RestoreGraphicsState,
    ConcatMatrix {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    SetLineWidth(f64),
    SetLineCap(i64),
    SetLineJoin(i64),
    SetMiterLimit(f64),
    SetDashPattern {
        array: Vec<f64>,
        phase: f64,
    },
    SetRenderingIntent(String),
    SetFlatness(f64),
    SetExtGState(String),

    // Path construction
    BeginSubpath {
        x: f64,
        y: f64,
    },
    AppendLine {
        x: f64,
        y: f64,
    },
    AppendBezier {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    },
    AppendBezierInitial {
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    },
    AppendBezierFinal {
        x1: f64,
        y1: f64,
        x3: f64,
        y3: f64,
    },
    ClosePath,
    AppendRectangle {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },

    // Path painting
    StrokePath,

    // Text positioning
    MoveText {
        tx: f64,
        ty: f64,
    },
    MoveTextSetLeading {
        tx: f64,
        ty: f64,
    },
    SetTextMatrix {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    },
    NextLine,

    // Font selection
    SetFont {
        name: String,
        size: f64,
    },

    // Text showing
    ShowText(Vec<u8>),
    /// Position adjustment from a TJ array number element
    AdjustText(f64),
}
