//! Content-stream interpreter.
//!
//! Re-tokenizes decoded content-stream bytes and drives an operand stack
//! machine: non-keyword tokens are pushed, keywords consume operands in
//! the order they were pushed (oldest first) and yield zero or more
//! operations. The stack is cleared after every table operator, and a
//! malformed operand count warns and pads rather than failing - content
//! producers vary too much for strictness to pay off.

use super::ops::Operation;
use crate::parser::lexer::{Keyword, Lexer, Token};
use std::collections::VecDeque;
use tracing::warn;

/// Operand stack with first-in-first-out consumption.
struct OperandStack {
    items: VecDeque<Token>,
}

impl OperandStack {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    fn push(&mut self, token: Token) {
        self.items.push_back(token);
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    /// Consume for an operand-less operator; leftovers are noise.
    fn ignore(&mut self) {
        if !self.items.is_empty() {
            warn!(leftover = self.items.len(), "operands before bare operator");
            self.clear();
        }
    }

    /// Pop the oldest operand, padding with zero when short.
    fn pop(&mut self) -> Token {
        match self.items.pop_front() {
            Some(token) => token,
            None => {
                warn!("operand stack underflow, padding with 0");
                Token::Int(0)
            }
        }
    }

    /// Pop the oldest n operands and clear the remainder.
    fn pop_n(&mut self, n: usize) -> Vec<Token> {
        if self.items.len() != n {
            warn!(
                have = self.items.len(),
                want = n,
                "operand count mismatch"
            );
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.pop());
        }
        self.clear();
        out
    }

    /// Pop an array delimited by structural markers.
    fn pop_array(&mut self) -> Vec<Token> {
        let open = self.pop();
        if open != Token::Keyword(Keyword::ArrayStart) {
            warn!(?open, "expected array start");
        }
        let mut out = Vec::new();
        loop {
            match self.items.pop_front() {
                None | Some(Token::Keyword(Keyword::ArrayEnd)) => break,
                Some(token) => out.push(token),
            }
        }
        out
    }
}

fn as_num(token: &Token) -> f64 {
    match token {
        Token::Int(n) => *n as f64,
        Token::Real(n) => *n,
        other => {
            warn!(?other, "expected number operand");
            0.0
        }
    }
}

fn as_int(token: &Token) -> i64 {
    match token {
        Token::Int(n) => *n,
        Token::Real(n) => *n as i64,
        other => {
            warn!(?other, "expected integer operand");
            0
        }
    }
}

fn as_name(token: Token) -> String {
    match token {
        Token::Name(name) => name,
        other => {
            warn!(?other, "expected name operand");
            String::new()
        }
    }
}

fn as_string(token: Token) -> Vec<u8> {
    match token {
        Token::String(bytes) => bytes,
        other => {
            warn!(?other, "expected string operand");
            Vec::new()
        }
    }
}

/// Parse content-stream bytes into a lazy sequence of operations.
pub struct ContentParser<'a> {
    lexer: Lexer<'a>,
    stack: OperandStack,
    pending: VecDeque<Operation>,
}

impl<'a> ContentParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            stack: OperandStack::new(),
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for ContentParser<'_> {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        loop {
            if let Some(op) = self.pending.pop_front() {
                return Some(op);
            }

            let (pos, token) = match self.lexer.next_token()? {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, "content stream lex error, stopping");
                    return None;
                }
            };

            match token {
                // Structural markers are operands (TJ and d arrays, BDC
                // property dicts), not operators.
                Token::Keyword(Keyword::ArrayStart)
                | Token::Keyword(Keyword::ArrayEnd)
                | Token::Keyword(Keyword::DictStart)
                | Token::Keyword(Keyword::DictEnd) => {
                    self.stack.push(token);
                }
                Token::Keyword(Keyword::Unknown(bytes)) => {
                    warn!(
                        pos,
                        operator = %String::from_utf8_lossy(&bytes),
                        "unknown content operator"
                    );
                }
                Token::Keyword(kw) => {
                    self.pending
                        .extend(build_operations(&kw, &mut self.stack));
                    self.stack.clear();
                }
                operand => self.stack.push(operand),
            }
        }
    }
}

/// The fixed operator table: one pure function from keyword and operand
/// stack to an operation list.
fn build_operations(kw: &Keyword, stack: &mut OperandStack) -> Vec<Operation> {
    use Operation::*;

    match kw {
        // Graphics state
        Keyword::Qq => {
            stack.ignore();
            vec![SaveGraphicsState]
        }
        Keyword::Q => {
            stack.ignore();
            vec![RestoreGraphicsState]
        }
        Keyword::Cm => {
            let ops = stack.pop_n(6);
            vec![ConcatMatrix {
                a: as_num(&ops[0]),
                b: as_num(&ops[1]),
                c: as_num(&ops[2]),
                d: as_num(&ops[3]),
                e: as_num(&ops[4]),
                f: as_num(&ops[5]),
            }]
        }
        Keyword::Ww => vec![SetLineWidth(as_num(&stack.pop()))],
        Keyword::J => vec![SetLineCap(as_int(&stack.pop()))],
        Keyword::Jj => vec![SetLineJoin(as_int(&stack.pop()))],
        Keyword::M => vec![SetMiterLimit(as_num(&stack.pop()))],
        Keyword::D => {
            let array = stack.pop_array().iter().map(as_num).collect();
            let phase = as_num(&stack.pop());
            vec![SetDashPattern { array, phase }]
        }
        Keyword::Ri => vec![SetRenderingIntent(as_name(stack.pop()))],
        Keyword::I => vec![SetFlatness(as_num(&stack.pop()))],
        Keyword::Gs => vec![SetExtGState(as_name(stack.pop()))],

        // Path construction
        Keyword::Mm => {
            let ops = stack.pop_n(2);
            vec![BeginSubpath {
                x: as_num(&ops[0]),
                y: as_num(&ops[1]),
            }]
        }
        Keyword::L => {
            let ops = stack.pop_n(2);
            vec![AppendLine {
                x: as_num(&ops[0]),
                y: as_num(&ops[1]),
            }]
        }
        Keyword::C => {
            let ops = stack.pop_n(6);
            vec![AppendBezier {
                x1: as_num(&ops[0]),
                y1: as_num(&ops[1]),
                x2: as_num(&ops[2]),
                y2: as_num(&ops[3]),
                x3: as_num(&ops[4]),
                y3: as_num(&ops[5]),
            }]
        }
        Keyword::V => {
            let ops = stack.pop_n(4);
            vec![AppendBezierInitial {
                x2: as_num(&ops[0]),
                y2: as_num(&ops[1]),
                x3: as_num(&ops[2]),
                y3: as_num(&ops[3]),
            }]
        }
        Keyword::Y => {
            let ops = stack.pop_n(4);
            vec![AppendBezierFinal {
                x1: as_num(&ops[0]),
                y1: as_num(&ops[1]),
                x3: as_num(&ops[2]),
                y3: as_num(&ops[3]),
            }]
        }
        Keyword::H => {
            stack.ignore();
            vec![ClosePath]
        }
        Keyword::Re => {
            let ops = stack.pop_n(4);
            vec![AppendRectangle {
                x: as_num(&ops[0]),
                y: as_num(&ops[1]),
                w: as_num(&ops[2]),
                h: as_num(&ops[3]),
            }]
        }

        // Path painting
        Keyword::S => {
            stack.ignore();
            vec![StrokePath]
        }
        Keyword::Ss => {
            stack.ignore();
            vec![ClosePath, StrokePath]
        }

        // Text positioning
        Keyword::Td => {
            let ops = stack.pop_n(2);
            vec![MoveText {
                tx: as_num(&ops[0]),
                ty: as_num(&ops[1]),
            }]
        }
        Keyword::TD => {
            let ops = stack.pop_n(2);
            vec![MoveTextSetLeading {
                tx: as_num(&ops[0]),
                ty: as_num(&ops[1]),
            }]
        }
        Keyword::Tm => {
            let ops = stack.pop_n(6);
            vec![SetTextMatrix {
                a: as_num(&ops[0]),
                b: as_num(&ops[1]),
                c: as_num(&ops[2]),
                d: as_num(&ops[3]),
                e: as_num(&ops[4]),
                f: as_num(&ops[5]),
            }]
        }
        Keyword::TStar => {
            stack.ignore();
            vec![NextLine]
        }

        // Font selection
        Keyword::Tf => {
            let ops = stack.pop_n(2);
            let [name, size] = match <[Token; 2]>::try_from(ops) {
                Ok(pair) => pair,
                Err(_) => return vec![],
            };
            vec![SetFont {
                name: as_name(name),
                size: as_num(&size),
            }]
        }

        // Text showing
        Keyword::Tj => vec![ShowText(as_string(stack.pop()))],
        Keyword::Quote => vec![NextLine, ShowText(as_string(stack.pop()))],
        Keyword::DoubleQuote => {
            // aw ac string " - the spacing operands are consumed only
            let ops = stack.pop_n(3);
            let text = match ops.into_iter().nth(2) {
                Some(token) => as_string(token),
                None => Vec::new(),
            };
            vec![NextLine, ShowText(text)]
        }
        Keyword::TJ => {
            let mut out = Vec::new();
            for token in stack.pop_array() {
                match token {
                    Token::String(bytes) => out.push(ShowText(bytes)),
                    Token::Int(_) | Token::Real(_) => out.push(AdjustText(as_num(&token))),
                    other => {
                        warn!(?other, "unexpected TJ array element");
                    }
                }
            }
            out
        }

        // Recognized for stack correctness, no operation materialized:
        // path painting variants, clipping, text object bounds and state,
        // colour, shading, XObjects, inline images, marked content,
        // compatibility, Type3 glyph metrics, CMap structure.
        _ => {
            stack.clear();
            vec![]
        }
    }
}
