use std::{fmt, rc::Rc};

/// A set of bytes, one bit per value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteSet([u64; 4]);

impl ByteSet {
    pub const fn empty() -> Self {
        Self([0; 4])
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut set = Self::empty();
        for &byte in bytes {
            set.insert(byte);
        }
        set
    }

    pub fn insert(&mut self, byte: u8) {
        self.0[usize::from(byte >> 6)] |= 1 << (byte & 63);
    }

    pub fn insert_range(&mut self, low: u8, high: u8) {
        for byte in low..=high {
            self.insert(byte);
        }
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.0[usize::from(byte >> 6)] & (1 << (byte & 63)) != 0
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<u8> = (0..=u8::MAX).filter(|&b| self.contains(b)).collect();
        write!(f, "ByteSet({:?})", String::from_utf8_lossy(&members))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Always succeeds without consuming.
    True,
    /// Always fails.
    False,
    /// Exactly `n` bytes.
    Any(usize),
    /// Succeeds, consuming nothing, when fewer than `n` bytes remain.
    Shorter(usize),
    Literal(Vec<u8>),
    Set(ByteSet),
    Sequence(Rc<Pattern>, Rc<Pattern>),
    Choice(Rc<Pattern>, Rc<Pattern>),
    Not(Rc<Pattern>),
    And(Rc<Pattern>),
    AtLeast(Rc<Pattern>, usize),
    AtMost(Rc<Pattern>, usize),
    Capture(Rc<Pattern>),
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Byte range `start..end` of the subject.
    Substring { start: usize, end: usize },
    /// Zero-based byte offset.
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub end: usize,
    pub captures: Vec<Capture>,
}

impl Pattern {
    pub fn integer(n: i64) -> Self {
        let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
        if n >= 0 { Pattern::Any(count) } else { Pattern::Shorter(count) }
    }

    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Pattern::Literal(bytes.into())
    }

    /// `p1 - p2`: `p1`, provided `p2` does not match here.
    pub fn difference(left: Rc<Pattern>, right: Rc<Pattern>) -> Self {
        Pattern::Sequence(Rc::new(Pattern::Not(right)), left)
    }

    /// `p ^ n`: at least `n` repetitions for `n >= 0`, at most `-n` otherwise.
    pub fn repeat(pattern: Rc<Pattern>, n: i64) -> Self {
        let count = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
        if n >= 0 {
            Pattern::AtLeast(pattern, count)
        } else {
            Pattern::AtMost(pattern, count)
        }
    }

    /// Matches anchored at `init`, a byte offset into `subject`.
    pub fn matches(&self, subject: &[u8], init: usize) -> Option<Match> {
        let mut captures = Vec::new();
        let end = self.step(subject, init.min(subject.len()), &mut captures)?;
        Some(Match { end, captures })
    }

    fn step(&self, subject: &[u8], pos: usize, captures: &mut Vec<Capture>) -> Option<usize> {
        match self {
            Pattern::True => Some(pos),
            Pattern::False => None,
            Pattern::Any(n) => {
                let end = pos.checked_add(*n)?;
                (end <= subject.len()).then_some(end)
            }
            Pattern::Shorter(n) => (subject.len() - pos < *n).then_some(pos),
            Pattern::Literal(bytes) => subject[pos..]
                .starts_with(bytes)
                .then(|| pos + bytes.len()),
            Pattern::Set(set) => match subject.get(pos) {
                Some(&byte) if set.contains(byte) => Some(pos + 1),
                _ => None,
            },
            Pattern::Sequence(first, second) => {
                let mark = captures.len();
                let result = first
                    .step(subject, pos, captures)
                    .and_then(|mid| second.step(subject, mid, captures));
                if result.is_none() {
                    captures.truncate(mark);
                }
                result
            }
            Pattern::Choice(first, second) => {
                let mark = captures.len();
                if let Some(end) = first.step(subject, pos, captures) {
                    return Some(end);
                }
                captures.truncate(mark);
                second.step(subject, pos, captures)
            }
            Pattern::Not(inner) => {
                let mark = captures.len();
                let matched = inner.step(subject, pos, captures).is_some();
                captures.truncate(mark);
                (!matched).then_some(pos)
            }
            Pattern::And(inner) => {
                let mark = captures.len();
                let matched = inner.step(subject, pos, captures).is_some();
                captures.truncate(mark);
                matched.then_some(pos)
            }
            Pattern::AtLeast(inner, min) => {
                let mark = captures.len();
                let mut current = pos;
                let mut count = 0;
                loop {
                    let before = captures.len();
                    match inner.step(subject, current, captures) {
                        Some(next) if next > current => {
                            current = next;
                            count += 1;
                        }
                        Some(_) => {
                            // Consumed nothing: further iterations would loop
                            // forever, so treat the requirement as satisfied.
                            captures.truncate(before);
                            count = count.max(*min);
                            break;
                        }
                        None => {
                            captures.truncate(before);
                            break;
                        }
                    }
                }
                if count < *min {
                    captures.truncate(mark);
                    return None;
                }
                Some(current)
            }
            Pattern::AtMost(inner, max) => {
                let mut current = pos;
                for _ in 0..*max {
                    let before = captures.len();
                    match inner.step(subject, current, captures) {
                        Some(next) if next > current => current = next,
                        _ => {
                            captures.truncate(before);
                            break;
                        }
                    }
                }
                Some(current)
            }
            Pattern::Capture(inner) => {
                let mark = captures.len();
                captures.push(Capture::Position(pos));
                match inner.step(subject, pos, captures) {
                    Some(end) => {
                        captures[mark] = Capture::Substring { start: pos, end };
                        Some(end)
                    }
                    None => {
                        captures.truncate(mark);
                        None
                    }
                }
            }
            Pattern::Position => {
                captures.push(Capture::Position(pos));
                Some(pos)
            }
        }
    }
}
