use std::fmt;

use crate::chop;

/// Anything that can answer `chop(target, sequence)`.
///
/// Returns an index holding `target`, or [`chop::NOT_FOUND`] when the target is absent.
pub trait Chopper {
    fn chop(&self, target: i64, sequence: &[i64]) -> isize;
}

impl<F> Chopper for F
where
    F: Fn(i64, &[i64]) -> isize,
{
    fn chop(&self, target: i64, sequence: &[i64]) -> isize {
        self(target, sequence)
    }
}

/// The registered implementations, tested in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Candidate {
    Iterative,
    Recursive,
    Halving,
    Std,
    Stub,
}

impl Candidate {
    pub const ALL: [Candidate; 5] = [
        Candidate::Iterative,
        Candidate::Recursive,
        Candidate::Halving,
        Candidate::Std,
        Candidate::Stub,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Candidate::Iterative => "iterative",
            Candidate::Recursive => "recursive",
            Candidate::Halving => "halving",
            Candidate::Std => "std",
            Candidate::Stub => "stub",
        }
    }

    pub fn about(self) -> &'static str {
        match self {
            Candidate::Iterative => "loop over a shrinking [low, high) window",
            Candidate::Recursive => "recursion on the window bounds",
            Candidate::Halving => "recursion on sub-slices",
            Candidate::Std => "slice::binary_search from the standard library",
            Candidate::Stub => "not implemented, always answers -1",
        }
    }
}

impl Chopper for Candidate {
    fn chop(&self, target: i64, sequence: &[i64]) -> isize {
        let found = match self {
            Candidate::Iterative => chop::search(sequence, target),
            Candidate::Recursive => chop::search_recursive(sequence, target),
            Candidate::Halving => chop::search_halving(sequence, target),
            Candidate::Std => chop::search_std(sequence, target),
            Candidate::Stub => None,
        };
        chop::to_index(found)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
