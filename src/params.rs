//! Timing and repetition parameters: closed integer intervals with defaults.
//!
//! Every instruction carries one range per parameter. A range samples
//! uniformly between its bounds; declaring a parameter with a single value
//! collapses the range to that value.

use rand::Rng;

/// The fixed parameter set. No other names are recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Duration,
    Before,
    After,
    Repeat,
    Cooldown,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::Duration,
        Param::Before,
        Param::After,
        Param::Repeat,
        Param::Cooldown,
    ];

    /// Parse a parameter name as it appears in a script line.
    pub fn parse(name: &str) -> Option<Param> {
        match name {
            "duration" => Some(Param::Duration),
            "before" => Some(Param::Before),
            "after" => Some(Param::After),
            "repeat" => Some(Param::Repeat),
            "cooldown" => Some(Param::Cooldown),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Param::Duration => "duration",
            Param::Before => "before",
            Param::After => "after",
            Param::Repeat => "repeat",
            Param::Cooldown => "cooldown",
        }
    }

    fn index(&self) -> usize {
        match self {
            Param::Duration => 0,
            Param::Before => 1,
            Param::After => 2,
            Param::Repeat => 3,
            Param::Cooldown => 4,
        }
    }

    fn default_range(&self) -> Range {
        match self {
            Param::Duration => Range::new(50, 70),
            Param::Before => Range::new(0, 0),
            Param::After => Range::new(30, 50),
            Param::Repeat => Range::new(0, 0),
            Param::Cooldown => Range::new(0, 0),
        }
    }
}

/// A closed integer interval `[lo, hi]` with `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    lo: i32,
    hi: i32,
}

impl Range {
    pub fn new(lo: i32, hi: i32) -> Self {
        debug_assert!(lo <= hi, "range bounds out of order: [{lo}, {hi}]");
        Self { lo, hi }
    }

    /// A range declared with one value: `hi = lo`.
    pub fn single(value: i32) -> Self {
        Self::new(value, value)
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    /// Returns `lo` for a collapsed range, otherwise a uniform integer in
    /// `[lo, hi]`.
    pub fn sample(&self) -> i32 {
        if self.lo == self.hi {
            return self.lo;
        }
        rand::thread_rng().gen_range(self.lo..=self.hi)
    }
}

/// One range per parameter, initialized to the language defaults:
/// duration [50, 70] ms, before [0, 0], after [30, 50] ms, repeat [0, 0],
/// cooldown [0, 0].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSet {
    ranges: [Range; 5],
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            ranges: Param::ALL.map(|p| p.default_range()),
        }
    }
}

impl ParamSet {
    pub fn get(&self, param: Param) -> Range {
        self.ranges[param.index()]
    }

    pub fn set(&mut self, param: Param, range: Range) {
        self.ranges[param.index()] = range;
    }
}
