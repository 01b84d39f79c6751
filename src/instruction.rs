//! The instruction record: the canonical unit every script line produces.
//!
//! An instruction can be a single key, an inline press, a group, a
//! scheduler, or a declaration. After registration in the instruction table
//! only the child list may grow; identity, kind, button, and parameter
//! ranges are frozen behind getters.

use crate::keys::ScanCode;
use crate::params::{Param, ParamSet, Range};

/// Every kind a script line can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Key,
    Press,
    Hold,
    Release,
    Start,
    Stop,
    Script,
    Window,
    Waitlist,
    Routine,
    Random,
    Group,
}

impl Kind {
    /// Parse the leading token of a script line.
    pub fn parse(token: &str) -> Option<Kind> {
        match token {
            "key" => Some(Kind::Key),
            "press" => Some(Kind::Press),
            "hold" => Some(Kind::Hold),
            "release" => Some(Kind::Release),
            "start" => Some(Kind::Start),
            "stop" => Some(Kind::Stop),
            "script" => Some(Kind::Script),
            "window" => Some(Kind::Window),
            "waitlist" => Some(Kind::Waitlist),
            "routine" => Some(Kind::Routine),
            "random" => Some(Kind::Random),
            "group" => Some(Kind::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Key => "key",
            Kind::Press => "press",
            Kind::Hold => "hold",
            Kind::Release => "release",
            Kind::Start => "start",
            Kind::Stop => "stop",
            Kind::Script => "script",
            Kind::Window => "window",
            Kind::Waitlist => "waitlist",
            Kind::Routine => "routine",
            Kind::Random => "random",
            Kind::Group => "group",
        }
    }

    /// Definition kinds create a named, reusable entity, e.g.
    /// `key sample with button a`.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            Kind::Key
                | Kind::Script
                | Kind::Window
                | Kind::Waitlist
                | Kind::Routine
                | Kind::Random
                | Kind::Group
        )
    }

    /// Kinds that may be defined in place by referencing another id on the
    /// same line, e.g. `press sample with repeat 2`.
    pub fn can_define_inplace(&self) -> bool {
        matches!(self, Kind::Press | Kind::Hold | Kind::Release)
    }

    /// Transactions enqueue a runtime action when found at indent 0.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            Kind::Press | Kind::Hold | Kind::Release | Kind::Start | Kind::Stop
        )
    }

    /// Schedulers own a dispatch policy over their children.
    pub fn is_scheduler(&self) -> bool {
        matches!(self, Kind::Routine | Kind::Waitlist | Kind::Random)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    id: String,
    kind: Kind,
    button: Option<ScanCode>,
    indent: usize,
    params: ParamSet,
    children: Vec<String>,
    line: usize,
}

impl Instruction {
    pub fn new(id: impl Into<String>, kind: Kind, line: usize, indent: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            button: None,
            indent,
            params: ParamSet::default(),
            children: Vec::new(),
            line,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn button(&self) -> Option<ScanCode> {
        self.button
    }

    /// Leading whitespace of the source line; a space counts 1, a tab 4.
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn param(&self, param: Param) -> Range {
        self.params.get(param)
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// 1-based source line, for diagnostics.
    pub fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn set_button(&mut self, code: ScanCode) {
        self.button = Some(code);
    }

    pub(crate) fn set_param(&mut self, param: Param, range: Range) {
        self.params.set(param, range);
    }

    /// Appending children is the only mutation allowed after registration;
    /// the nesting resolver and running schedulers both rely on it.
    pub fn push_child(&mut self, child_id: impl Into<String>) {
        self.children.push(child_id.into());
    }

    /// Take over the referent's button and parameter ranges. Used when an
    /// in-place `press`/`hold`/`release` shadows an existing definition;
    /// same-line parameter groups applied afterwards override these values.
    pub(crate) fn copy_values_from(&mut self, reference: &Instruction) {
        self.button = reference.button;
        self.params = reference.params.clone();
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}` (line {})", self.kind, self.id, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_roundtrip() {
        for token in [
            "key", "press", "hold", "release", "start", "stop", "script", "window", "waitlist",
            "routine", "random", "group",
        ] {
            let kind = Kind::parse(token).unwrap();
            assert_eq!(kind.as_str(), token);
        }
        assert_eq!(Kind::parse("loop"), None);
    }

    #[test]
    fn test_taxonomy() {
        assert!(Kind::Key.is_definition());
        assert!(Kind::Group.is_definition());
        assert!(!Kind::Press.is_definition());

        assert!(Kind::Press.can_define_inplace());
        assert!(Kind::Release.can_define_inplace());
        assert!(!Kind::Start.can_define_inplace());

        assert!(Kind::Start.is_transaction());
        assert!(Kind::Hold.is_transaction());
        assert!(!Kind::Routine.is_transaction());

        assert!(Kind::Routine.is_scheduler());
        assert!(Kind::Random.is_scheduler());
        assert!(!Kind::Group.is_scheduler());
    }

    #[test]
    fn test_new_instruction_defaults() {
        let instruction = Instruction::new("sample", Kind::Key, 3, 0);
        assert_eq!(instruction.id(), "sample");
        assert_eq!(instruction.param(Param::Duration), Range::new(50, 70));
        assert!(instruction.button().is_none());
        assert!(instruction.children().is_empty());
        assert_eq!(instruction.line(), 3);
    }

    #[test]
    fn test_copy_values_overwrites_button_and_params() {
        let mut reference = Instruction::new("base", Kind::Key, 1, 0);
        reference.set_button(ScanCode(0x10));
        reference.set_param(Param::Duration, Range::single(10));

        let mut alias = Instruction::new("Alias_00(base)", Kind::Press, 2, 0);
        alias.copy_values_from(&reference);

        assert_eq!(alias.button(), Some(ScanCode(0x10)));
        assert_eq!(alias.param(Param::Duration), Range::single(10));
        // The copy never touches identity.
        assert_eq!(alias.kind(), Kind::Press);
        assert_eq!(alias.id(), "Alias_00(base)");
    }
}
