//! Parse a script source into a [`Program`]: the instruction table, the
//! top-level execution list, and the window/script declarations.
//!
//! The grammar is line-oriented:
//!
//! ```text
//! <kind> <id words…> [with <param>[, <param>]…]
//! ```
//!
//! where a `<param>` group is `button <keyname>`, `<name> <int> [<int>]`
//! for a timing parameter, or a bare reference to an existing id.
//! Indentation expresses nesting: the deepest strictly-shallower preceding
//! line is the parent. Blank lines and `#` comments are ignored.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use crate::instruction::{Instruction, Kind};
use crate::keys;
use crate::params::{Param, Range};
use crate::table::InstructionTable;

/// A tab counts as this many columns of indentation.
const TAB_WIDTH: usize = 4;

/// A fully parsed script, ready to hand to the runtime.
#[derive(Debug, Default)]
pub struct Program {
    pub(crate) table: InstructionTable,
    pub(crate) execution_list: Vec<String>,
    pub(crate) windows: Vec<String>,
    pub(crate) scripts: Vec<String>,
}

impl Program {
    pub fn table(&self) -> &InstructionTable {
        &self.table
    }

    /// Ids of the indent-0 transactions, in source order.
    pub fn execution_list(&self) -> &[String] {
        &self.execution_list
    }

    /// Window titles declared by `window` definitions, in source order.
    pub fn windows(&self) -> &[String] {
        &self.windows
    }

    /// Names declared by `script` definitions, in source order.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}

/// Parse a script from an in-memory string.
pub fn parse_str(source: &str) -> Result<Program> {
    let mut parser = Parser::default();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_number = idx + 1;
        parser
            .parse_line(line_number, raw_line)
            .with_context(|| format!("Failed to parse line {}: {}", line_number, raw_line.trim()))?;
    }

    Ok(parser.finish())
}

/// Parse a script from a file path.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Program> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&source)
}

#[derive(Default)]
struct Parser {
    program: Program,
    /// Ids of every parsed line in source order; the nesting resolver scans
    /// this backwards to find parents.
    seen: Vec<String>,
}

impl Parser {
    fn parse_line(&mut self, line_number: usize, raw_line: &str) -> Result<()> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let indent = indent_width(raw_line);
        let (kind_token, header_id, groups) = split_line(trimmed);

        let kind = Kind::parse(kind_token)
            .ok_or_else(|| anyhow!("unknown instruction kind `{kind_token}`"))?;

        let mut instruction = self.build_header(kind, &header_id, line_number, indent)?;
        for group in &groups {
            self.apply_group(&mut instruction, group)?;
        }

        self.register(instruction, indent, &header_id)
    }

    /// Creates the line's instruction from its kind and header id.
    ///
    /// Definitions own their id. A press/hold/release header that names an
    /// existing instruction becomes a generated-alias reference to it,
    /// taking over the referent's button and parameter ranges so that
    /// same-line groups can override them; a new header id defines a named
    /// leaf carrying its own button and parameters. start/stop always
    /// reference an existing id behind a generated alias.
    fn build_header(
        &mut self,
        kind: Kind,
        header_id: &str,
        line_number: usize,
        indent: usize,
    ) -> Result<Instruction> {
        if kind.is_definition() {
            if header_id.is_empty() {
                bail!("missing id for {kind} definition");
            }
            check_user_id(header_id)?;
            return Ok(Instruction::new(header_id, kind, line_number, indent));
        }

        if header_id.is_empty() {
            bail!("missing target for {kind}");
        }

        if kind.can_define_inplace() {
            if self.program.table.contains(header_id) {
                let reference = self.program.table.get(header_id)?.clone();
                let alias = self.program.table.generate_alias(header_id);
                let mut instruction = Instruction::new(alias, kind, line_number, indent);
                instruction.copy_values_from(&reference);
                instruction.push_child(header_id);
                return Ok(instruction);
            }
            // An unclaimed id defines a named leaf on this line.
            check_user_id(header_id)?;
            return Ok(Instruction::new(header_id, kind, line_number, indent));
        }

        // start / stop
        if !self.program.table.contains(header_id) {
            bail!("unknown instruction id `{header_id}`");
        }
        let alias = self.program.table.generate_alias(header_id);
        let mut instruction = Instruction::new(alias, kind, line_number, indent);
        instruction.push_child(header_id);
        Ok(instruction)
    }

    /// Applies one comma-separated parameter group to the instruction.
    fn apply_group(&mut self, instruction: &mut Instruction, group: &[String]) -> Result<()> {
        let first = group[0].as_str();

        if let Some(param) = Param::parse(first) {
            let range = parse_range(param, &group[1..], instruction.kind())?;
            instruction.set_param(param, range);
            return Ok(());
        }

        if first == "button" {
            if group.len() != 2 {
                bail!("button takes exactly one key name");
            }
            let name = group[1].as_str();
            let code = keys::code_of(name).ok_or_else(|| anyhow!("unknown key name `{name}`"))?;
            instruction.set_button(code);
            return Ok(());
        }

        // Anything else is a reference to an existing instruction.
        let ref_id = group.join(" ");
        let referenced = self.program.table.get(&ref_id)?;

        let composite = matches!(
            instruction.kind(),
            Kind::Group | Kind::Routine | Kind::Waitlist | Kind::Random
        );
        if composite && matches!(referenced.kind(), Kind::Script | Kind::Window) {
            bail!(
                "a {} cannot be a child of a {}",
                referenced.kind(),
                instruction.kind()
            );
        }

        if instruction.kind().can_define_inplace() {
            // Wrap the reference in its own shadow instruction. The shadow
            // keeps parameter defaults; the referent's button resolves
            // through the child link at execution time.
            let alias = self.program.table.generate_alias(&ref_id);
            let mut shadow = Instruction::new(
                alias.clone(),
                instruction.kind(),
                instruction.line(),
                instruction.indent(),
            );
            shadow.push_child(&ref_id);
            self.program.table.insert(shadow)?;
            instruction.push_child(alias);
        } else {
            instruction.push_child(ref_id);
        }

        Ok(())
    }

    /// Registers the finished instruction and wires it into the program:
    /// indented lines attach to the deepest shallower predecessor, indent-0
    /// transactions enter the execution list.
    fn register(&mut self, instruction: Instruction, indent: usize, header_id: &str) -> Result<()> {
        let id = instruction.id().to_string();
        let kind = instruction.kind();
        self.program.table.insert(instruction)?;

        if indent > 0 {
            let parent_id = self.find_parent(indent)?;
            let parent_kind = self.program.table.get(&parent_id)?.kind();

            if matches!(kind, Kind::Script | Kind::Window) {
                bail!("a {kind} cannot be nested");
            }
            if !matches!(
                parent_kind,
                Kind::Group | Kind::Routine | Kind::Waitlist | Kind::Random
            ) {
                bail!("cannot nest under a {parent_kind}");
            }
            if kind.is_definition() && parent_kind != Kind::Group {
                bail!("a {kind} definition can only nest inside a group");
            }

            self.program.table.push_child(&parent_id, &id)?;
        } else {
            if kind.is_transaction() {
                self.program.execution_list.push(id.clone());
            }
            match kind {
                Kind::Window => self.program.windows.push(header_id.to_string()),
                Kind::Script => self.program.scripts.push(header_id.to_string()),
                _ => {}
            }
        }

        tracing::debug!(id = %id, kind = %kind, indent, "registered instruction");
        self.seen.push(id);
        Ok(())
    }

    fn find_parent(&self, indent: usize) -> Result<String> {
        for candidate in self.seen.iter().rev() {
            let candidate_indent = self.program.table.get(candidate)?.indent();
            if candidate_indent < indent {
                return Ok(candidate.clone());
            }
        }
        bail!("orphan indented line: no shallower preceding instruction");
    }

    fn finish(self) -> Program {
        self.program
    }
}

/// User-chosen ids stay clear of the generated alias namespace.
fn check_user_id(id: &str) -> Result<()> {
    if id.contains('(') || id.contains(')') {
        bail!("invalid instruction id `{id}`: parentheses are reserved");
    }
    Ok(())
}

/// Columns of leading whitespace; a space counts 1, a tab counts 4.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// Splits a trimmed line into its kind token, header id, and comma-separated
/// parameter groups. The header runs up to the literal `with`; id words are
/// re-joined by single spaces.
fn split_line(trimmed: &str) -> (&str, String, Vec<Vec<String>>) {
    let mut tokens = trimmed.split_whitespace();
    let kind_token = tokens.next().unwrap_or_default();

    let mut id_words = Vec::new();
    let mut tail = Vec::new();
    let mut saw_with = false;
    for token in tokens {
        if !saw_with && token == "with" {
            saw_with = true;
        } else if saw_with {
            tail.push(token);
        } else {
            id_words.push(token);
        }
    }

    (kind_token, id_words.join(" "), group_tokens(&tail))
}

/// Groups the tokens after `with`: a trailing comma ends the current group.
fn group_tokens(tokens: &[&str]) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for &token in tokens {
        let stripped = token.trim_end_matches(',');
        let group_ended = stripped.len() != token.len();

        if !stripped.is_empty() {
            current.push(stripped.to_string());
        }
        if group_ended && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Parses the 1-or-2 integer values of a timing parameter group.
fn parse_range(param: Param, values: &[String], kind: Kind) -> Result<Range> {
    if values.is_empty() {
        bail!("parameter `{}` needs a value", param.name());
    }
    if values.len() > 2 {
        bail!("parameter `{}` takes at most two values", param.name());
    }

    let lo: i32 = values[0].parse().map_err(|_| {
        anyhow!("non-numeric value `{}` for parameter `{}`", values[0], param.name())
    })?;
    let hi: i32 = match values.get(1) {
        Some(value) => value.parse().map_err(|_| {
            anyhow!("non-numeric value `{}` for parameter `{}`", value, param.name())
        })?,
        None => lo,
    };

    if lo > hi {
        bail!("parameter `{}` range is out of order ({lo} > {hi})", param.name());
    }
    if lo < 0 {
        // The single negative value the language admits: unbounded
        // repetition on a group.
        let unbounded_group_repeat =
            param == Param::Repeat && kind == Kind::Group && lo == -1 && hi == -1;
        if !unbounded_group_repeat {
            bail!("parameter `{}` must be non-negative", param.name());
        }
    }

    Ok(Range::new(lo, hi))
}
