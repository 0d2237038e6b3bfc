//! Path regexes shared by the in-memory handler and the edge program.
//!
//! # Responsibilities
//! - Accept only syntax the edge runtime's `RegExp` reads the same way
//! - Derive the in-memory pattern with the edge runtime's ASCII classes
//! - Derive the edge pattern, which adds captures so group offsets can be
//!   computed without match indices
//!
//! # Design Decisions
//! - Capture groups may not sit inside `*`, `+` or counted repetitions: the
//!   two engines disagree on which iteration a repeated group reports
//! - A group's start is the match start plus the lengths of the captures
//!   that precede it on its path through the pattern

use regex::Regex;
use regex_syntax::ast::parse::Parser;
use regex_syntax::ast::{
    AssertionKind, Ast, ClassBracketed, ClassPerl, ClassPerlKind, ClassSet, ClassSetItem,
    GroupKind, HexLiteralKind, Literal, LiteralKind, RepetitionKind, RepetitionOp,
    RepetitionRange, SpecialLiteralKind, Span,
};
use serde::Serialize;

const DOT: &str = r"[^\n\r\x{2028}\x{2029}]";
const DIGIT: &str = "[0-9]";
const NOT_DIGIT: &str = "[^0-9]";
const WORD: &str = "[0-9A-Za-z_]";
const NOT_WORD: &str = "[^0-9A-Za-z_]";
const SPACE: &str =
    r"[\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}]";
const NOT_SPACE: &str =
    r"[^\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}]";

/// Where one capture group of the source pattern sits in the edge match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSpan {
    /// Edge capture holding the group's text.
    pub capture: usize,
    /// Edge captures whose lengths add up to the group's offset from the match start.
    pub before: Vec<usize>,
}

/// A checked path regex and its two derived forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRegex {
    source: String,
    local: String,
    edge: String,
    groups: Vec<GroupSpan>,
}

impl EdgeRegex {
    /// Check `pattern` and derive both forms. The error is a human-readable reason.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let ast = Parser::new().parse(pattern).map_err(|e| e.to_string())?;

        let mut check = Check::default();
        check.node(&ast, false)?;

        let mut layout = Layout::default();
        layout.node(&ast, &[]);

        Ok(Self {
            source: pattern.to_string(),
            local: splice_replacements(pattern, check.replacements),
            edge: splice_inserts(pattern, layout.inserts),
            groups: layout.groups,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Pattern for the in-memory engine.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Pattern for the edge runtime.
    pub fn edge(&self) -> &str {
        &self.edge
    }

    /// One entry per capture group of the source, in group order.
    pub fn groups(&self) -> &[GroupSpan] {
        &self.groups
    }

    pub fn compile_local(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.local)
    }
}

fn is_capture(ast: &Ast) -> bool {
    matches!(ast, Ast::Group(group) if !matches!(group.kind, GroupKind::NonCapturing(_)))
}

fn contains_capture(ast: &Ast) -> bool {
    match ast {
        Ast::Group(group) => is_capture(ast) || contains_capture(&group.ast),
        Ast::Repetition(rep) => contains_capture(&rep.ast),
        Ast::Alternation(alt) => alt.asts.iter().any(contains_capture),
        Ast::Concat(concat) => concat.asts.iter().any(contains_capture),
        _ => false,
    }
}

fn unsupported(span: &Span, what: &str) -> String {
    format!("{what} at offset {} is not supported at the edge", span.start.offset)
}

/// Validation pass; records the in-memory replacements as it goes.
#[derive(Default)]
struct Check {
    replacements: Vec<(Span, &'static str)>,
}

impl Check {
    fn node(&mut self, ast: &Ast, repeated: bool) -> Result<(), String> {
        match ast {
            Ast::Empty(_) => Ok(()),
            Ast::Flags(flags) => Err(unsupported(&flags.span, "inline flags")),
            Ast::Literal(literal) => check_literal(literal),
            Ast::Dot(span) => {
                self.replacements.push((**span, DOT));
                Ok(())
            }
            Ast::Assertion(assertion) => match assertion.kind {
                AssertionKind::StartLine | AssertionKind::EndLine => Ok(()),
                AssertionKind::WordBoundary => {
                    self.replacements.push((assertion.span, r"(?-u:\b)"));
                    Ok(())
                }
                AssertionKind::NotWordBoundary => {
                    self.replacements.push((assertion.span, r"(?-u:\B)"));
                    Ok(())
                }
                _ => Err(unsupported(&assertion.span, "assertion")),
            },
            Ast::ClassUnicode(class) => Err(unsupported(&class.span, "Unicode class")),
            Ast::ClassPerl(class) => {
                self.replacements.push((class.span, perl_class(class)));
                Ok(())
            }
            Ast::ClassBracketed(class) => self.class(class),
            Ast::Repetition(rep) => self.node(&rep.ast, repeated || repeats(&rep.op)),
            Ast::Group(group) => {
                match &group.kind {
                    GroupKind::CaptureIndex(_) => {}
                    GroupKind::CaptureName {
                        starts_with_p: true,
                        name,
                    } => return Err(unsupported(&name.span, "`(?P<name>` group")),
                    GroupKind::CaptureName { name, .. } => {
                        if !is_group_name(&name.name) {
                            return Err(unsupported(&name.span, "group name"));
                        }
                    }
                    GroupKind::NonCapturing(flags) => {
                        if !flags.items.is_empty() {
                            return Err(unsupported(&flags.span, "inline flags"));
                        }
                    }
                }
                if repeated && is_capture(ast) {
                    return Err(unsupported(&group.span, "repeated capture group"));
                }
                self.node(&group.ast, repeated)
            }
            Ast::Alternation(alt) => alt.asts.iter().try_for_each(|a| self.node(a, repeated)),
            Ast::Concat(concat) => concat.asts.iter().try_for_each(|a| self.node(a, repeated)),
        }
    }

    fn class(&mut self, class: &ClassBracketed) -> Result<(), String> {
        match &class.kind {
            ClassSet::BinaryOp(op) => Err(unsupported(&op.span, "class set operation")),
            ClassSet::Item(item) => self.class_item(item),
        }
    }

    fn class_item(&mut self, item: &ClassSetItem) -> Result<(), String> {
        match item {
            ClassSetItem::Empty(_) => Ok(()),
            ClassSetItem::Literal(literal) => check_class_literal(literal),
            ClassSetItem::Range(range) => {
                check_class_literal(&range.start)?;
                check_class_literal(&range.end)
            }
            ClassSetItem::Ascii(class) => Err(unsupported(&class.span, "POSIX class")),
            ClassSetItem::Unicode(class) => Err(unsupported(&class.span, "Unicode class")),
            ClassSetItem::Perl(class) => {
                self.replacements.push((class.span, perl_class(class)));
                Ok(())
            }
            ClassSetItem::Bracketed(class) => Err(unsupported(&class.span, "nested class")),
            ClassSetItem::Union(union) => union
                .items
                .iter()
                .try_for_each(|item| self.class_item(item)),
        }
    }
}

fn perl_class(class: &ClassPerl) -> &'static str {
    match (&class.kind, class.negated) {
        (ClassPerlKind::Digit, false) => DIGIT,
        (ClassPerlKind::Digit, true) => NOT_DIGIT,
        (ClassPerlKind::Word, false) => WORD,
        (ClassPerlKind::Word, true) => NOT_WORD,
        (ClassPerlKind::Space, false) => SPACE,
        (ClassPerlKind::Space, true) => NOT_SPACE,
    }
}

fn check_literal(literal: &Literal) -> Result<(), String> {
    let supported = match &literal.kind {
        LiteralKind::Verbatim | LiteralKind::Meta | LiteralKind::Superfluous => true,
        LiteralKind::HexFixed(HexLiteralKind::X | HexLiteralKind::UnicodeShort) => true,
        LiteralKind::Special(kind) => {
            !matches!(kind, SpecialLiteralKind::Bell | SpecialLiteralKind::Space)
        }
        _ => false,
    };
    if supported {
        Ok(())
    } else {
        Err(unsupported(&literal.span, "escape"))
    }
}

fn check_class_literal(literal: &Literal) -> Result<(), String> {
    check_literal(literal)?;
    if literal.kind == LiteralKind::Verbatim && matches!(literal.c, '[' | ']') {
        return Err(unsupported(&literal.span, "unescaped bracket in a class"));
    }
    if u32::from(literal.c) > 0xFFFF {
        return Err(unsupported(&literal.span, "astral character in a class"));
    }
    Ok(())
}

/// Whether the operator can match its operand more than once.
fn repeats(op: &RepetitionOp) -> bool {
    match &op.kind {
        RepetitionKind::ZeroOrOne => false,
        RepetitionKind::ZeroOrMore | RepetitionKind::OneOrMore => true,
        RepetitionKind::Range(RepetitionRange::Exactly(n) | RepetitionRange::Bounded(_, n)) => *n > 1,
        RepetitionKind::Range(RepetitionRange::AtLeast(_)) => true,
    }
}

fn is_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Layout pass; numbers edge captures in the order their parentheses open.
#[derive(Default)]
struct Layout {
    next: usize,
    inserts: Vec<(usize, char)>,
    groups: Vec<GroupSpan>,
}

impl Layout {
    fn capture(&mut self) -> usize {
        self.next += 1;
        self.next
    }

    fn wrap(&mut self, start: usize, end: usize) -> usize {
        let capture = self.capture();
        self.inserts.push((start, '('));
        self.inserts.push((end, ')'));
        capture
    }

    /// Lay out `ast`; returns its own capture when it is a capture group.
    fn node(&mut self, ast: &Ast, before: &[usize]) -> Option<usize> {
        match ast {
            Ast::Group(group) => {
                let own = is_capture(ast).then(|| {
                    let capture = self.capture();
                    self.groups.push(GroupSpan {
                        capture,
                        before: before.to_vec(),
                    });
                    capture
                });
                self.node(&group.ast, before);
                own
            }
            Ast::Repetition(rep) => {
                self.node(&rep.ast, before);
                None
            }
            Ast::Alternation(alt) => {
                for branch in &alt.asts {
                    self.node(branch, before);
                }
                None
            }
            Ast::Concat(concat) => {
                self.concat(&concat.asts, before);
                None
            }
            _ => None,
        }
    }

    fn concat(&mut self, terms: &[Ast], before: &[usize]) {
        let Some(last) = terms.iter().rposition(contains_capture) else {
            return;
        };
        let mut offset = before.to_vec();
        let mut i = 0;
        while i < last {
            let term = &terms[i];
            if is_capture(term) {
                let own = self.node(term, &offset);
                offset.extend(own);
                i += 1;
            } else if contains_capture(term) {
                let capture = self.capture();
                self.inserts.push((term.span().start.offset, '('));
                self.node(term, &offset);
                self.inserts.push((term.span().end.offset, ')'));
                offset.push(capture);
                i += 1;
            } else {
                let end = (i..last)
                    .find(|&j| contains_capture(&terms[j]))
                    .unwrap_or(last);
                let capture = self.wrap(terms[i].span().start.offset, terms[end - 1].span().end.offset);
                offset.push(capture);
                i = end;
            }
        }
        self.node(&terms[last], &offset);
    }
}

fn splice_replacements(pattern: &str, mut replacements: Vec<(Span, &'static str)>) -> String {
    replacements.sort_by_key(|(span, _)| span.start.offset);
    let mut out = String::with_capacity(pattern.len());
    let mut cursor = 0;
    for (span, text) in replacements {
        out.push_str(&pattern[cursor..span.start.offset]);
        out.push_str(text);
        cursor = span.end.offset;
    }
    out.push_str(&pattern[cursor..]);
    out
}

fn splice_inserts(pattern: &str, mut inserts: Vec<(usize, char)>) -> String {
    inserts.sort_by_key(|(offset, _)| *offset);
    let mut out = String::with_capacity(pattern.len() + inserts.len());
    let mut cursor = 0;
    for (offset, c) in inserts {
        out.push_str(&pattern[cursor..offset]);
        out.push(c);
        cursor = offset;
    }
    out.push_str(&pattern[cursor..]);
    out
}
