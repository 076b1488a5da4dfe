//! Parser for the one-line text form of expressions and statements.
//!
//! The text form is whatever the `Display` implementations render; this
//! module reads it back.

use crate::error::IrError;
use crate::expression::{AddressBase, AddressElement, Expression};
use crate::memory::LocalVarOffset;
use crate::pou::PouId;
use crate::statement::Statement;

peg::parser! {
    grammar ir_text() for str {
        rule _ = [' ' | '\t']*
        rule __ = [' ' | '\t']+

        rule u16_number() -> u16
            = n:$(['0'..='9']+) {? n.parse().or(Err("16-bit unsigned integer")) }

        rule i32_number() -> i32
            = n:$("-"? ['0'..='9']+) {? n.parse().or(Err("32-bit integer")) }

        rule size() -> usize
            = n:$(['0'..='9']+) {? n.parse::<u16>().map(usize::from).or(Err("size of at most 65535")) }

        rule hex() -> u64
            = "0x" n:$(['0'..='9' | 'a'..='f' | 'A'..='F']+) {?
                u64::from_str_radix(n, 16).or(Err("64-bit hexadecimal literal"))
            }

        rule identifier() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']*)

        rule pou_id() -> PouId
            = n:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.']*) {
                PouId::from(n)
            }

        pub rule local() -> LocalVarOffset
            = "$" n:u16_number() { LocalVarOffset(n) }

        rule locals() -> Vec<LocalVarOffset>
            = _ offsets:(local() ** (_ "," _)) _ { offsets }

        rule element() -> AddressElement
            = "+" n:u16_number() { AddressElement::Offset(n) }
            / "[" _ index:local() _ "," _ scale:u16_number() _ "," _ lower:i32_number() _ "," _ upper:i32_number() _ "]" {
                AddressElement::CheckedIndex { index, scale, lower, upper }
            }
            / "[" _ index:local() _ "," _ scale:u16_number() _ "]" {
                AddressElement::UncheckedIndex { index, scale }
            }

        rule base() -> AddressBase
            = "*" offset:local() { AddressBase::Deref(offset) }
            / offset:local() { AddressBase::Local(offset) }

        pub rule expression() -> Expression
            = bits:hex() { Expression::Literal { bits } }
            / "null" { Expression::Null }
            / "*" offset:local() { Expression::Deref { offset } }
            / "&" base:base() elements:element()* { Expression::Address { base, elements } }
            / offset:local() { Expression::LoadLocal { offset } }

        rule target() -> (bool, LocalVarOffset)
            = "*" offset:local() { (true, offset) }
            / offset:local() { (false, offset) }

        rule body() -> Statement
            = "//" " "? text:$([_]*) { Statement::comment(text) }
            / "label" __ name:identifier() { Statement::Label { name: name.to_string() } }
            / "jumpifnot" __ control:local() __ label:identifier() {
                Statement::JumpIfNot { control, label: label.to_string() }
            }
            / "jump" __ label:identifier() { Statement::Jump { label: label.to_string() } }
            / "call" __ callee:pou_id() _ "(" inputs:locals() ")" _ "=>" _ "(" outputs:locals() ")" {
                Statement::StaticCall { callee, inputs, outputs }
            }
            / "copy" size:size() __ value:expression() __ "to" __ target:target() {
                match target {
                    (true, target) => Statement::WriteDerefValue { size, value, target },
                    (false, target) => Statement::WriteValue { size, value, target },
                }
            }
            / "return" { Statement::Return }

        pub rule statement() -> Statement
            = _ statement:body() _ { statement }
    }
}

fn syntax_error(line: usize, err: peg::error::ParseError<peg::str::LineCol>) -> IrError {
    IrError::Syntax {
        line,
        message: format!("expected {} at column {}", err.expected, err.location.column),
    }
}

pub(crate) fn parse_expression(text: &str) -> Result<Expression, IrError> {
    ir_text::expression(text.trim()).map_err(|e| syntax_error(1, e))
}

pub(crate) fn parse_statement(text: &str) -> Result<Statement, IrError> {
    ir_text::statement(text.trim_end_matches(['\r', '\n'])).map_err(|e| syntax_error(1, e))
}

/// Parses a frame offset of the form `$n`.
pub fn parse_local(text: &str) -> Result<LocalVarOffset, IrError> {
    ir_text::local(text.trim()).map_err(|e| syntax_error(1, e))
}

/// Parses one statement per line. Blank lines are skipped and errors carry
/// the 1-based line number.
pub fn parse_statements(text: &str) -> Result<Vec<Statement>, IrError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            ir_text::statement(line.trim_end_matches('\r')).map_err(|e| syntax_error(index + 1, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_statements_when_blank_lines_then_skipped() {
        let statements = parse_statements("label L0\n\n   \njump L0\n").unwrap();

        assert_eq!(
            statements,
            vec![
                Statement::label("L0"),
                Statement::Jump {
                    label: String::from("L0")
                }
            ]
        );
    }

    #[test]
    fn parse_statements_when_bad_line_then_error_has_line_number() {
        let err = parse_statements("return\n\ncopy2 $0 into $2").unwrap_err();

        assert!(matches!(err, IrError::Syntax { line: 3, .. }));
    }

    #[test]
    fn parse_statements_when_copy_size_exceeds_offset_space_then_error() {
        let err = parse_statements("copy18446744073709551615 0x0 to $1").unwrap_err();

        assert!(matches!(err, IrError::Syntax { line: 1, .. }));
    }

    #[test]
    fn parse_statement_when_jumpifnot_then_not_read_as_jump() {
        let statement: Statement = "jumpifnot $4 END_IF".parse().unwrap();

        assert_eq!(
            statement,
            Statement::JumpIfNot {
                control: LocalVarOffset(4),
                label: String::from("END_IF")
            }
        );
    }

    #[test]
    fn parse_statement_when_call_with_dotted_name_and_no_arguments_then_call() {
        let statement: Statement = "call Lib.Reset() => ()".parse().unwrap();

        assert_eq!(
            statement,
            Statement::StaticCall {
                callee: PouId::from("Lib.Reset"),
                inputs: vec![],
                outputs: vec![],
            }
        );
    }

    #[test]
    fn parse_statement_when_comment_without_space_then_text_kept() {
        let statement: Statement = "//x := 1;".parse().unwrap();

        assert_eq!(statement, Statement::comment("x := 1;"));
    }

    #[test]
    fn parse_expression_when_unchecked_and_checked_elements_then_address() {
        let expression: Expression = "&$2[$6,4][$8,2,-5,5]+1".parse().unwrap();

        assert_eq!(
            expression,
            Expression::Address {
                base: AddressBase::Local(LocalVarOffset(2)),
                elements: vec![
                    AddressElement::UncheckedIndex {
                        index: LocalVarOffset(6),
                        scale: 4
                    },
                    AddressElement::CheckedIndex {
                        index: LocalVarOffset(8),
                        scale: 2,
                        lower: -5,
                        upper: 5
                    },
                    AddressElement::Offset(1),
                ]
            }
        );
    }

    #[test]
    fn parse_expression_when_offset_out_of_range_then_error() {
        assert!("$70000".parse::<Expression>().is_err());
    }

    #[test]
    fn parse_local_when_dollar_number_then_offset() {
        assert_eq!(parse_local("$12").unwrap(), LocalVarOffset(12));
        assert!(parse_local("12").is_err());
    }
}
