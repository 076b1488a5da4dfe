//! Every expression and statement reads back from the text it renders to.

use proptest::prelude::*;
use stplc_ir::{
    parse_statements, render_statements, AddressBase, AddressElement, Expression, LocalVarOffset,
    PouId, Statement,
};

fn local() -> impl Strategy<Value = LocalVarOffset> {
    any::<u16>().prop_map(LocalVarOffset)
}

fn label() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,12}"
}

fn element() -> impl Strategy<Value = AddressElement> {
    prop_oneof![
        any::<u16>().prop_map(AddressElement::Offset),
        (local(), any::<u16>())
            .prop_map(|(index, scale)| AddressElement::UncheckedIndex { index, scale }),
        (local(), any::<u16>(), any::<i32>(), any::<i32>()).prop_map(
            |(index, scale, lower, upper)| AddressElement::CheckedIndex {
                index,
                scale,
                lower,
                upper
            }
        ),
    ]
}

fn expression() -> impl Strategy<Value = Expression> {
    prop_oneof![
        any::<u64>().prop_map(|bits| Expression::Literal { bits }),
        local().prop_map(|offset| Expression::LoadLocal { offset }),
        local().prop_map(|offset| Expression::Deref { offset }),
        (
            prop_oneof![
                local().prop_map(AddressBase::Local),
                local().prop_map(AddressBase::Deref)
            ],
            prop::collection::vec(element(), 0..4)
        )
            .prop_map(|(base, elements)| Expression::Address { base, elements }),
        Just(Expression::Null),
    ]
}

fn statement() -> impl Strategy<Value = Statement> {
    prop_oneof![
        "[ -~]{0,30}".prop_map(|text| Statement::comment(&text)),
        label().prop_map(|name| Statement::Label { name }),
        label().prop_map(|label| Statement::Jump { label }),
        (local(), label()).prop_map(|(control, label)| Statement::JumpIfNot { control, label }),
        (
            "[A-Za-z_][A-Za-z0-9_.]{0,12}",
            prop::collection::vec(local(), 0..4),
            prop::collection::vec(local(), 0..3)
        )
            .prop_map(|(callee, inputs, outputs)| Statement::StaticCall {
                callee: PouId::from(callee),
                inputs,
                outputs
            }),
        (1usize..64, expression(), local()).prop_map(|(size, value, target)| {
            Statement::WriteValue {
                size,
                value,
                target,
            }
        }),
        (1usize..64, expression(), local()).prop_map(|(size, value, target)| {
            Statement::WriteDerefValue {
                size,
                value,
                target,
            }
        }),
        Just(Statement::Return),
    ]
}

proptest! {
    #[test]
    fn expression_when_rendered_then_parses_to_same_value(expression in expression()) {
        let text = expression.to_string();

        prop_assert_eq!(text.parse::<Expression>().unwrap(), expression);
    }

    #[test]
    fn statement_when_rendered_then_parses_to_same_value(statement in statement()) {
        let text = statement.to_string();

        prop_assert_eq!(text.parse::<Statement>().unwrap(), statement);
    }

    #[test]
    fn statements_when_rendered_then_parse_to_same_sequence(
        statements in prop::collection::vec(statement(), 0..20)
    ) {
        let text = render_statements(&statements);

        prop_assert_eq!(parse_statements(&text).unwrap(), statements);
    }
}
