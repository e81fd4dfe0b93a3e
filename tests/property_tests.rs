// Property tests for the lexer, the token cursor and semantic ranges

use proptest::prelude::*;
use zsedit::parser::lexer::{Lexer, Token, TokenKind};
use zsedit::parser::stream::{TokenSet, TokenStream};
use zsedit::project::Project;

fn significant(source: &str) -> Vec<Token> {
    Lexer::new(source)
        .tokenize()
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect()
}

/// Well-nested bracket text over a few token shapes.
fn nested() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(vec!["a", "1", "+", ",", ";", "x.y", "\"s\""]).prop_map(String::from);
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|parts| parts.join(" ")),
            inner.clone().prop_map(|s| format!("( {} )", s)),
            inner.clone().prop_map(|s| format!("{{ {} }}", s)),
            inner.prop_map(|s| format!("[ {} ]", s)),
        ]
    })
}

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_map(|s| format!("f_{}", s))
}

/// A small class with random fields and a method using them.
fn class_source() -> impl Strategy<Value = String> {
    let field = (
        prop::sample::select(vec!["int", "double", "bool", "string", "Vector3", "Actor", "Missing"]),
        identifier(),
    );
    (
        prop::collection::vec(field, 1..5),
        prop::collection::vec(prop::sample::select(vec!["+", "-", "*", "==", "&&", ".."]), 1..4),
        0i32..1000,
    )
        .prop_map(|(fields, ops, n)| {
            let mut source = String::from("class Actor { }\nclass Thing : Actor\n{\n");
            for (ty, name) in &fields {
                source.push_str(&format!("\t{} {};\n", ty, name));
            }
            let mut expr = n.to_string();
            for (op, (_, name)) in ops.iter().zip(fields.iter().cycle()) {
                expr = format!("{} {} {}", expr, op, name);
            }
            source.push_str(&format!(
                "\tvoid Tick()\n\t{{\n\t\tlet r = {};\n\t\tif (r) {{ return; }} // done\n\t}}\n}}\n",
                expr
            ));
            source
        })
}

proptest! {
    #[test]
    fn prop_lexing_is_lossless(source in "\\PC{0,200}") {
        let tokens = Lexer::new(&source).tokenize();
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        prop_assert_eq!(&joined, &source);

        let mut offset = 0;
        for token in &tokens {
            prop_assert_eq!(token.start, offset);
            prop_assert!(token.end > token.start);
            offset = token.end;
        }
        prop_assert_eq!(offset, source.len());
    }

    #[test]
    fn prop_lexing_is_lossless_on_code(source in "[ -~\\t\\n]{0,200}") {
        let joined: String = Lexer::new(&source)
            .tokenize()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        prop_assert_eq!(joined, source);
    }

    #[test]
    fn prop_balanced_consumer_stops_at_matching_closer(inner in nested()) {
        let source = format!("( {} ) tail", inner);
        let tokens = significant(&source);
        let expected: Vec<(TokenKind, String)> = significant(&inner)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect();

        let mut stream = TokenStream::new(&tokens);
        prop_assert!(stream.expect(TokenKind::OpenParen).is_some());
        let consumed: Vec<(TokenKind, String)> = stream
            .consume_balanced(TokenSet::EMPTY)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect();
        prop_assert_eq!(consumed, expected);

        prop_assert!(stream.expect(TokenKind::CloseParen).is_some());
        prop_assert!(stream.peek().is_some_and(|t| t.is_keyword("tail")));
    }

    #[test]
    fn prop_semantic_ranges_stay_in_source(source in class_source()) {
        let project = Project::from_sources([("thing.zs", source.as_str())]);
        let document = &project.documents()[0];
        prop_assert!(!document.semantic().is_empty());
        for token in document.semantic() {
            prop_assert!(token.start <= token.end);
            prop_assert!(token.end <= source.len());
            prop_assert!(source.is_char_boundary(token.start));
            prop_assert!(source.is_char_boundary(token.end));
        }
    }
}
