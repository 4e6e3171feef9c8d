//! Content stream tokenizer behaviour.

use folio_core::PdfError;
use folio_core::content::{ContentLexer, Token};

fn lex(data: &[u8]) -> Vec<Token> {
    ContentLexer::new(data.to_vec())
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn op(name: &str) -> Token {
    Token::Operator(name.to_string())
}

fn num(n: f64) -> Token {
    Token::Number(n)
}

#[test]
fn test_path_operators() {
    assert_eq!(
        lex(b"10 20 m 30.5 40 l h\nf*"),
        vec![
            num(10.0),
            num(20.0),
            op("m"),
            num(30.5),
            num(40.0),
            op("l"),
            op("h"),
            op("f*"),
        ]
    );
}

#[test]
fn test_number_forms() {
    assert_eq!(
        lex(b".25 -3.5 +7 4. -.5"),
        vec![num(0.25), num(-3.5), num(7.0), num(4.0), num(-0.5)]
    );
}

#[test]
fn test_quote_operators() {
    assert_eq!(
        lex(b"(a) ' 1 2 (b) \" T*"),
        vec![
            Token::LiteralString(b"a".to_vec()),
            op("'"),
            num(1.0),
            num(2.0),
            Token::LiteralString(b"b".to_vec()),
            op("\""),
            op("T*"),
        ]
    );
}

#[test]
fn test_names_decode_hex_escapes() {
    assert_eq!(
        lex(b"/A#20B /Span/F1"),
        vec![
            Token::Name("A B".into()),
            Token::Name("Span".into()),
            Token::Name("F1".into()),
        ]
    );
}

#[test]
fn test_literal_string_escapes() {
    assert_eq!(
        lex(br"(a (nested) \) \101\n) Tj"),
        vec![Token::LiteralString(b"a (nested) ) A\n".to_vec()), op("Tj")]
    );
}

#[test]
fn test_hex_string_odd_nibble() {
    assert_eq!(
        lex(b"<48 65 6c6c 6f7> Tj"),
        vec![Token::LiteralString(b"Hellop".to_vec()), op("Tj")]
    );
}

#[test]
fn test_booleans_and_null() {
    assert_eq!(
        lex(b"true false null"),
        vec![Token::Boolean(true), Token::Boolean(false), op("null")]
    );
}

#[test]
fn test_nested_arrays() {
    assert_eq!(
        lex(b"[1 [2 /N] (s)] d"),
        vec![
            Token::Array(vec![
                num(1.0),
                Token::Array(vec![num(2.0), Token::Name("N".into())]),
                Token::LiteralString(b"s".to_vec()),
            ]),
            op("d"),
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(lex(b"% header\nq % save\nQ"), vec![op("q"), op("Q")]);
}

#[test]
fn test_inline_image_runs_to_delimited_ei() {
    let tokens = lex(b"BI /W 4 /H 1 /BPC 8 /CS /G ID\nAEIB EI Q");
    let id = tokens.iter().position(|t| t.is_operator("ID")).unwrap();
    assert_eq!(tokens[id + 1], Token::InlineImageData(b"AEIB".to_vec()));
    assert_eq!(tokens[id + 2], op("EI"));
    assert_eq!(tokens[id + 3], op("Q"));
    assert_eq!(tokens.len(), id + 4);
}

#[test]
fn test_inline_image_without_ei() {
    let mut lexer = ContentLexer::new(&b"BI /W 1 ID \x00\x01"[..]);
    let results: Vec<_> = lexer.by_ref().collect();
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(PdfError::ContentSyntaxError(_))))
    );
    assert!(lexer.next_token().is_none());
}

#[test]
fn test_unterminated_string() {
    let mut lexer = ContentLexer::new(&b"(never closed"[..]);
    assert!(matches!(
        lexer.next_token(),
        Some(Err(PdfError::ContentSyntaxError(_)))
    ));
}

#[test]
fn test_unterminated_array() {
    let mut lexer = ContentLexer::new(&b"[1 (a)"[..]);
    assert!(matches!(
        lexer.next_token(),
        Some(Err(PdfError::ContentSyntaxError(_)))
    ));
}

#[test]
fn test_braces_are_ignored() {
    assert_eq!(lex(b"{1 0 0 rg}"), vec![num(1.0), num(0.0), num(0.0), op("rg")]);
}

#[test]
fn test_position_tracks_consumed_input() {
    let mut lexer = ContentLexer::new(&b"q Q"[..]);
    assert_eq!(lexer.pos(), 0);
    lexer.next_token();
    assert_eq!(lexer.pos(), 1);
}
