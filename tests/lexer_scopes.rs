// tests/lexer_scopes.rs
use indigo_front::error::{LexError, LexErrorKind};
use indigo_front::lexer::{Lexer, Tok, Token};

fn lex_all(input: &str) -> Vec<Token> {
    Lexer::new(input)
        .collect::<Result<Vec<_>, LexError>>()
        .expect("unexpected lex error")
}

fn kinds(input: &str) -> Vec<Tok> {
    lex_all(input).into_iter().map(|t| t.tok).collect()
}

fn lex_err(input: &str) -> LexError {
    let mut lx = Lexer::new(input);
    loop {
        match lx.next_token() {
            Ok(tok) if tok.tok == Tok::Eof => panic!("lexed to EOF without error"),
            Ok(_) => continue,
            Err(err) => return err,
        }
    }
}

#[test]
fn empty_input_is_a_single_eof() {
    assert_eq!(kinds(""), vec![Tok::Eof]);
}

#[test]
fn leading_newline_with_indent_opens_a_scope() {
    assert_eq!(
        kinds("\n  for"),
        vec![Tok::NewScope, Tok::KwFor, Tok::EndScope, Tok::Eof]
    );
}

#[test]
fn nested_indent_with_dedent_at_eof() {
    let src = "\n  for test\n    for\n    frog\n";
    assert_eq!(
        kinds(src),
        vec![
            Tok::NewScope,
            Tok::KwFor,
            Tok::Word("test".into()),
            Tok::NewScope,
            Tok::KwFor,
            Tok::Word("frog".into()),
            Tok::EndScope,
            Tok::EndScope,
            Tok::Eof,
        ]
    );
}

#[test]
fn no_leading_newline_means_no_scope() {
    assert_eq!(kinds("for"), vec![Tok::KwFor, Tok::Eof]);
}

#[test]
fn dedent_to_an_outer_level_closes_inner_scopes() {
    assert_eq!(
        kinds("\n  a\n    b\n  c"),
        vec![
            Tok::NewScope,
            Tok::Word("a".into()),
            Tok::NewScope,
            Tok::Word("b".into()),
            Tok::EndScope,
            Tok::Word("c".into()),
            Tok::EndScope,
            Tok::Eof,
        ]
    );
}

#[test]
fn multi_level_dedent_emits_one_endscope_per_level() {
    assert_eq!(
        kinds("\n a\n  b\n   c\n a"),
        vec![
            Tok::NewScope,
            Tok::Word("a".into()),
            Tok::NewScope,
            Tok::Word("b".into()),
            Tok::NewScope,
            Tok::Word("c".into()),
            Tok::EndScope,
            Tok::EndScope,
            Tok::Word("a".into()),
            Tok::EndScope,
            Tok::Eof,
        ]
    );
}

#[test]
fn blank_lines_do_not_touch_the_stack() {
    // The middle line is only whitespace; its measurement is discarded.
    assert_eq!(
        kinds("\n  a\n\n  b"),
        vec![
            Tok::NewScope,
            Tok::Word("a".into()),
            Tok::Word("b".into()),
            Tok::EndScope,
            Tok::Eof,
        ]
    );
    assert_eq!(
        kinds("\n  a\n        \n  b"),
        vec![
            Tok::NewScope,
            Tok::Word("a".into()),
            Tok::Word("b".into()),
            Tok::EndScope,
            Tok::Eof,
        ]
    );
}

#[test]
fn dedent_to_unmatched_intermediate_width_is_a_bad_indent() {
    let err = lex_err("\n  a\n      b\n    c");
    assert_eq!(err.kind, LexErrorKind::BadIndent);
    // Cursor sits on the first real character of the misaligned line.
    assert_eq!(err.offset, "\n  a\n      b\n    ".len());
}

#[test]
fn tabs_count_like_any_other_indent_character() {
    assert_eq!(
        kinds("\n\tfor"),
        vec![Tok::NewScope, Tok::KwFor, Tok::EndScope, Tok::Eof]
    );
}

#[test]
fn scope_tokens_balance_on_deep_nesting() {
    let src = "\n a\n  b\n   c\n    d\n     e";
    let toks = kinds(src);
    let opens = toks.iter().filter(|t| **t == Tok::NewScope).count();
    let closes = toks.iter().filter(|t| **t == Tok::EndScope).count();
    assert_eq!(opens, 5);
    assert_eq!(opens, closes);
}

#[test]
fn eof_keeps_being_returned_after_the_end() {
    let mut lx = Lexer::new("for");
    assert_eq!(lx.next_token().unwrap().tok, Tok::KwFor);
    assert_eq!(lx.next_token().unwrap().tok, Tok::Eof);
    assert_eq!(lx.next_token().unwrap().tok, Tok::Eof);
    assert_eq!(lx.next_token().unwrap().tok, Tok::Eof);
}

#[test]
fn iterator_fuses_after_eof() {
    let toks: Vec<_> = Lexer::new("\n  for").collect();
    assert_eq!(toks.len(), 4);
    let mut lx = Lexer::new("for");
    assert!(lx.by_ref().count() == 2);
    assert!(lx.next().is_none());
}

#[test]
fn offsets_point_at_token_starts() {
    let toks = lex_all("\n  for");
    let offsets: Vec<usize> = toks.iter().map(|t| t.offset).collect();
    // NEWSCOPE at the newline, FOR at its first letter, the synthetic tail
    // at end of input.
    assert_eq!(offsets, vec![0, 3, 6, 6]);
}
