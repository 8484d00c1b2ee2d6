// tests/lexer_props.rs
use indigo_front::lexer::{Lexer, Tok};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn never_panics_and_stays_in_bounds(s in ".*") {
        let lx = Lexer::new(&s);
        let max_steps = s.len().saturating_mul(4) + 64;

        let mut prev_offset = 0usize;
        let mut eof_seen = 0usize;

        for (steps, item) in lx.enumerate() {
            prop_assert!(
                steps <= max_steps,
                "too many steps (possible hang): steps={steps} len={} input={s:?}",
                s.len()
            );

            match item {
                Err(err) => {
                    prop_assert!(err.offset <= s.len(), "error offset out of bounds: {err:?}");
                    break;
                }
                Ok(tok) => {
                    prop_assert!(
                        tok.offset <= s.len(),
                        "offset out of bounds: {tok:?} len={}",
                        s.len()
                    );
                    prop_assert!(
                        tok.offset >= prev_offset,
                        "offset moved backwards: {} < {} at {tok:?} input={s:?}",
                        tok.offset, prev_offset
                    );
                    prev_offset = tok.offset;
                    if tok.tok == Tok::Eof {
                        eof_seen += 1;
                    }
                }
            }
        }

        prop_assert!(eof_seen <= 1, "more than one EOF in the stream: input={s:?}");
    }

    #[test]
    fn scope_tokens_always_balance(s in ".*") {
        let toks: Result<Vec<_>, _> = Lexer::new(&s).collect();
        // Errors abort the stream; balance is only promised for accepted
        // sources.
        if let Ok(toks) = toks {
            let opens = toks.iter().filter(|t| t.tok == Tok::NewScope).count();
            let closes = toks.iter().filter(|t| t.tok == Tok::EndScope).count();
            prop_assert_eq!(opens, closes, "unbalanced scopes for input {:?}", s);

            prop_assert_eq!(
                toks.iter().filter(|t| t.tok == Tok::Eof).count(),
                1,
                "stream must end with exactly one EOF: {:?}", s
            );
            prop_assert_eq!(toks.last().map(|t| t.tok.clone()), Some(Tok::Eof));
        }
    }

    // Structured source lines: every accepted stream balances and every
    // NEWSCOPE precedes its matching ENDSCOPE.
    #[test]
    fn indented_word_lines_balance(
        lines in prop::collection::vec((0usize..6, "[a-z]{1,6}"), 1..12)
    ) {
        let mut src = String::new();
        for (indent, word) in &lines {
            src.push('\n');
            for _ in 0..*indent {
                src.push(' ');
            }
            src.push_str(word);
        }

        if let Ok(toks) = Lexer::new(&src).collect::<Result<Vec<_>, _>>() {
            let mut depth = 0isize;
            for tok in &toks {
                match tok.tok {
                    Tok::NewScope => depth += 1,
                    Tok::EndScope => {
                        depth -= 1;
                        prop_assert!(depth >= 0, "ENDSCOPE without NEWSCOPE: {:?}", src);
                    }
                    _ => {}
                }
            }
            prop_assert_eq!(depth, 0, "unbalanced at EOF: {:?}", src);
        }
    }
}
