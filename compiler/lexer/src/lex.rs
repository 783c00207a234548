use crate::{LexError, Token, TokenKind, TokenValue};

const OPEN_BLOCKS: [&str; 4] = ["ideed,", "obviously,", "definetly,", "also,"];
const CLOSE_BLOCKS: [&str; 4] = ["overall.", "hence.", "nevertheless.", "whereas."];

/// Splits source text into whitespace-separated lexemes and classifies
/// each one against the fixed keyword tables. Anything that is neither a
/// keyword nor starts with a digit is an identifier.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();

        for (line_idx, line) in self.source.lines().enumerate() {
            let mut chars = line.char_indices().peekable();

            while let Some(&(start, c)) = chars.peek() {
                if c.is_whitespace() {
                    chars.next();
                    continue;
                }

                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }

                let lexeme = &line[start..end];
                let (kind, value) = classify(lexeme);

                tokens.push(Token::new(
                    kind,
                    lexeme,
                    value,
                    line_idx as i32 + 1,
                    start as i32 + 1,
                ));
            }
        }

        tokens
    }
}

fn classify(lexeme: &str) -> (TokenKind, TokenValue) {
    if let Some(kind) = keyword(lexeme) {
        return (kind, TokenValue::None);
    }

    if OPEN_BLOCKS.contains(&lexeme) {
        return (TokenKind::OpenBlock, TokenValue::None);
    }

    if CLOSE_BLOCKS.contains(&lexeme) {
        return (TokenKind::CloseBlock, TokenValue::None);
    }

    if lexeme.starts_with(|c: char| c.is_ascii_digit()) {
        return match lexeme.parse::<i64>() {
            Ok(val) => (TokenKind::Number, TokenValue::Integer(val)),
            Err(_) => (TokenKind::Unknown, TokenValue::Error(LexError::InvalidNumber)),
        };
    }

    (TokenKind::Identifier, TokenValue::None)
}

fn keyword(lexeme: &str) -> Option<TokenKind> {
    let kind = match lexeme {
        "with" => TokenKind::With,
        "without" => TokenKind::Without,
        "times" => TokenKind::Times,
        "split" => TokenKind::Split,
        "root" => TokenKind::Root,
        "not" => TokenKind::Not,
        "eq" => TokenKind::Eq,
        "neql" => TokenKind::Neql,
        "less" => TokenKind::Less,
        "leseq" => TokenKind::Leseq,
        "more" => TokenKind::More,
        "moreq" => TokenKind::Moreq,
        "Let" => TokenKind::Let,
        "Idea" => TokenKind::Idea,
        "Theurgy" => TokenKind::Theurgy,
        "Criterion" => TokenKind::Criterion,
        "Else" => TokenKind::Else,
        "While" => TokenKind::While,
        "Ritual" => TokenKind::Ritual,
        "Catharsis" => TokenKind::Catharsis,
        "Thanks" => TokenKind::Thanks,
        "Write" => TokenKind::Write,
        "Read" => TokenKind::Read,
        "," => TokenKind::Comma,
        _ => return None,
    };

    Some(kind)
}
