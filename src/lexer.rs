use crate::diagnostics::LexError;
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};

/// Lex a preprocessed C translation unit. `file` names the main input and is
/// used for token coordinates until the first linemarker overrides it.
pub fn lex(source: &str, file: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, file).lex()
}

struct Lexer<'a> {
    source: &'a str,
    index: usize,
    line: usize,
    column: usize,
    file: String,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: &str) -> Self {
        Self {
            source,
            index: 0,
            line: 1,
            column: 1,
            file: basename(file).to_string(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let ch = match self.peek_char() {
                Some(ch) => ch,
                None => break,
            };
            let token = if is_ident_start(ch) {
                self.lex_identifier()
            } else if ch.is_ascii_digit() {
                self.lex_number()?
            } else {
                match ch {
                    '(' => self.simple_token(TokenKind::LeftParen),
                    ')' => self.simple_token(TokenKind::RightParen),
                    '{' => self.simple_token(TokenKind::LeftBrace),
                    '}' => self.simple_token(TokenKind::RightBrace),
                    '[' => self.simple_token(TokenKind::LeftBracket),
                    ']' => self.simple_token(TokenKind::RightBracket),
                    ',' => self.simple_token(TokenKind::Comma),
                    ';' => self.simple_token(TokenKind::Semicolon),
                    '*' => self.simple_token(TokenKind::Star),
                    '=' => self.simple_token(TokenKind::Equals),
                    '-' => self.simple_token(TokenKind::Minus),
                    _ => {
                        return Err(LexError::UnexpectedChar {
                            ch,
                            span: self.span_here(ch.len_utf8()),
                        })
                    }
                }
            };
            tokens.push(token);
        }
        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.index, self.index, self.line, self.column),
            self.file.clone(),
        ));
        Ok(tokens)
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance_char();
                }
                Some('/') if self.peek_second_char() == Some('/') => {
                    while let Some(ch) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                Some('/') if self.peek_second_char() == Some('*') => {
                    let start = self.span_here(2);
                    self.advance_char();
                    self.advance_char();
                    loop {
                        match self.peek_char() {
                            Some('*') if self.peek_second_char() == Some('/') => {
                                self.advance_char();
                                self.advance_char();
                                break;
                            }
                            Some(_) => {
                                self.advance_char();
                            }
                            None => return Err(LexError::UnterminatedComment { span: start }),
                        }
                    }
                }
                Some('#') => self.lex_directive()?,
                _ => return Ok(()),
            }
        }
    }

    /// Preprocessor output interleaves linemarkers (`# 12 "header.h" 2`)
    /// with the code. They re-anchor line numbers and the current file name;
    /// every other directive that survives preprocessing (`#pragma`) is
    /// skipped.
    fn lex_directive(&mut self) -> Result<(), LexError> {
        let start = self.span_here(1);
        self.advance_char();
        while matches!(self.peek_char(), Some(' ') | Some('\t')) {
            self.advance_char();
        }
        if !matches!(self.peek_char(), Some(ch) if ch.is_ascii_digit()) {
            self.skip_directive_line();
            return Ok(());
        }

        let mut line_number = 0usize;
        while let Some(ch) = self.peek_char() {
            if !ch.is_ascii_digit() {
                break;
            }
            line_number = line_number
                .checked_mul(10)
                .and_then(|n| n.checked_add(ch as usize - '0' as usize))
                .ok_or(LexError::MalformedLineMarker { span: start })?;
            self.advance_char();
        }
        while matches!(self.peek_char(), Some(' ') | Some('\t')) {
            self.advance_char();
        }
        if self.peek_char() != Some('"') {
            return Err(LexError::MalformedLineMarker { span: start });
        }
        self.advance_char();
        let name_start = self.index;
        while let Some(ch) = self.peek_char() {
            if ch == '"' || ch == '\n' {
                break;
            }
            self.advance_char();
        }
        if self.peek_char() != Some('"') {
            return Err(LexError::MalformedLineMarker { span: start });
        }
        let name = self.source[name_start..self.index].to_string();
        self.advance_char();
        // The marker's flags are irrelevant here; drop the rest of the line.
        self.skip_directive_line();
        self.line = line_number;
        self.column = 1;
        self.file = basename(&name).to_string();
        Ok(())
    }

    fn skip_directive_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            self.advance_char();
            if ch == '\n' {
                break;
            }
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start_index = self.index;
        let (line, column) = (self.line, self.column);
        while let Some(ch) = self.peek_char() {
            if !is_ident_continue(ch) {
                break;
            }
            self.advance_char();
        }
        let text = &self.source[start_index..self.index];
        let kind = match Keyword::from_lexeme(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text.to_string()),
        };
        Token::new(
            kind,
            Span::new(start_index, self.index, line, column),
            self.file.clone(),
        )
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start_index = self.index;
        let (line, column) = (self.line, self.column);
        let mut radix = 10;
        if self.peek_char() == Some('0')
            && matches!(self.peek_second_char(), Some('x') | Some('X'))
        {
            radix = 16;
            self.advance_char();
            self.advance_char();
        }
        while let Some(ch) = self.peek_char() {
            if !ch.is_ascii_hexdigit() {
                break;
            }
            self.advance_char();
        }
        let span = Span::new(start_index, self.index, line, column);
        // A literal suffix or a stray identifier character makes the whole
        // literal invalid; the modeled subset only uses plain integers.
        if matches!(self.peek_char(), Some(ch) if is_ident_continue(ch)) {
            return Err(LexError::InvalidNumber { span });
        }
        let digits = if radix == 16 {
            &self.source[start_index + 2..self.index]
        } else {
            &self.source[start_index..self.index]
        };
        let value = i64::from_str_radix(digits, radix)
            .map_err(|_| LexError::InvalidNumber { span })?;
        Ok(Token::new(
            TokenKind::Integer(value),
            span,
            self.file.clone(),
        ))
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let span = self.span_here(1);
        self.advance_char();
        Token::new(kind, span, self.file.clone())
    }

    fn span_here(&self, len: usize) -> Span {
        Span::new(self.index, self.index + len, self.line, self.column)
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut chars = self.source[self.index..].chars();
        chars.next();
        chars.next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.index += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linemarkers_rebase_coordinates() {
        let source = "# 1 \"/tmp/shims/stddef.h\"\ntypedef int size_t;\n# 42 \"/home/user/meshly.h\" 2\nint msh_logfile(const char* path);\n";
        let tokens = lex(source, "<input>").expect("lexing failed");
        let size_t = tokens
            .iter()
            .find(|t| matches!(&t.kind, TokenKind::Identifier(name) if name == "size_t"))
            .unwrap();
        assert_eq!(size_t.file, "stddef.h");
        assert_eq!(size_t.span.line, 1);
        let msh = tokens
            .iter()
            .find(|t| matches!(&t.kind, TokenKind::Identifier(name) if name == "msh_logfile"))
            .unwrap();
        assert_eq!(msh.file, "meshly.h");
        assert_eq!(msh.span.line, 42);
    }

    #[test]
    fn hex_and_negative_values_lex() {
        let tokens = lex("enum E { A = 0x10, B = -2 };", "e.h").expect("lexing failed");
        assert!(tokens
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Integer(16))));
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Minus)));
        assert!(tokens
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Integer(2))));
    }

    #[test]
    fn literal_suffixes_are_rejected() {
        let err = lex("enum E { A = 10UL };", "e.h").unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }
}
