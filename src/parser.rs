use crate::ast::*;
use crate::diagnostics::{BindgenError, ParseError};
use crate::lexer;
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};

/// Parse a preprocessed C translation unit into its declarations. `file`
/// names the main input for token coordinates (overridden by linemarkers).
pub fn parse_header(source: &str, file: &str) -> Result<HeaderAst, BindgenError> {
    let tokens = lexer::lex(source, file)?;
    let parser = Parser::new(tokens);
    parser.parse().map_err(BindgenError::from)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    /// A malformed or unsupported declaration fails the whole parse: the
    /// input is a machine-generated preprocessed unit, so an error means the
    /// header itself breaks the generator's contract.
    fn parse(mut self) -> Result<HeaderAst, ParseError> {
        let mut decls = Vec::new();
        while !self.is_at_end() {
            if self.match_with(|k| matches!(k, TokenKind::Semicolon)) {
                continue;
            }
            if self.check_keyword(Keyword::Typedef) {
                decls.push(self.parse_typedef()?);
            } else if self.check_keyword(Keyword::Enum) {
                let decl = self.parse_enum_def()?;
                self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
                decls.push(Decl::Enum(decl));
            } else {
                decls.push(Decl::Function(self.parse_function()?));
            }
        }
        Ok(HeaderAst { decls })
    }

    fn parse_typedef(&mut self) -> Result<Decl, ParseError> {
        let start = self.expect_keyword(Keyword::Typedef)?.span;
        if self.match_keyword(Keyword::Struct) {
            // typedef struct MSH_MESH MSH_MESH;
            let _ = self.expect_identifier("struct tag")?;
            let (alias, alias_span) = self.expect_identifier("typedef name")?;
            let end = self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
            return Ok(Decl::Typedef(TypedefDecl {
                name: alias,
                span: start.merge(alias_span).merge(end.span),
            }));
        }
        if self.check_keyword(Keyword::Enum) {
            // typedef enum TAG { .. } alias_t;
            let mut decl = self.parse_enum_def()?;
            let (alias, alias_span) = self.expect_identifier("typedef name")?;
            let end = self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
            decl.alias = Some(alias);
            decl.span = start.merge(alias_span).merge(end.span);
            return Ok(Decl::Enum(decl));
        }
        // typedef int size_t; -- the alias is the last name before the
        // semicolon, everything before it is the (ignored) base type.
        let (first, mut span) = self.expect_identifier("type name")?;
        let mut names = vec![first];
        while matches!(self.peek().kind, TokenKind::Identifier(_)) {
            let (name, name_span) = self.expect_identifier("typedef name")?;
            span = span.merge(name_span);
            names.push(name);
        }
        if names.len() < 2 {
            let token = self.peek().clone();
            return Err(ParseError::UnexpectedToken {
                expected: "typedef name",
                found: token.kind,
                span: token.span,
            });
        }
        let end = self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
        Ok(Decl::Typedef(TypedefDecl {
            name: names.pop().expect("at least two names"),
            span: start.merge(span).merge(end.span),
        }))
    }

    /// Parse `enum TAG? { enumerators }`. The caller owns whatever follows
    /// (a typedef alias or a semicolon).
    fn parse_enum_def(&mut self) -> Result<EnumDecl, ParseError> {
        let enum_token = self.expect_keyword(Keyword::Enum)?;
        let coord = enum_token.coord();
        let start = enum_token.span;
        let tag = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            Some(self.expect_identifier("enum tag")?.0)
        } else {
            None
        };
        self.expect_with("'{'", |k| matches!(k, TokenKind::LeftBrace))?;
        let mut enumerators = Vec::new();
        while !self.check(|k| matches!(k, TokenKind::RightBrace)) {
            let (name, name_span) = self.expect_identifier("enumerator name")?;
            let mut span = name_span;
            let value = if self.match_with(|k| matches!(k, TokenKind::Equals)) {
                let (value, value_span) = self.parse_int_literal()?;
                span = span.merge(value_span);
                Some(value)
            } else {
                None
            };
            enumerators.push(EnumeratorDecl { name, value, span });
            if !self.match_with(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
        }
        let end = self.expect_with("'}'", |k| matches!(k, TokenKind::RightBrace))?;
        Ok(EnumDecl {
            tag,
            alias: None,
            enumerators,
            coord,
            span: start.merge(end.span),
        })
    }

    fn parse_function(&mut self) -> Result<FuncDecl, ParseError> {
        let base = self.parse_type_specifier()?;
        let start = base.span();

        // Pointer-to-array return declarator: `int (*name(args))[3]`. The
        // function name sits in the innermost declarator.
        if self.match_with(|k| matches!(k, TokenKind::LeftParen)) {
            self.expect_with("'*'", |k| matches!(k, TokenKind::Star))?;
            let name_token =
                self.expect_with("function name", |k| matches!(k, TokenKind::Identifier(_)))?;
            let name = identifier_text(&name_token);
            let coord = name_token.coord();
            self.expect_with("'('", |k| matches!(k, TokenKind::LeftParen))?;
            let params = self.parse_params()?;
            self.expect_with("')'", |k| matches!(k, TokenKind::RightParen))?;
            self.expect_with("')'", |k| matches!(k, TokenKind::RightParen))?;
            self.expect_with("'['", |k| matches!(k, TokenKind::LeftBracket))?;
            let len = self.parse_array_len()?;
            self.expect_with("']'", |k| matches!(k, TokenKind::RightBracket))?;
            let end = self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
            return Ok(FuncDecl {
                name,
                coord,
                ret: TypeExpr::Ptr {
                    inner: Box::new(TypeExpr::Array {
                        inner: Box::new(base),
                        len,
                    }),
                },
                params,
                span: start.merge(end.span),
            });
        }

        let is_ptr = self.match_with(|k| matches!(k, TokenKind::Star));
        let name_token =
            self.expect_with("function name", |k| matches!(k, TokenKind::Identifier(_)))?;
        let name = identifier_text(&name_token);
        let coord = name_token.coord();
        self.expect_with("'('", |k| matches!(k, TokenKind::LeftParen))?;
        let params = self.parse_params()?;
        self.expect_with("')'", |k| matches!(k, TokenKind::RightParen))?;
        let end = self.expect_with("';'", |k| matches!(k, TokenKind::Semicolon))?;
        let ret = if is_ptr {
            TypeExpr::Ptr {
                inner: Box::new(base),
            }
        } else {
            base
        };
        Ok(FuncDecl {
            name,
            coord,
            ret,
            params,
            span: start.merge(end.span),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<ParamDecl>, ParseError> {
        if self.check(|k| matches!(k, TokenKind::RightParen)) {
            return Ok(Vec::new());
        }
        if self.check_keyword(Keyword::Void)
            && matches!(self.peek_kind_at(1), Some(TokenKind::RightParen))
        {
            self.advance();
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            params.push(self.parse_param()?);
            if !self.match_with(|k| matches!(k, TokenKind::Comma)) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<ParamDecl, ParseError> {
        let base = self.parse_type_specifier()?;
        let start = base.span();

        // `float (*data)[3]` -- pointer to a fixed-size row.
        if self.match_with(|k| matches!(k, TokenKind::LeftParen)) {
            self.expect_with("'*'", |k| matches!(k, TokenKind::Star))?;
            let (name, _) = self.expect_identifier("parameter name")?;
            self.expect_with("')'", |k| matches!(k, TokenKind::RightParen))?;
            self.expect_with("'['", |k| matches!(k, TokenKind::LeftBracket))?;
            let len = self.parse_array_len()?;
            let end = self.expect_with("']'", |k| matches!(k, TokenKind::RightBracket))?;
            return Ok(ParamDecl {
                name,
                ty: TypeExpr::Ptr {
                    inner: Box::new(TypeExpr::Array {
                        inner: Box::new(base),
                        len,
                    }),
                },
                span: start.merge(end.span),
            });
        }

        if self.match_with(|k| matches!(k, TokenKind::Star)) {
            let (name, name_span) = self.expect_identifier("parameter name")?;
            return Ok(ParamDecl {
                name,
                ty: TypeExpr::Ptr {
                    inner: Box::new(base),
                },
                span: start.merge(name_span),
            });
        }

        let (name, name_span) = self.expect_identifier("parameter name")?;
        let mut span = start.merge(name_span);
        let mut dims = Vec::new();
        while self.match_with(|k| matches!(k, TokenKind::LeftBracket)) {
            if dims.len() == 2 {
                let token = self.peek().clone();
                return Err(ParseError::UnexpectedToken {
                    expected: "at most two array dimensions",
                    found: token.kind,
                    span: token.span,
                });
            }
            let len = self.parse_array_len()?;
            let end = self.expect_with("']'", |k| matches!(k, TokenKind::RightBracket))?;
            span = span.merge(end.span);
            dims.push(len);
        }
        let ty = match dims.as_slice() {
            [] => base,
            [n] => TypeExpr::Array {
                inner: Box::new(base),
                len: *n,
            },
            [outer, inner] => TypeExpr::Array {
                inner: Box::new(TypeExpr::Array {
                    inner: Box::new(base),
                    len: *inner,
                }),
                len: *outer,
            },
            _ => unreachable!("dimension count is bounded above"),
        };
        Ok(ParamDecl { name, ty, span })
    }

    fn parse_type_specifier(&mut self) -> Result<TypeExpr, ParseError> {
        let is_const = self.match_keyword(Keyword::Const);
        if self.match_keyword(Keyword::Enum) {
            let (name, span) = self.expect_identifier("enum name")?;
            return Ok(TypeExpr::Named {
                name,
                is_const,
                span,
            });
        }
        let (name, span) = self.expect_identifier("type name")?;
        Ok(TypeExpr::Named {
            name,
            is_const,
            span,
        })
    }

    fn parse_int_literal(&mut self) -> Result<(i64, Span), ParseError> {
        let negative = self.match_with(|k| matches!(k, TokenKind::Minus));
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(value) => {
                let value = if negative { -value } else { value };
                Ok((value, token.span))
            }
            kind => Err(ParseError::UnexpectedToken {
                expected: "integer literal",
                found: kind,
                span: token.span,
            }),
        }
    }

    fn parse_array_len(&mut self) -> Result<u64, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(value) if value > 0 => Ok(value as u64),
            TokenKind::Integer(_) => Err(ParseError::InvalidArraySize { span: token.span }),
            kind => Err(ParseError::UnexpectedToken {
                expected: "array size",
                found: kind,
                span: token.span,
            }),
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if *k == keyword)
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, ParseError> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(ParseError::UnexpectedToken {
                expected: keyword.lexeme(),
                found: token.kind,
                span: token.span,
            })
        }
    }

    fn check<F>(&self, predicate: F) -> bool
    where
        F: Fn(&TokenKind) -> bool,
    {
        predicate(&self.peek().kind)
    }

    fn match_with<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(&TokenKind) -> bool,
    {
        if self.check(predicate) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_with<F>(&mut self, expected: &'static str, predicate: F) -> Result<Token, ParseError>
    where
        F: Fn(&TokenKind) -> bool,
    {
        if self.check(&predicate) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(ParseError::UnexpectedToken {
                expected,
                found: token.kind,
                span: token.span,
            })
        }
    }

    fn expect_identifier(&mut self, context: &'static str) -> Result<(String, Span), ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) => Ok((name, token.span)),
            kind => Err(ParseError::UnexpectedToken {
                expected: context,
                found: kind,
                span: token.span,
            }),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }
}

fn identifier_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Identifier(name) => name.clone(),
        kind => unreachable!("expected identifier token, found {kind:?}"),
    }
}
