//! The statement grammar understood by the simulated engine.
//!
//! ```text
//! SELECT * FROM t [WHERE c = x]
//! SELECT f(x, ...)
//! INSERT INTO t VALUES (x, ...)
//! UPDATE t SET c = x [WHERE c = x]
//! DELETE FROM t [WHERE c = x]
//! ```
//! where `x` is an integer literal or a `$n` placeholder (1-based).
//! Keywords are case-insensitive; a trailing `;` is allowed.

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    /// Zero-based parameter index.
    Param(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub value: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select {
        table: String,
        filter: Option<Predicate>,
    },
    Call {
        function: String,
        args: Vec<Operand>,
    },
    Insert {
        table: String,
        values: Vec<Operand>,
    },
    Update {
        table: String,
        column: String,
        value: Operand,
        filter: Option<Predicate>,
    },
    Delete {
        table: String,
        filter: Option<Predicate>,
    },
}

impl Statement {
    pub fn parse(text: &str) -> Result<Statement> {
        let tokens = tokenize(text)?;
        let mut p = Parser { tokens, pos: 0 };
        let stmt = p.statement()?;
        p.eat_symbol(';');
        if let Some(tok) = p.peek() {
            return Err(SimError::Syntax(format!("unexpected trailing {tok:?}")));
        }
        Ok(stmt)
    }

    /// Table the statement touches, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            Statement::Select { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => Some(table),
            Statement::Call { .. } => None,
        }
    }

    /// Every operand in textual order.
    pub fn operands(&self) -> Vec<Operand> {
        let filter_value = |f: &Option<Predicate>| f.as_ref().map(|p| p.value);
        match self {
            Statement::Select { filter, .. } | Statement::Delete { filter, .. } => {
                filter_value(filter).into_iter().collect()
            }
            Statement::Call { args, .. } => args.clone(),
            Statement::Insert { values, .. } => values.clone(),
            Statement::Update { value, filter, .. } => {
                std::iter::once(*value).chain(filter_value(filter)).collect()
            }
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Number(i64),
    Param(usize),
    Symbol(char),
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                word.push(c.to_ascii_lowercase());
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else if c.is_ascii_digit() || c == '-' || c == '$' {
            chars.next();
            let mut digits = String::new();
            if c != '$' {
                digits.push(c);
            }
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            if c == '$' {
                let n: usize = digits
                    .parse()
                    .map_err(|_| SimError::Syntax("bad placeholder".into()))?;
                if n == 0 {
                    return Err(SimError::Syntax("placeholders start at $1".into()));
                }
                tokens.push(Token::Param(n - 1));
            } else {
                let n = digits
                    .parse()
                    .map_err(|_| SimError::Syntax(format!("bad number '{digits}'")))?;
                tokens.push(Token::Number(n));
            }
        } else if "*(),=;".contains(c) {
            tokens.push(Token::Symbol(c));
            chars.next();
        } else {
            return Err(SimError::Syntax(format!("unexpected character '{c}'")));
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == kw) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_symbol(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Token::Symbol(sym)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn keyword(&mut self, kw: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(SimError::Syntax(format!("expected {}", kw.to_uppercase())))
        }
    }

    fn symbol(&mut self, sym: char) -> Result<()> {
        if self.eat_symbol(sym) {
            Ok(())
        } else {
            Err(SimError::Syntax(format!("expected '{sym}'")))
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            other => Err(SimError::Syntax(format!("expected identifier, got {other:?}"))),
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Operand::Literal(n)),
            Some(Token::Param(i)) => Ok(Operand::Param(i)),
            other => Err(SimError::Syntax(format!("expected value, got {other:?}"))),
        }
    }

    fn operand_list(&mut self) -> Result<Vec<Operand>> {
        self.symbol('(')?;
        let mut out = Vec::new();
        if self.eat_symbol(')') {
            return Ok(out);
        }
        loop {
            out.push(self.operand()?);
            if self.eat_symbol(')') {
                return Ok(out);
            }
            self.symbol(',')?;
        }
    }

    fn filter(&mut self) -> Result<Option<Predicate>> {
        if !self.eat_keyword("where") {
            return Ok(None);
        }
        let column = self.ident()?;
        self.symbol('=')?;
        let value = self.operand()?;
        Ok(Some(Predicate { column, value }))
    }

    fn statement(&mut self) -> Result<Statement> {
        let verb = self.ident()?;
        match verb.as_str() {
            "select" => {
                if self.eat_symbol('*') {
                    self.keyword("from")?;
                    let table = self.ident()?;
                    let filter = self.filter()?;
                    Ok(Statement::Select { table, filter })
                } else {
                    let function = self.ident()?;
                    let args = self.operand_list()?;
                    Ok(Statement::Call { function, args })
                }
            }
            "insert" => {
                self.keyword("into")?;
                let table = self.ident()?;
                self.keyword("values")?;
                let values = self.operand_list()?;
                Ok(Statement::Insert { table, values })
            }
            "update" => {
                let table = self.ident()?;
                self.keyword("set")?;
                let column = self.ident()?;
                self.symbol('=')?;
                let value = self.operand()?;
                let filter = self.filter()?;
                Ok(Statement::Update {
                    table,
                    column,
                    value,
                    filter,
                })
            }
            "delete" => {
                self.keyword("from")?;
                let table = self.ident()?;
                let filter = self.filter()?;
                Ok(Statement::Delete { table, filter })
            }
            other => Err(SimError::Syntax(format!("unsupported statement '{other}'"))),
        }
    }
}
