use crate::error::{Error, Result};
use crate::ir::{
    BasicBlock, Function, GlobalVariable, Instruction, Module, Opcode, Operand, Param, Predicate,
    Type,
};

use super::token::{Token, TokenType};

/// Recursive-descent parser over the token stream of one IR module.
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

/// Flags that may sit between an opcode and its type and carry no meaning
/// for this backend.
const IGNORED_FLAGS: [&str; 5] = ["nsw", "nuw", "exact", "inbounds", "volatile"];

/// Call markers written before the `call` mnemonic.
const CALL_MARKERS: [&str; 3] = ["tail", "musttail", "notail"];

impl<'a> Parser<'a> {
    pub fn parse(tokens: &'a [Token]) -> Result<Module> {
        let mut parser = Parser {
            tokens,
            position: 0,
        };
        parser.module()
    }

    fn module(&mut self) -> Result<Module> {
        let mut module = Module::default();

        loop {
            self.skip_newlines();
            let token = self.peek().clone();
            match token.r#type {
                TokenType::Eof => break,
                TokenType::GlobalIdent => module.globals.push(self.global()?),
                TokenType::Word if token.lexeme == "define" => {
                    module.functions.push(self.function()?)
                }
                TokenType::Word
                    if matches!(
                        token.lexeme.as_str(),
                        "target" | "source_filename" | "declare" | "attributes"
                    ) =>
                {
                    self.skip_line();
                }
                _ => return Err(self.error(format!("unexpected `{token}` at top level"))),
            }
        }

        Ok(module)
    }

    // @name = [linkage...] global <ty> <init> [, align N]
    fn global(&mut self) -> Result<GlobalVariable> {
        let name = self.advance().lexeme.clone();
        self.expect(TokenType::Equal)?;
        while !self.check_word("global") && !self.check_word("constant") {
            if self.peek().r#type != TokenType::Word {
                return Err(self.error(format!("expected `global` in definition of @{name}")));
            }
            self.advance();
        }
        self.advance();
        let ty = self.parse_type()?;

        let token = self.advance().clone();
        let zero = match token.r#type {
            TokenType::Integer => token.lexeme.parse::<i64>().ok() == Some(0),
            TokenType::Word => matches!(
                token.lexeme.as_str(),
                "zeroinitializer" | "null" | "false"
            ),
            _ => false,
        };
        if !zero {
            return Err(Error::parse(
                token.line,
                format!("global @{name} must be zero-initialized, found `{token}`"),
            ));
        }
        self.skip_line();

        Ok(GlobalVariable { name, ty })
    }

    fn function(&mut self) -> Result<Function> {
        self.advance(); // define
        while self.peek().r#type == TokenType::Word && !self.at_type() {
            self.advance();
        }
        let ret = self.parse_type()?;
        let name = self.expect(TokenType::GlobalIdent)?.lexeme.clone();

        self.expect(TokenType::LeftParen)?;
        let mut params = Vec::new();
        while self.peek().r#type != TokenType::RightParen {
            let ty = self.parse_type()?;
            while self.peek().r#type == TokenType::Word {
                self.advance();
            }
            let param = self.expect(TokenType::LocalIdent)?.lexeme.clone();
            params.push(Param { name: param, ty });
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RightParen)?;

        // attributes, personality, etc.
        while self.peek().r#type != TokenType::LeftBrace {
            if self.peek().r#type == TokenType::Eof {
                return Err(self.error(format!("missing body for @{name}")));
            }
            self.advance();
        }
        self.advance();

        let mut blocks: Vec<BasicBlock> = Vec::new();
        loop {
            self.skip_newlines();
            let token = self.peek().clone();
            match token.r#type {
                TokenType::RightBrace => {
                    self.advance();
                    break;
                }
                TokenType::Eof => {
                    return Err(self.error(format!("unterminated body for @{name}")));
                }
                TokenType::Word | TokenType::Integer
                    if self.peek_at(1).r#type == TokenType::Colon =>
                {
                    self.advance();
                    self.advance();
                    blocks.push(BasicBlock {
                        label: Some(token.lexeme.clone()),
                        instrs: vec![],
                    });
                }
                _ => {
                    let instr = self.instruction()?;
                    match blocks.last_mut() {
                        Some(block) => block.instrs.push(instr),
                        None => blocks.push(BasicBlock {
                            label: None,
                            instrs: vec![instr],
                        }),
                    }
                }
            }
        }

        Ok(Function {
            name,
            ret,
            params,
            blocks,
        })
    }

    fn instruction(&mut self) -> Result<Instruction> {
        let result = if self.peek().r#type == TokenType::LocalIdent
            && self.peek_at(1).r#type == TokenType::Equal
        {
            let name = self.advance().lexeme.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        while self.peek().r#type == TokenType::Word
            && CALL_MARKERS.contains(&self.peek().lexeme.as_str())
        {
            self.advance();
        }
        let mnemonic = self.expect(TokenType::Word)?.lexeme.clone();
        self.skip_flags();

        let (opcode, operands, ty) = match mnemonic.as_str() {
            "alloca" => (Opcode::Alloca, vec![], self.parse_type()?),
            "store" => {
                let ty = self.parse_type()?;
                let value = self.operand()?;
                self.expect(TokenType::Comma)?;
                self.parse_type()?;
                let pointer = self.operand()?;
                (Opcode::Store, vec![value, pointer], ty)
            }
            "load" => {
                let ty = self.parse_type()?;
                self.expect(TokenType::Comma)?;
                self.parse_type()?;
                let pointer = self.operand()?;
                (Opcode::Load, vec![pointer], ty)
            }
            "br" => {
                if self.check_word("label") {
                    (Opcode::Br, vec![self.label()?], Type::Void)
                } else {
                    self.parse_type()?;
                    let cond = self.operand()?;
                    self.expect(TokenType::Comma)?;
                    let then_label = self.label()?;
                    self.expect(TokenType::Comma)?;
                    let else_label = self.label()?;
                    (Opcode::Br, vec![cond, then_label, else_label], Type::Void)
                }
            }
            "icmp" => {
                let keyword = self.expect(TokenType::Word)?.lexeme.clone();
                let predicate = Predicate::from_keyword(&keyword)
                    .ok_or_else(|| self.error(format!("unknown icmp predicate `{keyword}`")))?;
                let ty = self.parse_type()?;
                let lhs = self.operand()?;
                self.expect(TokenType::Comma)?;
                let rhs = self.operand()?;
                (Opcode::Icmp(predicate), vec![lhs, rhs], ty)
            }
            "add" | "sub" | "mul" | "sdiv" | "srem" | "or" | "and" => {
                let ty = self.parse_type()?;
                let lhs = self.operand()?;
                self.expect(TokenType::Comma)?;
                let rhs = self.operand()?;
                (Opcode::from_mnemonic(&mnemonic), vec![lhs, rhs], ty)
            }
            "call" => self.call()?,
            "ret" => {
                if self.check_word("void") {
                    self.advance();
                    (Opcode::Ret, vec![], Type::Void)
                } else {
                    let ty = self.parse_type()?;
                    (Opcode::Ret, vec![self.operand()?], ty)
                }
            }
            "getelementptr" => {
                let ty = self.parse_type()?;
                self.expect(TokenType::Comma)?;
                self.parse_type()?;
                let mut operands = vec![self.operand()?];
                while self.matches(TokenType::Comma) {
                    if self.check_word("align") {
                        break;
                    }
                    self.parse_type()?;
                    operands.push(self.operand()?);
                }
                (Opcode::GetElementPtr, operands, ty)
            }
            "bitcast" => {
                self.parse_type()?;
                let value = self.operand()?;
                if !self.check_word("to") {
                    return Err(self.error("expected `to` in bitcast"));
                }
                self.advance();
                (Opcode::Bitcast, vec![value], self.parse_type()?)
            }
            other => {
                // Keep the registers it reads so that liveness still sees them.
                let mut operands = vec![];
                while !self.at_line_end() {
                    let token = self.advance();
                    if token.r#type == TokenType::LocalIdent {
                        operands.push(Operand::Reg(token.lexeme.clone()));
                    }
                }
                (Opcode::Unsupported(other.to_string()), operands, Type::Void)
            }
        };

        self.skip_line();

        Ok(Instruction {
            opcode,
            operands,
            result,
            ty,
        })
    }

    // call <ret>[(<params>)] @callee(<ty> <arg>, ...)
    fn call(&mut self) -> Result<(Opcode, Vec<Operand>, Type)> {
        while self.peek().r#type == TokenType::Word && !self.at_type() {
            self.advance();
        }
        let ty = match self.parse_type()? {
            Type::Function { ret, .. } => *ret,
            ty => ty,
        };
        let callee = self.expect(TokenType::GlobalIdent)?.lexeme.clone();

        self.expect(TokenType::LeftParen)?;
        let mut operands = vec![];
        while self.peek().r#type != TokenType::RightParen {
            self.parse_type()?;
            while self.peek().r#type == TokenType::Word && !self.at_value() {
                self.advance();
            }
            operands.push(self.operand()?);
            if !self.matches(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RightParen)?;
        operands.push(Operand::Callee(callee));

        Ok((Opcode::Call, operands, ty))
    }

    fn label(&mut self) -> Result<Operand> {
        if !self.check_word("label") {
            return Err(self.error(format!("expected `label`, found `{}`", self.peek())));
        }
        self.advance();
        let name = self.expect(TokenType::LocalIdent)?.lexeme.clone();
        Ok(Operand::Label(name))
    }

    fn operand(&mut self) -> Result<Operand> {
        let token = self.advance().clone();
        match token.r#type {
            TokenType::LocalIdent => Ok(Operand::Reg(token.lexeme)),
            TokenType::GlobalIdent => Ok(Operand::Global(token.lexeme)),
            TokenType::Integer => token
                .lexeme
                .parse::<i64>()
                .map(Operand::Imm)
                .map_err(|e| Error::parse(token.line, e.to_string())),
            TokenType::Word => match token.lexeme.as_str() {
                "null" | "false" | "undef" | "poison" | "zeroinitializer" => Ok(Operand::Imm(0)),
                "true" => Ok(Operand::Imm(1)),
                _ => Err(Error::parse(
                    token.line,
                    format!("expected a value, found `{token}`"),
                )),
            },
            _ => Err(Error::parse(
                token.line,
                format!("expected a value, found `{token}`"),
            )),
        }
    }

    fn parse_type(&mut self) -> Result<Type> {
        let token = self.advance().clone();
        let mut ty = match token.r#type {
            TokenType::Word => match token.lexeme.as_str() {
                "void" => Type::Void,
                "label" => Type::Label,
                "ptr" => Type::Opaque,
                word => match word.strip_prefix('i').and_then(|bits| bits.parse().ok()) {
                    Some(bits) => Type::Int(bits),
                    None => {
                        return Err(Error::parse(
                            token.line,
                            format!("expected a type, found `{token}`"),
                        ));
                    }
                },
            },
            TokenType::LeftBracket => {
                let len = self.expect(TokenType::Integer)?.lexeme.clone();
                let len = len
                    .parse::<u64>()
                    .map_err(|e| Error::parse(token.line, e.to_string()))?;
                if !self.check_word("x") {
                    return Err(self.error("expected `x` in array type"));
                }
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenType::RightBracket)?;
                Type::Array(len, Box::new(inner))
            }
            _ => {
                return Err(Error::parse(
                    token.line,
                    format!("expected a type, found `{token}`"),
                ));
            }
        };

        loop {
            match self.peek().r#type {
                TokenType::Star => {
                    self.advance();
                    ty = ty.pointer_to();
                }
                TokenType::LeftParen => {
                    self.advance();
                    let mut params = vec![];
                    while self.peek().r#type != TokenType::RightParen {
                        if self.check_word("...") {
                            self.advance();
                        } else {
                            params.push(self.parse_type()?);
                        }
                        if !self.matches(TokenType::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenType::RightParen)?;
                    ty = Type::Function {
                        ret: Box::new(ty),
                        params,
                    };
                }
                _ => break,
            }
        }

        Ok(ty)
    }

    fn at_type(&self) -> bool {
        let token = self.peek();
        match token.r#type {
            TokenType::LeftBracket => true,
            TokenType::Word => {
                matches!(token.lexeme.as_str(), "void" | "label" | "ptr")
                    || token
                        .lexeme
                        .strip_prefix('i')
                        .is_some_and(|bits| !bits.is_empty() && bits.bytes().all(|b| b.is_ascii_digit()))
            }
            _ => false,
        }
    }

    fn at_value(&self) -> bool {
        let token = self.peek();
        token.r#type != TokenType::Word
            || matches!(
                token.lexeme.as_str(),
                "null" | "true" | "false" | "undef" | "poison" | "zeroinitializer"
            )
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().r#type, TokenType::Newline | TokenType::Eof)
    }

    fn skip_flags(&mut self) {
        while self.peek().r#type == TokenType::Word
            && IGNORED_FLAGS.contains(&self.peek().lexeme.as_str())
        {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().r#type == TokenType::Newline {
            self.advance();
        }
    }

    fn peek(&self) -> &'a Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.position + offset).min(last)]
    }

    fn advance(&mut self) -> &'a Token {
        let index = self.position.min(self.tokens.len().saturating_sub(1));
        if self.tokens[index].r#type != TokenType::Eof {
            self.position += 1;
        }
        &self.tokens[index]
    }

    fn check_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    fn matches(&mut self, r#type: TokenType) -> bool {
        if self.peek().r#type == r#type {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, r#type: TokenType) -> Result<&'a Token> {
        if self.peek().r#type == r#type {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {:?}, found `{}`",
                r#type,
                self.peek()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.peek().line, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::tokenizer::Tokenizer;

    fn parse(input: &str) -> Result<Module> {
        let tokens = Tokenizer::tokenize(input)?;
        Parser::parse(&tokens)
    }

    #[test]
    fn test_parse_globals_and_declarations() {
        let module = parse(
            r#"
target triple = "x86_64-pc-linux-gnu"
declare i64 @putchar(i64)
@count = dso_local global i64 0, align 8
@flag = common global i8 0
"#,
        )
        .unwrap();
        assert_eq!(
            module.globals,
            vec![
                GlobalVariable {
                    name: "count".to_string(),
                    ty: Type::Int(64)
                },
                GlobalVariable {
                    name: "flag".to_string(),
                    ty: Type::Int(8)
                },
            ]
        );
        assert!(module.functions.is_empty());
    }

    #[test]
    fn test_parse_nonzero_global_rejected() {
        assert!(matches!(
            parse("@g = global i64 3"),
            Err(Error::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_function() {
        let module = parse(
            r#"
define i64 @max(i64 %a, i64 %b) #0 {
  %local_r = alloca i64, align 8
  %c = icmp sgt i64 %a, %b
  br i1 %c, label %then, label %else
then:
  store i64 %a, i64* %local_r
  br label %end
else:
  store i64 %b, i64* %local_r
  br label %end
end:
  %r = load i64, i64* %local_r
  ret i64 %r
}
"#,
        )
        .unwrap();
        let func = &module.functions[0];
        assert_eq!(func.name, "max");
        assert_eq!(func.ret, Type::Int(64));
        assert_eq!(func.param_index("b"), Some(1));
        let labels: Vec<Option<&str>> = func.blocks.iter().map(|b| b.label.as_deref()).collect();
        assert_eq!(labels, vec![None, Some("then"), Some("else"), Some("end")]);
        assert_eq!(func.blocks[0].instrs.len(), 3);
        assert_eq!(
            func.blocks[0].instrs[2].operands,
            vec![
                Operand::Reg("c".to_string()),
                Operand::Label("then".to_string()),
                Operand::Label("else".to_string()),
            ]
        );
        assert_eq!(
            func.blocks[1].instrs[0].operands,
            vec![
                Operand::Reg("a".to_string()),
                Operand::Reg("local_r".to_string())
            ]
        );
        assert_eq!(func.blocks[3].instrs[0].opcode, Opcode::Load);
    }

    #[test]
    fn test_parse_calls() {
        let module = parse(
            r#"
define i64 @main() {
entry:
  call void() @main_init()
  %x = call i64 @f(i64 1, i64* @g, i64 %y)
  %t = tail call i64 @f(i64 2)
  musttail call void @main_init()
  ret i64 0
}
"#,
        )
        .unwrap();
        let instrs = &module.functions[0].blocks[0].instrs;
        assert_eq!(instrs[0].operands, vec![Operand::Callee("main_init".to_string())]);
        assert_eq!(instrs[0].result, None);
        assert_eq!(instrs[0].ty, Type::Void);
        assert_eq!(
            instrs[1].operands,
            vec![
                Operand::Imm(1),
                Operand::Global("g".to_string()),
                Operand::Reg("y".to_string()),
                Operand::Callee("f".to_string()),
            ]
        );
        assert_eq!(instrs[1].result.as_deref(), Some("x"));
        assert_eq!(instrs[2].opcode, Opcode::Call);
        assert_eq!(instrs[2].result.as_deref(), Some("t"));
        assert_eq!(instrs[3].opcode, Opcode::Call);
        assert_eq!(instrs[3].operands, vec![Operand::Callee("main_init".to_string())]);
    }

    #[test]
    fn test_parse_gep_bitcast_and_flags() {
        let module = parse(
            r#"
define i64* @at(i8* %m, i64 %i) {
  %p = bitcast i8* %m to i64*
  %q = getelementptr inbounds i64, i64* %p, i64 %i
  %s = add nsw i64 %i, 1
  ret i64* %q
}
"#,
        )
        .unwrap();
        let instrs = &module.functions[0].blocks[0].instrs;
        assert_eq!(instrs[0].opcode, Opcode::Bitcast);
        assert_eq!(instrs[0].ty, Type::Int(64).pointer_to());
        assert_eq!(
            instrs[1].operands,
            vec![Operand::Reg("p".to_string()), Operand::Reg("i".to_string())]
        );
        assert_eq!(instrs[2].operands[1], Operand::Imm(1));
    }

    #[test]
    fn test_parse_unknown_opcode_is_kept() {
        let module = parse(
            r#"
define i64 @f(i64 %a) {
  %b = xor i64 %a, 1
  ret i64 %b
}
"#,
        )
        .unwrap();
        let instr = &module.functions[0].blocks[0].instrs[0];
        assert_eq!(instr.opcode, Opcode::Unsupported("xor".to_string()));
        assert_eq!(instr.operands, vec![Operand::Reg("a".to_string())]);
        assert_eq!(instr.result.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse("define i64 @f() {\n  %x = icmp ult i64 1, 2\n  ret i64 0\n}\n")
            .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }), "{err}");
        assert!(parse("define i64 @f() {\n  ret i64 0\n").is_err());
    }
}
