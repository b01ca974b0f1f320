// constructor.rs - The compile-time stack machine that builds bytecode blocks

use crate::bytecode::{ByteCode, Op};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::lexer::{Token, TokenKind};
use crate::location::Location;
use crate::value::Value;

/// One in-progress compiled unit: a top level fragment, a word body, or a
/// sub-block pushed by a compiler plugin word.
#[derive(Debug, Clone, Default)]
pub struct Construction {
    pub is_immediate: bool,
    pub is_hidden: bool,

    pub name: String,
    pub description: String,
    pub signature: String,

    pub location: Option<Location>,

    pub byte_code: Vec<ByteCode>,
}

impl Construction {
    pub fn new() -> Self {
        Construction::default()
    }
}

/// Compilation state for one token stream.  The block stack always holds at
/// least the implicit top level construction, and the cursor is visible to
/// immediate words so they can consume tokens ahead of the main loop.
#[derive(Debug, Clone)]
pub struct Constructor {
    pub stack: Vec<Construction>,
    pub insert_at_front: bool,

    pub tokens: Vec<Token>,
    pub current_token: usize,
}

impl Constructor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Constructor {
            stack: vec![Construction::new()],
            insert_at_front: false,
            tokens,
            current_token: 0,
        }
    }

    pub fn top(&self) -> Result<&Construction> {
        self.stack
            .last()
            .ok_or_else(|| crate::error::ScriptError::new("No construction available."))
    }

    pub fn top_mut(&mut self) -> Result<&mut Construction> {
        self.stack
            .last_mut()
            .ok_or_else(|| crate::error::ScriptError::new("No construction available."))
    }

    pub fn pop_block(&mut self) -> Result<Construction> {
        self.stack
            .pop()
            .ok_or_else(|| crate::error::ScriptError::new("No construction available."))
    }

    /// Append an instruction to the current block, or prepend it when the
    /// insert-at-front toggle is set.
    pub fn insert_instruction(&mut self, instruction: ByteCode) -> Result<()> {
        let at_front = self.insert_at_front;
        let top = self.top_mut()?;

        if at_front {
            top.byte_code.insert(0, instruction);
        } else {
            top.byte_code.push(instruction);
        }

        Ok(())
    }

    /// Advance the cursor and return the token there, for words that consume
    /// their own arguments from the stream.
    pub fn next_token(&mut self) -> Result<Token> {
        self.current_token += 1;

        if self.current_token >= self.tokens.len() {
            return Err(crate::error::ScriptError::new(
                "Trying to read past end of token stream.",
            ));
        }

        Ok(self.tokens[self.current_token].clone())
    }
}

// ============================================================================
// TOKEN COMPILATION
// ============================================================================

impl Interpreter {
    /// Translate one token into bytecode.  Dictionary words win over every
    /// other reading; immediate words execute right now against the live
    /// constructor state.  Unknown tokens fall back to literal parsing, or
    /// to a late-bound execute for unknown words.
    pub fn compile_token(&mut self, token: &Token) -> Result<()> {
        let found = if token.kind != TokenKind::String {
            self.find_word(&token.text)
        } else {
            None
        };

        if let Some(word) = found {
            if word.is_immediate {
                return self.execute_word_at(token.location.clone(), &word);
            }

            // A name already declared as a local variable or constant in
            // this block stays late bound, so the generated unit's local
            // binding can shadow the dictionary entry.
            let operand = if self.is_declared_in_block(&token.text)? {
                Value::from(token.text.clone())
            } else {
                Value::from(word.handler_index as i64)
            };

            let instruction = ByteCode::new(Op::Execute, operand, Some(token.location.clone()));

            self.constructor_mut()?.top_mut()?.byte_code.push(instruction);
            return Ok(());
        }

        match token.kind {
            TokenKind::Number => {
                let value = self.parse_number_token(token)?;
                let instruction = ByteCode::new(Op::PushConstantValue, value, None);

                self.constructor_mut()?.top_mut()?.byte_code.push(instruction);
            }

            TokenKind::String => {
                let instruction =
                    ByteCode::new(Op::PushConstantValue, Value::from(token.text.clone()), None);

                self.constructor_mut()?.top_mut()?.byte_code.push(instruction);
            }

            TokenKind::Word => {
                // Unknown word: leave the name in the bytecode for the code
                // generator, or the runtime, to resolve later.
                let instruction = ByteCode::new(
                    Op::Execute,
                    Value::from(token.text.clone()),
                    Some(token.location.clone()),
                );

                self.constructor_mut()?.top_mut()?.byte_code.push(instruction);
            }
        }

        Ok(())
    }

    /// Drive compilation across the whole token stream.  The cursor is
    /// re-read every iteration because immediate words may have advanced it.
    pub fn compile_token_list(&mut self) -> Result<()> {
        self.constructor_mut()?.current_token = 0;

        loop {
            let token = {
                let constructor = self.constructor_mut()?;

                if constructor.current_token >= constructor.tokens.len() {
                    break;
                }

                constructor.tokens[constructor.current_token].clone()
            };

            self.compile_token(&token)?;

            self.constructor_mut()?.current_token += 1;
        }

        Ok(())
    }

    fn is_declared_in_block(&self, name: &str) -> Result<bool> {
        let top = self.constructor()?.top()?;

        Ok(top.byte_code.iter().any(|instruction| {
            matches!(instruction.op, Op::DefVariable | Op::DefConstant)
                && instruction.value.is_string()
                && instruction.value.as_string() == name
        }))
    }

    fn parse_number_token(&self, token: &Token) -> Result<Value> {
        let text = &token.text;

        if text.contains('.') {
            return match text.parse::<f64>() {
                Ok(value) => Ok(Value::from(value)),
                Err(_) => Err(self.script_error(format!("Malformed numeric literal, {}.", text))),
            };
        }

        let parsed = if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            i64::from_str_radix(digits, 16)
        } else if let Some(digits) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            i64::from_str_radix(digits, 2)
        } else {
            text.parse::<i64>()
        };

        match parsed {
            Ok(value) => Ok(Value::from(value)),
            Err(_) => Err(self.script_error(format!("Malformed numeric literal, {}.", text))),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
