pub mod parser;
pub mod token;
pub mod tokenizer;

use crate::error::Result;
use crate::ir::Module;

use parser::Parser;
use tokenizer::Tokenizer;

/// Parses the textual IR of a whole module.
pub fn parse_module(source: &str) -> Result<Module> {
    let tokens = Tokenizer::tokenize(source)?;
    Parser::parse(&tokens)
}
