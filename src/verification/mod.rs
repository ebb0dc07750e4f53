use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::ir::{Function, Module, Opcode, Operand};

/// Structural checks on a single function. The backend assumes all of
/// these hold and does not re-check them.
struct Verifier<'a> {
    func: &'a Function,
    labels: HashSet<&'a str>,
}

impl<'a> Verifier<'a> {
    fn new(func: &'a Function) -> Result<Self> {
        let mut verifier = Verifier {
            func,
            labels: HashSet::new(),
        };
        for (idx, block) in func.blocks.iter().enumerate() {
            match &block.label {
                Some(label) => {
                    if !verifier.labels.insert(label.as_str()) {
                        return Err(verifier.error(format!("label `{label}` defined twice")));
                    }
                }
                None if idx == 0 => {}
                None => return Err(verifier.error("only the entry block may be unlabeled")),
            }
        }
        Ok(verifier)
    }

    fn run(&self) -> Result<()> {
        if self.func.blocks.is_empty() {
            return Err(self.error("function has no blocks"));
        }

        let mut results: HashSet<&str> = self
            .func
            .params
            .iter()
            .map(|param| param.name.as_str())
            .collect();

        for block in &self.func.blocks {
            let name = block.label.as_deref().unwrap_or("<entry>");
            let Some(last) = block.instrs.last() else {
                return Err(self.error(format!("block `{name}` is empty")));
            };
            if !matches!(last.opcode, Opcode::Br | Opcode::Ret) {
                return Err(self.error(format!(
                    "block `{name}` does not end with a terminator"
                )));
            }

            for instr in &block.instrs {
                if let Some(result) = &instr.result {
                    if !results.insert(result.as_str()) {
                        return Err(self.error(format!("`%{result}` is defined twice")));
                    }
                }
                for operand in &instr.operands {
                    if let Operand::Label(label) = operand {
                        if !self.labels.contains(label.as_str()) {
                            return Err(self.error(format!("branch to undefined label `{label}`")));
                        }
                    }
                }
                if instr.opcode == Opcode::Br && !matches!(instr.operands.len(), 1 | 3) {
                    return Err(self.error(format!("malformed branch `{instr}`")));
                }
            }
        }

        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Verify {
            function: self.func.name.clone(),
            message: message.into(),
        }
    }
}

/// Checks the invariants the rest of the pipeline takes for granted: one
/// optional unlabeled entry block, unique labels and result names, defined
/// branch targets and terminated blocks.
pub fn verify(module: &Module) -> Result<()> {
    let mut globals = HashSet::new();
    for global in &module.globals {
        if !globals.insert(global.name.as_str()) {
            return Err(Error::Verify {
                function: String::new(),
                message: format!("global `@{}` defined twice", global.name),
            });
        }
    }

    for func in &module.functions {
        Verifier::new(func)?.run()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_module;

    fn verify_source(source: &str) -> Result<()> {
        verify(&parse_module(source).unwrap())
    }

    #[test]
    fn test_verify_accepts_loop() {
        verify_source(
            r#"
define i64 @count(i64 %n) {
  br label %head
head:
  %c = icmp slt i64 %n, 10
  br i1 %c, label %body, label %exit
body:
  br label %head
exit:
  ret i64 %n
}
"#,
        )
        .unwrap();
    }

    #[test]
    fn test_verify_rejects_undefined_label() {
        let err = verify_source("define void @f() {\n  br label %nowhere\n}\n").unwrap_err();
        assert!(err.to_string().contains("nowhere"), "{err}");
    }

    #[test]
    fn test_verify_rejects_missing_terminator() {
        let err = verify_source("define i64 @f() {\nentry:\n  %x = add i64 1, 2\n}\n").unwrap_err();
        assert!(matches!(err, Error::Verify { .. }));
    }

    #[test]
    fn test_verify_rejects_redefinition() {
        let err = verify_source(
            "define i64 @f(i64 %a) {\n  %a = add i64 1, 2\n  ret i64 %a\n}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("defined twice"), "{err}");
    }

    #[test]
    fn test_verify_rejects_duplicate_labels() {
        let err = verify_source(
            "define void @f() {\na:\n  br label %a\na:\n  ret void\n}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("`a` defined twice"), "{err}");
    }
}
